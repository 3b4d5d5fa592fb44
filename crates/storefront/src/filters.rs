//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Plural suffix for a count: `""` for exactly one, `"s"` otherwise.
///
/// Usage in templates: `{{ count }} item{{ count|plural }}`
#[askama::filter_fn]
pub fn plural(count: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(if count.to_string() == "1" { "" } else { "s" })
}

/// Filled and empty stars for a 0-5 value, rounding to the nearest star.
///
/// Usage in templates: `{{ product.average_rating|stars }}`
#[askama::filter_fn]
pub fn stars(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(star_string(&value.to_string()))
}

fn star_string(value: &str) -> String {
    let rating = value.parse::<f64>().unwrap_or(0.0).round().clamp(0.0, 5.0);
    // Bounded to 0..=5 above
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = rating as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_string() {
        assert_eq!(star_string("0"), "☆☆☆☆☆");
        assert_eq!(star_string("4.50"), "★★★★★");
        assert_eq!(star_string("3.49"), "★★★☆☆");
        assert_eq!(star_string("7"), "★★★★★");
        assert_eq!(star_string("n/a"), "☆☆☆☆☆");
    }
}
