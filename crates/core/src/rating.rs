//! Review ratings and the per-product aggregate.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Rating`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RatingError {
    #[error("rating must be between 1 and 5, got {0}")]
    OutOfRange(i64),
}

/// A 1-5 star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Build a rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] outside 1..=5.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError::OutOfRange(value))
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Filled and empty stars, e.g. `★★★★☆`.
    #[must_use]
    pub fn stars(self) -> String {
        let filled = usize::from(self.0);
        let empty = usize::from(Self::MAX - self.0);
        format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i16> for Rating {
    type Error = RatingError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

/// Average and count over a product's approved reviews.
///
/// Always recomputed from scratch; there is no running accumulator to drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatingSummary {
    /// Mean rating rounded half-up to two decimals; zero when `count == 0`.
    pub average: Decimal,
    pub count: u32,
}

impl RatingSummary {
    /// Aggregate a set of approved ratings.
    #[must_use]
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = Rating>,
    {
        let (sum, count) = ratings
            .into_iter()
            .fold((0_u64, 0_u32), |(sum, count), r| {
                (sum + u64::from(r.value()), count + 1)
            });

        if count == 0 {
            return Self::default();
        }

        let average = (Decimal::from(sum) / Decimal::from(count))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Self { average, count }
    }

    /// Average formatted with one decimal, e.g. `4.5`.
    #[must_use]
    pub fn display_average(&self) -> String {
        format!(
            "{:.1}",
            self.average
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ratings(values: &[i64]) -> Vec<Rating> {
        values.iter().map(|v| Rating::new(*v).unwrap()).collect()
    }

    #[test]
    fn test_rating_range() {
        assert!(Rating::new(1).is_ok());
        assert!(Rating::new(5).is_ok());
        assert_eq!(Rating::new(0), Err(RatingError::OutOfRange(0)));
        assert_eq!(Rating::new(6), Err(RatingError::OutOfRange(6)));
        assert_eq!(Rating::new(-1), Err(RatingError::OutOfRange(-1)));
        assert_eq!(Rating::new(256), Err(RatingError::OutOfRange(256)));
    }

    #[test]
    fn test_stars() {
        assert_eq!(Rating::new(4).unwrap().stars(), "★★★★☆");
        assert_eq!(Rating::new(1).unwrap().stars(), "★☆☆☆☆");
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let summary = RatingSummary::from_ratings(Vec::new());
        assert_eq!(summary.average, Decimal::ZERO);
        assert_eq!(summary.count, 0);
    }

    #[test]
    fn test_single_five_star() {
        let summary = RatingSummary::from_ratings(ratings(&[5]));
        assert_eq!(summary.average, Decimal::new(500, 2));
        assert_eq!(summary.count, 1);
    }

    #[test]
    fn test_average_rounds_to_two_places() {
        let summary = RatingSummary::from_ratings(ratings(&[5, 4, 4]));
        assert_eq!(summary.average, Decimal::new(433, 2));
        assert_eq!(summary.count, 3);

        let summary = RatingSummary::from_ratings(ratings(&[5, 5, 4]));
        assert_eq!(summary.average, Decimal::new(467, 2));
        assert_eq!(summary.display_average(), "4.7");
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<Rating>("3").is_ok());
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }
}
