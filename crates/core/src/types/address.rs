//! Postal address snapshot stored on orders.

use serde::{Deserialize, Serialize};

/// A shipping or billing address as captured at checkout.
///
/// Orders keep their own copy (a JSONB column), so later profile edits never
/// rewrite where a past order went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Street and number.
    pub address: String,
    /// City.
    pub city: String,
    /// Postal code.
    pub postal_code: String,
}

impl Address {
    /// Build an address, trimming every field.
    #[must_use]
    pub fn new(address: &str, city: &str, postal_code: &str) -> Self {
        Self {
            address: address.trim().to_owned(),
            city: city.trim().to_owned(),
            postal_code: postal_code.trim().to_owned(),
        }
    }

    /// Whether the street and city are filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.address.is_empty() && !self.city.is_empty()
    }

    /// Single-line rendering for order pages.
    #[must_use]
    pub fn one_line(&self) -> String {
        [&self.address, &self.city, &self.postal_code]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims() {
        let address = Address::new(" Calle Mayor 1 ", " Madrid", "28013 ");
        assert_eq!(address.address, "Calle Mayor 1");
        assert_eq!(address.city, "Madrid");
        assert_eq!(address.postal_code, "28013");
        assert!(address.is_complete());
    }

    #[test]
    fn test_one_line_skips_empty_parts() {
        let address = Address::new("Calle Mayor 1", "Madrid", "");
        assert_eq!(address.one_line(), "Calle Mayor 1, Madrid");
        assert!(!Address::default().is_complete());
    }
}
