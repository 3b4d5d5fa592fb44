//! Customer-facing order numbers.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur when parsing an [`OrderNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderNumberError {
    /// Wrong prefix or length.
    #[error("order number must be {prefix} followed by {digits} hex digits")]
    Malformed {
        /// Expected prefix.
        prefix: &'static str,
        /// Expected digit count.
        digits: usize,
    },
}

/// A public order number such as `TN3F9A0C12B7`.
///
/// Every order gets one at creation time: the `TN` prefix followed by the
/// first ten hex digits of a random UUID, upper-cased. The column is unique,
/// and the rare collision is retried by the checkout service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Fixed prefix of every order number.
    pub const PREFIX: &'static str = "TN";

    /// Number of hex digits after the prefix.
    pub const DIGITS: usize = 10;

    /// Generate a fresh random order number.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Derive an order number from a UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        let hex = uuid.simple().to_string().to_uppercase();
        let digits: String = hex.chars().take(Self::DIGITS).collect();
        Self(format!("{}{digits}", Self::PREFIX))
    }

    /// Parse an order number from a URL segment or form field.
    ///
    /// Lower-case input is accepted and normalized.
    ///
    /// # Errors
    ///
    /// Returns [`OrderNumberError::Malformed`] when the input is not `TN`
    /// followed by exactly ten hex digits.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let upper = s.trim().to_uppercase();
        let valid = upper
            .strip_prefix(Self::PREFIX)
            .is_some_and(|rest| {
                rest.len() == Self::DIGITS && rest.chars().all(|c| c.is_ascii_hexdigit())
            });

        if valid {
            Ok(Self(upper))
        } else {
            Err(OrderNumberError::Malformed {
                prefix: Self::PREFIX,
                digits: Self::DIGITS,
            })
        }
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn is_well_formed(s: &str) -> bool {
        s.len() == 12
            && s.starts_with("TN")
            && s[2..]
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
    }

    #[test]
    fn test_generate_format() {
        for _ in 0..100 {
            let number = OrderNumber::generate();
            assert!(is_well_formed(number.as_str()), "bad number {number}");
        }
    }

    #[test]
    fn test_from_uuid_is_deterministic() {
        let uuid = Uuid::parse_str("3f9a0c12-b7de-4a11-9c3e-000000000000").unwrap();
        assert_eq!(OrderNumber::from_uuid(uuid).as_str(), "TN3F9A0C12B7");
    }

    #[test]
    fn test_parse_normalizes_case() {
        let number = OrderNumber::parse("tn3f9a0c12b7").unwrap();
        assert_eq!(number.as_str(), "TN3F9A0C12B7");
    }

    #[test]
    fn test_parse_rejects_legacy_and_malformed() {
        assert!(OrderNumber::parse("ORD123456").is_err());
        assert!(OrderNumber::parse("TN123").is_err());
        assert!(OrderNumber::parse("TN3F9A0C12BZ").is_err());
        assert!(OrderNumber::parse("").is_err());
    }
}
