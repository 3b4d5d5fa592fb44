//! Contact form subjects.

use serde::{Deserialize, Serialize};

/// What a contact message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contact_subject", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContactSubject {
    General,
    Support,
    Sales,
    Billing,
    Partnership,
}

impl ContactSubject {
    /// All subjects, in the order the form lists them.
    pub const ALL: [Self; 5] = [
        Self::General,
        Self::Support,
        Self::Sales,
        Self::Billing,
        Self::Partnership,
    ];

    /// Database/form value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Support => "support",
            Self::Sales => "sales",
            Self::Billing => "billing",
            Self::Partnership => "partnership",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::General => "General question",
            Self::Support => "Technical support",
            Self::Sales => "Sales",
            Self::Billing => "Billing",
            Self::Partnership => "Partnerships",
        }
    }

    /// Parse a form value.
    #[must_use]
    pub fn from_form(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value.trim())
    }
}
