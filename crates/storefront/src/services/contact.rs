//! Contact form validation and storage.

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use technova_core::{ContactMessageId, Email, EmailError};

use crate::db::contact::NewContactMessage;
use crate::db::{ContactRepository, RepositoryError};
use crate::models::{ContactSubject, CurrentUser};

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_PHONE_LENGTH: usize = 20;
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Errors from the contact form.
#[derive(Debug, Error)]
pub enum ContactError {
    #[error("name is required")]
    EmptyName,

    #[error("name is longer than {MAX_NAME_LENGTH} characters")]
    NameTooLong,

    /// Names are letters, spaces, apostrophes and hyphens.
    #[error("name contains characters other than letters, spaces, ' and -")]
    InvalidName,

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error("phone number is longer than {MAX_PHONE_LENGTH} characters")]
    PhoneTooLong,

    /// Phones are digits, spaces, `+`, `-` and parentheses.
    #[error("phone number contains invalid characters")]
    InvalidPhone,

    #[error("unknown subject {0:?}")]
    UnknownSubject(String),

    #[error("message is required")]
    EmptyMessage,

    #[error("message is longer than {MAX_MESSAGE_LENGTH} characters")]
    MessageTooLong,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ContactError {
    /// Short code carried in `?error=` redirects.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyName | Self::InvalidName => "invalid_name",
            Self::NameTooLong => "contact_name_too_long",
            Self::Email(_) => "invalid_email",
            Self::PhoneTooLong => "phone_too_long",
            Self::InvalidPhone => "invalid_phone",
            Self::UnknownSubject(_) => "invalid_subject",
            Self::EmptyMessage => "empty_message",
            Self::MessageTooLong => "message_too_long",
            Self::Repository(_) => "server",
        }
    }

    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Repository(_))
    }
}

/// The contact form as posted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

fn is_name_char(c: char) -> bool {
    c.is_alphabetic() || c.is_whitespace() || c == '\'' || c == '-'
}

fn is_phone_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')')
}

impl ContactForm {
    /// An empty form, with the email of a signed-in user filled in.
    #[must_use]
    pub fn for_user(user: Option<&CurrentUser>) -> Self {
        Self {
            email: user.map(|u| u.email.as_str().to_owned()).unwrap_or_default(),
            subject: ContactSubject::General.as_str().to_owned(),
            ..Self::default()
        }
    }

    /// Validate and normalize the form.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn validate(&self) -> Result<NewContactMessage, ContactError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ContactError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(ContactError::NameTooLong);
        }
        if !name.chars().all(is_name_char) {
            return Err(ContactError::InvalidName);
        }

        let email = Email::parse(&self.email)?;

        let phone = self.phone.trim();
        if phone.chars().count() > MAX_PHONE_LENGTH {
            return Err(ContactError::PhoneTooLong);
        }
        if !phone.chars().all(is_phone_char) {
            return Err(ContactError::InvalidPhone);
        }

        let subject = ContactSubject::from_form(&self.subject)
            .ok_or_else(|| ContactError::UnknownSubject(self.subject.clone()))?;

        let message = self.message.trim();
        if message.is_empty() {
            return Err(ContactError::EmptyMessage);
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ContactError::MessageTooLong);
        }

        Ok(NewContactMessage {
            name: name.to_owned(),
            email,
            phone: phone.to_owned(),
            subject,
            message: message.to_owned(),
        })
    }
}

/// Contact service.
pub struct ContactService<'a> {
    messages: ContactRepository<'a>,
}

impl<'a> ContactService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            messages: ContactRepository::new(pool),
        }
    }

    /// Validate and store a message.
    ///
    /// # Errors
    ///
    /// Returns a validation variant for bad input and
    /// `ContactError::Repository` if the insert fails.
    pub async fn submit(&self, form: &ContactForm) -> Result<ContactMessageId, ContactError> {
        let message = form.validate()?;
        let id = self.messages.create(&message).await?;
        tracing::info!(
            message_id = %id,
            subject = message.subject.as_str(),
            "contact message received"
        );
        Ok(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid() -> ContactForm {
        ContactForm {
            name: "María O'Neil-Ruiz".to_owned(),
            email: " Maria@Example.com ".to_owned(),
            phone: "(809) 123-4567".to_owned(),
            subject: "support".to_owned(),
            message: "  My laptop will not charge.  ".to_owned(),
        }
    }

    fn code(form: &ContactForm) -> &'static str {
        form.validate().unwrap_err().code()
    }

    #[test]
    fn test_valid_form_is_normalized() {
        let message = valid().validate().unwrap();
        assert_eq!(message.name, "María O'Neil-Ruiz");
        assert_eq!(message.email.as_str(), "maria@example.com");
        assert_eq!(message.subject, ContactSubject::Support);
        assert_eq!(message.message, "My laptop will not charge.");
    }

    #[test]
    fn test_phone_is_optional_but_checked() {
        let no_phone = ContactForm {
            phone: "  ".to_owned(),
            ..valid()
        };
        assert_eq!(no_phone.validate().unwrap().phone, "");

        let letters = ContactForm {
            phone: "call me".to_owned(),
            ..valid()
        };
        assert_eq!(code(&letters), "invalid_phone");

        let long = ContactForm {
            phone: "+52 (55) 1234-5678 ext. 90".to_owned(),
            ..valid()
        };
        assert_eq!(code(&long), "phone_too_long");
    }

    #[test]
    fn test_field_rules() {
        let cases = [
            (ContactForm { name: " ".to_owned(), ..valid() }, "invalid_name"),
            (ContactForm { name: "R2-D2".to_owned(), ..valid() }, "invalid_name"),
            (ContactForm { name: "a".repeat(101), ..valid() }, "contact_name_too_long"),
            (ContactForm { email: "nobody".to_owned(), ..valid() }, "invalid_email"),
            (ContactForm { subject: "refund".to_owned(), ..valid() }, "invalid_subject"),
            (ContactForm { message: "\n".to_owned(), ..valid() }, "empty_message"),
            (ContactForm { message: "x".repeat(2001), ..valid() }, "message_too_long"),
        ];
        for (form, expected) in cases {
            assert_eq!(code(&form), expected, "{form:?}");
        }

        let longest = ContactForm {
            name: "a".repeat(MAX_NAME_LENGTH),
            message: "x".repeat(MAX_MESSAGE_LENGTH),
            ..valid()
        };
        assert!(longest.validate().is_ok());
    }

    #[test]
    fn test_for_user_prefills_email() {
        let anonymous = ContactForm::for_user(None);
        assert_eq!(anonymous.subject, "general");
        assert!(anonymous.email.is_empty());

        let user = CurrentUser {
            id: technova_core::UserId::new(7),
            username: "ana".to_owned(),
            email: Email::parse("ana@example.com").unwrap(),
            is_staff: false,
        };
        assert_eq!(ContactForm::for_user(Some(&user)).email, "ana@example.com");
    }
}
