//! Contact form submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContactId, Email, EmailError};

/// A stored contact form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/contact`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub message: String,
}

/// Why a contact submission was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContactError {
    #[error("Name and message are required")]
    MissingFields,
    #[error("Please enter a valid email address: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// A validated contact submission ready to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidContact {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub message: String,
}

impl NewContact {
    /// Trim every field and validate.
    ///
    /// # Errors
    ///
    /// Returns `ContactError` if the name or message is blank or the email
    /// does not parse.
    pub fn validate(&self) -> Result<ValidContact, ContactError> {
        let name = self.name.trim();
        let message = self.message.trim();
        if name.is_empty() || message.is_empty() {
            return Err(ContactError::MissingFields);
        }
        let email = Email::parse(&self.email)?;

        Ok(ValidContact {
            name: name.to_owned(),
            email,
            phone: self.phone.trim().to_owned(),
            message: message.to_owned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> NewContact {
        NewContact {
            name: " Selam ".to_owned(),
            email: "Selam@Example.com".to_owned(),
            phone: String::new(),
            message: " Do you ship to Hawassa? ".to_owned(),
        }
    }

    #[test]
    fn test_validate_trims_and_normalizes() {
        let valid = form().validate().unwrap();
        assert_eq!(valid.name, "Selam");
        assert_eq!(valid.email.as_str(), "selam@example.com");
        assert_eq!(valid.message, "Do you ship to Hawassa?");
    }

    #[test]
    fn test_validate_requires_name_and_message() {
        let mut f = form();
        f.message = "   ".to_owned();
        assert_eq!(f.validate(), Err(ContactError::MissingFields));
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        let mut f = form();
        f.email = "selam".to_owned();
        assert!(matches!(f.validate(), Err(ContactError::InvalidEmail(_))));
    }
}
