//! The user record and group types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::email::local_part;

/// An email-keyed user account.
///
/// `password_hash` is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// A fresh record with a new id and no password.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: String::new(),
            first_name: None,
            last_name: None,
            is_staff: true,
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    /// First and last name separated by a space, trimmed.
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }

    pub fn short_name(&self) -> &str {
        self.first_name.as_deref().unwrap_or("")
    }

    /// Shown as the "Admin" column of the user list.
    pub fn is_admin(&self) -> bool {
        self.is_superuser
    }

    /// Fill empty names from the email's local part.
    ///
    /// The first character becomes the first name and the second character
    /// the last name, both upper-cased. Runs on every save, so a name that
    /// was cleared is derived again.
    pub fn derive_default_names(&mut self) {
        let mut chars = local_part(&self.email).chars();
        let first = chars.next();
        let second = chars.next();

        if self.first_name.as_deref().map_or(true, str::is_empty) {
            self.first_name = Some(first.map(|c| c.to_uppercase().collect()).unwrap_or_default());
        }
        if self.last_name.as_deref().map_or(true, str::is_empty) {
            self.last_name = Some(second.map(|c| c.to_uppercase().collect()).unwrap_or_default());
        }
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// A named group users can belong to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub name: String,
}
