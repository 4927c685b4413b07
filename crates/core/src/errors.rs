//! Error types for the SiteKit core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Locale(#[from] LocaleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// Rejections raised while constructing or updating a user record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The email was empty (or only whitespace).
    #[error("the email must be set")]
    EmptyEmail,

    /// The email does not look like an address.
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    /// Another record already uses this email.
    #[error("a user with email '{0}' already exists")]
    DuplicateEmail(String),

    /// `create_superuser` was called with `is_staff = false`.
    #[error("superuser must have is_staff=true")]
    SuperuserNotStaff,

    /// `create_superuser` was called with `is_superuser = false`.
    #[error("superuser must have is_superuser=true")]
    SuperuserFlagUnset,

    /// The two password entries of a form differ.
    #[error("the two password fields didn't match")]
    PasswordMismatch,

    /// A group name was empty.
    #[error("invalid group name '{0}'")]
    InvalidGroupName(String),
}

// ---------------------------------------------------------------------------
// Password errors
// ---------------------------------------------------------------------------

/// Errors from password hashing and password policy checks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordError {
    /// Shorter than the configured minimum.
    #[error("this password is too short, it must contain at least {min} characters")]
    TooShort { min: usize },

    /// Appears in the common-password list.
    #[error("this password is too common")]
    TooCommon,

    /// Digits only.
    #[error("this password is entirely numeric")]
    EntirelyNumeric,

    /// Too close to one of the user's own attributes.
    #[error("the password is too similar to the {attribute}")]
    TooSimilar { attribute: String },

    /// The hashing backend failed.
    #[error("password hashing failed: {0}")]
    HashFailed(String),
}

// ---------------------------------------------------------------------------
// User errors
// ---------------------------------------------------------------------------

/// Errors from the identity manager.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Locale errors
// ---------------------------------------------------------------------------

/// Errors from the locale path rewriter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocaleError {
    /// The path is empty or not absolute.
    #[error("invalid path '{path}' for language switch: {detail}")]
    InvalidPath { path: String, detail: &'static str },

    /// The requested locale is not in the supported set.
    #[error("{0} is not a supported language code")]
    UnsupportedLocale(String),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing { var: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Database errors
// ---------------------------------------------------------------------------

/// Errors from the SQLite persistence layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Underlying rusqlite error.
    #[error("database error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// A migration failed.
    #[error("database migration failed (version {version}): {detail}")]
    MigrationFailed { version: u32, detail: String },

    /// A record was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Generic I/O error (e.g. file permissions).
    #[error("database I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DatabaseError {
    /// Whether this error is a SQLite UNIQUE constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::SqliteError(rusqlite::Error::SqliteFailure(err, _)) => {
                err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        assert_eq!(ValidationError::EmptyEmail.to_string(), "the email must be set");
        assert_eq!(
            ValidationError::SuperuserNotStaff.to_string(),
            "superuser must have is_staff=true"
        );

        let err = LocaleError::UnsupportedLocale("fr".into());
        assert_eq!(err.to_string(), "fr is not a supported language code");

        let err = PasswordError::TooShort { min: 8 };
        assert!(err.to_string().contains("at least 8 characters"));

        let err = ConfigError::EnvVarMissing {
            var: "SITEKIT_SECRET_KEY".into(),
            field: "server.secret_key_env".into(),
        };
        assert!(err.to_string().contains("SITEKIT_SECRET_KEY"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let user_err: UserError = ValidationError::EmptyEmail.into();
        let core_err: CoreError = user_err.into();
        assert!(matches!(
            core_err,
            CoreError::User(UserError::Validation(ValidationError::EmptyEmail))
        ));

        let core_err: CoreError = LocaleError::UnsupportedLocale("xx".into()).into();
        assert!(matches!(core_err, CoreError::Locale(_)));
    }

    #[test]
    fn test_not_found_is_not_unique_violation() {
        let err = DatabaseError::NotFound {
            entity: "user".into(),
            id: "abc".into(),
        };
        assert!(!err.is_unique_violation());
    }
}
