//! Email normalization and syntax checks.

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::errors::ValidationError;

/// Normalize an email address.
///
/// Surrounding whitespace is trimmed and the domain part (after the last
/// `@`) is lower-cased. The local part is kept as typed, since mailbox names
/// may be case-sensitive.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
            .expect("email regex is valid")
    })
}

/// Check that a (normalized) email is non-empty and looks like an address.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    if email.len() > 255 || !email_regex().is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

/// The part of an email before the last `@` (the whole string if none).
pub fn local_part(email: &str) -> &str {
    email.rsplit_once('@').map(|(local, _)| local).unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_domain_only() {
        assert_eq!(normalize_email("John.Doe@Example.COM"), "John.Doe@example.com");
        assert_eq!(normalize_email("  test@example.com \n"), "test@example.com");
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn test_normalize_uses_last_at() {
        assert_eq!(normalize_email("\"a@b\"@EXAMPLE.org"), "\"a@b\"@example.org");
    }

    #[test]
    fn test_validate_accepts_common_addresses() {
        validate_email("test@example.com").unwrap();
        validate_email("first.last+tag@sub.example.co.uk").unwrap();
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert_eq!(validate_email(""), Err(ValidationError::EmptyEmail));
        for bad in ["plain", "@example.com", "user@", "user@localhost", "a b@example.com"] {
            assert!(
                matches!(validate_email(bad), Err(ValidationError::InvalidEmail(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_local_part() {
        assert_eq!(local_part("test@example.com"), "test");
        assert_eq!(local_part("nodomain"), "nodomain");
    }
}
