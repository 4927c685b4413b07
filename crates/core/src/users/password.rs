//! Password hashing and password policy.
//!
//! Hashes are bcrypt strings (salt embedded). A record without a usable
//! password stores [`UNUSABLE_PASSWORD_PREFIX`] followed by random noise;
//! such a hash never verifies.

use rand::distributions::{Alphanumeric, DistString};
use tracing::debug;

use crate::config::AuthConfig;
use crate::errors::PasswordError;

/// Marks a hash that no password can match.
pub const UNUSABLE_PASSWORD_PREFIX: &str = "!";
const UNUSABLE_PASSWORD_SUFFIX_LEN: usize = 40;

/// Password-hashing capability consumed by the identity manager.
pub trait PasswordHasher: Send + Sync {
    /// Hash a raw password into a storable string.
    fn hash(&self, raw: &str) -> Result<String, PasswordError>;

    /// Check a raw password against a stored hash.
    fn verify(&self, raw: &str, hash: &str) -> bool;
}

/// bcrypt-backed [`PasswordHasher`].
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, raw: &str) -> Result<String, PasswordError> {
        bcrypt::hash(raw, self.cost).map_err(|e| PasswordError::HashFailed(e.to_string()))
    }

    fn verify(&self, raw: &str, hash: &str) -> bool {
        if !is_usable(hash) {
            return false;
        }
        match bcrypt::verify(raw, hash) {
            Ok(matches) => matches,
            Err(e) => {
                debug!(error = %e, "stored password hash could not be parsed");
                false
            }
        }
    }
}

/// A hash that can never be matched.
pub fn unusable_password() -> String {
    format!(
        "{}{}",
        UNUSABLE_PASSWORD_PREFIX,
        Alphanumeric.sample_string(&mut rand::thread_rng(), UNUSABLE_PASSWORD_SUFFIX_LEN)
    )
}

/// Whether a stored hash can ever verify.
pub fn is_usable(hash: &str) -> bool {
    !hash.is_empty() && !hash.starts_with(UNUSABLE_PASSWORD_PREFIX)
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Short list of passwords rejected by the `common` validator.
const COMMON_PASSWORDS: &[&str] = &[
    "123456", "123456789", "12345678", "12345", "1234567", "1234567890", "111111", "000000",
    "password", "password1", "password123", "passw0rd", "qwerty", "qwerty123", "qwertyuiop",
    "abc123", "abcd1234", "iloveyou", "admin", "admin123", "administrator", "welcome",
    "welcome1", "letmein", "monkey", "dragon", "football", "baseball", "sunshine", "princess",
    "master", "shadow", "superman", "trustno1", "starwars", "whatever", "freedom", "hello123",
    "login", "changeme", "secret", "test1234", "testpass", "default", "root", "guest",
    "passwort", "hallo123", "geheim", "schatz",
];

/// Values of the user record a password must not resemble.
#[derive(Debug, Clone, Default)]
pub struct UserAttributes<'a> {
    pub email: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

/// Configurable password strength rules.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub check_similarity: bool,
    pub check_length: bool,
    pub check_common: bool,
    pub check_numeric: bool,
    /// Similarity ratio at or above which a password is rejected.
    pub max_similarity: f64,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            check_similarity: true,
            check_length: true,
            check_common: true,
            check_numeric: true,
            max_similarity: 0.7,
        }
    }
}

impl PasswordPolicy {
    /// A policy with every validator disabled.
    pub fn permissive() -> Self {
        Self {
            min_length: 0,
            check_similarity: false,
            check_length: false,
            check_common: false,
            check_numeric: false,
            max_similarity: 1.0,
        }
    }

    /// Build the policy named by `[auth]`.
    pub fn from_config(config: &AuthConfig) -> Self {
        let enabled = |name: &str| config.password_validators.iter().any(|v| v == name);
        Self {
            min_length: config.password_min_length,
            check_similarity: enabled("user_attribute_similarity"),
            check_length: enabled("minimum_length"),
            check_common: enabled("common"),
            check_numeric: enabled("numeric"),
            ..Self::default()
        }
    }

    /// Run every enabled validator; the first failure is returned.
    pub fn validate(&self, password: &str, user: &UserAttributes<'_>) -> Result<(), PasswordError> {
        if self.check_similarity {
            self.check_user_similarity(password, user)?;
        }
        if self.check_length && password.chars().count() < self.min_length {
            return Err(PasswordError::TooShort {
                min: self.min_length,
            });
        }
        if self.check_common && COMMON_PASSWORDS.contains(&password.trim().to_lowercase().as_str()) {
            return Err(PasswordError::TooCommon);
        }
        if self.check_numeric && !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            return Err(PasswordError::EntirelyNumeric);
        }
        Ok(())
    }

    fn check_user_similarity(
        &self,
        password: &str,
        user: &UserAttributes<'_>,
    ) -> Result<(), PasswordError> {
        let password = password.to_lowercase();
        let attributes = [
            ("email address", Some(user.email)),
            ("first name", user.first_name),
            ("last name", user.last_name),
        ];

        for (attribute, value) in attributes {
            let Some(value) = value.filter(|v| !v.is_empty()) else {
                continue;
            };
            let value = value.to_lowercase();
            let mut candidates: Vec<&str> = value
                .split(|c: char| !c.is_alphanumeric())
                .filter(|p| !p.is_empty())
                .collect();
            candidates.push(&value);

            if candidates
                .iter()
                .any(|part| similarity(&password, part) >= self.max_similarity)
            {
                return Err(PasswordError::TooSimilar {
                    attribute: attribute.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// `2 * LCS / (len(a) + len(b))` over characters.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs = prev[b.len()];
    (2 * lcs) as f64 / (a.len() + b.len()) as f64
}
