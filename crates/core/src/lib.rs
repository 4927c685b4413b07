//! SiteKit core library.
//!
//! This crate provides the foundational components of a SiteKit site:
//! typed startup settings, SQLite persistence, the email-keyed identity
//! manager, and locale-prefix helpers for URL routing.

pub mod config;
pub mod db;
pub mod errors;
pub mod i18n;
pub mod users;

// Re-exports for convenience.
pub use config::AppConfig;
pub use db::Database;
pub use i18n::{switch_locale, LocaleSet};
pub use users::{BcryptHasher, ExtraFields, User, UserManager};
