//! HTTP endpoint modules.

pub mod admin;
pub mod auth;
pub mod docs;
pub mod groups;
pub mod i18n;
pub mod status;
pub mod users;
