//! TOML-based startup settings for SiteKit.
//!
//! Every knob the site needs at boot (listen address, database file,
//! languages, static/media locations, password policy, security headers) is
//! a typed field here. The secret key is never stored in the file: it is
//! referenced by an environment variable name and resolved at runtime via
//! [`AppConfig::resolve_env_vars`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

/// Names accepted in `auth.password_validators`.
pub const PASSWORD_VALIDATORS: &[&str] = &[
    "user_attribute_similarity",
    "minimum_length",
    "common",
    "numeric",
];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Languages and locale routing.
    #[serde(default)]
    pub i18n: I18nConfig,

    /// Static and media file locations.
    #[serde(default)]
    pub static_files: StaticFilesConfig,

    /// Sessions, password hashing and password policy.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Response security headers.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Cross-origin policy.
    #[serde(default)]
    pub cors: CorsConfig,

    /// API documentation metadata.
    #[serde(default)]
    pub docs: DocsConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default `127.0.0.1:8000`).
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Debug mode: serves static and media files from disk.
    #[serde(default)]
    pub debug: bool,

    /// Host header values accepted by the server. `*` accepts any host.
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,

    /// Environment variable holding the site secret key.
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for persistent data (database, uploaded media).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Resolved secret key (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub secret_key: Option<String>,
}

fn default_listen() -> String {
    "127.0.0.1:8000".into()
}
fn default_allowed_hosts() -> Vec<String> {
    vec!["*".into()]
}
fn default_secret_key_env() -> String {
    "SITEKIT_SECRET_KEY".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            debug: false,
            allowed_hosts: default_allowed_hosts(),
            secret_key_env: default_secret_key_env(),
            log_level: default_log_level(),
            data_dir: default_data_dir(),
            secret_key: None,
        }
    }
}

impl ServerConfig {
    /// Whether a `Host` header value (with or without port) is accepted.
    pub fn host_allowed(&self, host: &str) -> bool {
        let bare = match host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
            _ => host,
        };
        self.allowed_hosts.iter().any(|allowed| {
            allowed == "*"
                || allowed.eq_ignore_ascii_case(bare)
                || allowed
                    .strip_prefix('.')
                    .map(|suffix| {
                        bare.eq_ignore_ascii_case(suffix)
                            || bare
                                .to_ascii_lowercase()
                                .ends_with(&format!(".{}", suffix.to_ascii_lowercase()))
                    })
                    .unwrap_or(false)
        })
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// SQLite database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file name, relative to `server.data_dir` unless absolute.
    #[serde(default = "default_db_file")]
    pub file: PathBuf,
}

fn default_db_file() -> PathBuf {
    PathBuf::from("db.sqlite3")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            file: default_db_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// Internationalization
// ---------------------------------------------------------------------------

/// A supported language: a URL code and a display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageEntry {
    pub code: String,
    pub name: String,
}

/// Language and locale-prefix configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct I18nConfig {
    /// Language used when a request expresses no preference.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// IANA time zone name of the site.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    /// Supported languages, in display order.
    #[serde(default = "default_languages")]
    pub languages: Vec<LanguageEntry>,

    /// Redirect paths without a language prefix to a prefixed path.
    #[serde(default = "default_true")]
    pub prefix_redirect: bool,
}

fn default_language() -> String {
    "en".into()
}
fn default_time_zone() -> String {
    "Europe/Berlin".into()
}
fn default_languages() -> Vec<LanguageEntry> {
    vec![
        LanguageEntry {
            code: "de".into(),
            name: "German".into(),
        },
        LanguageEntry {
            code: "en".into(),
            name: "English".into(),
        },
    ]
}
fn default_true() -> bool {
    true
}

impl I18nConfig {
    /// The site time zone. Timestamps shown to users are rendered in it.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|_| invalid("i18n.time_zone", &format!("unknown time zone '{}'", self.time_zone)))
    }
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            time_zone: default_time_zone(),
            languages: default_languages(),
            prefix_redirect: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Static and media files
// ---------------------------------------------------------------------------

/// Static asset and uploaded media locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticFilesConfig {
    /// URL prefix for static assets.
    #[serde(default = "default_static_url")]
    pub static_url: String,

    /// Directory static assets are collected into.
    #[serde(default = "default_static_root")]
    pub static_root: PathBuf,

    /// URL prefix for uploaded media.
    #[serde(default = "default_media_url")]
    pub media_url: String,

    /// Directory uploaded media lives in.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    /// Additional static asset directories, searched in order after
    /// `static_root` when debug mode serves static files.
    #[serde(default)]
    pub static_dirs: Vec<PathBuf>,
}

fn default_static_url() -> String {
    "/static/".into()
}
fn default_static_root() -> PathBuf {
    PathBuf::from("static")
}
fn default_media_url() -> String {
    "/media/".into()
}
fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            static_url: default_static_url(),
            static_root: default_static_root(),
            media_url: default_media_url(),
            media_root: default_media_root(),
            static_dirs: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Session and password settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of a login session in hours.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: u64,

    /// bcrypt work factor (4..=31).
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Minimum password length enforced by `minimum_length`.
    #[serde(default = "default_min_length")]
    pub password_min_length: usize,

    /// Enabled password validators.
    #[serde(default = "default_validators")]
    pub password_validators: Vec<String>,
}

fn default_session_ttl() -> u64 {
    24
}
fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}
fn default_min_length() -> usize {
    8
}
fn default_validators() -> Vec<String> {
    PASSWORD_VALIDATORS.iter().map(|v| v.to_string()).collect()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl(),
            bcrypt_cost: default_bcrypt_cost(),
            password_min_length: default_min_length(),
            password_validators: default_validators(),
        }
    }
}

// ---------------------------------------------------------------------------
// Security headers
// ---------------------------------------------------------------------------

/// Headers added to every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// `X-Frame-Options` value.
    #[serde(default = "default_frame_options")]
    pub x_frame_options: String,

    /// Send `X-Content-Type-Options: nosniff`.
    #[serde(default = "default_true")]
    pub content_type_nosniff: bool,

    /// `Referrer-Policy` value.
    #[serde(default = "default_referrer_policy")]
    pub referrer_policy: String,
}

fn default_frame_options() -> String {
    "DENY".into()
}
fn default_referrer_policy() -> String {
    "same-origin".into()
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            x_frame_options: default_frame_options(),
            content_type_nosniff: true,
            referrer_policy: default_referrer_policy(),
        }
    }
}

// ---------------------------------------------------------------------------
// CORS
// ---------------------------------------------------------------------------

/// Cross-origin resource sharing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; `*` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".into()]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

// ---------------------------------------------------------------------------
// API docs
// ---------------------------------------------------------------------------

/// Metadata rendered into the OpenAPI document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    #[serde(default = "default_docs_title")]
    pub title: String,

    #[serde(default = "default_docs_version")]
    pub version: String,

    #[serde(default)]
    pub description: String,
}

fn default_docs_title() -> String {
    "SiteKit API".into()
}
fn default_docs_version() -> String {
    "1.0.0".into()
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            title: default_docs_title(),
            version: default_docs_version(),
            description: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `*_env` fields from environment variables.
    ///
    /// A missing secret key is only a warning in debug mode; outside debug
    /// mode it is an error.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");

        self.server.secret_key =
            resolve_optional_env(&self.server.secret_key_env, "server.secret_key_env");

        if self.server.secret_key.is_none() && !self.server.debug {
            return Err(ConfigError::EnvVarMissing {
                var: self.server.secret_key_env.clone(),
                field: "server.secret_key_env".into(),
            });
        }

        debug!("environment variable resolution complete");
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen.is_empty() {
            return Err(invalid("server.listen", "listen address must not be empty"));
        }
        if self.server.allowed_hosts.is_empty() {
            return Err(invalid(
                "server.allowed_hosts",
                "at least one host (or \"*\") must be allowed",
            ));
        }

        if self.i18n.languages.is_empty() {
            return Err(invalid("i18n.languages", "at least one language is required"));
        }
        let mut seen = HashSet::new();
        for lang in &self.i18n.languages {
            if lang.code.is_empty() || lang.code.contains('/') {
                return Err(invalid(
                    "i18n.languages",
                    &format!("invalid language code '{}'", lang.code),
                ));
            }
            if !seen.insert(lang.code.as_str()) {
                return Err(invalid(
                    "i18n.languages",
                    &format!("duplicate language code '{}'", lang.code),
                ));
            }
        }
        self.i18n.tz()?;
        if !seen.contains(self.i18n.default_language.as_str()) {
            return Err(invalid(
                "i18n.default_language",
                &format!(
                    "'{}' is not one of the configured languages",
                    self.i18n.default_language
                ),
            ));
        }

        for (field, url) in [
            ("static_files.static_url", &self.static_files.static_url),
            ("static_files.media_url", &self.static_files.media_url),
        ] {
            if url.len() < 2 || !url.starts_with('/') || !url.ends_with('/') {
                return Err(invalid(field, "URL prefix must start and end with '/'"));
            }
        }
        if self.static_files.static_url == self.static_files.media_url {
            return Err(invalid(
                "static_files.media_url",
                "media and static URLs must differ",
            ));
        }

        if self.auth.session_ttl_hours == 0 {
            return Err(invalid("auth.session_ttl_hours", "session TTL must be > 0"));
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(invalid("auth.bcrypt_cost", "bcrypt cost must be within 4..=31"));
        }
        for name in &self.auth.password_validators {
            if !PASSWORD_VALIDATORS.contains(&name.as_str()) {
                return Err(invalid(
                    "auth.password_validators",
                    &format!("unknown validator '{}'", name),
                ));
            }
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Absolute (or data-dir relative) path of the SQLite file.
    pub fn database_path(&self) -> PathBuf {
        if self.database.file.is_absolute() {
            self.database.file.clone()
        } else {
            self.server.data_dir.join(&self.database.file)
        }
    }

    /// Starter configuration file written by `sitekit init`.
    pub fn default_toml() -> String {
        r#"# SiteKit configuration

[server]
listen = "127.0.0.1:8000"
debug = false
allowed_hosts = ["*"]
# Name of the environment variable that holds the secret key.
secret_key_env = "SITEKIT_SECRET_KEY"
log_level = "info"
data_dir = "./data"

[database]
file = "db.sqlite3"

[i18n]
default_language = "en"
time_zone = "Europe/Berlin"
prefix_redirect = true
languages = [
    { code = "de", name = "German" },
    { code = "en", name = "English" },
]

[static_files]
static_url = "/static/"
static_root = "static"
media_url = "/media/"
media_root = "media"
static_dirs = []

[auth]
session_ttl_hours = 24
bcrypt_cost = 12
password_min_length = 8
password_validators = ["user_attribute_similarity", "minimum_length", "common", "numeric"]

[security]
x_frame_options = "DENY"
content_type_nosniff = true
referrer_policy = "same-origin"

[cors]
allowed_origins = ["*"]

[docs]
title = "SiteKit API"
version = "1.0.0"
description = ""
"#
        .to_string()
    }
}

fn invalid(field: &str, detail: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        detail: detail.into(),
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
