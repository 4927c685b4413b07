//! Locale-prefix helpers for URL routing.
//!
//! Every public page lives under a language prefix (`/en/...`, `/de/...`).
//! [`switch_locale`] rewrites the prefix of a path to another supported
//! language; [`LocaleSet`] wraps the configured languages and answers the
//! routing questions the web layer asks (which locale does this path carry,
//! which locale does this `Accept-Language` header prefer).

use serde::Serialize;

use crate::config::{I18nConfig, LanguageEntry};
use crate::errors::LocaleError;

/// Rewrite the leading locale segment of `path` to `target`.
///
/// If the first segment of `path` is one of `supported` it is replaced,
/// otherwise `target` is prepended as a new first segment. The function is
/// pure and idempotent for a fixed `target`.
pub fn switch_locale<S: AsRef<str>>(
    path: &str,
    target: &str,
    supported: &[S],
) -> Result<String, LocaleError> {
    if path.is_empty() {
        return Err(LocaleError::InvalidPath {
            path: String::new(),
            detail: "URL path for language switch is empty",
        });
    }
    if !path.starts_with('/') {
        return Err(LocaleError::InvalidPath {
            path: path.to_string(),
            detail: "URL path for language switch does not start with \"/\"",
        });
    }
    if !is_supported(target, supported) {
        return Err(LocaleError::UnsupportedLocale(target.to_string()));
    }

    // `path` starts with '/', so the first element is always "".
    let mut parts: Vec<&str> = path.split('/').collect();
    let first = parts.get(1).copied().unwrap_or("");

    if is_supported(first, supported) {
        parts[1] = target;
        Ok(parts.join("/"))
    } else {
        Ok(format!("/{}{}", target, path))
    }
}

/// Like [`switch_locale`] but for a request target that may carry a query
/// string: only the path part is rewritten.
pub fn switch_request_locale<S: AsRef<str>>(
    path_and_query: &str,
    target: &str,
    supported: &[S],
) -> Result<String, LocaleError> {
    match path_and_query.split_once('?') {
        Some((path, query)) => Ok(format!("{}?{}", switch_locale(path, target, supported)?, query)),
        None => switch_locale(path_and_query, target, supported),
    }
}

fn is_supported<S: AsRef<str>>(code: &str, supported: &[S]) -> bool {
    supported.iter().any(|s| s.as_ref() == code)
}

/// A supported language as exposed to API clients.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Language {
    pub code: String,
    pub name: String,
}

impl From<&LanguageEntry> for Language {
    fn from(entry: &LanguageEntry) -> Self {
        Self {
            code: entry.code.clone(),
            name: entry.name.clone(),
        }
    }
}

/// The configured set of languages plus the default.
#[derive(Debug, Clone)]
pub struct LocaleSet {
    languages: Vec<Language>,
    default_code: String,
}

impl LocaleSet {
    /// Build a set from explicit languages. The default must be one of them.
    pub fn new(languages: Vec<Language>, default_code: &str) -> Result<Self, LocaleError> {
        if !languages.iter().any(|l| l.code == default_code) {
            return Err(LocaleError::UnsupportedLocale(default_code.to_string()));
        }
        Ok(Self {
            languages,
            default_code: default_code.to_string(),
        })
    }

    /// Build the set from the `[i18n]` settings section.
    pub fn from_config(config: &I18nConfig) -> Result<Self, LocaleError> {
        Self::new(
            config.languages.iter().map(Language::from).collect(),
            &config.default_language,
        )
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    pub fn codes(&self) -> Vec<&str> {
        self.languages.iter().map(|l| l.code.as_str()).collect()
    }

    pub fn default_code(&self) -> &str {
        &self.default_code
    }

    pub fn contains(&self, code: &str) -> bool {
        self.languages.iter().any(|l| l.code == code)
    }

    /// The supported locale carried by the first segment of `path`, if any.
    pub fn locale_of<'a>(&self, path: &'a str) -> Option<&'a str> {
        let first = path.strip_prefix('/')?.split('/').next()?;
        self.contains(first).then_some(first)
    }

    /// [`switch_locale`] against this set.
    pub fn switch(&self, path: &str, target: &str) -> Result<String, LocaleError> {
        switch_request_locale(path, target, &self.codes())
    }

    /// Pick the best supported locale from an `Accept-Language` header.
    ///
    /// Entries are ranked by q-weight (stable for ties); `de-CH` matches `de`.
    pub fn negotiate(&self, accept_language: &str) -> Option<&str> {
        let mut ranked: Vec<(f32, &str)> = accept_language
            .split(',')
            .filter_map(|item| {
                let mut pieces = item.trim().split(';');
                let tag = pieces.next()?.trim();
                if tag.is_empty() {
                    return None;
                }
                let q = pieces
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .unwrap_or(1.0);
                Some((q, tag))
            })
            .filter(|(q, _)| *q > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        ranked.into_iter().find_map(|(_, tag)| {
            let tag = tag.to_ascii_lowercase();
            let primary = tag.split('-').next().unwrap_or(&tag);
            self.languages
                .iter()
                .find(|l| l.code.eq_ignore_ascii_case(&tag) || l.code.eq_ignore_ascii_case(primary))
                .map(|l| l.code.as_str())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPPORTED: [&str; 2] = ["en", "de"];

    fn locales() -> LocaleSet {
        LocaleSet::from_config(&I18nConfig::default()).unwrap()
    }

    #[test]
    fn test_replaces_existing_prefix() {
        assert_eq!(switch_locale("/en/page", "de", &SUPPORTED).unwrap(), "/de/page");
        assert_eq!(switch_locale("/en/", "de", &SUPPORTED).unwrap(), "/de/");
        assert_eq!(switch_locale("/en", "de", &SUPPORTED).unwrap(), "/de");
    }

    #[test]
    fn test_prepends_missing_prefix() {
        assert_eq!(switch_locale("/page", "de", &SUPPORTED).unwrap(), "/de/page");
        assert_eq!(switch_locale("/", "de", &SUPPORTED).unwrap(), "/de/");
        assert_eq!(
            switch_locale("/fr/page", "en", &SUPPORTED).unwrap(),
            "/en/fr/page"
        );
    }

    #[test]
    fn test_idempotent() {
        let once = switch_locale("/page/sub", "de", &SUPPORTED).unwrap();
        let twice = switch_locale(&once, "de", &SUPPORTED).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rejects_empty_path() {
        assert!(matches!(
            switch_locale("", "de", &SUPPORTED),
            Err(LocaleError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_rejects_relative_path() {
        assert!(matches!(
            switch_locale("en/page", "de", &SUPPORTED),
            Err(LocaleError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_rejects_unsupported_target() {
        assert_eq!(
            switch_locale("/en/page", "fr", &SUPPORTED),
            Err(LocaleError::UnsupportedLocale("fr".into()))
        );
    }

    #[test]
    fn test_query_string_is_preserved() {
        assert_eq!(
            switch_request_locale("/en/users?q=bob&page=2", "de", &SUPPORTED).unwrap(),
            "/de/users?q=bob&page=2"
        );
        assert_eq!(
            switch_request_locale("/en?x=1", "de", &SUPPORTED).unwrap(),
            "/de?x=1"
        );
    }

    #[test]
    fn test_locale_of() {
        let set = locales();
        assert_eq!(set.locale_of("/de/users"), Some("de"));
        assert_eq!(set.locale_of("/en"), Some("en"));
        assert_eq!(set.locale_of("/users"), None);
        assert_eq!(set.locale_of("/"), None);
        assert_eq!(set.locale_of(""), None);
    }

    #[test]
    fn test_negotiate() {
        let set = locales();
        assert_eq!(set.negotiate("de-CH, en;q=0.8"), Some("de"));
        assert_eq!(set.negotiate("fr, en;q=0.5, de;q=0.9"), Some("de"));
        assert_eq!(set.negotiate("fr, it"), None);
        assert_eq!(set.negotiate("de;q=0, en;q=0.1"), Some("en"));
        assert_eq!(set.negotiate(""), None);
    }

    #[test]
    fn test_new_rejects_unknown_default() {
        let result = LocaleSet::new(
            vec![Language {
                code: "en".into(),
                name: "English".into(),
            }],
            "de",
        );
        assert!(result.is_err());
    }
}
