//! Term cleaning functions.
//!
//! The tracker never cleans terms itself: it applies whatever
//! [`CleaningFunction`] the caller injects. This module holds the named
//! built-ins the server can be started with.

use std::sync::Arc;

use crate::error::ConfigError;

/// A pure `term -> term` function applied to every stored term.
///
/// An empty result removes the term.
pub type CleaningFunction = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Names accepted by [`cleaner_by_name`].
pub const BUILTIN_CLEANERS: &[&str] = &["alphanumeric", "strip-underscores", "lowercase"];

/// Look up a built-in cleaning function by name (case-insensitive).
pub fn cleaner_by_name(name: &str) -> std::result::Result<CleaningFunction, ConfigError> {
    match name.trim().to_lowercase().as_str() {
        "alphanumeric" | "alnum" => Ok(Arc::new(alphanumeric)),
        "strip-underscores" | "underscores" => Ok(Arc::new(strip_underscores)),
        "lowercase" => Ok(Arc::new(|term: &str| term.to_lowercase())),
        _ => Err(ConfigError::UnknownStrategy {
            kind: "cleaning",
            name: name.to_string(),
        }),
    }
}

/// Keep alphanumeric characters only.
fn alphanumeric(term: &str) -> String {
    term.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Replace phrase joiners (`new_york`) by spaces.
fn strip_underscores(term: &str) -> String {
    term.split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
