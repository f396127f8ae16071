//! Environment variable expansion for configuration files.
//!
//! `${VAR}` references are replaced with the value of `VAR` before the
//! document is parsed. A variable that is unset or empty is left as the
//! literal `${VAR}` token and reported with a warning; expansion never fails.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;

static VAR_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").expect("valid env var pattern"));

/// Expands `${VAR}` references in `text`.
pub fn expand_env_vars(text: &str) -> Cow<'_, str> {
    expand_with(text, |name| std::env::var(name).ok())
}

/// Expands `${VAR}` references using `lookup` to resolve names.
pub(crate) fn expand_with<F>(text: &str, lookup: F) -> Cow<'_, str>
where
    F: Fn(&str) -> Option<String>,
{
    if !text.contains("${") {
        return Cow::Borrowed(text);
    }

    VAR_REF.replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        match lookup(name) {
            Some(value) if !value.is_empty() => value,
            _ => {
                warn!("Environment variable '{}' not found; keeping literal", name);
                caps[0].to_string()
            }
        }
    })
}
