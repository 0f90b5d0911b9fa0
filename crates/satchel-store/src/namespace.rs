//! Namespace validation shared by the namespaced backends.
//!
//! Valid namespaces:
//! - Must be non-empty and at most 64 bytes
//! - Must contain only ASCII alphanumerics, `-`, `_` and `.`
//! - Must not start with `.`
//!
//! These rules keep a namespace usable as a file stem.

use crate::error::{StoreError, StoreResult};

const MAX_NAMESPACE_LEN: usize = 64;

/// Validate a namespace, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use satchel_store::validate_namespace;
///
/// assert!(validate_namespace("SessionContainer").is_ok());
/// assert!(validate_namespace("shop.checkout-v2").is_ok());
/// assert!(validate_namespace("").is_err());
/// assert!(validate_namespace("../etc").is_err());
/// ```
pub fn validate_namespace(namespace: &str) -> StoreResult<()> {
    let invalid = |reason: String| StoreError::InvalidNamespace {
        namespace: namespace.to_string(),
        reason,
    };

    if namespace.is_empty() {
        return Err(invalid("namespace must not be empty".into()));
    }
    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(invalid(format!(
            "namespace must be at most {MAX_NAMESPACE_LEN} bytes"
        )));
    }
    if namespace.starts_with('.') {
        return Err(invalid("must not start with '.'".into()));
    }
    if let Some(ch) = namespace
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_names() {
        for ns in ["SessionContainer", "app_session", "shop.v2", "a-b-c", "x"] {
            assert!(validate_namespace(ns).is_ok(), "{ns} should be valid");
        }
    }

    #[test]
    fn rejects_path_separators() {
        assert!(validate_namespace("a/b").is_err());
        assert!(validate_namespace("a\\b").is_err());
    }

    #[test]
    fn rejects_hidden_names() {
        assert!(validate_namespace(".hidden").is_err());
        assert!(validate_namespace("..").is_err());
    }

    #[test]
    fn rejects_whitespace_and_unicode() {
        assert!(validate_namespace("my session").is_err());
        assert!(validate_namespace("sesión").is_err());
    }

    #[test]
    fn rejects_overlong() {
        assert!(validate_namespace(&"n".repeat(65)).is_err());
        assert!(validate_namespace(&"n".repeat(64)).is_ok());
    }

    #[test]
    fn error_names_the_namespace() {
        let err = validate_namespace("bad name").unwrap_err();
        match err {
            StoreError::InvalidNamespace { namespace, .. } => assert_eq!(namespace, "bad name"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
