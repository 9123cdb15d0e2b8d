//! Security utilities for mirror-guard.
//!
//! Credentials coming out of configuration are wrapped so they zeroize on
//! drop and never leak through `Debug`, and table names destined for SQL are
//! validated against a safe-identifier pattern before any query is built.

use crate::error::{MirrorError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secure string that automatically clears its contents when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureString(String);

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl SecureString {
    /// Create a new secure string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string value. Use carefully and avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Convert to a regular string. The SecureString will be zeroized.
    pub fn into_string(mut self) -> String {
        let value = std::mem::take(&mut self.0);
        self.0.zeroize();
        value
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Validates a table name before it is used in a generated query.
///
/// Dot-qualified names (`schema.table`) are allowed; each segment must start
/// with a letter or underscore and contain only letters, digits, and
/// underscores. Length is capped at 128 characters.
pub fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() || name.trim().is_empty() {
        return Err(MirrorError::Security(
            "table name cannot be empty or whitespace-only".to_string(),
        ));
    }

    if name.len() > 128 {
        return Err(MirrorError::Security(
            "table name too long (max 128 characters)".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MirrorError::Security(
            "table name cannot contain null bytes".to_string(),
        ));
    }

    static TABLE_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
        // This regex is compile-time constant and known to be valid
        #[allow(clippy::expect_used)]
        Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
            .expect("hard-coded regex pattern should be valid")
    });

    if !TABLE_NAME_REGEX.is_match(name) {
        return Err(MirrorError::Security(format!(
            "invalid table name '{name}': segments must start with a letter or underscore \
             and contain only letters, digits, and underscores"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_string_masks_debug() {
        let secret = SecureString::new("hunter2");
        assert_eq!(format!("{secret:?}"), "SecureString(***)");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_secure_string_into_string() {
        let secret = SecureString::new("hunter2");
        assert_eq!(secret.into_string(), "hunter2");
    }

    #[test]
    fn test_valid_table_names() {
        assert!(validate_table_name("orders").is_ok());
        assert!(validate_table_name("_staging").is_ok());
        assert!(validate_table_name("sales.orders_2024").is_ok());
    }

    #[test]
    fn test_invalid_table_names() {
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("   ").is_err());
        assert!(validate_table_name(&"a".repeat(200)).is_err());
        assert!(validate_table_name("orders; DROP TABLE users").is_err());
        assert!(validate_table_name("orders--").is_err());
        assert!(validate_table_name("order details").is_err()); // space
        assert!(validate_table_name("123orders").is_err()); // starts with digit
        assert!(validate_table_name("orders.").is_err()); // trailing dot
    }
}
