//! Blob key validation.
//!
//! Keys become file names directly under the storage root, so a key must be
//! exactly one plain path component: nothing that could traverse, nest, or
//! truncate when handed to a C-based syscall.

use crate::error::{ErrorKind, Result};

/// Validates a blob key.
///
/// # Returns
/// Returns the key unchanged if valid, or [`InvalidKey`](crate::error::ErrorKind::InvalidKey)
/// if invalid.
///
/// # Examples
///
/// ```
/// use parcel_storage::validate_key;
/// assert!(validate_key("5d41402abc4b2a76b9719d911017c592").is_ok());
/// assert!(validate_key("plain-name").is_ok());
/// assert!(validate_key("").is_err());
/// assert!(validate_key("..").is_err());
/// assert!(validate_key("nested/key").is_err());
/// assert!(validate_key("a\0b").is_err());
/// ```
pub fn validate(key: &str) -> Result<&str> {
    let invalid = key.is_empty()
        || key == "."
        || key == ".."
        // Both separators, regardless of platform. A key that is a valid
        // file name on Linux but a path on Windows is still a bad key.
        || key.contains(['/', '\\'])
        // Null bytes cause truncation in C-based syscalls.
        || key.contains('\0');
    match invalid {
        true => exn::bail!(ErrorKind::InvalidKey(key.to_string())),
        false => Ok(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert_eq!(validate("0123456789abcdef0123456789abcdef").unwrap(), "0123456789abcdef0123456789abcdef");
        assert_eq!(validate("with.dots").unwrap(), "with.dots");
        assert_eq!(validate(".hidden").unwrap(), ".hidden");
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate("..").is_err());
        assert!(validate("../etc/passwd").is_err());
        assert!(validate("a/../../b").is_err());
    }

    #[test]
    fn test_separators() {
        assert!(validate("a/b").is_err());
        assert!(validate("a\\b").is_err());
        assert!(validate("/absolute").is_err());
        assert!(validate("trailing/").is_err());
    }

    #[test]
    fn test_empty_keys() {
        assert!(validate("").is_err());
        assert!(validate(".").is_err());
    }

    #[test]
    fn test_invalid_characters() {
        assert!(validate("a\0b").is_err());
        assert!(validate("\0").is_err());
    }
}
