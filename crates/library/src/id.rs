//! Blob identifiers.

use crate::error::{ErrorKind, Result};
use std::fmt;
use time::UtcDateTime;

/// Identifier of an uploaded file, and the name of its blob.
///
/// The first 128 bits of a BLAKE3 digest over the display name followed by
/// the upload instant in Unix nanoseconds, as 32 lowercase hex characters.
/// Uniqueness rests on the timestamp's resolution; there is no retry.
///
/// ```
/// use parcel_library::FileId;
/// use time::UtcDateTime;
///
/// let instant = UtcDateTime::now();
/// let id = FileId::generate_at("report.pdf", instant);
/// assert_eq!(id.as_str().len(), 32);
/// assert_eq!(id, FileId::generate_at("report.pdf", instant));
/// assert_eq!(FileId::parse(id.as_str()).unwrap(), id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(String);

impl FileId {
    /// Length of an identifier in hex characters.
    pub const LEN: usize = 32;

    /// Generate an identifier for a file uploaded right now.
    pub fn generate(name: &str) -> Self {
        Self::generate_at(name, UtcDateTime::now())
    }

    /// Generate the identifier for `name` uploaded at `instant`.
    pub fn generate_at(name: &str, instant: UtcDateTime) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(name.as_bytes());
        hasher.update(instant.unix_timestamp_nanos().to_string().as_bytes());
        let hex = hasher.finalize().to_hex();
        Self(hex[..Self::LEN].to_string())
    }

    /// Parse an identifier that arrived from outside (a URL, say).
    ///
    /// Anything that could not have been generated is reported as
    /// [`NotFound`](ErrorKind::NotFound), since no file can have that id.
    pub fn parse(id: &str) -> Result<Self> {
        let valid = id.len() == Self::LEN && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !valid {
            exn::bail!(ErrorKind::NotFound(id.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::Duration;
    use time::macros::utc_datetime;

    #[test]
    fn test_shape() {
        let id = FileId::generate("anything at all");
        assert_eq!(id.as_str().len(), FileId::LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_deterministic_for_same_inputs() {
        let instant = utc_datetime!(2026-03-14 15:09:26.535897932);
        assert_eq!(FileId::generate_at("report.pdf", instant), FileId::generate_at("report.pdf", instant));
    }

    #[test]
    fn test_differs_by_instant_and_name() {
        let instant = utc_datetime!(2026-03-14 15:09:26.535897932);
        let a = FileId::generate_at("report.pdf", instant);
        let b = FileId::generate_at("report.pdf", instant + Duration::nanoseconds(1));
        let c = FileId::generate_at("report.pdf.", instant);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_matches_blake3_prefix() {
        let instant = utc_datetime!(2026-01-01 00:00:00);
        let expected = blake3::hash(format!("a.txt{}", instant.unix_timestamp_nanos()).as_bytes()).to_hex();
        assert_eq!(FileId::generate_at("a.txt", instant).as_str(), &expected[..32]);
    }

    #[rstest]
    #[case::empty("")]
    #[case::short("abc123")]
    #[case::uppercase("0123456789ABCDEF0123456789ABCDEF")]
    #[case::too_long("0123456789abcdef0123456789abcdef0")]
    #[case::not_hex("0123456789abcdef0123456789abcdeg")]
    #[case::traversal("../../../../../../../../etc/passwd")]
    fn test_parse_rejects(#[case] input: &str) {
        let err = FileId::parse(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }
}
