//! Display name sanitizing.

/// Clean up a user-supplied file name for display and for the
/// `Content-Disposition` header of downloads.
///
/// Control characters are dropped, path separators and double quotes become
/// underscores, and surrounding whitespace and leading dots are trimmed.
/// Returns `None` if nothing is left.
///
/// ```
/// use parcel_library::sanitize_filename;
/// assert_eq!(sanitize_filename("report.pdf").as_deref(), Some("report.pdf"));
/// assert_eq!(sanitize_filename("../etc/passwd").as_deref(), Some("_etc_passwd"));
/// assert_eq!(sanitize_filename("  \t "), None);
/// ```
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' | '"' => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim_start();
    match cleaned.is_empty() {
        true => None,
        false => Some(cleaned.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("report.pdf", "report.pdf")]
    #[case("My Holiday Photos.zip", "My Holiday Photos.zip")]
    #[case("  padded.txt  ", "padded.txt")]
    #[case("a/b\\c.txt", "a_b_c.txt")]
    #[case("C:\\fakepath\\upload.png", "C:_fakepath_upload.png")]
    #[case(".bashrc", "bashrc")]
    #[case("...hidden", "hidden")]
    #[case("tab\there", "tabhere")]
    #[case("new\nline\r.txt", "newline.txt")]
    #[case("say \"cheese\".jpg", "say _cheese_.jpg")]
    #[case("résumé 履歴書.pdf", "résumé 履歴書.pdf")]
    fn test_sanitized(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitize_filename(raw).as_deref(), Some(expected));
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   ")]
    #[case::dots("..")]
    #[case::dot_space(". ")]
    #[case::controls("\u{0}\u{7}\u{1b}")]
    fn test_rejected(#[case] raw: &str) {
        assert_eq!(sanitize_filename(raw), None);
    }
}
