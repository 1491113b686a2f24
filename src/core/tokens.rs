//! Session-token scanning and stripping.
//!
//! Pure string functions shared by the renaming and sidecar-rewriting
//! passes. A session token is a `ses-<alnum>` segment bounded by `_`,
//! `/`, `.` or string boundaries; at most one distinct token exists per
//! subject tree.

use regex::Regex;

/// Isolate the session token from a name or relative path.
///
/// The left boundary is anchored, so a prefix embedded inside another
/// tag (e.g. the `ses-` in `analyses-01`) is not a token. Returns the
/// full token (prefix included, e.g. `ses-A1`), or `None` if the name
/// carries no session token.
pub fn session_token(name: &str, session_prefix: &str) -> Option<String> {
    let pattern = Regex::new(&format!(
        r"(?:^|[_/.])({}[0-9A-Za-z]+)",
        regex::escape(session_prefix)
    ))
    .unwrap();

    pattern
        .captures(name)
        .map(|captures| captures[1].to_string())
}

/// Strip a session token and its trailing separator from a file name.
///
/// Removes `{token}_`; names without the token are returned unchanged.
pub fn strip_token(name: &str, token: &str) -> String {
    name.replace(&format!("{}_", token), "")
}

/// Strip a session token from a relative path string.
///
/// Removes both the path segment (`{token}/`) and the filename tag
/// (`{token}_`), so a reference like
/// `sub-01/ses-A1/func/sub-01_ses-A1_bold.nii.gz` comes back as
/// `sub-01/func/sub-01_bold.nii.gz` with no leading separator artifacts.
pub fn strip_token_from_path(path: &str, token: &str) -> String {
    path.replace(&format!("{}/", token), "")
        .replace(&format!("{}_", token), "")
}

/// Clean a file name of any session token and the versioning tag.
///
/// The token is removed first, then the tag: the two substrings can be
/// adjacent, and removing in the other order leaves a stray separator.
/// Returns `None` if the name needs no change.
pub fn cleaned_name(name: &str, session_prefix: &str, version_tag: &str) -> Option<String> {
    let mut cleaned = match session_token(name, session_prefix) {
        Some(token) => strip_token(name, &token),
        None => name.to_string(),
    };

    cleaned = cleaned.replace(version_tag, "");

    if cleaned == name {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_in_filename() {
        let token = session_token("sub-00123_ses-A1_T1w.nii.gz", "ses-");
        assert_eq!(token, Some("ses-A1".to_string()));
    }

    #[test]
    fn test_session_token_in_directory_name() {
        assert_eq!(session_token("ses-00123", "ses-"), Some("ses-00123".to_string()));
    }

    #[test]
    fn test_session_token_absent() {
        assert_eq!(session_token("sub-00123_T1w.nii.gz", "ses-"), None);
    }

    #[test]
    fn test_session_token_ignores_embedded_prefix() {
        assert_eq!(session_token("sub-01_analyses-01.tsv", "ses-"), None);
    }

    #[test]
    fn test_strip_token() {
        let name = strip_token("sub-00123_ses-A1_T1w.nii.gz", "ses-A1");
        assert_eq!(name, "sub-00123_T1w.nii.gz");
    }

    #[test]
    fn test_strip_token_leaves_clean_name_unchanged() {
        let name = strip_token("sub-00123_T1w.nii.gz", "ses-A1");
        assert_eq!(name, "sub-00123_T1w.nii.gz");
    }

    #[test]
    fn test_strip_token_from_path() {
        let cleaned = strip_token_from_path(
            "sub-00123/ses-A1/func/sub-00123_ses-A1_task-rest_bold.nii.gz",
            "ses-A1",
        );
        assert_eq!(cleaned, "sub-00123/func/sub-00123_task-rest_bold.nii.gz");
        assert!(!cleaned.starts_with('/'));
    }

    #[test]
    fn test_cleaned_name_token_then_tag() {
        // Adjacent token and tag: token must go first
        let cleaned = cleaned_name("sub-01_ses-A1_v2_bold.nii.gz", "ses-", "v2_");
        assert_eq!(cleaned, Some("sub-01_bold.nii.gz".to_string()));
    }

    #[test]
    fn test_cleaned_name_tag_only() {
        let cleaned = cleaned_name("sub-01_v2_bold.nii.gz", "ses-", "v2_");
        assert_eq!(cleaned, Some("sub-01_bold.nii.gz".to_string()));
    }

    #[test]
    fn test_cleaned_name_no_change() {
        assert_eq!(cleaned_name("sub-01_bold.nii.gz", "ses-", "v2_"), None);
    }
}
