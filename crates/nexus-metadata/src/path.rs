use crate::error::{MetadataError, Result};
use crate::types::NormalizedPath;

pub const MAX_PATH_BYTES: usize = 4096;

/// Validates and normalizes a user-supplied path per §3: UTF-8, starts with
/// `/`, `/`-separated components, no `.`/`..`, no empty components,
/// case-sensitive, capped at 4096 bytes. A trailing `/` is accepted as the
/// directory form and stripped (the file record's `is_directory` flag is
/// authoritative, not the trailing slash).
pub fn normalize(raw: &str) -> Result<NormalizedPath> {
    if raw.len() > MAX_PATH_BYTES {
        return Err(MetadataError::InvalidPath(format!("path exceeds {MAX_PATH_BYTES} bytes")));
    }
    if !raw.starts_with('/') {
        return Err(MetadataError::InvalidPath("path must start with '/'".into()));
    }
    if raw == "/" {
        return Ok(NormalizedPath("/".to_owned()));
    }

    let trimmed = raw.strip_suffix('/').unwrap_or(raw);
    let mut components = Vec::new();
    for component in trimmed.split('/').skip(1) {
        if component.is_empty() {
            return Err(MetadataError::InvalidPath("path contains an empty component".into()));
        }
        if component == "." || component == ".." {
            return Err(MetadataError::InvalidPath(format!(
                "path contains a reserved component: {component}"
            )));
        }
        components.push(component);
    }
    if components.is_empty() {
        return Ok(NormalizedPath("/".to_owned()));
    }
    Ok(NormalizedPath(format!("/{}", components.join("/"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_path() {
        assert_eq!(normalize("/a/b.txt").unwrap().as_str(), "/a/b.txt");
    }

    #[test]
    fn strips_trailing_slash() {
        assert_eq!(normalize("/a/b/").unwrap().as_str(), "/a/b");
    }

    #[test]
    fn rejects_missing_leading_slash() {
        assert!(normalize("a/b").is_err());
    }

    #[test]
    fn rejects_dot_dot() {
        assert!(normalize("/a/../b").is_err());
    }

    #[test]
    fn rejects_empty_component() {
        assert!(normalize("/a//b").is_err());
    }

    #[test]
    fn rejects_oversized_path() {
        let huge = format!("/{}", "a".repeat(MAX_PATH_BYTES));
        assert!(normalize(&huge).is_err());
    }

    #[test]
    fn root_normalizes_to_slash() {
        assert_eq!(normalize("/").unwrap().as_str(), "/");
    }
}
