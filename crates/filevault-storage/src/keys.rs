//! Shared bucket and key validation for storage backends.

use crate::traits::{StorageError, StorageResult};

/// Reject keys that are empty, absolute or contain `.`/`..` segments.
///
/// Dots inside a segment (`a..b.txt`) are plain filename characters.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|segment| segment == ".." || segment == ".")
    {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

/// Bucket names are a single path segment.
pub fn validate_bucket(bucket: &str) -> StorageResult<()> {
    if bucket.is_empty() || bucket.contains('/') || bucket.contains('\\') || bucket.contains("..")
    {
        return Err(StorageError::InvalidKey(format!(
            "Invalid bucket name: {}",
            bucket
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("7dHm9xQa2bKcP4rTvWz8Ne/report.pdf").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("abc/../../etc/passwd").is_err());
        assert!(validate_key("abc\\report.pdf").is_err());
        assert!(validate_key("abc/./report.pdf").is_err());
        assert!(validate_key("abc/..").is_err());
    }

    #[test]
    fn test_validate_key_allows_dots_inside_segments() {
        assert!(validate_key("7dHm9xQa2bKcP4rTvWz8Ne/a..b.txt").is_ok());
        assert!(validate_key("7dHm9xQa2bKcP4rTvWz8Ne/...").is_ok());
    }

    #[test]
    fn test_validate_bucket() {
        assert!(validate_bucket("files").is_ok());
        assert!(validate_bucket("").is_err());
        assert!(validate_bucket("files/nested").is_err());
        assert!(validate_bucket("..").is_err());
    }
}
