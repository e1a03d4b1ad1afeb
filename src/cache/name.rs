// Cache name utilities.
// Validates UNIX-style cache names and translates them into native paths under a root.

use std::path::{Component, Path, PathBuf};

use crate::error::{CacheError, Result};

/// Check that `name` is a forward-slash delimited relative path that stays
/// inside whatever root it is joined onto.
pub fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CacheError::invalid_name(name, "empty name"));
    }
    if name.starts_with('/') {
        return Err(CacheError::invalid_name(name, "absolute path"));
    }
    if name.contains('\\') {
        return Err(CacheError::invalid_name(name, "backslash separator"));
    }
    if name.contains('\0') {
        return Err(CacheError::invalid_name(name, "NUL byte"));
    }
    if has_drive_prefix(name) {
        return Err(CacheError::invalid_name(name, "drive prefix"));
    }

    for segment in name.split('/') {
        match segment {
            "" => return Err(CacheError::invalid_name(name, "empty segment")),
            "." => return Err(CacheError::invalid_name(name, "current-directory segment")),
            ".." => return Err(CacheError::invalid_name(name, "parent-directory segment")),
            _ => {}
        }

        // Whatever the host treats as a prefix or root must not sneak in.
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(CacheError::invalid_name(name, "not a plain path segment")),
        }
    }

    Ok(())
}

/// Native path for a validated `name`, relative to any root.
pub fn to_native(name: &str) -> PathBuf {
    name.split('/').collect()
}

/// Resolve `name` under `root`, rejecting names that would escape it.
pub fn resolve(root: &Path, name: &str) -> Result<PathBuf> {
    validate(name)?;
    Ok(root.join(to_native(name)))
}

/// Native form of a configured UNIX-style root.
///
/// An empty root resolves to the platform temporary directory. This is looked
/// up on every call and never cached.
pub fn root_path(root: &str) -> PathBuf {
    if root.is_empty() {
        return std::env::temp_dir();
    }
    from_slash(root)
}

#[cfg(windows)]
fn from_slash(path: &str) -> PathBuf {
    PathBuf::from(path.replace('/', "\\"))
}

#[cfg(not(windows))]
fn from_slash(path: &str) -> PathBuf {
    PathBuf::from(path)
}

fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate("simple").is_ok());
        assert!(validate("github.com/owner/repo/@v/v1.2.3.zip").is_ok());
        assert!(validate("a/b/c").is_ok());
        assert!(validate("with space/and-dash_1").is_ok());
        assert!(validate(".hidden/file").is_ok());
    }

    #[test]
    fn test_rejected_names() {
        for name in [
            "",
            "/etc/passwd",
            "a\\b",
            "C:/windows",
            "c:relative",
            "a//b",
            "a/b/",
            "./a",
            "a/./b",
            "../escape",
            "a/../../escape",
            "a/..",
            "nul\0byte",
        ] {
            let err = validate(name).unwrap_err();
            assert!(
                matches!(err, CacheError::InvalidName { .. }),
                "expected {name:?} to be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_resolve_joins_under_root() {
        let root = Path::new("cache-root");
        let path = resolve(root, "a/b/c.info").unwrap();

        assert!(path.starts_with(root));
        assert!(path.ends_with(Path::new("a").join("b").join("c.info")));
        assert_eq!(path.components().count(), 4);
    }

    #[test]
    fn test_resolve_rejects_escape() {
        let root = Path::new("cache-root");
        assert!(resolve(root, "../outside").is_err());
        assert!(resolve(root, "/abs").is_err());
    }

    #[test]
    fn test_empty_root_is_temp_dir() {
        assert_eq!(root_path(""), std::env::temp_dir());
    }

    #[test]
    fn test_root_keeps_configured_path() {
        let root = root_path("var/cache/mods");
        assert!(root.ends_with(Path::new("var").join("cache").join("mods")));
    }
}
