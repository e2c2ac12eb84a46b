//! `.built` stamps mark a directory as fully prepared so callers can skip
//! re-downloading a whole dataset or model bundle. First line is a timestamp,
//! optional second line is a version string.

use std::fs;
use std::io;
use std::path::Path;

const BUILT_FILE: &str = ".built";

/// True when `path` carries a `.built` stamp, and, if `version_string` is
/// given, when the stamp records that exact version.
pub fn built(path: &Path, version_string: Option<&str>) -> bool {
    let stamp = path.join(BUILT_FILE);
    match version_string {
        None => stamp.is_file(),
        Some(version) => match fs::read_to_string(&stamp) {
            Ok(contents) => contents.lines().nth(1) == Some(version),
            Err(_) => false,
        },
    }
}

/// Stamps `path` as built, recording when and (optionally) which version.
pub fn mark_built(path: &Path, version_string: Option<&str>) -> io::Result<()> {
    fs::create_dir_all(path)?;
    let mut contents = chrono::Utc::now().to_rfc3339();
    if let Some(version) = version_string {
        contents.push('\n');
        contents.push_str(version);
    }
    fs::write(path.join(BUILT_FILE), contents)
}

pub fn remove_built(path: &Path) -> io::Result<()> {
    fs::remove_file(path.join(BUILT_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_roundtrip_without_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(!built(dir.path(), None));
        mark_built(dir.path(), None).expect("mark");
        assert!(built(dir.path(), None));
        // a stamp with no version line never satisfies a version demand
        assert!(!built(dir.path(), Some("v1.0")));
        remove_built(dir.path()).expect("remove");
        assert!(!built(dir.path(), None));
    }

    #[test]
    fn test_built_version_must_match() {
        let dir = tempfile::tempdir().expect("tempdir");
        mark_built(dir.path(), Some("v2.1")).expect("mark");
        assert!(built(dir.path(), Some("v2.1")));
        assert!(!built(dir.path(), Some("v2.0")));
        assert!(built(dir.path(), None));
    }
}
