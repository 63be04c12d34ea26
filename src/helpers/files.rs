//! File system helpers shared by the build and the dev watchers

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Write `content` to `path` through a temp file in the same directory
/// and an atomic rename. Readers see either the old file or the new one.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create dir {:?}", parent))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {:?}", parent))?;
    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file
        .persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write {:?}", path))?;

    Ok(())
}

/// Recursively copy a directory tree. Returns the number of files copied.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src)?;
        let dest = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest)
                .with_context(|| format!("Failed to copy {:?} -> {:?}", entry.path(), dest))?;
            tracing::debug!("Copied: {:?} -> {:?}", entry.path(), dest);
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/index.html");

        write_atomic(&path, b"first").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");

        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");

        // No temp files left behind
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_copy_dir() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("assets");
        fs::create_dir_all(src.join("css")).unwrap();
        fs::write(src.join("css/site.css"), "body{}").unwrap();
        fs::write(src.join("robots.txt"), "ok").unwrap();

        let dst = dir.path().join("public/public");
        assert_eq!(copy_dir(&src, &dst).unwrap(), 2);
        assert_eq!(fs::read_to_string(dst.join("css/site.css")).unwrap(), "body{}");
        assert!(dst.join("robots.txt").exists());
    }
}
