//! Scaffolding applied to new collections and new content files

use anyhow::{anyhow, Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::config::BodyMode;
use crate::content::collection::BASE_FILE;
use crate::content::{CollectionResolver, FrontMatter};
use crate::helpers::write_atomic;
use crate::templates::collection_stub;

/// Front matter written to the `base.md` of a new collection
pub const BASE_FRONT_MATTER: &str = r#"---
title: "Title"
description: "Description"
date: "YYYY-MM-DD"
draft: true
---
"#;

/// Create `<collection>.html` in the template root if it does not exist.
/// Returns whether a template was written.
pub fn ensure_collection_template(
    template_dir: &Path,
    collection: &str,
    body_mode: BodyMode,
) -> Result<bool> {
    let path = template_dir.join(CollectionResolver::template_name(collection));
    if path.exists() {
        return Ok(false);
    }

    fs::create_dir_all(template_dir)?;
    write_new(&path, collection_stub(body_mode).as_bytes())
        .with_context(|| format!("Failed to create template {:?}", path))
}

/// Create `base.md` in a collection directory unless one is already there
pub fn create_base_file(dir: &Path) -> Result<bool> {
    let path = dir.join(BASE_FILE);
    write_new(&path, BASE_FRONT_MATTER.as_bytes())
        .with_context(|| format!("Failed to create {:?}", path))
}

/// Prepend the collection's `base.md` front matter to a new content file.
///
/// The result is written next to the file and renamed over it, so readers
/// never see a half-written file. Files that already open with a front
/// matter block are left alone. Returns whether the file was rewritten.
pub fn apply_base_front_matter(path: &Path) -> Result<bool> {
    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("{:?} has no parent directory", path))?;
    let base_path = dir.join(BASE_FILE);

    let base = fs::read_to_string(&base_path)
        .with_context(|| format!("Failed to read {:?}", base_path))?;
    let front_matter = FrontMatter::block(&base)
        .with_context(|| format!("No front matter in {:?}", base_path))?;

    let existing = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    if existing.trim_start().starts_with("---") {
        tracing::debug!("{:?} already has front matter", path);
        return Ok(false);
    }

    let rewritten = format!("{}\n{}", front_matter, existing);
    write_atomic(path, rewritten.as_bytes())?;
    Ok(true)
}

/// Create a file only if it does not exist yet
fn write_new(path: &Path, content: &[u8]) -> Result<bool> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(content)?;
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_collection_template() {
        let dir = TempDir::new().unwrap();
        let templates = dir.path().join("templates");

        assert!(ensure_collection_template(&templates, "recipes", BodyMode::Raw).unwrap());
        let stub = fs::read_to_string(templates.join("recipes.html")).unwrap();
        assert!(stub.contains("Page.title"));
        assert!(stub.contains("markdown"));

        // Existing templates are never overwritten
        fs::write(templates.join("recipes.html"), "custom").unwrap();
        assert!(!ensure_collection_template(&templates, "recipes", BodyMode::Raw).unwrap());
        assert_eq!(
            fs::read_to_string(templates.join("recipes.html")).unwrap(),
            "custom"
        );
    }

    #[test]
    fn test_create_base_file() {
        let dir = TempDir::new().unwrap();
        assert!(create_base_file(dir.path()).unwrap());

        let base = fs::read_to_string(dir.path().join("base.md")).unwrap();
        let (fm, _) = FrontMatter::parse(&base).unwrap();
        assert_eq!(fm.title(), Some("Title"));
        assert_eq!(fm.date(), Some("YYYY-MM-DD"));
        assert!(fm.is_draft());

        assert!(!create_base_file(dir.path()).unwrap());
    }

    #[test]
    fn test_apply_base_front_matter() {
        let dir = TempDir::new().unwrap();
        let collection = dir.path().join("recipes");
        fs::create_dir(&collection).unwrap();
        fs::write(
            collection.join("base.md"),
            "---\ntitle: \"Recipe\"\ndraft: true\n---\nbase body is not copied\n",
        )
        .unwrap();
        let file = collection.join("soup.md");
        fs::write(&file, "# Soup\n").unwrap();

        assert!(apply_base_front_matter(&file).unwrap());
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "---\ntitle: \"Recipe\"\ndraft: true\n---\n# Soup\n"
        );

        // A second pass must not prepend again
        assert!(!apply_base_front_matter(&file).unwrap());
        assert_eq!(fs::read_dir(&collection).unwrap().count(), 2);
    }

    #[test]
    fn test_apply_without_base_fails() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x.md");
        fs::write(&file, "text").unwrap();
        assert!(apply_base_front_matter(&file).is_err());
        assert_eq!(fs::read_to_string(&file).unwrap(), "text");
    }
}
