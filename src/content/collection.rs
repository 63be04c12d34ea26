//! Collection and template resolution

use std::path::Path;

use crate::error::{ContentError, Result};
use crate::templates::Renderer;

/// Collection whose items render at the site root
pub const PAGE_COLLECTION: &str = "page";

/// Per-collection front-matter scaffold, never rendered
pub const BASE_FILE: &str = "base.md";

/// Collection name of a content file: its immediate parent directory
pub fn collection_of(path: &Path) -> Result<String> {
    path.parent()
        .and_then(|dir| dir.file_name())
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ContentError::InvalidPath(path.to_path_buf()))
}

/// True for `base.md` scaffolds
pub fn is_base_file(path: &Path) -> bool {
    path.file_name().map(|n| n == BASE_FILE).unwrap_or(false)
}

/// True for files that belong in feeds: not a page, not a scaffold
pub fn is_feed_item(path: &Path) -> bool {
    if is_base_file(path) {
        return false;
    }
    !matches!(collection_of(path), Ok(c) if c == PAGE_COLLECTION)
}

/// Check if a file is a markdown file
pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md")
        .unwrap_or(false)
}

/// Maps collections to template names
#[derive(Debug, Clone)]
pub struct CollectionResolver {
    default_template: String,
}

impl CollectionResolver {
    pub fn new(default_template: impl Into<String>) -> Self {
        Self {
            default_template: default_template.into(),
        }
    }

    /// Template name a collection maps to by identity
    pub fn template_name(collection: &str) -> String {
        format!("{}.html", collection)
    }

    /// Resolve the template for a collection, falling back to the default
    /// layout when the renderer has no `<collection>.html`
    pub fn resolve<R: Renderer + ?Sized>(&self, renderer: &R, collection: &str) -> String {
        let name = Self::template_name(collection);
        if renderer.has_template(&name) {
            name
        } else {
            tracing::warn!(
                "Template {} not found, using default {}",
                name,
                self.default_template
            );
            self.default_template.clone()
        }
    }

    pub fn default_template(&self) -> &str {
        &self.default_template
    }
}
