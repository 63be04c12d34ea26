//! Content loader - materializes content items from the content directory

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{collection, ContentItem, FrontMatter, MarkdownRenderer};
use crate::config::BodyMode;
use crate::error::{ContentError, Result};
use crate::Site;

/// Loads content items from a content root
#[derive(Clone)]
pub struct ContentLoader {
    content_dir: PathBuf,
    theme: String,
    body_mode: BodyMode,
    markdown: Arc<MarkdownRenderer>,
}

impl ContentLoader {
    /// Create a loader for a site. Theme and body mode come from its config.
    pub fn new(site: &Site, markdown: Arc<MarkdownRenderer>) -> Self {
        Self::with_options(
            &site.content_dir,
            &site.config.theme_name,
            site.config.body_mode,
            markdown,
        )
    }

    pub fn with_options(
        content_dir: impl Into<PathBuf>,
        theme: &str,
        body_mode: BodyMode,
        markdown: Arc<MarkdownRenderer>,
    ) -> Self {
        Self {
            content_dir: content_dir.into(),
            theme: theme.to_string(),
            body_mode,
            markdown,
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    pub fn body_mode(&self) -> BodyMode {
        self.body_mode
    }

    pub fn markdown(&self) -> &Arc<MarkdownRenderer> {
        &self.markdown
    }

    /// Load one item from a path relative to the content root.
    ///
    /// Items marked `draft: true` yield [`ContentError::Draft`].
    pub fn load(&self, relative: &Path) -> Result<ContentItem> {
        let full_path = self.content_dir.join(relative);
        let content =
            fs::read_to_string(&full_path).map_err(|e| ContentError::io(&full_path, e))?;
        self.load_from_str(relative, &content)
    }

    /// Build an item from already-read file content
    pub fn load_from_str(&self, relative: &Path, content: &str) -> Result<ContentItem> {
        let (fm, body) = FrontMatter::parse(content)?;

        if fm.is_draft() {
            return Err(ContentError::Draft(relative.to_path_buf()));
        }

        let collection = collection::collection_of(&self.content_dir.join(relative))?;

        let body = match self.body_mode {
            BodyMode::Raw => body.to_string(),
            BodyMode::Rendered => self.markdown.render(body),
        };

        Ok(ContentItem {
            title: fm.title().unwrap_or_default().to_string(),
            description: fm.description().unwrap_or_default().to_string(),
            body,
            date: fm.date().unwrap_or_default().to_string(),
            draft: false,
            featured: fm.featured().unwrap_or(false),
            url: fm.url().unwrap_or_default().to_string(),
            theme: self.theme.clone(),
            collection,
            og_image_url: String::new(),
            source: relative.to_path_buf(),
        })
    }
}
