//! Feed aggregation across collections

use anyhow::Result;
use std::cmp::Reverse;
use walkdir::WalkDir;

use super::collection::{is_feed_item, is_markdown_file};
use super::{ContentItem, ContentLoader};

/// Collects publishable items from every collection, newest first
pub struct FeedBuilder<'a> {
    loader: &'a ContentLoader,
}

impl<'a> FeedBuilder<'a> {
    pub fn new(loader: &'a ContentLoader) -> Self {
        Self { loader }
    }

    /// Walk the content root and load every feed item.
    ///
    /// Pages, `base.md` scaffolds and drafts are left out. Any other item
    /// that fails to load is logged and skipped; only an unreadable content
    /// root fails the whole feed.
    pub fn build(&self) -> Result<Vec<ContentItem>> {
        let root = self.loader.content_dir();
        let mut items = Vec::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in feed: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !is_markdown_file(path) || !is_feed_item(path) {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path);
            match self.loader.load(relative) {
                Ok(item) => items.push(item),
                Err(e) if e.is_draft() => {
                    tracing::debug!("Leaving draft {:?} out of feed", relative);
                }
                Err(e) => {
                    tracing::warn!("Failed to load {:?} for feed: {}", relative, e);
                }
            }
        }

        sort_feed(&mut items);
        tracing::debug!("Feed built with {} items from {:?}", items.len(), root);
        Ok(items)
    }
}

/// Sort by date, newest first. Items without a parseable date go last and
/// keep their relative order.
pub fn sort_feed(items: &mut [ContentItem]) {
    items.sort_by_cached_key(|item| Reverse(item.parsed_date()));
}

/// Convenience wrapper for a one-off feed
pub fn load_feed(loader: &ContentLoader) -> Result<Vec<ContentItem>> {
    FeedBuilder::new(loader).build()
}
