//! Content module - front matter, content items, loading and feeds

pub mod collection;
pub mod feed;
mod frontmatter;
mod item;
pub mod loader;
mod markdown;

pub use collection::CollectionResolver;
pub use feed::FeedBuilder;
pub use frontmatter::FrontMatter;
pub use item::{ContentItem, DATE_FORMAT};
pub use loader::ContentLoader;
pub use markdown::MarkdownRenderer;
