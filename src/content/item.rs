//! Content item model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Date format accepted in front matter
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One content file, as handed to templates.
///
/// Built fresh on every load and never mutated by the pipeline afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    /// Title from front matter, empty if absent
    pub title: String,

    /// Description from front matter, empty if absent
    pub description: String,

    /// Markdown or HTML, depending on the site's body mode
    pub body: String,

    /// `YYYY-MM-DD`, empty if absent
    pub date: String,

    pub draft: bool,

    pub featured: bool,

    /// External link from front matter
    pub url: String,

    /// Active theme name from the site configuration
    pub theme: String,

    /// Name of the parent directory
    pub collection: String,

    /// Set by the OG image generator, never computed here
    #[serde(rename = "ogImageUrl")]
    pub og_image_url: String,

    /// Path relative to the content root
    #[serde(skip)]
    pub source: PathBuf,
}

impl ContentItem {
    /// Parsed date, `None` when absent or not `YYYY-MM-DD`
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).ok()
    }

    /// File name without extension
    pub fn slug(&self) -> String {
        self.source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    }
}
