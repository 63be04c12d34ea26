//! Site configuration (config.json)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    // Site
    pub site_title: String,
    pub site_description: String,
    pub theme_name: String,

    // Directory
    pub template_path: String,
    pub content_path: String,
    pub output_path: String,
    pub data_path: String,
    pub assets_path: String,
    pub themes_path: String,

    // Rendering
    pub body_mode: BodyMode,
    /// Catch-all layout used when a collection has no template of its own
    pub default_template: String,

    #[serde(default)]
    pub og_image: OgImageConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_title: String::new(),
            site_description: String::new(),
            theme_name: "default".to_string(),

            template_path: "templates".to_string(),
            content_path: "content".to_string(),
            output_path: "public".to_string(),
            data_path: "data".to_string(),
            assets_path: "assets".to_string(),
            themes_path: "themes".to_string(),

            body_mode: BodyMode::Raw,
            default_template: "site.html".to_string(),

            og_image: OgImageConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: SiteConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }
}

/// How a content body is handed to templates.
///
/// This is one switch for the whole pipeline: every loader reads it from the
/// site configuration, so a template never sees a mix of both forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BodyMode {
    /// Body stays Markdown; templates render it with the `markdown` filter
    #[default]
    Raw,
    /// Body is converted to HTML while loading
    Rendered,
}

/// OG image generation (external screenshot script)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OgImageConfig {
    pub enabled: bool,
    /// Interpreter for the script
    pub program: String,
    /// Screenshot script invoked as `<program> <script> <html> <png>`
    pub script: String,
    pub output_dir: String,
    pub url_prefix: String,
}

impl Default for OgImageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            program: "node".to_string(),
            script: "scripts/screenshot.js".to_string(),
            output_dir: "assets/og-image".to_string(),
            url_prefix: "/public/og-image".to_string(),
        }
    }
}
