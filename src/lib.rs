//! mdsite: a personal static site generator
//!
//! Markdown files grouped into collections (`content/<collection>/*.md`)
//! are rendered through Tera templates, either in one batch build or on
//! demand by the dev server, which also scaffolds new collections and new
//! files as they appear.

pub mod config;
pub mod content;
pub mod data;
pub mod dev;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod ogimage;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE: &str = "config.json";

/// A site rooted at a base directory
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content directory (one subdirectory per collection)
    pub content_dir: PathBuf,
    /// Output directory
    pub output_dir: PathBuf,
    /// Template directory
    pub template_dir: PathBuf,
    /// JSON data directory
    pub data_dir: PathBuf,
    /// Static assets, published under `<output>/public`
    pub assets_dir: PathBuf,
    /// Theme stylesheets
    pub themes_dir: PathBuf,
}

impl Site {
    /// Open a site from a directory, reading `config.json` if present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join(CONFIG_FILE);
        Self::load(base_dir, &config_path)
    }

    /// Open a site with an explicit config file. A missing file means
    /// defaults; an unreadable or malformed one is an error.
    pub fn load<P: AsRef<Path>>(base_dir: P, config_path: &Path) -> Result<Self> {
        let config = if config_path.exists() {
            config::SiteConfig::load(config_path)?
        } else {
            tracing::debug!("No config at {:?}, using defaults", config_path);
            config::SiteConfig::default()
        };
        Ok(Self::with_config(base_dir, config))
    }

    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();

        Self {
            content_dir: base_dir.join(&config.content_path),
            output_dir: base_dir.join(&config.output_path),
            template_dir: base_dir.join(&config.template_path),
            data_dir: base_dir.join(&config.data_path),
            assets_dir: base_dir.join(&config.assets_path),
            themes_dir: base_dir.join(&config.themes_path),
            config,
            base_dir,
        }
    }

    /// Run a batch build
    pub fn build(&self) -> Result<generator::BuildReport> {
        generator::build_site(self)
    }
}
