//! OG image generation through an external screenshot script
//!
//! Images are cached by file presence: once `<stem>-og-image.png` exists it
//! is never regenerated.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

use crate::content::collection::{is_base_file, is_markdown_file};
use crate::content::{ContentItem, ContentLoader};
use crate::data::DataBag;
use crate::templates::{RenderContext, Renderer};
use crate::Site;

/// Template rendered to HTML before the screenshot is taken
pub const OG_TEMPLATE: &str = "og-image.html";

pub struct OgImageGenerator {
    program: String,
    script: PathBuf,
    output_dir: PathBuf,
    url_prefix: String,
}

impl OgImageGenerator {
    pub fn new(site: &Site) -> Self {
        let og = &site.config.og_image;
        Self::with_options(
            &og.program,
            site.base_dir.join(&og.script),
            site.base_dir.join(&og.output_dir),
            &og.url_prefix,
        )
    }

    pub fn with_options(
        program: &str,
        script: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        url_prefix: &str,
    ) -> Self {
        Self {
            program: program.to_string(),
            script: script.into(),
            output_dir: output_dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// `<stem>-og-image.png`
    pub fn image_name(source: &Path) -> String {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        format!("{}-og-image.png", stem)
    }

    pub fn image_path(&self, source: &Path) -> PathBuf {
        self.output_dir.join(Self::image_name(source))
    }

    pub fn url_for(&self, source: &Path) -> String {
        format!("{}/{}", self.url_prefix, Self::image_name(source))
    }

    /// Produce the image for an item unless it already exists.
    /// Returns the public URL of the image.
    pub fn generate<R: Renderer + ?Sized>(&self, item: &ContentItem, renderer: &R) -> Result<String> {
        let image_path = self.image_path(&item.source);
        let url = self.url_for(&item.source);

        if image_path.exists() {
            tracing::debug!("OG image already exists for {:?}, skipping", item.source);
            return Ok(url);
        }

        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create {:?}", self.output_dir))?;

        let data = DataBag::new();
        let html = renderer.render(
            OG_TEMPLATE,
            &RenderContext {
                page: item,
                data: &data,
                feed: &[],
            },
        )?;

        // Removed when dropped, whether or not the script succeeds
        let mut html_file = tempfile::Builder::new()
            .prefix("og-")
            .suffix(".html")
            .tempfile_in(&self.output_dir)?;
        html_file.write_all(html.as_bytes())?;
        html_file.flush()?;

        let status = Command::new(&self.program)
            .arg(&self.script)
            .arg(html_file.path())
            .arg(&image_path)
            .status()
            .with_context(|| format!("Failed to run {} {:?}", self.program, self.script))?;

        if !status.success() {
            bail!(
                "Screenshot script failed for {:?} ({})",
                item.source,
                status
            );
        }

        tracing::info!("Generated OG image {:?}", image_path);
        Ok(url)
    }

    /// Generate images for every non-draft item. Per-item failures are
    /// logged; returns the number of items that have an image afterwards.
    pub fn generate_all<R: Renderer + ?Sized>(
        &self,
        loader: &ContentLoader,
        renderer: &R,
    ) -> Result<usize> {
        let root = loader.content_dir();
        let mut done = 0;

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_markdown_file(path) || is_base_file(path) {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path);
            let item = match loader.load(relative) {
                Ok(item) => item,
                Err(e) if e.is_draft() => continue,
                Err(e) => {
                    tracing::warn!("Failed to load {:?}: {}", relative, e);
                    continue;
                }
            };

            match self.generate(&item, renderer) {
                Ok(_) => done += 1,
                Err(e) => tracing::warn!("Failed to generate OG image for {:?}: {:#}", relative, e),
            }
        }

        Ok(done)
    }
}
