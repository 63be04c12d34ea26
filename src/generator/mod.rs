//! Generator module - batch build of the whole site

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::content::collection::{is_base_file, is_markdown_file, PAGE_COLLECTION};
use crate::content::{CollectionResolver, ContentLoader, FeedBuilder, MarkdownRenderer};
use crate::data::{self, DataBag};
use crate::helpers::{copy_dir, write_atomic};
use crate::ogimage::OgImageGenerator;
use crate::templates::{RenderContext, Renderer, TemplateSet};
use crate::Site;

/// Outcome of a batch build
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Output files written
    pub rendered: Vec<PathBuf>,
    /// Sources skipped as drafts
    pub drafts: Vec<PathBuf>,
    /// Sources whose render failed, with the error
    pub failed: Vec<(PathBuf, String)>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Output location of a content file: same relative path with `.html`,
/// except that the `page` collection lands at the output root.
pub fn output_path(output_dir: &Path, relative: &Path) -> PathBuf {
    let html = relative.with_extension("html");
    match html.strip_prefix(PAGE_COLLECTION) {
        Ok(flattened) => output_dir.join(flattened),
        Err(_) => output_dir.join(html),
    }
}

/// Walks the content tree once and renders every file
pub struct Generator<'a, R: Renderer + ?Sized> {
    loader: &'a ContentLoader,
    resolver: &'a CollectionResolver,
    renderer: &'a R,
    output_dir: PathBuf,
    og_images: Option<&'a OgImageGenerator>,
}

impl<'a, R: Renderer + ?Sized> Generator<'a, R> {
    pub fn new(
        loader: &'a ContentLoader,
        resolver: &'a CollectionResolver,
        renderer: &'a R,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            loader,
            resolver,
            renderer,
            output_dir: output_dir.into(),
            og_images: None,
        }
    }

    /// Attach OG image URLs to items as they are built
    pub fn with_og_images(mut self, og_images: &'a OgImageGenerator) -> Self {
        self.og_images = Some(og_images);
        self
    }

    /// Build every content file.
    ///
    /// Drafts are skipped. A file that cannot be loaded aborts the build;
    /// a file whose render fails is recorded in the report and the walk
    /// goes on. Output is written atomically, so a failed render never
    /// leaves a partial file.
    pub fn generate(&self, data: &DataBag) -> Result<BuildReport> {
        let root = self.loader.content_dir();
        let feed = FeedBuilder::new(self.loader).build()?;
        let mut report = BuildReport::default();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {:?}", root))?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_markdown_file(path) {
                continue;
            }
            if is_base_file(path) {
                tracing::debug!("Skipping scaffold {:?}", path);
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path);
            let mut item = match self.loader.load(relative) {
                Ok(item) => item,
                Err(e) if e.is_draft() => {
                    tracing::info!("Skipping draft {:?}", relative);
                    report.drafts.push(relative.to_path_buf());
                    continue;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to load {:?}", relative));
                }
            };

            if let Some(og) = self.og_images {
                match og.generate(&item, self.renderer) {
                    Ok(url) => item.og_image_url = url,
                    Err(e) => tracing::warn!("No OG image for {:?}: {:#}", relative, e),
                }
            }

            let template = self.resolver.resolve(self.renderer, &item.collection);
            let context = RenderContext {
                page: &item,
                data,
                feed: &feed,
            };

            let html = match self.renderer.render(&template, &context) {
                Ok(html) => html,
                Err(e) => {
                    tracing::error!("Failed to render {:?} with {}: {:#}", relative, template, e);
                    report
                        .failed
                        .push((relative.to_path_buf(), format!("{:#}", e)));
                    continue;
                }
            };

            let output = output_path(&self.output_dir, relative);
            write_atomic(&output, html.as_bytes())?;
            tracing::debug!("Generated: {:?}", output);
            report.rendered.push(output);
        }

        Ok(report)
    }
}

/// Copy the theme stylesheet into the assets and the assets into
/// `<output>/public`
pub fn stage_assets(site: &Site) -> Result<()> {
    let theme_css = site
        .themes_dir
        .join(format!("{}.css", site.config.theme_name));
    if theme_css.exists() {
        let dest = site
            .assets_dir
            .join("css")
            .join(format!("{}.css", site.config.theme_name));
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&theme_css, &dest)
            .with_context(|| format!("Failed to copy theme {:?}", theme_css))?;
    } else {
        tracing::debug!("No theme stylesheet at {:?}", theme_css);
    }

    if site.assets_dir.exists() {
        let count = copy_dir(&site.assets_dir, &site.output_dir.join("public"))?;
        tracing::debug!("Copied {} asset files", count);
    }

    Ok(())
}

/// Load templates, data and assets for a site and run the batch build
pub fn build_site(site: &Site) -> Result<BuildReport> {
    let start = std::time::Instant::now();

    let markdown = Arc::new(MarkdownRenderer::new());
    let templates = TemplateSet::load(&site.template_dir, markdown.clone())?;
    let data = data::load_data(&site.data_dir)?;

    std::fs::create_dir_all(&site.output_dir)
        .with_context(|| format!("Failed to create {:?}", site.output_dir))?;

    let loader = ContentLoader::new(site, markdown);
    let resolver = CollectionResolver::new(&site.config.default_template);
    let og_images = OgImageGenerator::new(site);

    let mut generator = Generator::new(&loader, &resolver, &templates, &site.output_dir);
    if site.config.og_image.enabled {
        generator = generator.with_og_images(&og_images);
    }
    let report = generator.generate(&data)?;

    // After the walk, so images generated during it are published too
    stage_assets(site)?;

    tracing::info!(
        "Built {} files ({} drafts skipped, {} failed) in {:.2}s",
        report.rendered.len(),
        report.drafts.len(),
        report.failed.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BodyMode, OgImageConfig, SiteConfig};
    use std::fs;
    use tempfile::TempDir;

    /// Renders `template|title|feed size`; fails for one title
    struct Stub {
        templates: Vec<&'static str>,
        fail_title: Option<&'static str>,
    }

    impl Renderer for Stub {
        fn has_template(&self, name: &str) -> bool {
            self.templates.contains(&name)
        }

        fn render(&self, name: &str, context: &RenderContext<'_>) -> Result<String> {
            if Some(context.page.title.as_str()) == self.fail_title {
                anyhow::bail!("boom");
            }
            Ok(format!(
                "{}|{}|{}",
                name,
                context.page.title,
                context.feed.len()
            ))
        }
    }

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn loader(content: &Path) -> ContentLoader {
        ContentLoader::with_options(
            content,
            "t",
            BodyMode::Raw,
            Arc::new(MarkdownRenderer::new()),
        )
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        write(&content, "page/index.md", "---\ntitle: \"Home\"\ndraft: false\n---\nWelcome");
        write(&content, "page/about.md", "---\ntitle: About\n---\n");
        write(&content, "post/hello.md", "---\ntitle: Hello\ndate: \"2024-01-01\"\n---\n");
        write(&content, "post/base.md", "---\ntitle: \"Title\"\ndraft: true\n---\n");
        write(&content, "notes/a.md", "---\ntitle: A\ndraft: true\n---\n");
        dir
    }

    #[test]
    fn test_output_path() {
        let out = Path::new("/out");
        assert_eq!(
            output_path(out, Path::new("page/about.md")),
            PathBuf::from("/out/about.html")
        );
        assert_eq!(
            output_path(out, Path::new("post/hello.md")),
            PathBuf::from("/out/post/hello.html")
        );
        assert_eq!(
            output_path(out, Path::new("pages/x.md")),
            PathBuf::from("/out/pages/x.html")
        );
    }

    #[test]
    fn test_generate_writes_pages_and_skips_drafts() {
        let dir = fixture();
        let loader = loader(&dir.path().join("content"));
        let resolver = CollectionResolver::new("site.html");
        let stub = Stub {
            templates: vec!["page.html", "site.html"],
            fail_title: None,
        };
        let out = dir.path().join("output");

        let report = Generator::new(&loader, &resolver, &stub, &out)
            .generate(&DataBag::new())
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.rendered.len(), 3);
        assert_eq!(report.drafts, vec![PathBuf::from("notes/a.md")]);

        assert_eq!(
            fs::read_to_string(out.join("index.html")).unwrap(),
            "page.html|Home|1"
        );
        assert!(out.join("about.html").exists());
        // No post.html template, so the default layout is used
        assert_eq!(
            fs::read_to_string(out.join("post/hello.html")).unwrap(),
            "site.html|Hello|1"
        );
        assert!(!out.join("notes/a.html").exists());
        assert!(!out.join("post/base.html").exists());
    }

    #[test]
    fn test_render_error_skips_only_that_file() {
        let dir = fixture();
        let loader = loader(&dir.path().join("content"));
        let resolver = CollectionResolver::new("site.html");
        let stub = Stub {
            templates: vec!["site.html"],
            fail_title: Some("About"),
        };
        let out = dir.path().join("output");

        let report = Generator::new(&loader, &resolver, &stub, &out)
            .generate(&DataBag::new())
            .unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, PathBuf::from("page/about.md"));
        assert!(!out.join("about.html").exists());
        assert!(out.join("index.html").exists());
        assert!(out.join("post/hello.html").exists());
    }

    #[test]
    fn test_structural_error_aborts() {
        let dir = fixture();
        let content = dir.path().join("content");
        write(&content, "post/broken.md", "---\ntitle: never closed\n");
        let loader = loader(&content);
        let resolver = CollectionResolver::new("site.html");
        let stub = Stub {
            templates: vec!["site.html"],
            fail_title: None,
        };

        let result = Generator::new(&loader, &resolver, &stub, dir.path().join("output"))
            .generate(&DataBag::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_build_site_with_templates() {
        let dir = fixture();
        write(
            &dir.path().join("templates"),
            "site.html",
            "<title>{{ Page.title }}</title>{{ Page.body | markdown | safe }}",
        );
        write(&dir.path().join("data"), "site.json", r#"{"name": "x"}"#);
        write(&dir.path().join("themes"), "t.css", "body{}");
        let config = SiteConfig {
            theme_name: "t".to_string(),
            output_path: "output".to_string(),
            ..Default::default()
        };
        let site = Site::with_config(dir.path(), config);

        let report = site.build().unwrap();
        assert!(report.is_success());

        let index = fs::read_to_string(dir.path().join("output/index.html")).unwrap();
        assert!(index.contains("<title>Home</title>"));
        assert!(index.contains("<p>Welcome</p>"));
        assert!(dir.path().join("output/public/css/t.css").exists());
        assert!(!dir.path().join("output/notes/a.html").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_og_images_are_published_by_the_same_build() {
        let dir = fixture();
        write(
            &dir.path().join("templates"),
            "site.html",
            "{{ Page.title }} {{ Page.ogImageUrl }}",
        );
        write(&dir.path().join("templates"), "og-image.html", "<h1>{{ Page.title }}</h1>");
        // Stands in for the screenshot script: `sh shot.sh <html> <png>`
        write(dir.path(), "shot.sh", "cp \"$1\" \"$2\"\n");
        let config = SiteConfig {
            output_path: "output".to_string(),
            og_image: OgImageConfig {
                enabled: true,
                program: "sh".to_string(),
                script: "shot.sh".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let site = Site::with_config(dir.path(), config);

        let report = site.build().unwrap();
        assert!(report.is_success());

        let hello = fs::read_to_string(dir.path().join("output/post/hello.html")).unwrap();
        assert_eq!(hello, "Hello /public/og-image/hello-og-image.png");
        let published = dir.path().join("output/public/og-image/hello-og-image.png");
        assert_eq!(fs::read_to_string(published).unwrap(), "<h1>Hello</h1>");
    }
}
