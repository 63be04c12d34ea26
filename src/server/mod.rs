//! Development server: renders pages on request from the content tree

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::content::collection::{is_base_file, PAGE_COLLECTION};
use crate::content::{CollectionResolver, ContentLoader, FeedBuilder, MarkdownRenderer};
use crate::data;
use crate::dev::{self, DevWatcher};
use crate::error::ContentError;
use crate::generator::stage_assets;
use crate::ogimage::OgImageGenerator;
use crate::templates::{RenderContext, Renderer, TemplateSet};
use crate::Site;

/// Sent with every rendered page
const CACHE_CONTROL: &str = "max-age=600";

lazy_static! {
    static ref SEGMENT: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// Map a request path to a content file relative to the content root.
///
/// `/` is `page/index.md`, `/<name>` is `page/<name>.md` and
/// `/<collection>/<name>` is `<collection>/<name>.md`. Anything else,
/// including segments outside `[A-Za-z0-9_-]`, has no source.
pub fn route_to_source(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Some(Path::new(PAGE_COLLECTION).join("index.md"));
    }

    let segments: Vec<&str> = trimmed.split('/').collect();
    if !segments.iter().all(|s| SEGMENT.is_match(s)) {
        return None;
    }

    match segments.as_slice() {
        [name] => Some(Path::new(PAGE_COLLECTION).join(format!("{}.md", name))),
        [collection, name] => Some(Path::new(collection).join(format!("{}.md", name))),
        _ => None,
    }
}

/// Why a page could not be served
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Render(#[from] anyhow::Error),
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        match self {
            ServeError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ServeError::Render(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Render error: {:#}", e)).into_response()
            }
        }
    }
}

/// Shared by every request
pub struct DevState {
    loader: ContentLoader,
    resolver: CollectionResolver,
    templates: RwLock<Arc<TemplateSet>>,
    template_dir: PathBuf,
    data_dir: PathBuf,
    markdown: Arc<MarkdownRenderer>,
    og_images: Option<OgImageGenerator>,
}

impl DevState {
    pub fn new(site: &Site) -> Result<Self> {
        let markdown = Arc::new(MarkdownRenderer::new());
        std::fs::create_dir_all(&site.template_dir)
            .with_context(|| format!("Failed to create {:?}", site.template_dir))?;
        let templates = TemplateSet::load(&site.template_dir, markdown.clone())?;

        let mut state = Self::with_templates(
            ContentLoader::new(site, markdown),
            CollectionResolver::new(&site.config.default_template),
            templates,
            &site.template_dir,
            &site.data_dir,
        );
        if site.config.og_image.enabled {
            state.og_images = Some(OgImageGenerator::new(site));
        }
        Ok(state)
    }

    pub fn with_templates(
        loader: ContentLoader,
        resolver: CollectionResolver,
        templates: TemplateSet,
        template_dir: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            markdown: loader.markdown().clone(),
            loader,
            resolver,
            templates: RwLock::new(Arc::new(templates)),
            template_dir: template_dir.into(),
            data_dir: data_dir.into(),
            og_images: None,
        }
    }

    /// The current template set. Requests keep the set they started with
    /// even if a reload swaps in a new one meanwhile.
    pub fn templates(&self) -> Arc<TemplateSet> {
        let guard = self.templates.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Load the template root again and swap the new set in. On failure the
    /// previous set stays in place.
    pub fn reload_templates(&self) -> Result<()> {
        let fresh = TemplateSet::load(&self.template_dir, self.markdown.clone())?;
        let count = fresh.names().len();
        *self.templates.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(fresh);
        tracing::info!("Reloaded {} templates", count);
        Ok(())
    }

    /// Render the page behind a request path
    pub fn render_page(&self, path: &str) -> Result<String, ServeError> {
        let relative = route_to_source(path).ok_or(ServeError::NotFound)?;
        if is_base_file(&relative) {
            return Err(ServeError::NotFound);
        }

        let mut item = match self.loader.load(&relative) {
            Ok(item) => item,
            Err(e) if e.is_draft() => {
                tracing::debug!("Not serving draft {:?}", relative);
                return Err(ServeError::NotFound);
            }
            Err(ContentError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                return Err(ServeError::NotFound);
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to load {:?}", relative))
                    .into())
            }
        };

        if let Some(og) = &self.og_images {
            if og.image_path(&item.source).exists() {
                item.og_image_url = og.url_for(&item.source);
            }
        }

        let data = data::load_data(&self.data_dir)?;
        let feed = FeedBuilder::new(&self.loader).build()?;

        let templates = self.templates();
        let template = self.resolver.resolve(templates.as_ref(), &item.collection);
        let html = templates.render(
            &template,
            &RenderContext {
                page: &item,
                data: &data,
                feed: &feed,
            },
        )?;
        Ok(html)
    }
}

/// Routes of the dev server: assets under `/public`, pages everywhere else
pub fn router(state: Arc<DevState>, assets_dir: &Path) -> Router {
    Router::new()
        .nest_service("/public", ServeDir::new(assets_dir))
        .fallback(page_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn page_handler(State(state): State<Arc<DevState>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    let request_path = path.clone();

    match tokio::task::spawn_blocking(move || state.render_page(&request_path)).await {
        Ok(Ok(html)) => ([(header::CACHE_CONTROL, CACHE_CONTROL)], Html(html)).into_response(),
        Ok(Err(ServeError::Render(e))) => {
            tracing::error!("Failed to render {}: {:#}", path, e);
            ServeError::Render(e).into_response()
        }
        Ok(Err(e)) => e.into_response(),
        Err(e) => {
            tracing::error!("Render task for {} failed: {}", path, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

/// Start the development server along with the content and template
/// watchers
pub async fn start(site: &Site, ip: &str, port: u16) -> Result<()> {
    data::export_collections(&site.content_dir, &site.data_dir)?;
    stage_assets(site)?;

    let state = Arc::new(DevState::new(site)?);

    Arc::new(DevWatcher::new(site)).spawn()?;

    let reloader = Arc::clone(&state);
    let template_dir = site.template_dir.clone();
    std::thread::Builder::new()
        .name("template-watcher".to_string())
        .spawn(move || {
            let result = dev::watch_templates(&template_dir, || {
                if let Err(e) = reloader.reload_templates() {
                    tracing::warn!("Keeping previous templates: {:#}", e);
                }
            });
            if let Err(e) = result {
                tracing::error!("Template watcher stopped: {:#}", e);
            }
        })?;

    let app = router(state, &site.assets_dir);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
