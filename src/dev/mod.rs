//! Dev-mode filesystem watchers
//!
//! Two long-lived subscriptions on the content root, each on its own
//! thread:
//! - the directory watcher scaffolds a template and a `base.md` for every
//!   new collection directory;
//! - the file watcher gives every new Markdown file the front matter of its
//!   collection's `base.md`, once its creator has closed it after writing.
//!
//! A third, debounced watcher on the template root tells the server to
//! reload its template set.

pub mod scaffold;

use anyhow::{Context, Result};
use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::BodyMode;
use crate::content::collection::{collection_of, is_base_file, is_markdown_file};
use crate::Site;

/// Watches the content tree for new collections and new files
pub struct DevWatcher {
    content_dir: PathBuf,
    template_dir: PathBuf,
    body_mode: BodyMode,
    /// New files still waiting for their creator to finish writing
    pending: Mutex<HashSet<PathBuf>>,
    /// Files already given front matter this session
    processed: Mutex<HashSet<PathBuf>>,
}

impl DevWatcher {
    pub fn new(site: &Site) -> Self {
        Self::with_options(&site.content_dir, &site.template_dir, site.config.body_mode)
    }

    pub fn with_options(
        content_dir: impl Into<PathBuf>,
        template_dir: impl Into<PathBuf>,
        body_mode: BodyMode,
    ) -> Self {
        Self {
            content_dir: content_dir.into(),
            template_dir: template_dir.into(),
            body_mode,
            pending: Mutex::new(HashSet::new()),
            processed: Mutex::new(HashSet::new()),
        }
    }

    /// Start both watchers. They run until the process exits; a watcher
    /// that fails to subscribe logs the error and stops on its own.
    pub fn spawn(self: Arc<Self>) -> Result<Vec<JoinHandle<()>>> {
        let dirs = Arc::clone(&self);
        let files = Arc::clone(&self);

        let handles = vec![
            thread::Builder::new()
                .name("dir-watcher".to_string())
                .spawn(move || {
                    if let Err(e) = dirs.watch_directories() {
                        tracing::error!("Directory watcher stopped: {:#}", e);
                    }
                })?,
            thread::Builder::new()
                .name("file-watcher".to_string())
                .spawn(move || {
                    if let Err(e) = files.watch_files() {
                        tracing::error!("File watcher stopped: {:#}", e);
                    }
                })?,
        ];
        Ok(handles)
    }

    /// Block forever handling "directory created" events in the content root
    pub fn watch_directories(&self) -> Result<()> {
        let (mut watcher, rx) = subscribe()?;
        watcher
            .watch(&self.content_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {:?}", self.content_dir))?;
        tracing::debug!("Watching for new collections in {:?}", self.content_dir);

        for result in rx {
            match result {
                Ok(event) if is_create(&event) => {
                    for path in event.paths.iter().filter(|p| p.is_dir()) {
                        if let Err(e) = self.on_directory_created(path) {
                            tracing::warn!("Failed to scaffold {:?}: {:#}", path, e);
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Watch error: {:?}", e),
            }
        }

        Ok(())
    }

    /// Block forever handling file events in the content root and its
    /// immediate subdirectories. A new file is rewritten only when it is
    /// closed after writing, so the creator's own writes are never lost.
    pub fn watch_files(&self) -> Result<()> {
        let (mut watcher, rx) = subscribe()?;
        watcher
            .watch(&self.content_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {:?}", self.content_dir))?;

        for entry in fs::read_dir(&self.content_dir)? {
            let path = entry?.path();
            if path.is_dir() {
                watcher.watch(&path, RecursiveMode::NonRecursive)?;
                tracing::debug!("Watching: {:?}", path);
            }
        }

        for result in rx {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!("Watch error: {:?}", e);
                    continue;
                }
            };

            if is_create(&event) {
                for path in &event.paths {
                    if path.is_dir() {
                        // Collections created while running get watched too
                        if path.parent() == Some(self.content_dir.as_path()) {
                            if let Err(e) = watcher.watch(path, RecursiveMode::NonRecursive) {
                                tracing::warn!("Failed to watch {:?}: {}", path, e);
                            }
                        }
                    } else if let Err(e) = self.on_file_created(path) {
                        tracing::warn!("Failed to track {:?}: {:#}", path, e);
                    }
                }
            } else if is_close_write(&event) {
                for path in &event.paths {
                    if let Err(e) = self.on_file_written(path) {
                        tracing::warn!("Failed to apply front matter to {:?}: {:#}", path, e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Scaffold a new collection: its template and its `base.md`
    pub fn on_directory_created(&self, dir: &Path) -> Result<()> {
        let Some(collection) = dir.file_name().and_then(|n| n.to_str()) else {
            return Ok(());
        };

        if scaffold::ensure_collection_template(&self.template_dir, collection, self.body_mode)? {
            tracing::info!("Created template for collection {}", collection);
        }
        if scaffold::create_base_file(dir)? {
            tracing::info!("Created base.md in {:?}", dir);
        }
        Ok(())
    }

    /// Track a new Markdown file until its creator closes it.
    /// Returns whether the file is now waiting for front matter.
    pub fn on_file_created(&self, path: &Path) -> Result<bool> {
        if !is_markdown_file(path) || is_base_file(path) {
            return Ok(false);
        }
        if path.parent() == Some(self.content_dir.as_path()) {
            return Ok(false);
        }
        if lock(&self.processed)?.contains(path) {
            return Ok(false);
        }

        lock(&self.pending)?.insert(path.to_path_buf());
        tracing::debug!("New file {:?}, waiting for it to be written", path);
        Ok(true)
    }

    /// Give a new file its collection's front matter once it has been
    /// written and closed. Returns whether the file was rewritten.
    pub fn on_file_written(&self, path: &Path) -> Result<bool> {
        if !lock(&self.pending)?.contains(path) {
            return Ok(false);
        }

        // A failed attempt leaves the file pending, so the next close retries
        let rewritten = scaffold::apply_base_front_matter(path)?;

        lock(&self.pending)?.remove(path);
        // Some platforms report one creation more than once
        lock(&self.processed)?.insert(path.to_path_buf());

        if rewritten {
            tracing::info!(
                "Front matter from base.md applied to {:?} (collection {})",
                path,
                collection_of(path)?
            );
        }
        Ok(rewritten)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| anyhow::anyhow!("watcher path set poisoned"))
}

/// Block forever, calling `on_change` after a burst of template changes
pub fn watch_templates<F>(template_dir: &Path, mut on_change: F) -> Result<()>
where
    F: FnMut(),
{
    use notify_debouncer_mini::new_debouncer;

    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(Duration::from_millis(300), tx)?;
    debouncer
        .watcher()
        .watch(template_dir, notify_debouncer_mini::notify::RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {:?}", template_dir))?;
    tracing::debug!("Watching templates in {:?}", template_dir);

    for result in rx {
        match result {
            Ok(events) => {
                let relevant = events
                    .iter()
                    .any(|e| e.path.extension().map(|x| x == "html").unwrap_or(false));
                if relevant {
                    on_change();
                }
            }
            Err(e) => tracing::error!("Watch error: {:?}", e),
        }
    }

    Ok(())
}

fn subscribe() -> Result<(RecommendedWatcher, Receiver<notify::Result<Event>>)> {
    let (tx, rx) = channel();
    let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })?;
    Ok((watcher, rx))
}

fn is_create(event: &Event) -> bool {
    matches!(event.kind, EventKind::Create(_))
}

fn is_close_write(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Access(AccessKind::Close(AccessMode::Write))
    )
}
