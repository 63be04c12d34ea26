//! Global data bag and collection JSON export

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::content::{collection, FrontMatter};
use crate::helpers::write_atomic;

/// Data available to every template, keyed by JSON file stem
pub type DataBag = BTreeMap<String, serde_json::Value>;

/// Load every `*.json` file under `dir` into a data bag.
///
/// A missing directory yields an empty bag.
pub fn load_data(dir: &Path) -> Result<DataBag> {
    let mut data = DataBag::new();
    if !dir.exists() {
        tracing::debug!("Data directory {:?} not found, using empty data", dir);
        return Ok(data);
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;

        if let Some(key) = path.file_stem().and_then(|s| s.to_str()) {
            data.insert(key.to_string(), value);
        }
    }

    Ok(data)
}

/// One content file as stored in a collection export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedEntry {
    #[serde(rename = "frontMatter")]
    pub front_matter: FrontMatter,
    pub body: String,
}

/// Write `<data>/<collection>.json` for every collection directory.
///
/// Each export maps file stem to front matter and raw body. Entries for
/// files that no longer exist are dropped; files that fail to parse are
/// logged and left out.
pub fn export_collections(content_dir: &Path, data_dir: &Path) -> Result<()> {
    fs::create_dir_all(data_dir)?;

    let mut collections: Vec<_> = fs::read_dir(content_dir)
        .with_context(|| format!("Failed to read content directory {:?}", content_dir))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    collections.sort();

    for dir in collections {
        let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let json_path = data_dir.join(format!("{}.json", name));

        let mut entries: BTreeMap<String, ExportedEntry> = match fs::read_to_string(&json_path) {
            Ok(existing) => serde_json::from_str(&existing)
                .with_context(|| format!("Failed to parse {:?}", json_path))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", json_path)),
        };

        let mut present = BTreeSet::new();
        for entry in WalkDir::new(&dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !collection::is_markdown_file(path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            present.insert(stem.to_string());

            let content = fs::read_to_string(path)?;
            match FrontMatter::parse(&content) {
                Ok((front_matter, body)) => {
                    entries.insert(
                        stem.to_string(),
                        ExportedEntry {
                            front_matter,
                            body: body.to_string(),
                        },
                    );
                }
                Err(e) => tracing::warn!("Skipping {:?} in export: {}", path, e),
            }
        }

        entries.retain(|stem, _| present.contains(stem));

        write_atomic(&json_path, serde_json::to_string_pretty(&entries)?.as_bytes())?;
        tracing::debug!("Exported collection {} to {:?}", name, json_path);
    }

    Ok(())
}
