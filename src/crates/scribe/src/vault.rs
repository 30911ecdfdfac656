//! Vault summary service.
//!
//! Supplies the opaque vault snapshot injected into pipeline state at
//! executor entry. Kept behind a trait so tests and deployments without a
//! local checkout can substitute their own source.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Snapshot of the vault's contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultSummary {
    /// Number of markdown articles in the vault.
    pub total_articles: usize,
    /// Top-level directories containing articles.
    pub categories: Vec<String>,
    /// Most recently modified article paths, newest first.
    pub recent_updates: Vec<String>,
}

/// Read-only view over the vault used to seed pipeline state.
pub trait VaultService: Send + Sync {
    /// Compute a summary of the vault.
    fn summary(&self) -> VaultSummary;
}

/// Filesystem-backed vault service over a local checkout.
#[derive(Debug, Clone, Default)]
pub struct FsVaultService {
    root: Option<PathBuf>,
}

impl FsVaultService {
    /// Create a service over an optional vault root. Without a root the
    /// summary is empty.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

impl VaultService for FsVaultService {
    fn summary(&self) -> VaultSummary {
        let Some(root) = &self.root else {
            return VaultSummary::default();
        };

        let mut articles: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
        collect_markdown(root, root, &mut articles);

        let mut categories: Vec<String> = articles
            .iter()
            .filter_map(|(path, _)| path.components().next())
            .filter_map(|component| match component {
                std::path::Component::Normal(name) => name.to_str().map(str::to_string),
                _ => None,
            })
            .collect();
        categories.sort();
        categories.dedup();

        articles.sort_by(|a, b| b.1.cmp(&a.1));
        let recent_updates = articles
            .iter()
            .take(5)
            .filter_map(|(path, _)| path.to_str().map(str::to_string))
            .collect();

        debug!(total = articles.len(), "Computed vault summary");
        VaultSummary {
            total_articles: articles.len(),
            categories,
            recent_updates,
        }
    }
}

/// Recursively collect markdown files as vault-relative paths with their
/// modification times. I/O errors skip the offending entry.
fn collect_markdown(root: &Path, dir: &Path, out: &mut Vec<(PathBuf, std::time::SystemTime)>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_markdown(root, &path, out);
        } else if path.extension().is_some_and(|ext| ext == "md") {
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            if let Ok(relative) = path.strip_prefix(root) {
                out.push((relative.to_path_buf(), modified));
            }
        }
    }
}
