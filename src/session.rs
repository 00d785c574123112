// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Client-local session store
//!
//! A flat string key-value store holding the last diagram (`diagramCode`) and
//! the repository it belongs to (`repoUrl`). Views hand diagrams to each
//! other through [`Handoff`]; the store only carries them across invocations.

use crate::types::{DiagramDescription, Handoff, RepositoryReference};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key of the last diagram description
pub const DIAGRAM_KEY: &str = "diagramCode";
/// Key of the repository reference
pub const REPO_KEY: &str = "repoUrl";
/// File name of the store inside the session directory
pub const FILE_NAME: &str = "session.json";

/// Key-value store, optionally backed by a JSON file
#[derive(Debug, Default)]
pub struct SessionStore {
    entries: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Store that lives only as long as this value
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store in `dir`, starting empty if no file exists yet
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(FILE_NAME);
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            entries,
            path: Some(path),
        })
    }

    /// File backing this store, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read a value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Write a value and flush it to disk
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let json =
            serde_json::to_string_pretty(&self.entries).context("Failed to serialize session")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "session saved");
        Ok(())
    }

    /// Persist the payload passed from the submission view to the result view
    pub fn save_handoff(&mut self, handoff: &Handoff) -> Result<()> {
        self.entries
            .insert(DIAGRAM_KEY.to_string(), handoff.diagram.as_str().to_string());
        match &handoff.repo {
            Some(repo) => {
                self.entries.insert(REPO_KEY.to_string(), repo.as_str().to_string());
            }
            None => {
                self.entries.remove(REPO_KEY);
            }
        }
        self.flush()
    }

    /// Replace the stored diagram, keeping the repository
    pub fn save_diagram(&mut self, diagram: &DiagramDescription) -> Result<()> {
        self.set(DIAGRAM_KEY, diagram.as_str())
    }

    /// Stored repository reference, if a valid one exists
    #[must_use]
    pub fn repo(&self) -> Option<RepositoryReference> {
        self.get(REPO_KEY)
            .and_then(|url| RepositoryReference::parse(url).ok())
    }

    /// Rebuild the last handoff; `None` when no diagram was stored
    #[must_use]
    pub fn load_handoff(&self) -> Option<Handoff> {
        let diagram = self.get(DIAGRAM_KEY)?;
        Some(Handoff {
            diagram: DiagramDescription::new(diagram),
            repo: self.repo(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn handoff(code: &str, repo: Option<&str>) -> Handoff {
        Handoff {
            diagram: DiagramDescription::new(code),
            repo: repo.map(|r| RepositoryReference::parse(r).unwrap()),
        }
    }

    #[test]
    fn test_in_memory_round_trip() {
        let mut store = SessionStore::in_memory();
        store.set(DIAGRAM_KEY, "graph TD; A-->B;").unwrap();
        assert_eq!(store.get(DIAGRAM_KEY), Some("graph TD; A-->B;"));
        assert!(store.path().is_none());
    }

    #[test]
    fn test_file_store_persists() {
        let dir = TempDir::new().unwrap();
        let mut store = SessionStore::open(dir.path()).unwrap();
        store
            .save_handoff(&handoff("graph LR; X-->Y;", Some("github.com/acme/repo")))
            .unwrap();

        let reopened = SessionStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(DIAGRAM_KEY), Some("graph LR; X-->Y;"));
        assert_eq!(reopened.get(REPO_KEY), Some("github.com/acme/repo"));
        assert_eq!(
            reopened.load_handoff(),
            Some(handoff("graph LR; X-->Y;", Some("github.com/acme/repo")))
        );
    }

    #[test]
    fn test_handoff_without_repo_clears_stale_repo() {
        let mut store = SessionStore::in_memory();
        store.save_handoff(&handoff("a", Some("github.com/acme/old"))).unwrap();
        store.save_handoff(&handoff("b", None)).unwrap();

        assert_eq!(store.get(REPO_KEY), None);
        assert_eq!(store.load_handoff(), Some(handoff("b", None)));
    }

    #[test]
    fn test_save_diagram_keeps_repo() {
        let mut store = SessionStore::in_memory();
        store.save_handoff(&handoff("first", Some("github.com/acme/repo"))).unwrap();
        store.save_diagram(&DiagramDescription::new("second")).unwrap();

        let loaded = store.load_handoff().unwrap();
        assert_eq!(loaded.diagram.as_str(), "second");
        assert_eq!(loaded.repo.unwrap().as_str(), "github.com/acme/repo");
    }

    #[test]
    fn test_empty_store_has_no_handoff() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        assert!(store.load_handoff().is_none());
        assert!(store.repo().is_none());
    }
}
