//! Store configuration.
//!
//! A [`StoreConfig`] is constructed explicitly and passed down to
//! [`crate::service::NoteService::open`]; there is no ambient global
//! configuration.

use std::io;
use std::path::{Path, PathBuf};

/// Locations of the note files and the derived indexes.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the markdown note files (also the journal repo root).
    pub notes_dir: PathBuf,
    /// Directory holding the search index, backlink index, and lock file.
    pub index_dir: PathBuf,
}

impl StoreConfig {
    /// Config with `notes/` and `index/` directories under a single root.
    pub fn at_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self { notes_dir: root.join("notes"), index_dir: root.join("index") }
    }

    /// Config under the platform-local data directory.
    pub fn default_locations() -> Self {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notarium");
        Self::at_root(base)
    }

    /// Create the data directories if they do not exist.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.notes_dir)?;
        std::fs::create_dir_all(&self.index_dir)?;
        Ok(())
    }

    /// Path of the advisory lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.index_dir.join("notarium.lock")
    }

    /// Path of the persisted backlink index.
    pub fn backlinks_path(&self) -> PathBuf {
        self.index_dir.join("backlinks.json")
    }

    /// Directory of the full-text search index.
    pub fn search_dir(&self) -> PathBuf {
        self.index_dir.join("search")
    }
}
