use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::links::parser::extract_links;
use crate::note::Note;

const INDEX_VERSION: u32 = 1;

/// Errors raised by the backlink index.
#[derive(Debug, Error)]
pub enum BacklinkError {
    #[error("backlink index I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize backlink index: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Inbound links of a single target from a single source note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backlink {
    pub source_path: String,
    /// 1-based line numbers of the occurrences, ascending, deduplicated.
    pub line_numbers: Vec<u32>,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    links: BTreeMap<String, BTreeMap<String, Vec<u32>>>,
}

/// Persisted reverse link index: `target -> source -> line numbers`.
///
/// BTreeMaps keep the serialized form deterministic, so rebuilding over an
/// unchanged store produces a byte-identical file.
pub struct BacklinksIndex {
    index_path: PathBuf,
    links: BTreeMap<String, BTreeMap<String, Vec<u32>>>,
    loaded: bool,
}

impl BacklinksIndex {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self { index_path: index_path.into(), links: BTreeMap::new(), loaded: false }
    }

    /// Load the index file on first use. A missing file starts empty; a
    /// corrupt one is logged and replaced rather than failing the store.
    fn ensure_loaded(&mut self) -> Result<(), BacklinkError> {
        if self.loaded {
            return Ok(());
        }
        if self.index_path.exists() {
            let raw = fs::read_to_string(&self.index_path).map_err(|source| {
                BacklinkError::Io { path: self.index_path.clone(), source }
            })?;
            match serde_json::from_str::<IndexFile>(&raw) {
                Ok(file) => self.links = file.links,
                Err(err) => {
                    warn!(
                        path = %self.index_path.display(),
                        %err,
                        "backlink index unreadable, starting fresh"
                    );
                    self.links = BTreeMap::new();
                }
            }
        }
        self.loaded = true;
        Ok(())
    }

    fn save(&self) -> Result<(), BacklinkError> {
        let file = IndexFile { version: INDEX_VERSION, links: self.links.clone() };
        let json = serde_json::to_string_pretty(&file)?;
        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| BacklinkError::Io { path: parent.to_path_buf(), source })?;
        }
        fs::write(&self.index_path, json)
            .map_err(|source| BacklinkError::Io { path: self.index_path.clone(), source })
    }

    /// Replace all outgoing links of `note` with those found in its body.
    pub fn update_note_links(&mut self, note: &Note) -> Result<(), BacklinkError> {
        self.ensure_loaded()?;
        self.remove_source(&note.path);
        for link in extract_links(&note.content) {
            let lines = self
                .links
                .entry(link.target_path)
                .or_default()
                .entry(note.path.clone())
                .or_default();
            if !lines.contains(&link.line_number) {
                lines.push(link.line_number);
                lines.sort_unstable();
            }
        }
        self.save()
    }

    /// Forget a note as a link source (its inbound entries are untouched).
    pub fn remove_note(&mut self, path: &str) -> Result<(), BacklinkError> {
        self.ensure_loaded()?;
        self.remove_source(path);
        self.save()
    }

    /// All notes linking to `target`, sorted by source path.
    pub fn get_backlinks(&mut self, target: &str) -> Result<Vec<Backlink>, BacklinkError> {
        self.ensure_loaded()?;
        Ok(self
            .links
            .get(target)
            .map(|sources| {
                sources
                    .iter()
                    .map(|(source, lines)| Backlink {
                        source_path: source.clone(),
                        line_numbers: lines.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Re-key all inbound entries of `old_target` under `new_target`.
    ///
    /// Only moves index entries; the link text inside source notes is the
    /// caller's business.
    pub fn rename_target(&mut self, old_target: &str, new_target: &str) -> Result<(), BacklinkError> {
        self.ensure_loaded()?;
        if let Some(sources) = self.links.remove(old_target) {
            let merged = self.links.entry(new_target.to_string()).or_default();
            for (source, mut lines) in sources {
                let entry = merged.entry(source).or_default();
                entry.append(&mut lines);
                entry.sort_unstable();
                entry.dedup();
            }
        }
        self.save()
    }

    /// Drop every entry and persist the empty index.
    pub fn clear(&mut self) -> Result<(), BacklinkError> {
        self.ensure_loaded()?;
        self.links.clear();
        self.save()
    }

    /// Rebuild from scratch over the given notes. Returns how many notes
    /// were scanned.
    pub fn rebuild(&mut self, notes: &[Note]) -> Result<usize, BacklinkError> {
        self.links.clear();
        self.loaded = true;
        for note in notes {
            for link in extract_links(&note.content) {
                let lines = self
                    .links
                    .entry(link.target_path)
                    .or_default()
                    .entry(note.path.clone())
                    .or_default();
                if !lines.contains(&link.line_number) {
                    lines.push(link.line_number);
                    lines.sort_unstable();
                }
            }
        }
        self.save()?;
        Ok(notes.len())
    }

    fn remove_source(&mut self, path: &str) {
        self.links.retain(|_, sources| {
            sources.remove(path);
            !sources.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn index(dir: &tempfile::TempDir) -> BacklinksIndex {
        BacklinksIndex::new(dir.path().join("backlinks.json"))
    }

    fn note(path: &str, content: &str) -> Note {
        let mut n = Note::new(path, "t", "", vec![]).unwrap();
        n.content = content.to_string();
        n
    }

    #[test]
    fn update_and_query_backlinks() {
        let dir = tempdir().unwrap();
        let mut idx = index(&dir);
        idx.update_note_links(&note("a", "[[b]]\nand [[b]] again\n[[c]]")).unwrap();
        let back = idx.get_backlinks("b").unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].source_path, "a");
        assert_eq!(back[0].line_numbers, vec![1, 2]);
        assert!(idx.get_backlinks("missing").unwrap().is_empty());
    }

    #[test]
    fn duplicate_links_on_same_line_recorded_once() {
        let dir = tempdir().unwrap();
        let mut idx = index(&dir);
        idx.update_note_links(&note("a", "[[b]] [[b]]")).unwrap();
        assert_eq!(idx.get_backlinks("b").unwrap()[0].line_numbers, vec![1]);
    }

    #[test]
    fn update_replaces_previous_outgoing_links() {
        let dir = tempdir().unwrap();
        let mut idx = index(&dir);
        idx.update_note_links(&note("a", "[[b]]")).unwrap();
        idx.update_note_links(&note("a", "[[c]]")).unwrap();
        assert!(idx.get_backlinks("b").unwrap().is_empty());
        assert_eq!(idx.get_backlinks("c").unwrap()[0].source_path, "a");
    }

    #[test]
    fn remove_note_drops_it_as_source_only() {
        let dir = tempdir().unwrap();
        let mut idx = index(&dir);
        idx.update_note_links(&note("a", "[[target]]")).unwrap();
        idx.update_note_links(&note("b", "[[a]]")).unwrap();
        idx.remove_note("a").unwrap();
        assert!(idx.get_backlinks("target").unwrap().is_empty());
        // a still has inbound links from b
        assert_eq!(idx.get_backlinks("a").unwrap()[0].source_path, "b");
    }

    #[test]
    fn rename_target_moves_inbound_entries() {
        let dir = tempdir().unwrap();
        let mut idx = index(&dir);
        idx.update_note_links(&note("a", "[[old]]")).unwrap();
        idx.update_note_links(&note("b", "[[old]]\n[[old]]")).unwrap();
        idx.rename_target("old", "new").unwrap();
        assert!(idx.get_backlinks("old").unwrap().is_empty());
        let back = idx.get_backlinks("new").unwrap();
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn index_persists_across_instances() {
        let dir = tempdir().unwrap();
        {
            let mut idx = index(&dir);
            idx.update_note_links(&note("a", "[[b]]")).unwrap();
        }
        let mut idx = index(&dir);
        assert_eq!(idx.get_backlinks("b").unwrap()[0].source_path, "a");
    }

    #[test]
    fn corrupt_index_file_starts_fresh() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("backlinks.json"), "{not json").unwrap();
        let mut idx = index(&dir);
        assert!(idx.get_backlinks("anything").unwrap().is_empty());
    }

    #[test]
    fn rebuild_is_deterministic() {
        let dir = tempdir().unwrap();
        let notes = vec![note("z", "[[a]]"), note("a", "[[z]]\n[[middle]]")];
        let mut idx = index(&dir);
        idx.rebuild(&notes).unwrap();
        let first = fs::read_to_string(dir.path().join("backlinks.json")).unwrap();
        idx.rebuild(&notes).unwrap();
        let second = fs::read_to_string(dir.path().join("backlinks.json")).unwrap();
        assert_eq!(first, second);
    }
}
