//! The note service: one façade tying storage, search, backlinks, and the
//! version journal together under the store-wide lock.
//!
//! Every public operation takes the advisory lock first (shared for reads,
//! exclusive for mutations) and then drives all four subsystems so they stay
//! consistent with each other.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::history::{GitJournal, JournalError, NoteDiff, NoteVersion, Operation};
use crate::links::{replace_link_target, Backlink, BacklinkError, BacklinksIndex};
use crate::lock::{LockError, RwFileLock};
use crate::note::{filter_tags, validate_title, Note, NoteValidationError};
use crate::search::{preprocess_dates, SearchError, SearchHit, SearchIndex};
use crate::storage::{FilesystemStorage, FolderContents, StorageError};
use thiserror::Error;

/// Errors surfaced by [`NoteService`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error(transparent)]
    Validation(#[from] NoteValidationError),

    #[error(transparent)]
    Backlinks(#[from] BacklinkError),

    #[error("note not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("cannot combine a full tag replacement with incremental tag edits")]
    ConflictingTagEdit,

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fields to change in an update. `None` leaves the current value alone.
#[derive(Debug, Clone)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Full replacement of the tag set. Mutually exclusive with the
    /// incremental edits below.
    pub tags: Option<Vec<String>>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
    /// Move the note to this path.
    pub new_path: Option<String>,
    /// When moving: rewrite links in notes that point at the old path.
    pub update_backlinks: bool,
    /// Author recorded in the journal entry.
    pub author: Option<String>,
}

impl Default for NoteUpdate {
    fn default() -> Self {
        Self {
            title: None,
            content: None,
            tags: None,
            add_tags: Vec::new(),
            remove_tags: Vec::new(),
            new_path: None,
            update_backlinks: true,
            author: None,
        }
    }
}

/// Outcome of an update, including backlink side effects of a move.
#[derive(Debug)]
pub struct UpdateResult {
    pub note: Note,
    /// Source notes whose links were rewritten during a move.
    pub backlinks_updated: Vec<String>,
    /// Set when a move left dangling links behind.
    pub backlinks_warning: Option<String>,
}

/// Outcome of a delete.
#[derive(Debug)]
pub struct DeleteResult {
    /// Set when other notes still link to the deleted note.
    pub backlinks_warning: Option<String>,
}

/// Outcome of a full index rebuild.
#[derive(Debug)]
pub struct RebuildResult {
    pub notes_processed: usize,
    pub search_index_rebuilt: bool,
    pub backlinks_index_rebuilt: bool,
}

/// Entry point for all note operations.
pub struct NoteService {
    storage: FilesystemStorage,
    search: SearchIndex,
    backlinks: Mutex<BacklinksIndex>,
    journal: GitJournal,
    lock: RwFileLock,
}

impl NoteService {
    /// Open the store described by `config`, creating directories, indexes,
    /// and the journal repository as needed.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        config.ensure_dirs()?;
        let storage = FilesystemStorage::new(&config.notes_dir)?;
        let search = SearchIndex::open(config.search_dir())?;
        let backlinks = Mutex::new(BacklinksIndex::new(config.backlinks_path()));
        let journal = GitJournal::new(&config.notes_dir);
        journal.ensure_initialized()?;
        let lock = RwFileLock::new(config.lock_path());
        Ok(Self { storage, search, backlinks, journal, lock })
    }

    /// Create a note. Fails with [`StoreError::Conflict`] if the path is
    /// already occupied.
    pub fn create_note(
        &self,
        path: &str,
        title: &str,
        content: &str,
        tags: Vec<String>,
        author: Option<&str>,
    ) -> Result<Note, StoreError> {
        let note = Note::new(path, title, content, tags)?;
        let _guard = self.lock.write()?;

        if self.storage.load(&note.path)?.is_some() {
            return Err(StoreError::Conflict(format!(
                "note already exists: {}",
                note.path
            )));
        }
        self.storage.save(&note).map_err(occupied_folder_to_conflict)?;
        self.search.index_note(&note)?;
        self.backlinks().update_note_links(&note)?;
        self.journal.commit(&note.path, Operation::Create, author)?;
        info!(path = %note.path, "created note");
        Ok(note)
    }

    /// Read a note by path. An absent note is `Ok(None)`, not an error;
    /// only mutating operations treat a missing note as a failure.
    pub fn get_note(&self, path: &str) -> Result<Option<Note>, StoreError> {
        let _guard = self.lock.read()?;
        Ok(self.storage.load(path)?)
    }

    /// Apply an update, optionally moving the note.
    pub fn update_note(&self, path: &str, update: NoteUpdate) -> Result<UpdateResult, StoreError> {
        if update.tags.is_some()
            && !(update.add_tags.is_empty() && update.remove_tags.is_empty())
        {
            return Err(StoreError::ConflictingTagEdit);
        }

        let _guard = self.lock.write()?;
        let mut note = self
            .storage
            .load(path)?
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

        if let Some(title) = &update.title {
            note.title = validate_title(title)?;
        }
        if let Some(content) = &update.content {
            note.content = content.clone();
        }
        if let Some(tags) = update.tags.clone() {
            note.tags = filter_tags(tags);
        } else if !(update.add_tags.is_empty() && update.remove_tags.is_empty()) {
            let mut tags = note.tags.clone();
            tags.extend(filter_tags(update.add_tags.clone()));
            tags.sort_unstable();
            tags.dedup();
            tags.retain(|t| !update.remove_tags.contains(t));
            note.tags = tags;
        }
        note.updated_at = chrono::Utc::now();

        // Moving to the current path is a plain in-place update.
        let destination = match &update.new_path {
            Some(new_path) => {
                let clean = crate::note::validate_path(new_path)?;
                if clean == note.path { None } else { Some(clean) }
            }
            None => None,
        };

        match destination {
            Some(new_path) => self.move_note(note, &new_path, &update),
            None => {
                self.storage.save(&note)?;
                self.search.index_note(&note)?;
                self.backlinks().update_note_links(&note)?;
                self.journal
                    .commit(&note.path, Operation::Update, update.author.as_deref())?;
                info!(path = %note.path, "updated note");
                Ok(UpdateResult {
                    note,
                    backlinks_updated: Vec::new(),
                    backlinks_warning: None,
                })
            }
        }
    }

    /// Relocate a note, keeping all four subsystems and (optionally) the
    /// link text of referring notes consistent.
    fn move_note(
        &self,
        mut note: Note,
        new_path: &str,
        update: &NoteUpdate,
    ) -> Result<UpdateResult, StoreError> {
        let old_path = note.path.clone();
        let new_path = new_path.to_string();
        if self.storage.load(&new_path)?.is_some() {
            return Err(StoreError::Conflict(format!(
                "note already exists: {new_path}"
            )));
        }
        // Conflicts must surface before anything is deleted; finding the
        // folder overlap at the final save would lose the note.
        self.storage
            .check_overlap(&new_path)
            .map_err(occupied_folder_to_conflict)?;

        let inbound = self.backlinks().get_backlinks(&old_path)?;
        let mut backlinks_updated = Vec::new();
        let mut backlinks_warning = None;

        if update.update_backlinks {
            for backlink in &inbound {
                let Some(mut source) = self.storage.load(&backlink.source_path)? else {
                    continue;
                };
                source.content = replace_link_target(&source.content, &old_path, &new_path);
                self.storage.save(&source)?;
                self.search.index_note(&source)?;
                self.backlinks().update_note_links(&source)?;
                backlinks_updated.push(source.path);
            }
        } else if !inbound.is_empty() {
            let sources: Vec<&str> =
                inbound.iter().map(|b| b.source_path.as_str()).collect();
            backlinks_warning = Some(format!(
                "{} note(s) still link to '{old_path}': {}",
                sources.len(),
                sources.join(", ")
            ));
            warn!(path = %old_path, "moved note leaves dangling links behind");
        }

        self.storage.delete(&old_path)?;
        self.search.remove_note(&old_path)?;
        self.backlinks().remove_note(&old_path)?;

        note.path = new_path.clone();
        self.storage.save(&note).map_err(occupied_folder_to_conflict)?;
        self.search.index_note(&note)?;
        self.backlinks().update_note_links(&note)?;
        self.journal
            .commit(&note.path, Operation::Move, update.author.as_deref())?;
        info!(from = %old_path, to = %note.path, "moved note");
        Ok(UpdateResult { note, backlinks_updated, backlinks_warning })
    }

    /// Delete a note everywhere. Warns (does not fail) when other notes
    /// still link to it.
    pub fn delete_note(
        &self,
        path: &str,
        author: Option<&str>,
    ) -> Result<DeleteResult, StoreError> {
        let _guard = self.lock.write()?;
        if self.storage.load(path)?.is_none() {
            return Err(StoreError::NotFound(path.to_string()));
        }

        let inbound = self.backlinks().get_backlinks(path)?;
        let backlinks_warning = if inbound.is_empty() {
            None
        } else {
            let sources: Vec<&str> = inbound.iter().map(|b| b.source_path.as_str()).collect();
            Some(format!(
                "{} note(s) link to '{path}': {}",
                sources.len(),
                sources.join(", ")
            ))
        };

        self.storage.delete(path)?;
        self.search.remove_note(path)?;
        self.backlinks().remove_note(path)?;
        self.journal.commit(path, Operation::Delete, author)?;
        info!(%path, "deleted note");
        Ok(DeleteResult { backlinks_warning })
    }

    /// All note paths, sorted.
    pub fn list_notes(&self) -> Result<Vec<String>, StoreError> {
        let _guard = self.lock.read()?;
        Ok(self.storage.list_all()?)
    }

    /// One folder level of the hierarchy.
    pub fn list_notes_in_folder(&self, folder: &str) -> Result<FolderContents, StoreError> {
        let _guard = self.lock.read()?;
        Ok(self.storage.list_by_prefix(folder)?)
    }

    /// Every tag in the store with its usage count, sorted by tag.
    pub fn list_tags(&self) -> Result<BTreeMap<String, usize>, StoreError> {
        let _guard = self.lock.read()?;
        let mut counts = BTreeMap::new();
        for path in self.storage.list_all()? {
            if let Some(note) = self.storage.load(&path)? {
                for tag in note.tags {
                    *counts.entry(tag).or_insert(0) += 1;
                }
            }
        }
        Ok(counts)
    }

    /// Paths of all notes carrying the given tag, sorted.
    pub fn find_by_tag(&self, tag: &str) -> Result<Vec<String>, StoreError> {
        let _guard = self.lock.read()?;
        let mut paths = Vec::new();
        for path in self.storage.list_all()? {
            if let Some(note) = self.storage.load(&path)? {
                if note.tags.iter().any(|t| t == tag) {
                    paths.push(path);
                }
            }
        }
        Ok(paths)
    }

    /// Notes linking to `path`, with line numbers.
    pub fn get_backlinks(&self, path: &str) -> Result<Vec<Backlink>, StoreError> {
        let _guard = self.lock.read()?;
        Ok(self.backlinks().get_backlinks(path)?)
    }

    /// Full-text search. Date-math tokens in the query (`now-7d`,
    /// `2024-01-15+2w`) are expanded before parsing.
    pub fn search_notes(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, StoreError> {
        let _guard = self.lock.read()?;
        let expanded = preprocess_dates(query);
        Ok(self.search.search(&expanded, limit)?)
    }

    /// Journal entries for a note, newest first.
    pub fn get_history(&self, path: &str, limit: usize) -> Result<Vec<NoteVersion>, StoreError> {
        let _guard = self.lock.read()?;
        Ok(self.journal.history(path, limit)?)
    }

    /// A note as it was at a given version, or `None` if the version does
    /// not exist or the note was absent in it.
    pub fn get_version(&self, path: &str, commit_id: &str) -> Result<Option<Note>, StoreError> {
        let _guard = self.lock.read()?;
        Ok(self
            .journal
            .file_at(path, commit_id)?
            .map(|raw| Note::from_markdown(path, &raw)))
    }

    /// Unified diff of a note between two versions.
    pub fn diff_versions(
        &self,
        path: &str,
        from_version: &str,
        to_version: &str,
    ) -> Result<NoteDiff, StoreError> {
        let _guard = self.lock.read()?;
        Ok(self.journal.diff(path, from_version, to_version)?)
    }

    /// Restore a note to the state recorded at `commit_id`.
    ///
    /// Restoring is itself an update: the journal gains a new entry rather
    /// than rewriting history. The write lock is reentrant, so the nested
    /// update acquires it again without blocking.
    pub fn restore_version(
        &self,
        path: &str,
        commit_id: &str,
        author: Option<&str>,
    ) -> Result<Note, StoreError> {
        let _guard = self.lock.write()?;
        let raw = self
            .journal
            .file_at(path, commit_id)?
            .ok_or_else(|| StoreError::NotFound(format!("{path}@{commit_id}")))?;
        let old = Note::from_markdown(path, &raw);
        let result = self.update_note(
            path,
            NoteUpdate {
                title: Some(old.title),
                content: Some(old.content),
                tags: Some(old.tags),
                author: author.map(str::to_string),
                ..NoteUpdate::default()
            },
        )?;
        info!(%path, version = %commit_id, "restored note version");
        Ok(result.note)
    }

    /// Rebuild the search and backlink indexes from the note files.
    ///
    /// Safe to run at any time; both rebuilds are idempotent over an
    /// unchanged store.
    pub fn rebuild_indexes(&self) -> Result<RebuildResult, StoreError> {
        let _guard = self.lock.write()?;
        let mut notes = Vec::new();
        for path in self.storage.list_all()? {
            if let Some(note) = self.storage.load(&path)? {
                notes.push(note);
            }
        }
        let count = notes.len();
        self.search.rebuild(&notes)?;
        self.backlinks().rebuild(&notes)?;
        info!(notes = count, "rebuilt indexes");
        Ok(RebuildResult {
            notes_processed: count,
            search_index_rebuilt: true,
            backlinks_index_rebuilt: true,
        })
    }

    fn backlinks(&self) -> std::sync::MutexGuard<'_, BacklinksIndex> {
        // The store lock serializes writers already; the mutex only guards
        // the in-memory map against concurrent readers.
        self.backlinks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn occupied_folder_to_conflict(err: StorageError) -> StoreError {
    match err {
        StorageError::FolderConflict(path) => StoreError::Conflict(format!(
            "a folder named '{path}' already exists; use '{path}/index' for a folder note"
        )),
        other => StoreError::Storage(other),
    }
}
