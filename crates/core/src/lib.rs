//! notarium-core - a concurrency-safe, multi-index markdown knowledge store.
//!
//! Notes are markdown files addressed by hierarchical path, cross-referenced
//! by `[[wiki links]]`, indexed for full-text search, and versioned in a git
//! journal. All mutations go through [`NoteService`], which keeps primary
//! storage, the search index, the backlink graph, and the journal consistent
//! under a reentrant, cross-process read/write lock.

pub mod config;
pub mod history;
pub mod links;
pub mod lock;
pub mod note;
pub mod search;
pub mod service;
pub mod storage;

pub use config::StoreConfig;
pub use history::{GitJournal, NoteDiff, NoteVersion, Operation};
pub use links::{extract_links, replace_link_target, Backlink, BacklinksIndex, WikiLink};
pub use lock::RwFileLock;
pub use note::{Note, NoteValidationError};
pub use search::{SearchHit, SearchIndex};
pub use service::{
    DeleteResult, NoteService, NoteUpdate, RebuildResult, StoreError, UpdateResult,
};
pub use storage::{FilesystemStorage, FolderContents};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
