use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tantivy::collector::TopDocs;
use tantivy::directory::error::OpenDirectoryError;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value, INDEXED, STORED, STRING, TEXT};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use thiserror::Error;

use crate::note::Note;

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Errors raised by the search layer.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("failed to open search index directory: {0}")]
    OpenDirectory(#[from] OpenDirectoryError),

    #[error("invalid search query: {0}")]
    QueryParse(#[from] tantivy::query::QueryParserError),

    #[error("search index directory I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A previous panic left the index writer unusable.
    #[error("search index writer poisoned")]
    WriterPoisoned,
}

/// A single search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub path: String,
    pub title: String,
    pub score: f32,
}

struct Fields {
    path: Field,
    title: Field,
    content: Field,
    tags: Field,
    created_at: Field,
    updated_at: Field,
}

/// Full-text index over the note store.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: Fields,
}

impl SearchIndex {
    /// Open (or create) the index under `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SearchError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(|source| SearchError::Io { path: dir.to_path_buf(), source })?;

        let mut builder = Schema::builder();
        let fields = Fields {
            path: builder.add_text_field("path", STRING | STORED),
            title: builder.add_text_field("title", TEXT | STORED),
            content: builder.add_text_field("content", TEXT),
            tags: builder.add_text_field("tags", TEXT),
            created_at: builder.add_date_field("created_at", INDEXED),
            updated_at: builder.add_date_field("updated_at", INDEXED),
        };
        let schema = builder.build();

        let index = Index::open_or_create(MmapDirectory::open(dir)?, schema)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;
        let writer = Mutex::new(index.writer(WRITER_HEAP_BYTES)?);
        Ok(Self { index, reader, writer, fields })
    }

    /// Index a note, replacing any previous document at its path.
    pub fn index_note(&self, note: &Note) -> Result<(), SearchError> {
        let mut writer = self.writer()?;
        writer.delete_term(Term::from_field_text(self.fields.path, &note.path));
        writer.add_document(self.to_document(note))?;
        writer.commit()?;
        Ok(())
    }

    /// Drop a note from the index.
    pub fn remove_note(&self, path: &str) -> Result<(), SearchError> {
        let mut writer = self.writer()?;
        writer.delete_term(Term::from_field_text(self.fields.path, path));
        writer.commit()?;
        Ok(())
    }

    /// Delete every document from the index.
    pub fn clear(&self) -> Result<(), SearchError> {
        let mut writer = self.writer()?;
        writer.delete_all_documents()?;
        writer.commit()?;
        Ok(())
    }

    /// Rebuild from scratch over the given notes. Returns how many notes
    /// were indexed.
    pub fn rebuild(&self, notes: &[Note]) -> Result<usize, SearchError> {
        let mut writer = self.writer()?;
        writer.delete_all_documents()?;
        for note in notes {
            writer.add_document(self.to_document(note))?;
        }
        writer.commit()?;
        Ok(notes.len())
    }

    /// Query the index, returning the best `limit` hits.
    ///
    /// Title matches are boosted over content, tags sit in between.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.reader.reload()?;
        let searcher = self.reader.searcher();

        let mut parser = QueryParser::for_index(
            &self.index,
            vec![self.fields.title, self.fields.content, self.fields.tags],
        );
        parser.set_field_boost(self.fields.title, 2.0);
        parser.set_field_boost(self.fields.tags, 1.5);
        let parsed = parser.parse_query(query)?;

        let top = searcher.search(&parsed, &TopDocs::with_limit(limit))?;
        let mut hits = Vec::with_capacity(top.len());
        for (score, addr) in top {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let text = |field| {
                doc.get_first(field)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            hits.push(SearchHit {
                path: text(self.fields.path),
                title: text(self.fields.title),
                score,
            });
        }
        Ok(hits)
    }

    fn to_document(&self, note: &Note) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        doc.add_text(self.fields.path, &note.path);
        doc.add_text(self.fields.title, &note.title);
        doc.add_text(self.fields.content, &note.content);
        doc.add_text(self.fields.tags, note.tags.join(" "));
        doc.add_date(
            self.fields.created_at,
            tantivy::DateTime::from_timestamp_secs(note.created_at.timestamp()),
        );
        doc.add_date(
            self.fields.updated_at,
            tantivy::DateTime::from_timestamp_secs(note.updated_at.timestamp()),
        );
        doc
    }

    fn writer(&self) -> Result<std::sync::MutexGuard<'_, IndexWriter>, SearchError> {
        self.writer.lock().map_err(|_| SearchError::WriterPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn index(dir: &tempfile::TempDir) -> SearchIndex {
        SearchIndex::open(dir.path().join("search")).unwrap()
    }

    fn note(path: &str, title: &str, content: &str, tags: &[&str]) -> Note {
        let mut n = Note::new(path, title, "", tags.iter().map(|t| t.to_string()).collect())
            .unwrap();
        n.content = content.to_string();
        n
    }

    #[test]
    fn indexed_note_is_findable() {
        let dir = tempdir().unwrap();
        let idx = index(&dir);
        idx.index_note(&note("a", "Rust ownership", "borrow checker", &[])).unwrap();
        let hits = idx.search("ownership", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "a");
        assert_eq!(hits[0].title, "Rust ownership");
    }

    #[test]
    fn reindex_replaces_previous_document() {
        let dir = tempdir().unwrap();
        let idx = index(&dir);
        idx.index_note(&note("a", "first title", "", &[])).unwrap();
        idx.index_note(&note("a", "second title", "", &[])).unwrap();
        assert!(idx.search("first", 10).unwrap().is_empty());
        let hits = idx.search("second", 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn removed_note_no_longer_matches() {
        let dir = tempdir().unwrap();
        let idx = index(&dir);
        idx.index_note(&note("a", "findme", "", &[])).unwrap();
        idx.remove_note("a").unwrap();
        assert!(idx.search("findme", 10).unwrap().is_empty());
    }

    #[test]
    fn tags_are_searchable() {
        let dir = tempdir().unwrap();
        let idx = index(&dir);
        idx.index_note(&note("a", "plain", "nothing", &["gardening"])).unwrap();
        assert_eq!(idx.search("gardening", 10).unwrap().len(), 1);
    }

    #[test]
    fn title_match_outranks_content_match() {
        let dir = tempdir().unwrap();
        let idx = index(&dir);
        idx.index_note(&note("in-title", "keyword here", "other text", &[])).unwrap();
        idx.index_note(&note("in-body", "other title", "keyword here", &[])).unwrap();
        let hits = idx.search("keyword", 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].path, "in-title");
    }

    #[test]
    fn rebuild_replaces_everything() {
        let dir = tempdir().unwrap();
        let idx = index(&dir);
        idx.index_note(&note("stale", "old", "", &[])).unwrap();
        let count = idx.rebuild(&[note("fresh", "new", "", &[])]).unwrap();
        assert_eq!(count, 1);
        assert!(idx.search("old", 10).unwrap().is_empty());
        assert_eq!(idx.search("new", 10).unwrap().len(), 1);
    }
}
