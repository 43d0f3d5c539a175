//! Filesystem-backed primary storage.
//!
//! One markdown file per note under the storage root, mirroring the note
//! path hierarchy 1:1 (`projects/rust` lives at `<root>/projects/rust.md`).

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::note::Note;

/// Errors raised by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("path cannot be empty")]
    EmptyPath,

    /// The path resolves outside the storage root.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A folder with child notes already occupies the path.
    #[error("a folder named '{0}' already exists; use '{0}/index' for a folder note")]
    FolderConflict(String),

    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Listing of a single folder level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderContents {
    /// Notes directly inside the folder (the `index` note excluded).
    pub notes: Vec<String>,
    /// Immediate child folder paths, deduplicated.
    pub subfolders: Vec<String>,
    /// Whether the folder has an `index` landing-page note.
    pub has_index: bool,
}

/// Stores notes as markdown files on disk.
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    /// Open storage rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|source| StorageError::Io { path: root.clone(), source })?;
        Ok(Self { root })
    }

    /// Sanitize a note path against directory traversal.
    ///
    /// Runs independently of `Note` validation: storage must defend against
    /// paths arriving from any caller, validated or not.
    fn sanitize(&self, path: &str) -> Result<String, StorageError> {
        let trimmed = path.trim();
        let clean = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if clean.is_empty() {
            return Err(StorageError::EmptyPath);
        }
        // Only plain segments allowed; rejects `..`, `.`, a second leading
        // slash, and any combination of segments that would escape the root.
        let all_normal = Path::new(clean)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !all_normal {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(clean.to_string())
    }

    fn file_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let clean = self.sanitize(path)?;
        Ok(self.root.join(format!("{clean}.md")))
    }

    /// Verify the overlap invariant for a prospective note path: a note may
    /// not occupy a path that is already a folder with child notes, unless
    /// its last segment is the literal name `index`.
    pub fn check_overlap(&self, path: &str) -> Result<(), StorageError> {
        let clean = self.sanitize(path)?;
        let last_segment = clean.rsplit('/').next().unwrap_or(&clean);
        if last_segment != "index" && self.folder_has_notes(&clean) {
            return Err(StorageError::FolderConflict(clean));
        }
        Ok(())
    }

    /// Write a note to disk, enforcing the overlap invariant.
    pub fn save(&self, note: &Note) -> Result<(), StorageError> {
        let clean = self.sanitize(&note.path)?;
        self.check_overlap(&clean)?;
        let file = self.root.join(format!("{clean}.md"));
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| StorageError::Io { path: parent.to_path_buf(), source })?;
        }
        fs::write(&file, note.to_markdown())
            .map_err(|source| StorageError::Io { path: file, source })
    }

    /// Load a note, or `None` if no file exists at the path.
    pub fn load(&self, path: &str) -> Result<Option<Note>, StorageError> {
        let file = self.file_path(path)?;
        if !file.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&file)
            .map_err(|source| StorageError::Io { path: file, source })?;
        Ok(Some(Note::from_markdown(self.sanitize(path)?.as_str(), &raw)))
    }

    /// Delete a note file. Returns whether a file was removed.
    pub fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let file = self.file_path(path)?;
        if !file.exists() {
            return Ok(false);
        }
        fs::remove_file(&file).map_err(|source| StorageError::Io { path: file, source })?;
        Ok(true)
    }

    /// All note paths under the root, sorted.
    pub fn list_all(&self) -> Result<Vec<String>, StorageError> {
        let mut paths = Vec::new();
        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| !is_hidden(e));
        for entry in walker {
            let entry = entry.map_err(|e| StorageError::Io {
                path: self.root.clone(),
                source: io::Error::other(e),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let p = entry.path();
            if p.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let rel = p.strip_prefix(&self.root).unwrap_or(p).with_extension("");
            let mut segments: Vec<String> = Vec::new();
            for c in rel.components() {
                segments.push(c.as_os_str().to_string_lossy().into_owned());
            }
            paths.push(segments.join("/"));
        }
        paths.sort();
        Ok(paths)
    }

    /// Notes and subfolders directly inside `folder` (`""` = top level).
    pub fn list_by_prefix(&self, folder: &str) -> Result<FolderContents, StorageError> {
        let folder = folder.trim().trim_matches('/');
        let paths = self.list_all()?;

        let mut contents = FolderContents::default();
        let mut subfolders: Vec<String> = Vec::new();

        if folder.is_empty() {
            for p in &paths {
                match p.split_once('/') {
                    None if p == "index" => contents.has_index = true,
                    None => contents.notes.push(p.clone()),
                    Some((first, _)) => subfolders.push(first.to_string()),
                }
            }
        } else {
            let prefix = format!("{folder}/");
            for p in &paths {
                if let Some(rest) = p.strip_prefix(&prefix) {
                    match rest.split_once('/') {
                        None if rest == "index" => contents.has_index = true,
                        None => contents.notes.push(p.clone()),
                        Some((first, _)) => subfolders.push(format!("{prefix}{first}")),
                    }
                }
            }
            // A note at exactly the folder path surfaces in the listing too,
            // unless it is itself an index note.
            if paths.iter().any(|p| p == folder)
                && folder.rsplit('/').next() != Some("index")
            {
                contents.notes.push(folder.to_string());
            }
        }

        contents.notes.sort();
        subfolders.sort();
        subfolders.dedup();
        contents.subfolders = subfolders;
        Ok(contents)
    }

    /// Whether a directory named `path` exists and contains note files.
    fn folder_has_notes(&self, path: &str) -> bool {
        let dir = self.root.join(path);
        if !dir.is_dir() {
            return false;
        }
        WalkDir::new(&dir)
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
            .filter_map(Result::ok)
            .any(|e| {
                e.file_type().is_file()
                    && e.path().extension().and_then(|x| x.to_str()) == Some("md")
            })
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_name().to_str().is_some_and(|s| s.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn storage(dir: &tempfile::TempDir) -> FilesystemStorage {
        FilesystemStorage::new(dir.path().join("notes")).unwrap()
    }

    fn note(path: &str) -> Note {
        Note::new(path, "Title", "body", vec![]).unwrap()
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let s = storage(&dir);
        s.save(&note("folder/my-note")).unwrap();
        let loaded = s.load("folder/my-note").unwrap().unwrap();
        assert_eq!(loaded.path, "folder/my-note");
        assert_eq!(loaded.title, "Title");
        assert_eq!(loaded.content, "body");
    }

    #[test]
    fn load_absent_is_none() {
        let dir = tempdir().unwrap();
        assert!(storage(&dir).load("missing").unwrap().is_none());
    }

    #[test]
    fn delete_reports_whether_removed() {
        let dir = tempdir().unwrap();
        let s = storage(&dir);
        s.save(&note("a")).unwrap();
        assert!(s.delete("a").unwrap());
        assert!(!s.delete("a").unwrap());
    }

    #[test]
    fn traversal_rejected() {
        let dir = tempdir().unwrap();
        let s = storage(&dir);
        for bad in ["../outside", "foo/../../outside", "foo/../../../etc/passwd"] {
            assert!(matches!(s.load(bad), Err(StorageError::InvalidPath(_))), "{bad}");
        }
        assert!(matches!(s.load(""), Err(StorageError::EmptyPath)));
        assert!(matches!(s.load("   "), Err(StorageError::EmptyPath)));
        assert!(matches!(s.load("/"), Err(StorageError::EmptyPath)));
    }

    #[test]
    fn leading_slash_and_whitespace_stripped() {
        let dir = tempdir().unwrap();
        let s = storage(&dir);
        s.save(&note("etc/passwd")).unwrap();
        assert!(s.load("/etc/passwd").unwrap().is_some());
        assert!(s.load("  etc/passwd  ").unwrap().is_some());
    }

    #[test]
    fn overlap_rejected_except_index() {
        let dir = tempdir().unwrap();
        let s = storage(&dir);
        s.save(&note("projects/x")).unwrap();
        let mut folder_note = note("projects/x");
        folder_note.path = "projects".to_string();
        assert!(matches!(s.save(&folder_note), Err(StorageError::FolderConflict(_))));
        s.save(&note("projects/index")).unwrap();
    }

    #[test]
    fn check_overlap_without_writing() {
        let dir = tempdir().unwrap();
        let s = storage(&dir);
        s.save(&note("projects/x")).unwrap();
        assert!(matches!(s.check_overlap("projects"), Err(StorageError::FolderConflict(_))));
        assert!(s.check_overlap("projects/index").is_ok());
        assert!(s.check_overlap("somewhere/new").is_ok());
    }

    #[test]
    fn list_all_sorted_relative() {
        let dir = tempdir().unwrap();
        let s = storage(&dir);
        s.save(&note("b")).unwrap();
        s.save(&note("a/deep/c")).unwrap();
        s.save(&note("a/x")).unwrap();
        assert_eq!(s.list_all().unwrap(), vec!["a/deep/c", "a/x", "b"]);
    }

    #[test]
    fn list_by_prefix_top_level() {
        let dir = tempdir().unwrap();
        let s = storage(&dir);
        s.save(&note("top")).unwrap();
        s.save(&note("folder/nested")).unwrap();
        s.save(&note("folder/deep/more")).unwrap();
        let listing = s.list_by_prefix("").unwrap();
        assert_eq!(listing.notes, vec!["top"]);
        assert_eq!(listing.subfolders, vec!["folder"]);
        assert!(!listing.has_index);
    }

    #[test]
    fn list_by_prefix_folder_with_index() {
        let dir = tempdir().unwrap();
        let s = storage(&dir);
        s.save(&note("projects/index")).unwrap();
        s.save(&note("projects/alpha")).unwrap();
        s.save(&note("projects/sub/beta")).unwrap();
        let listing = s.list_by_prefix("projects").unwrap();
        assert_eq!(listing.notes, vec!["projects/alpha"]);
        assert_eq!(listing.subfolders, vec!["projects/sub"]);
        assert!(listing.has_index);
    }

    #[test]
    fn list_by_prefix_tolerates_slashes() {
        let dir = tempdir().unwrap();
        let s = storage(&dir);
        s.save(&note("folder/n")).unwrap();
        let expected = s.list_by_prefix("folder").unwrap();
        for variant in ["/folder", "folder/", "/folder/"] {
            assert_eq!(s.list_by_prefix(variant).unwrap(), expected);
        }
    }

    #[test]
    fn note_at_folder_path_included() {
        let dir = tempdir().unwrap();
        let s = storage(&dir);
        s.save(&note("projects")).unwrap();
        s.save(&note("projects/alpha")).unwrap();
        let listing = s.list_by_prefix("projects").unwrap();
        assert_eq!(listing.notes, vec!["projects", "projects/alpha"]);
    }
}
