//! Version journal backed by a git repository in the notes directory.
//!
//! Shells out to the `git` binary rather than linking a libgit2 binding;
//! the store only needs init, add, commit, log, show, and diff.

use std::io;
use std::path::PathBuf;
use std::process::Command;

use chrono::{DateTime, FixedOffset};
use thiserror::Error;
use tracing::debug;

const SHORT_ID_LEN: usize = 7;

/// Errors raised by the journal.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] io::Error),

    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },
}

/// The kind of change a journal entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Move,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "Create",
            Operation::Update => "Update",
            Operation::Move => "Move",
            Operation::Delete => "Delete",
        }
    }
}

/// One recorded version of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteVersion {
    /// Abbreviated commit id.
    pub commit_id: String,
    pub timestamp: DateTime<FixedOffset>,
    pub author: String,
    pub message: String,
}

/// Line-level difference between two versions of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDiff {
    pub path: String,
    pub from_version: String,
    pub to_version: String,
    pub diff_text: String,
    pub additions: usize,
    pub deletions: usize,
}

/// Records every mutation of the note files as a git commit.
pub struct GitJournal {
    repo_dir: PathBuf,
}

impl GitJournal {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self { repo_dir: repo_dir.into() }
    }

    /// Initialize the repository if it is not one yet. Returns whether a new
    /// repository was created.
    pub fn ensure_initialized(&self) -> Result<bool, JournalError> {
        if self.repo_dir.join(".git").exists() {
            return Ok(false);
        }
        self.run(&["init"])?;
        self.run(&["config", "user.name", "Notes System"])?;
        self.run(&["config", "user.email", "notes@localhost"])?;
        debug!(repo = %self.repo_dir.display(), "initialized journal repository");
        Ok(true)
    }

    /// Record a mutation of `path`. Returns the new commit id (full length).
    ///
    /// Deletes and moves stage more than one file, so they stage the whole
    /// tree; plain edits stage only the touched file. Commits allow an empty
    /// tree change so that no-op updates still leave a journal entry.
    pub fn commit(
        &self,
        path: &str,
        operation: Operation,
        author: Option<&str>,
    ) -> Result<String, JournalError> {
        let rel = format!("{path}.md");
        match operation {
            Operation::Move | Operation::Delete => {
                self.run(&["add", "--all", "."])?;
            }
            _ => {
                self.run(&["add", rel.as_str()])?;
            }
        }
        let message = format!("{} note: {}", operation.as_str(), path);
        let mut args = vec!["commit", "-m", message.as_str(), "--allow-empty"];
        let author_arg;
        if let Some(name) = author {
            author_arg = format!("{name} <{name}@notes>");
            args.push("--author");
            args.push(author_arg.as_str());
        }
        self.run(&args)?;
        let head = self.run(&["rev-parse", "HEAD"])?;
        Ok(head.trim().to_string())
    }

    /// Recorded versions of a note, newest first. Follows renames. A note
    /// the journal has never seen yields an empty history.
    pub fn history(&self, path: &str, limit: usize) -> Result<Vec<NoteVersion>, JournalError> {
        let rel = format!("{path}.md");
        let max = format!("--max-count={limit}");
        let output = match self.run(&[
            "log",
            max.as_str(),
            "--format=%H|%aI|%an|%s",
            "--follow",
            "--",
            rel.as_str(),
        ]) {
            Ok(out) => out,
            // No commits yet, or the path never existed.
            Err(JournalError::Git { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut versions = Vec::new();
        for line in output.lines() {
            let mut parts = line.splitn(4, '|');
            let (Some(hash), Some(ts), Some(author), Some(message)) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                continue;
            };
            let Ok(timestamp) = DateTime::parse_from_rfc3339(ts) else {
                continue;
            };
            versions.push(NoteVersion {
                commit_id: short_id(hash),
                timestamp,
                author: author.to_string(),
                message: message.to_string(),
            });
        }
        Ok(versions)
    }

    /// Raw file content of a note at a given version, or `None` if the
    /// version does not exist or the note was absent in it.
    pub fn file_at(&self, path: &str, commit_id: &str) -> Result<Option<String>, JournalError> {
        let spec = format!("{commit_id}:{path}.md");
        match self.run(&["show", spec.as_str()]) {
            Ok(content) => Ok(Some(content)),
            Err(JournalError::Git { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Unified diff of a note between two versions.
    pub fn diff(
        &self,
        path: &str,
        from_version: &str,
        to_version: &str,
    ) -> Result<NoteDiff, JournalError> {
        let rel = format!("{path}.md");
        let diff_text = self
            .run(&["diff", from_version, to_version, "--", rel.as_str()])
            .unwrap_or_default();

        let mut additions = 0;
        let mut deletions = 0;
        for line in diff_text.lines() {
            if line.starts_with('+') && !line.starts_with("+++") {
                additions += 1;
            } else if line.starts_with('-') && !line.starts_with("---") {
                deletions += 1;
            }
        }
        Ok(NoteDiff {
            path: path.to_string(),
            from_version: short_id(from_version),
            to_version: short_id(to_version),
            diff_text,
            additions,
            deletions,
        })
    }

    fn run(&self, args: &[&str]) -> Result<String, JournalError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()?;
        if !output.status.success() {
            return Err(JournalError::Git {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn short_id(hash: &str) -> String {
    hash.chars().take(SHORT_ID_LEN).collect()
}
