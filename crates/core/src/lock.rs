//! Reentrant read/write lock over an advisory OS file lock.
//!
//! One lock file guards the whole store. Shared (read) and exclusive (write)
//! modes map directly onto `flock(2)`, so the same guarantee holds across
//! separate processes, not just across threads. Within a process, each thread
//! tracks its own `{mode, depth}` entry; only the outermost acquisition in a
//! thread touches the OS lock.
//!
//! `flock` state belongs to the open file description, so every outermost
//! acquisition opens a fresh descriptor. A single shared descriptor would let
//! one thread silently convert another thread's lock.
//!
//! Reentrancy rules:
//! - read inside read, write inside write: depth increment, no OS call
//! - read inside write: allowed, write implies read
//! - write inside read: [`LockError::OrderViolation`], never blocks; an
//!   upgrade can deadlock against another shared holder, so it is rejected
//!   outright.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::marker::PhantomData;
use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread::{self, ThreadId};

use thiserror::Error;
use tracing::trace;

/// Errors raised by lock acquisition.
#[derive(Debug, Error)]
pub enum LockError {
    /// Write requested while the same thread already holds read.
    #[error("cannot acquire write lock while holding read lock (would deadlock)")]
    OrderViolation,

    #[error("failed to open or lock {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

struct ThreadState {
    mode: Mode,
    depth: u32,
    /// Open descriptor holding the OS-level lock; dropped on final release.
    file: File,
}

/// Cross-thread, cross-process advisory read/write lock.
pub struct RwFileLock {
    lock_path: PathBuf,
    states: Mutex<HashMap<ThreadId, ThreadState>>,
}

impl RwFileLock {
    /// Create a lock backed by the given lock file (created on demand).
    pub fn new(lock_path: impl Into<PathBuf>) -> Self {
        Self { lock_path: lock_path.into(), states: Mutex::new(HashMap::new()) }
    }

    /// Acquire the shared lock, blocking until available.
    ///
    /// Reentrant: inside an existing read or write hold this only bumps the
    /// depth counter.
    pub fn read(&self) -> Result<ReadGuard<'_>, LockError> {
        let tid = thread::current().id();
        {
            let mut states = self.lock_states();
            if let Some(state) = states.get_mut(&tid) {
                // Write implies read; either way just nest.
                state.depth += 1;
                return Ok(ReadGuard { lock: self, _not_send: PhantomData });
            }
        }
        // Not holding anything: take the OS lock without holding the state
        // map, so other threads can still release while we block.
        let file = self.acquire_os_lock(libc::LOCK_SH)?;
        self.lock_states()
            .insert(tid, ThreadState { mode: Mode::Read, depth: 1, file });
        trace!(path = %self.lock_path.display(), "acquired shared lock");
        Ok(ReadGuard { lock: self, _not_send: PhantomData })
    }

    /// Acquire the exclusive lock, blocking until available.
    ///
    /// Reentrant inside an existing write hold. Fails immediately with
    /// [`LockError::OrderViolation`] if this thread holds a read lock.
    pub fn write(&self) -> Result<WriteGuard<'_>, LockError> {
        let tid = thread::current().id();
        {
            let mut states = self.lock_states();
            match states.get_mut(&tid) {
                Some(state) if state.mode == Mode::Write => {
                    state.depth += 1;
                    return Ok(WriteGuard { lock: self, _not_send: PhantomData });
                }
                Some(_) => return Err(LockError::OrderViolation),
                None => {}
            }
        }
        let file = self.acquire_os_lock(libc::LOCK_EX)?;
        self.lock_states()
            .insert(tid, ThreadState { mode: Mode::Write, depth: 1, file });
        trace!(path = %self.lock_path.display(), "acquired exclusive lock");
        Ok(WriteGuard { lock: self, _not_send: PhantomData })
    }

    fn acquire_os_lock(&self, op: libc::c_int) -> Result<File, LockError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|source| LockError::Io { path: self.lock_path.clone(), source })?;
        flock(&file, op)
            .map_err(|source| LockError::Io { path: self.lock_path.clone(), source })?;
        Ok(file)
    }

    fn release(&self) {
        let tid = thread::current().id();
        let mut states = self.lock_states();
        let done = match states.get_mut(&tid) {
            Some(state) => {
                state.depth -= 1;
                state.depth == 0
            }
            // Guard exists, so the entry must exist.
            None => false,
        };
        if done {
            // Dropping the descriptor releases the flock.
            if let Some(state) = states.remove(&tid) {
                drop(state.file);
            }
            trace!(path = %self.lock_path.display(), "released lock");
        }
    }

    fn lock_states(&self) -> std::sync::MutexGuard<'_, HashMap<ThreadId, ThreadState>> {
        // Entries are plain counters plus a file handle; a panic while the
        // map is held leaves nothing half-written, so recover the guard.
        self.states.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Blocking `flock`, retried on EINTR.
#[cfg(unix)]
fn flock(file: &File, op: libc::c_int) -> io::Result<()> {
    loop {
        let rc = unsafe { libc::flock(file.as_raw_fd(), op) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Scope of a shared lock hold; released on drop.
///
/// Not `Send`: the hold belongs to the acquiring thread's lock state.
#[must_use = "the lock is released when the guard is dropped"]
pub struct ReadGuard<'a> {
    lock: &'a RwFileLock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// Scope of an exclusive lock hold; released on drop.
#[must_use = "the lock is released when the guard is dropped"]
pub struct WriteGuard<'a> {
    lock: &'a RwFileLock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn new_lock(dir: &tempfile::TempDir) -> RwFileLock {
        RwFileLock::new(dir.path().join("test.lock"))
    }

    #[test]
    fn read_is_reentrant() {
        let dir = tempdir().unwrap();
        let lock = new_lock(&dir);
        let _a = lock.read().unwrap();
        let _b = lock.read().unwrap();
    }

    #[test]
    fn write_is_reentrant() {
        let dir = tempdir().unwrap();
        let lock = new_lock(&dir);
        let _a = lock.write().unwrap();
        let _b = lock.write().unwrap();
    }

    #[test]
    fn read_inside_write_allowed() {
        let dir = tempdir().unwrap();
        let lock = new_lock(&dir);
        let _w = lock.write().unwrap();
        let _r = lock.read().unwrap();
    }

    #[test]
    fn write_inside_read_rejected() {
        let dir = tempdir().unwrap();
        let lock = new_lock(&dir);
        let _r = lock.read().unwrap();
        assert!(matches!(lock.write(), Err(LockError::OrderViolation)));
    }

    #[test]
    fn lock_usable_after_release() {
        let dir = tempdir().unwrap();
        let lock = new_lock(&dir);
        drop(lock.read().unwrap());
        let _w = lock.write().unwrap();
    }

    #[test]
    fn writers_exclude_each_other_across_threads() {
        let dir = tempdir().unwrap();
        let lock = Arc::new(new_lock(&dir));
        let counter = Arc::new(Mutex::new(0u32));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = Arc::clone(&lock);
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                let _g = lock.write().unwrap();
                let mut c = counter.lock().unwrap();
                *c += 1;
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*counter.lock().unwrap(), 8);
    }
}
