use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use notarium_core::{NoteService, RwFileLock, StoreConfig};
use tempfile::tempdir;

#[test]
fn concurrent_writers_serialize() {
    let tmp = tempdir().unwrap();
    let svc = Arc::new(NoteService::open(StoreConfig::at_root(tmp.path())).unwrap());

    let mut handles = Vec::new();
    for i in 0..4 {
        let svc = Arc::clone(&svc);
        handles.push(thread::spawn(move || {
            svc.create_note(&format!("note-{i}"), &format!("Note {i}"), "", vec![], None)
                .unwrap();
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let paths = svc.list_notes().unwrap();
    assert_eq!(paths.len(), 4);
    for i in 0..4 {
        assert_eq!(svc.get_history(&format!("note-{i}"), 5).unwrap().len(), 1);
    }
}

#[test]
fn readers_run_alongside_each_other() {
    let tmp = tempdir().unwrap();
    let svc = Arc::new(NoteService::open(StoreConfig::at_root(tmp.path())).unwrap());
    svc.create_note("shared", "Shared", "body", vec![], None).unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let svc = Arc::clone(&svc);
        handles.push(thread::spawn(move || {
            for _ in 0..10 {
                assert_eq!(svc.get_note("shared").unwrap().unwrap().title, "Shared");
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
}

const CHILD_ENV: &str = "NOTARIUM_LOCK_WORKER_DIR";
const WORKER_ROUNDS: usize = 5;
const WORKER_COUNT: usize = 3;

fn append_event(path: &Path, event: &str) {
    // O_APPEND keeps each small write intact across processes.
    let mut file = OpenOptions::new().create(true).append(true).open(path).unwrap();
    writeln!(file, "{event}").unwrap();
}

/// Worker body for the cross-process test below. Does nothing unless
/// re-executed with the coordination directory in the environment.
#[test]
fn cross_process_writer_worker() {
    let Ok(dir) = std::env::var(CHILD_ENV) else {
        return;
    };
    let dir = Path::new(&dir);
    let lock = RwFileLock::new(dir.join("store.lock"));
    let events = dir.join("events.log");
    for _ in 0..WORKER_ROUNDS {
        let _guard = lock.write().unwrap();
        append_event(&events, "start");
        thread::sleep(Duration::from_millis(5));
        append_event(&events, "end");
    }
}

#[test]
fn writers_exclude_each_other_across_processes() {
    let tmp = tempdir().unwrap();
    let exe = std::env::current_exe().unwrap();

    let mut children = Vec::new();
    for _ in 0..WORKER_COUNT {
        children.push(
            Command::new(&exe)
                .arg("cross_process_writer_worker")
                .arg("--exact")
                .env(CHILD_ENV, tmp.path())
                .spawn()
                .unwrap(),
        );
    }
    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    // Exclusive holds may never nest: every start is followed by its own
    // end before any other process gets to start.
    let log = std::fs::read_to_string(tmp.path().join("events.log")).unwrap();
    let mut holders = 0i32;
    let mut lines = 0;
    for line in log.lines() {
        match line {
            "start" => {
                holders += 1;
                assert_eq!(holders, 1, "overlapping writer windows:\n{log}");
            }
            "end" => holders -= 1,
            other => panic!("unexpected event: {other}"),
        }
        lines += 1;
    }
    assert_eq!(holders, 0);
    assert_eq!(lines, WORKER_COUNT * WORKER_ROUNDS * 2);
}
