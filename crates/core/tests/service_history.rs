use notarium_core::{NoteService, NoteUpdate, StoreConfig};
use tempfile::tempdir;

fn open(tmp: &tempfile::TempDir) -> NoteService {
    NoteService::open(StoreConfig::at_root(tmp.path())).unwrap()
}

#[test]
fn every_mutation_leaves_a_journal_entry() {
    let tmp = tempdir().unwrap();
    let svc = open(&tmp);
    svc.create_note("a", "A", "v1", vec![], None).unwrap();
    svc.update_note("a", NoteUpdate { content: Some("v2".into()), ..NoteUpdate::default() })
        .unwrap();

    let history = svc.get_history("a", 10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].message, "Update note: a");
    assert_eq!(history[1].message, "Create note: a");
    assert_eq!(history[0].author, "Notes System");
}

#[test]
fn author_flows_into_the_journal() {
    let tmp = tempdir().unwrap();
    let svc = open(&tmp);
    svc.create_note("a", "A", "", vec![], Some("alice")).unwrap();
    assert_eq!(svc.get_history("a", 1).unwrap()[0].author, "alice");
}

#[test]
fn get_version_returns_old_content() {
    let tmp = tempdir().unwrap();
    let svc = open(&tmp);
    svc.create_note("a", "A", "first body", vec![], None).unwrap();
    svc.update_note("a", NoteUpdate { content: Some("second body".into()), ..NoteUpdate::default() })
        .unwrap();

    let history = svc.get_history("a", 10).unwrap();
    let oldest = &history[history.len() - 1];
    let old = svc.get_version("a", &oldest.commit_id).unwrap().unwrap();
    assert_eq!(old.content, "first body");

    // An unknown version is a plain absence, not an error.
    assert!(svc.get_version("a", "0000000").unwrap().is_none());
}

#[test]
fn diff_between_versions() {
    let tmp = tempdir().unwrap();
    let svc = open(&tmp);
    svc.create_note("a", "A", "one\ntwo\n", vec![], None).unwrap();
    svc.update_note("a", NoteUpdate { content: Some("one\nthree\n".into()), ..NoteUpdate::default() })
        .unwrap();

    let history = svc.get_history("a", 10).unwrap();
    let diff = svc
        .diff_versions("a", &history[1].commit_id, &history[0].commit_id)
        .unwrap();
    assert!(diff.additions >= 1);
    assert!(diff.deletions >= 1);
    assert!(diff.diff_text.contains("+three"));
}

#[test]
fn restore_adds_history_instead_of_rewriting_it() {
    let tmp = tempdir().unwrap();
    let svc = open(&tmp);
    svc.create_note("a", "A", "v1", vec!["old-tag".into()], None).unwrap();
    svc.update_note("a", NoteUpdate { content: Some("v2".into()), ..NoteUpdate::default() })
        .unwrap();

    let history = svc.get_history("a", 10).unwrap();
    let first = &history[history.len() - 1];
    let restored = svc.restore_version("a", &first.commit_id, None).unwrap();
    assert_eq!(restored.content, "v1");
    assert_eq!(restored.tags, vec!["old-tag"]);

    let history = svc.get_history("a", 10).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].message, "Update note: a");
    assert_eq!(svc.get_note("a").unwrap().unwrap().content, "v1");
}

#[test]
fn history_survives_a_move() {
    let tmp = tempdir().unwrap();
    let svc = open(&tmp);
    svc.create_note("a", "A", "v1", vec![], None).unwrap();
    svc.update_note("a", NoteUpdate { new_path: Some("b".into()), ..NoteUpdate::default() })
        .unwrap();

    let history = svc.get_history("b", 10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].message, "Move note: b");
    assert_eq!(history[1].message, "Create note: a");
}
