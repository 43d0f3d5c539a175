use std::path::Path;

use crate::cmd::{fail, open_store};

pub fn run(root: Option<&Path>) {
    let service = open_store(root);
    match service.rebuild_indexes() {
        Ok(result) => {
            println!("Rebuilt indexes over {} note(s).", result.notes_processed);
        }
        Err(e) => fail("rebuilding indexes", e),
    }
}
