use std::path::Path;

use crate::cmd::{fail, open_store};
use crate::RestoreArgs;

pub fn run(root: Option<&Path>, author: Option<&str>, args: RestoreArgs) {
    let service = open_store(root);
    match service.restore_version(&args.path, &args.version, author) {
        Ok(note) => println!("Restored {} to {}", note.path, args.version),
        Err(e) => fail("restoring version", e),
    }
}
