use std::path::Path;

use crate::cmd::{fail, open_store};
use crate::RmArgs;

pub fn run(root: Option<&Path>, author: Option<&str>, args: RmArgs) {
    let service = open_store(root);
    match service.delete_note(&args.path, author) {
        Ok(result) => {
            println!("Deleted {}", args.path);
            if let Some(warning) = result.backlinks_warning {
                eprintln!("Warning: {}", warning);
            }
        }
        Err(e) => fail("deleting note", e),
    }
}
