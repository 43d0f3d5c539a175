use std::path::Path;

use notarium_core::NoteUpdate;

use crate::cmd::{fail, open_store};
use crate::MvArgs;

pub fn run(root: Option<&Path>, author: Option<&str>, args: MvArgs) {
    let service = open_store(root);
    let update = NoteUpdate {
        new_path: Some(args.new_path),
        update_backlinks: !args.no_update_links,
        author: author.map(str::to_string),
        ..NoteUpdate::default()
    };
    match service.update_note(&args.path, update) {
        Ok(result) => {
            println!("Moved {} -> {}", args.path, result.note.path);
            for source in &result.backlinks_updated {
                println!("  updated links in {}", source);
            }
            if let Some(warning) = result.backlinks_warning {
                eprintln!("Warning: {}", warning);
            }
        }
        Err(e) => fail("moving note", e),
    }
}
