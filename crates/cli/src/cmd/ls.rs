use std::path::Path;

use crate::cmd::{fail, open_store};
use crate::LsArgs;

pub fn run(root: Option<&Path>, args: LsArgs) {
    let service = open_store(root);
    match args.folder {
        None => match service.list_notes() {
            Ok(paths) => {
                for path in paths {
                    println!("{}", path);
                }
            }
            Err(e) => fail("listing notes", e),
        },
        Some(folder) => match service.list_notes_in_folder(&folder) {
            Ok(contents) => {
                for sub in contents.subfolders {
                    println!("{}/", sub);
                }
                if contents.has_index {
                    let prefix = if folder.trim_matches('/').is_empty() {
                        String::new()
                    } else {
                        format!("{}/", folder.trim_matches('/'))
                    };
                    println!("{}index", prefix);
                }
                for note in contents.notes {
                    println!("{}", note);
                }
            }
            Err(e) => fail("listing folder", e),
        },
    }
}
