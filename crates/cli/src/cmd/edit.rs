use std::path::Path;

use notarium_core::NoteUpdate;

use crate::cmd::{fail, open_store};
use crate::EditArgs;

pub fn run(root: Option<&Path>, author: Option<&str>, args: EditArgs) {
    let service = open_store(root);
    let update = NoteUpdate {
        title: args.title,
        content: args.content,
        tags: if args.tags.is_empty() { None } else { Some(args.tags) },
        add_tags: args.add_tags,
        remove_tags: args.remove_tags,
        author: author.map(str::to_string),
        ..NoteUpdate::default()
    };
    match service.update_note(&args.path, update) {
        Ok(result) => println!("Updated {}", result.note.path),
        Err(e) => fail("updating note", e),
    }
}
