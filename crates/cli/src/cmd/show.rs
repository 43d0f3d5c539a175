use std::path::Path;

use serde::Serialize;

use crate::cmd::{fail, open_store};
use crate::ShowArgs;

/// Note shape for JSON output.
#[derive(Debug, Serialize)]
struct NoteOutput {
    path: String,
    title: String,
    content: String,
    tags: Vec<String>,
    created_at: String,
    updated_at: String,
}

pub fn run(root: Option<&Path>, args: ShowArgs) {
    let service = open_store(root);
    let note = match service.get_note(&args.path) {
        Ok(Some(note)) => note,
        Ok(None) => {
            eprintln!("Note not found: {}", args.path);
            std::process::exit(1);
        }
        Err(e) => fail("reading note", e),
    };

    if args.json {
        let out = NoteOutput {
            path: note.path,
            title: note.title,
            content: note.content,
            tags: note.tags,
            created_at: note.created_at.to_rfc3339(),
            updated_at: note.updated_at.to_rfc3339(),
        };
        match serde_json::to_string_pretty(&out) {
            Ok(json) => println!("{}", json),
            Err(e) => fail("serializing note", e),
        }
    } else {
        println!("# {}", note.title);
        if !note.tags.is_empty() {
            println!("tags: {}", note.tags.join(", "));
        }
        println!();
        println!("{}", note.content);
    }
}
