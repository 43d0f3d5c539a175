use std::io::Read;
use std::path::Path;

use crate::cmd::{fail, open_store};
use crate::NewArgs;

pub fn run(root: Option<&Path>, author: Option<&str>, args: NewArgs) {
    let content = if args.content == "-" {
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            fail("reading stdin", e);
        }
        buf
    } else {
        args.content
    };

    let service = open_store(root);
    match service.create_note(&args.path, &args.title, &content, args.tags, author) {
        Ok(note) => println!("Created {}", note.path),
        Err(e) => fail("creating note", e),
    }
}
