use std::path::Path;

use serde::Serialize;

use crate::cmd::{fail, open_store};
use crate::BacklinksArgs;

/// Backlink shape for JSON output.
#[derive(Debug, Serialize)]
struct BacklinkOutput {
    source: String,
    lines: Vec<u32>,
}

pub fn run(root: Option<&Path>, args: BacklinksArgs) {
    let service = open_store(root);
    let backlinks = match service.get_backlinks(&args.path) {
        Ok(backlinks) => backlinks,
        Err(e) => fail("reading backlinks", e),
    };

    if args.json {
        let out: Vec<BacklinkOutput> = backlinks
            .into_iter()
            .map(|b| BacklinkOutput { source: b.source_path, lines: b.line_numbers })
            .collect();
        match serde_json::to_string_pretty(&out) {
            Ok(json) => println!("{}", json),
            Err(e) => fail("serializing backlinks", e),
        }
    } else if backlinks.is_empty() {
        println!("No notes link to {}.", args.path);
    } else {
        for b in backlinks {
            let lines: Vec<String> = b.line_numbers.iter().map(u32::to_string).collect();
            println!("{}  (line {})", b.source_path, lines.join(", "));
        }
    }
}
