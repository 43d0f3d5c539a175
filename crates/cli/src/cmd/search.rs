use std::path::Path;

use serde::Serialize;

use crate::cmd::{fail, open_store};
use crate::SearchArgs;

/// Search hit shape for JSON output.
#[derive(Debug, Serialize)]
struct HitOutput {
    path: String,
    title: String,
    score: f32,
}

pub fn run(root: Option<&Path>, args: SearchArgs) {
    let service = open_store(root);
    let hits = match service.search_notes(&args.query, args.limit) {
        Ok(hits) => hits,
        Err(e) => fail("searching", e),
    };

    if args.json {
        let out: Vec<HitOutput> = hits
            .into_iter()
            .map(|h| HitOutput { path: h.path, title: h.title, score: h.score })
            .collect();
        match serde_json::to_string_pretty(&out) {
            Ok(json) => println!("{}", json),
            Err(e) => fail("serializing results", e),
        }
    } else if hits.is_empty() {
        println!("No matches.");
    } else {
        for hit in hits {
            println!("{:>7.3}  {}  {}", hit.score, hit.path, hit.title);
        }
    }
}
