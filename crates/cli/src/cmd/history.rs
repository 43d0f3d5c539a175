use std::path::Path;

use crate::cmd::{fail, open_store};
use crate::HistoryArgs;

pub fn run(root: Option<&Path>, args: HistoryArgs) {
    let service = open_store(root);

    if let [from, to] = args.diff.as_slice() {
        match service.diff_versions(&args.path, from, to) {
            Ok(diff) => {
                println!(
                    "{} {}..{} (+{} -{})",
                    diff.path, diff.from_version, diff.to_version, diff.additions, diff.deletions
                );
                print!("{}", diff.diff_text);
            }
            Err(e) => fail("diffing versions", e),
        }
        return;
    }

    match service.get_history(&args.path, args.limit) {
        Ok(versions) if versions.is_empty() => {
            println!("No history for {}.", args.path);
        }
        Ok(versions) => {
            for v in versions {
                println!(
                    "{}  {}  {}  {}",
                    v.commit_id,
                    v.timestamp.format("%Y-%m-%d %H:%M"),
                    v.author,
                    v.message
                );
            }
        }
        Err(e) => fail("reading history", e),
    }
}
