use std::path::Path;

use crate::cmd::{fail, open_store};
use crate::TagsArgs;

pub fn run(root: Option<&Path>, args: TagsArgs) {
    let service = open_store(root);
    match args.tag {
        Some(tag) => match service.find_by_tag(&tag) {
            Ok(paths) => {
                for path in paths {
                    println!("{}", path);
                }
            }
            Err(e) => fail("finding notes by tag", e),
        },
        None => match service.list_tags() {
            Ok(counts) => {
                for (tag, count) in counts {
                    println!("{:>5}  {}", count, tag);
                }
            }
            Err(e) => fail("listing tags", e),
        },
    }
}
