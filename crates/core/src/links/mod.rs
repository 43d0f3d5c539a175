//! Wiki-style links between notes.
//!
//! Notes reference each other with `[[target/path]]` or
//! `[[target/path|display text]]`. The parser extracts links from note
//! bodies; the index persists the reverse mapping so inbound links of any
//! note can be answered without scanning the store.

mod index;
mod parser;

pub use index::{Backlink, BacklinkError, BacklinksIndex};
pub use parser::{extract_links, replace_link_target, WikiLink};
