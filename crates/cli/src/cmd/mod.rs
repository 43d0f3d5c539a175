//! Subcommand implementations.
//!
//! Each command opens the store, runs one service call, prints the result,
//! and exits nonzero on error.

pub mod backlinks;
pub mod edit;
pub mod history;
pub mod ls;
pub mod mv;
pub mod new;
pub mod rebuild;
pub mod restore;
pub mod rm;
pub mod search;
pub mod show;
pub mod tags;

use std::path::Path;

use notarium_core::{NoteService, StoreConfig};

/// Open the store at `root`, or the default location.
pub fn open_store(root: Option<&Path>) -> NoteService {
    let config = match root {
        Some(root) => StoreConfig::at_root(root),
        None => StoreConfig::default_locations(),
    };
    match NoteService::open(config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error opening store: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print an error and exit; shared by every command's failure path.
pub fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("Error {}: {}", context, err);
    std::process::exit(1);
}
