mod cmd;
mod logging;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ntm", version, about = "Markdown knowledge store with links, search, and history")]
struct Cli {
    /// Store root directory (defaults to the platform data directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Author name recorded in the version journal
    #[arg(long, global = true)]
    author: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a note
    New(NewArgs),

    /// Print a note
    Show(ShowArgs),

    /// List notes, either all or one folder level
    Ls(LsArgs),

    /// Move a note to a new path, rewriting inbound links
    Mv(MvArgs),

    /// Delete a note
    Rm(RmArgs),

    /// Edit a note's title, content, or tags
    Edit(EditArgs),

    /// Full-text search across all notes
    Search(SearchArgs),

    /// List tags, or the notes carrying one tag
    Tags(TagsArgs),

    /// Show notes linking to a note
    Backlinks(BacklinksArgs),

    /// Show the version history of a note
    History(HistoryArgs),

    /// Restore a note to a previous version
    Restore(RestoreArgs),

    /// Rebuild the search and backlink indexes from the note files
    Rebuild,
}

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Note path, e.g. "projects/rust"
    pub path: String,

    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub content: String,

    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub path: String,

    /// Print the note as JSON instead of markdown
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct LsArgs {
    /// Folder to list; omit for the whole store
    pub folder: Option<String>,
}

#[derive(Debug, Args)]
pub struct MvArgs {
    pub path: String,
    pub new_path: String,

    /// Leave links in other notes pointing at the old path
    #[arg(long)]
    pub no_update_links: bool,
}

#[derive(Debug, Args)]
pub struct RmArgs {
    pub path: String,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    pub path: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub content: Option<String>,

    /// Replace the whole tag set (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Add a tag, keeping existing ones (repeatable)
    #[arg(long = "add-tag")]
    pub add_tags: Vec<String>,

    /// Remove a tag (repeatable)
    #[arg(long = "remove-tag")]
    pub remove_tags: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Query; supports date math like "updated_at:>now-7d"
    pub query: String,

    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TagsArgs {
    /// Show only notes carrying this tag
    pub tag: Option<String>,
}

#[derive(Debug, Args)]
pub struct BacklinksArgs {
    pub path: String,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    pub path: String,

    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Show the diff between two versions instead of the log
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    pub diff: Vec<String>,
}

#[derive(Debug, Args)]
pub struct RestoreArgs {
    pub path: String,

    /// Commit id from `ntm history`
    pub version: String,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let author = cli.author.as_deref();

    match cli.command {
        Commands::New(args) => cmd::new::run(cli.root.as_deref(), author, args),
        Commands::Show(args) => cmd::show::run(cli.root.as_deref(), args),
        Commands::Ls(args) => cmd::ls::run(cli.root.as_deref(), args),
        Commands::Mv(args) => cmd::mv::run(cli.root.as_deref(), author, args),
        Commands::Rm(args) => cmd::rm::run(cli.root.as_deref(), author, args),
        Commands::Edit(args) => cmd::edit::run(cli.root.as_deref(), author, args),
        Commands::Search(args) => cmd::search::run(cli.root.as_deref(), args),
        Commands::Tags(args) => cmd::tags::run(cli.root.as_deref(), args),
        Commands::Backlinks(args) => cmd::backlinks::run(cli.root.as_deref(), args),
        Commands::History(args) => cmd::history::run(cli.root.as_deref(), args),
        Commands::Restore(args) => cmd::restore::run(cli.root.as_deref(), author, args),
        Commands::Rebuild => cmd::rebuild::run(cli.root.as_deref()),
    }
}
