use clap::{Args, Subcommand};

use crate::cli::subcommands::{BriefsCommands, CacheCommands, ConfigCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Discover, analyze and write a new briefing.
    Run(RunArgs),
    /// Archive the selected entries of a briefing into Zotero.
    Archive(ArchiveArgs),
    /// Briefing artifacts.
    Briefs {
        #[command(subcommand)]
        action: BriefsCommands,
    },
    /// Mark a briefing entry for archival.
    Select(SelectArgs),
    /// Configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// Content cache.
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
    /// Run on the configured daily schedule until interrupted.
    Daemon,
}

/// Arguments for `sift run`.
#[derive(Clone, Debug, Args)]
pub struct RunArgs {
    /// Search queries (defaults to `feed.queries`).
    pub queries: Vec<String>,

    /// Maximum number of new papers (defaults to `feed.max_results`).
    #[arg(short = 'n', long = "max")]
    pub max_results: Option<usize>,

    /// Earliest submission date, YYYY-MM-DD.
    #[arg(long)]
    pub from: Option<String>,

    /// Latest submission date, YYYY-MM-DD (defaults to today).
    #[arg(long)]
    pub to: Option<String>,

    /// Skip LLM analysis; entries carry metadata only.
    #[arg(long)]
    pub no_analyze: bool,
}

/// Arguments for `sift archive`.
#[derive(Clone, Debug, Args)]
pub struct ArchiveArgs {
    /// Artifact id (defaults to the latest).
    pub id: Option<String>,

    /// Zotero collection name (defaults to `zotero.collection`).
    #[arg(long)]
    pub collection: Option<String>,
}

/// Arguments for `sift select`.
#[derive(Clone, Debug, Args)]
pub struct SelectArgs {
    /// Artifact id.
    pub id: String,

    /// arXiv identifier of the entry.
    pub paper: String,

    /// Clear the selection instead of setting it.
    #[arg(long)]
    pub off: bool,
}
