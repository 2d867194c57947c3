use clap::Subcommand;

/// Briefing artifacts.
#[derive(Clone, Debug, Subcommand)]
pub enum BriefsCommands {
    /// List artifacts, newest first.
    List,
    /// Show one artifact.
    Show {
        /// Artifact id, e.g. 2026-10-18 or 2026-10-18-2.
        id: String,
    },
}

/// Configuration inspection.
#[derive(Clone, Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration. Secrets are shown as presence flags.
    Show,
}

/// Content cache management.
#[derive(Clone, Debug, Subcommand)]
pub enum CacheCommands {
    /// Remove cache entries older than their tier's TTL.
    Purge,
}
