use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `sift` binary.
#[derive(Debug, Parser)]
#[command(name = "sift", version, about = "Sift - daily arXiv briefings with Zotero archival")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only, no progress bar)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project root holding `.sift/` and `.env` (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub project: Option<String>,
}

impl Cli {
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            project: self.project.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::{Cli, Commands, OutputFormat};
    use crate::cli::subcommands::BriefsCommands;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from(["sift", "--format", "raw", "--verbose", "daemon"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Daemon));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["sift", "briefs", "list", "--quiet", "-p", "/tmp/demo"])
            .expect("cli should parse");

        assert!(cli.quiet);
        assert_eq!(cli.global_flags().project.as_deref(), Some("/tmp/demo"));
        assert!(matches!(
            cli.command,
            Commands::Briefs {
                action: BriefsCommands::List
            }
        ));
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        assert!(Cli::try_parse_from(["sift", "--format", "xml", "daemon"]).is_err());
    }

    #[test]
    fn run_takes_queries_and_bounds() {
        let cli = Cli::try_parse_from([
            "sift",
            "run",
            "retrieval augmented generation",
            "agents",
            "--max",
            "5",
            "--from",
            "2026-10-01",
            "--no-analyze",
        ])
        .expect("cli should parse");

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.queries, vec!["retrieval augmented generation", "agents"]);
        assert_eq!(args.max_results, Some(5));
        assert_eq!(args.from.as_deref(), Some("2026-10-01"));
        assert_eq!(args.to, None);
        assert!(args.no_analyze);
    }

    #[test]
    fn select_and_archive_arguments() {
        let cli = Cli::try_parse_from(["sift", "select", "2026-10-18", "2410.01234", "--off"])
            .expect("cli should parse");
        let Commands::Select(args) = cli.command else {
            panic!("expected select");
        };
        assert_eq!(args.id, "2026-10-18");
        assert_eq!(args.paper, "2410.01234");
        assert!(args.off);

        let cli = Cli::try_parse_from(["sift", "archive", "--collection", "Inbox"])
            .expect("cli should parse");
        let Commands::Archive(args) = cli.command else {
            panic!("expected archive");
        };
        assert_eq!(args.id, None);
        assert_eq!(args.collection.as_deref(), Some("Inbox"));
    }
}
