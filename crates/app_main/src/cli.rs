//! CLI argument definitions using clap derive

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "refboard")]
#[command(author, version, about = "Tag images with references and mirror a live folder")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: platform config dir)
    #[arg(long, global = true, env = "REFBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync a folder once and print the board
    Scan(ScanArgs),

    /// Keep a folder in sync until interrupted
    Watch(WatchArgs),

    /// List the reference sessions in the catalog
    Sessions,

    /// Show the effective configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct BoardArgs {
    /// Folder to sync
    pub dir: PathBuf,

    /// Seed references from a catalog session
    #[arg(long, short = 's')]
    pub session: Option<String>,

    /// Extra files added by hand before syncing
    #[arg(long = "upload", short = 'u')]
    pub uploads: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub board: BoardArgs,

    /// Oldest first
    #[arg(long)]
    pub ascending: bool,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub board: BoardArgs,

    /// Refresh interval in milliseconds (1000-30000)
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write the effective configuration to the config file
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing file
    #[arg(long, requires = "init")]
    pub force: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan() {
        let cli = Cli::parse_from(["refboard", "scan", "shots", "-s", "session_proj_alpha", "-u", "a.png", "-f", "json"]);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.board.dir, PathBuf::from("shots"));
                assert_eq!(args.board.session.as_deref(), Some("session_proj_alpha"));
                assert_eq!(args.board.uploads, vec![PathBuf::from("a.png")]);
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_parse_config() {
        let cli = Cli::parse_from(["refboard", "config", "--init", "--config", "board.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("board.toml")));
        assert!(matches!(cli.command, Commands::Config(ConfigArgs { init: true, force: false })));

        assert!(Cli::try_parse_from(["refboard", "config", "--force"]).is_err());
    }
}
