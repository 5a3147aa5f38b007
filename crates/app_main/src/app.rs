//! Subcommand runners

use crate::cli::{BoardArgs, Cli, Commands, ConfigArgs, OutputFormat, ScanArgs, WatchArgs};
use anyhow::{bail, Context, Result};
use app_core::{
    AppConfig, AppState, NewFile, SessionCatalog, SortOrder, StaticCatalog, SyncOutcome, SyncReport, SyncSummary,
    ViewGroup,
};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Run the parsed command line
pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    match cli.command {
        Commands::Scan(args) => scan(args, config, cli.format).await,
        Commands::Watch(args) => watch(args, config, cli.format).await,
        Commands::Sessions => sessions(&config, cli.format),
        Commands::Config(args) => {
            let path = cli.config.unwrap_or_else(AppConfig::config_path);
            show_config(args, &path, &config, cli.format)
        }
    }
}

/// Seed the board and start syncing the folder
async fn open_board(args: &BoardArgs, config: AppConfig) -> Result<(AppState, SyncSummary)> {
    let state = AppState::new(config);

    if let Some(id) = &args.session {
        let count = state.load_session(id)?;
        tracing::info!("Session {} seeded {} references", id, count);
    }

    if !args.uploads.is_empty() {
        let files = args
            .uploads
            .iter()
            .map(|path| NewFile::from_path(path).with_context(|| format!("Cannot add {}", path.display())))
            .collect::<Result<Vec<_>>>()?;
        state.board.write().upload(files);
    }

    let handle = state.open_folder(&args.dir)?;
    let summary = state.start_sync(handle).await?;
    Ok((state, summary))
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    folder: Option<&'a str>,
    summary: SyncSummary,
    groups: Vec<ViewGroup<'a>>,
}

async fn scan(args: ScanArgs, mut config: AppConfig, format: OutputFormat) -> Result<()> {
    if args.ascending {
        config.view.sort_order = SortOrder::Ascending;
    }
    let (state, summary) = open_board(&args.board, config).await?;

    {
        let board = state.board.read();
        let output = ScanOutput {
            folder: board.synced_folder(),
            summary,
            groups: board.project(),
        };

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
            OutputFormat::Text => print_groups(&output),
        }
    }

    state.stop_sync().await;
    Ok(())
}

fn print_groups(output: &ScanOutput<'_>) {
    println!("{}: {}", output.folder.unwrap_or("-"), output.summary);

    for group in &output.groups {
        let title = group.reference.map_or("Unassociated", |r| r.text.as_str());
        println!("\n{} ({})", title, group.files.len());

        for file in &group.files {
            let stars = "*".repeat(usize::from(file.rating.stars()));
            let source = file.origin.folder().unwrap_or("manual");
            println!("  {:<40} {:>10} {:<5} {}", file.name, file.size, stars, source);
        }
    }
}

async fn watch(args: WatchArgs, mut config: AppConfig, format: OutputFormat) -> Result<()> {
    if let Some(interval_ms) = args.interval_ms {
        config.sync.interval_ms = interval_ms;
    }
    let (state, summary) = open_board(&args.board, config).await?;

    if format == OutputFormat::Text {
        println!("Watching {} ({}), Ctrl-C to stop", args.board.dir.display(), summary);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut poll = tokio::time::interval(Duration::from_millis(250));

    let stopped_by_sync = loop {
        tokio::select! {
            _ = &mut ctrl_c => break false,
            _ = poll.tick() => {
                let reports = state.poll_sync_reports();
                for report in &reports {
                    print_report(report, format)?;
                }
                if !state.sync.is_active() {
                    break true;
                }
            }
        }
    };

    if stopped_by_sync {
        tracing::warn!("Sync ended on its own");
    } else {
        state.stop_sync().await;
        tracing::info!("Sync stopped by user");
    }
    Ok(())
}

fn print_report(report: &SyncReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(report)?),
        OutputFormat::Text => match &report.outcome {
            SyncOutcome::Completed(summary) => println!("[{:?}] {}: {}", report.trigger, report.folder, summary),
            SyncOutcome::Failed { message, .. } => eprintln!("[{:?}] {}: {}", report.trigger, report.folder, message),
        },
    }
    Ok(())
}

fn sessions(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let sessions = StaticCatalog::from_config(config).sessions();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sessions)?),
        OutputFormat::Text => {
            for session in sessions {
                println!("{:<28} {} ({} references)", session.id, session.name, session.reference_count);
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ConfigOutput<'a> {
    path: &'a Path,
    written: bool,
    config: &'a AppConfig,
}

fn show_config(args: ConfigArgs, path: &Path, config: &AppConfig, format: OutputFormat) -> Result<()> {
    if args.init {
        if path.exists() && !args.force {
            bail!("{} already exists, pass --force to overwrite", path.display());
        }
        config.save_to(path)?;
    }

    match format {
        OutputFormat::Json => {
            let output = ConfigOutput {
                path,
                written: args.init,
                config,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            let state = if args.init { "written" } else if path.exists() { "loaded" } else { "defaults" };
            println!("{} ({})", path.display(), state);
            println!("  sync interval  {} ms", config.sync.interval().as_millis());
            println!("  extensions     {}", config.sync.extensions.join(", "));
            println!("  sort order     {:?}", config.view.sort_order);
            println!("  sessions       {}", config.sessions.len());
            println!("  log retention  {} days", config.general.log_retention_days);
        }
    }
    Ok(())
}
