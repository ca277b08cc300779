use chrono::TimeDelta;
use clap::{Args, Parser, Subcommand};
use listen_next::{
    BacklogEstimate, CleanupReport, Config, ListenNextError, ProgressEvent, SyncOptions,
    cleanup_library, connect, estimate_backlog, format_duration, sync_playlist,
};
use std::path::PathBuf;
use std::process;

#[derive(Debug, Parser)]
#[command(
    name = "listen_next",
    version,
    about = "Keep an Audiobookshelf \"listen next\" playlist in sync with your unfinished podcast episodes"
)]
struct Cli {
    /// Path to the config file (defaults to the system config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log output (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Update the playlist to the oldest unfinished episodes (default)
    Sync(SyncArgs),
    /// Delete finished episodes older than the retention window
    Cleanup {
        /// Retention window in days, overriding the config file
        #[arg(long)]
        older_than_days: Option<u32>,

        /// Only show which episodes would be deleted
        #[arg(long)]
        dry_run: bool,
    },
    /// Show how much unfinished listening has piled up
    Estimate,
}

#[derive(Debug, Default, Args)]
struct SyncArgs {
    /// Name of the target playlist
    #[arg(long)]
    playlist: Option<String>,

    /// Maximum number of episodes on the playlist
    #[arg(long)]
    count: Option<usize>,

    /// Number of oldest unfinished episodes to leave out
    #[arg(long)]
    skip: Option<usize>,

    /// Do not delete old finished episodes before syncing
    #[arg(long)]
    no_cleanup: bool,

    /// Only show what would change
    #[arg(long)]
    dry_run: bool,
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::ReadingCatalog { library_id } => {
            println!("Reading episodes of library {}...", library_id);
        }
        ProgressEvent::CatalogRead {
            episode_count,
            unfinished_count,
            failed_lookups,
        } => {
            println!(
                "Found {} episode(s), {} unfinished",
                episode_count, unfinished_count
            );
            if failed_lookups > 0 {
                println!(
                    "  Progress of {} episode(s) could not be read, treating them as unfinished",
                    failed_lookups
                );
            }
        }
        ProgressEvent::DeletingEpisode {
            podcast,
            title,
            published_at,
        } => {
            println!(
                "Deleting {} {} - {}",
                published_at.date_naive(),
                podcast,
                title
            );
        }
        ProgressEvent::DeletionFailed { title, reason } => {
            println!("  Failed to delete '{}': {}", title, reason);
        }
        ProgressEvent::PlaylistCreated { name } => {
            println!("Created playlist '{}'", name);
        }
        ProgressEvent::CandidatesSelected { count } => {
            println!("Selected {} episode(s) for the playlist", count);
        }
        ProgressEvent::AddingEntry { name } => {
            println!("  + {}", name);
        }
        ProgressEvent::RemovingEntry { name } => {
            println!("  - {}", name);
        }
        ProgressEvent::Complete { added, removed } => {
            if added == 0 && removed == 0 {
                println!("Playlist is up to date.");
            } else {
                println!("Added {} and removed {} episode(s).", added, removed);
            }
        }
    }
}

fn print_backlog(backlog: &BacklogEstimate) {
    println!("\n=== Backlog ===");

    let Some(oldest) = &backlog.oldest else {
        println!("No unfinished episodes. Well done!");
        return;
    };

    println!(
        "Oldest episode is {} ({} days!): {} - {}",
        oldest.published_at.date_naive(),
        backlog.age_days,
        oldest.podcast_name,
        oldest.title
    );
    println!(
        "Total backlog length is {} across {} episode(s)",
        format_duration(backlog.total_duration),
        backlog.episode_count
    );
    println!(
        "Remaining listening time is {}",
        format_duration(backlog.remaining_duration)
    );
    if let Some(average) = backlog.average_per_day {
        println!("Average {} per day", format_duration(average));
    }
}

fn print_pending_deletions(report: &CleanupReport) {
    if report.pending.is_empty() {
        println!("No episodes to delete.");
        return;
    }
    println!("Would delete:");
    for episode in &report.pending {
        println!(
            "  {} {} - {}",
            episode.published_at.date_naive(),
            episode.podcast_name,
            episode.title
        );
    }
}

fn run_sync(config: &Config, args: SyncArgs) -> Result<(), ListenNextError> {
    let mut options = SyncOptions::from_config(config);
    if let Some(playlist) = args.playlist {
        options.playlist_name = playlist;
    }
    if let Some(count) = args.count {
        options.count = count;
    }
    if let Some(skip) = args.skip {
        options.skip = skip;
    }
    if args.no_cleanup {
        options.retention = None;
    }
    options.dry_run = args.dry_run;

    let (client, session) = connect(config)?;
    let report = sync_playlist(
        &client,
        &session.default_library_id,
        &options,
        handle_progress_event,
    )?;

    if options.dry_run {
        println!("\n=== Dry run: nothing was changed ===");
        if let Some(cleanup) = &report.cleanup {
            print_pending_deletions(cleanup);
        }
        for entry in &report.diff.to_add {
            println!("  + {}", entry.display_name());
        }
        for entry in &report.diff.to_remove {
            println!("  - {}", entry.display_name());
        }
    }

    print_backlog(&report.backlog);
    Ok(())
}

fn run_cleanup(
    config: &Config,
    older_than_days: Option<u32>,
    dry_run: bool,
) -> Result<(), ListenNextError> {
    let days = older_than_days.unwrap_or(config.cleanup.older_than_days);

    let (client, session) = connect(config)?;
    let report = cleanup_library(
        &client,
        &session.default_library_id,
        TimeDelta::days(i64::from(days)),
        dry_run,
        handle_progress_event,
    )?;

    if dry_run {
        print_pending_deletions(&report);
    } else {
        println!(
            "\nDeleted {} episode(s), {} failed.",
            report.deleted.len(),
            report.failed.len()
        );
    }
    Ok(())
}

fn run_estimate(config: &Config) -> Result<(), ListenNextError> {
    let (client, session) = connect(config)?;
    let backlog = estimate_backlog(&client, &session.default_library_id, handle_progress_event)?;
    print_backlog(&backlog);
    Ok(())
}

fn run(cli: Cli) -> Result<(), ListenNextError> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Some(Command::Sync(args)) => run_sync(&config, args),
        Some(Command::Cleanup {
            older_than_days,
            dry_run,
        }) => run_cleanup(&config, older_than_days, dry_run),
        Some(Command::Estimate) => run_estimate(&config),
        None => run_sync(&config, SyncArgs::default()),
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("\nError: {}", e);
        process::exit(1);
    }
}
