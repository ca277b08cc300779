//! listen_next - Keep a "listen next" playlist in sync with your podcast backlog
//!
//! This library reads every unfinished podcast episode from an Audiobookshelf
//! server, picks the oldest ones and brings a playlist on the server to
//! exactly that selection with as few changes as possible. It can also sweep
//! old, finished episodes off the server and estimate the size of the backlog.

mod catalog;
mod config;
mod estimate;
mod media_server;
mod playlist_diff;
mod reconcile;
mod selection;

use chrono::{DateTime, TimeDelta, Utc};
use log::info;
use thiserror::Error;

pub use catalog::{BACKLOG_TAG, Catalog, CompletionState, Episode, ProgressFailure, read_catalog};
pub use config::{
    CleanupSettings, Config, ConfigError, PASSWORD_ENV, PlaylistSettings, ServerSettings,
    default_config_path,
};
pub use estimate::{BacklogEstimate, estimate, format_duration};
pub use media_server::{
    AudiobookshelfClient, EpisodeProgress, EpisodeRecord, MediaServer, MediaServerError,
    Playlist, PodcastDetail, PodcastSummary, Session,
};
pub use playlist_diff::{EntryKey, PlaylistDiff, PlaylistEntry, diff};
pub use reconcile::{
    CleanupReport, cleanup, cleanup_candidates, find_or_create_playlist, find_playlist, reconcile,
};
pub use selection::select_candidates;

/// Progress event emitted during a run
///
/// These events allow library users to report what is happening, or to
/// stay silent by ignoring them.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Reading podcasts, episodes and progress from the server
    ReadingCatalog { library_id: String },

    /// Catalog read
    CatalogRead {
        episode_count: usize,
        unfinished_count: usize,
        failed_lookups: usize,
    },

    /// An episode is about to be deleted by the retention sweep
    DeletingEpisode {
        podcast: String,
        title: String,
        published_at: DateTime<Utc>,
    },

    /// Deleting an episode failed, the sweep continues
    DeletionFailed { title: String, reason: String },

    /// The target playlist did not exist and was created
    PlaylistCreated { name: String },

    /// Candidates for the playlist selected
    CandidatesSelected { count: usize },

    /// An entry is about to be added to the playlist
    AddingEntry { name: String },

    /// An entry is about to be removed from the playlist
    RemovingEntry { name: String },

    /// Run complete
    Complete { added: usize, removed: usize },
}

/// Top-level error type for listen_next operations
#[derive(Debug, Error)]
pub enum ListenNextError {
    /// Error while talking to the media server
    #[error("Media server error: {0}")]
    MediaServer(#[from] MediaServerError),

    /// Error in the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Settings for a playlist sync
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Name of the target playlist
    pub playlist_name: String,
    /// Number of oldest unfinished episodes to leave out
    pub skip: usize,
    /// Maximum number of episodes on the playlist
    pub count: usize,
    /// Retention window of the sweep run before syncing, `None` disables it
    pub retention: Option<TimeDelta>,
    /// Report what would change without changing anything
    pub dry_run: bool,
}

impl SyncOptions {
    /// Builds the options from the `[playlist]` and `[cleanup]` config sections
    pub fn from_config(config: &Config) -> Self {
        Self {
            playlist_name: config.playlist.name.clone(),
            skip: config.playlist.skip,
            count: config.playlist.count,
            retention: config
                .cleanup
                .enabled
                .then(|| TimeDelta::days(i64::from(config.cleanup.older_than_days))),
            dry_run: false,
        }
    }
}

/// Outcome of a playlist sync
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// The playlist as it was before the sync
    pub playlist: Playlist,
    /// Changes applied, or that would be applied in a dry run
    pub diff: PlaylistDiff,
    /// Result of the retention sweep, if it ran
    pub cleanup: Option<CleanupReport>,
    /// The unfinished backlog at the time of the sync
    pub backlog: BacklogEstimate,
}

/// Logs in to the server described by the configuration
///
/// Returns the authenticated client together with the session, whose
/// default library is the one all other operations work on.
pub fn connect(config: &Config) -> Result<(AudiobookshelfClient, Session), ListenNextError> {
    config.validate()?;
    let password = config.password()?;

    let mut client = AudiobookshelfClient::new(&config.server.url, config.timeout())?;
    let session = client.authenticate(&config.server.username, &password)?;
    info!(
        "Logged in to {} as {}, library {}",
        config.server.url, config.server.username, session.default_library_id
    );

    Ok((client, session))
}

/// Brings the listen-next playlist in line with the unfinished episodes
///
/// The catalog is read once and used for all later steps: the optional
/// retention sweep, the candidate selection and the backlog estimate. The
/// target playlist is created if it does not exist yet, then the missing
/// episodes are added and the superfluous ones removed.
///
/// # Examples
///
/// ```no_run
/// use listen_next::{Config, SyncOptions, connect, sync_playlist};
///
/// let config = Config::load(None).unwrap();
/// let (client, session) = connect(&config).unwrap();
/// let report = sync_playlist(
///     &client,
///     &session.default_library_id,
///     &SyncOptions::from_config(&config),
///     |event| println!("{event:?}"),
/// )
/// .unwrap();
/// println!("{} added, {} removed", report.diff.to_add.len(), report.diff.to_remove.len());
/// ```
pub fn sync_playlist<S, F>(
    server: &S,
    library_id: &str,
    options: &SyncOptions,
    progress_callback: F,
) -> Result<SyncReport, ListenNextError>
where
    S: MediaServer,
    F: FnMut(ProgressEvent),
{
    sync_playlist_at(server, library_id, options, Utc::now(), progress_callback)
}

fn sync_playlist_at<S, F>(
    server: &S,
    library_id: &str,
    options: &SyncOptions,
    now: DateTime<Utc>,
    mut progress_callback: F,
) -> Result<SyncReport, ListenNextError>
where
    S: MediaServer,
    F: FnMut(ProgressEvent),
{
    let catalog = load_catalog(server, library_id, &mut progress_callback)?;

    let cleanup = options.retention.map(|older_than| {
        sweep(server, &catalog, older_than, now, options.dry_run, &mut progress_callback)
    });

    let candidates = select_candidates(&catalog, options.skip, options.count);
    progress_callback(ProgressEvent::CandidatesSelected {
        count: candidates.len(),
    });
    let desired: Vec<PlaylistEntry> = candidates.into_iter().map(PlaylistEntry::from).collect();

    let playlist = if options.dry_run {
        find_playlist(server, library_id, &options.playlist_name)?.unwrap_or_else(|| Playlist {
            id: String::new(),
            name: options.playlist_name.clone(),
            library_id: library_id.to_string(),
            entries: Vec::new(),
        })
    } else {
        find_or_create_playlist(
            server,
            library_id,
            &options.playlist_name,
            &mut progress_callback,
        )?
    };

    let diff = diff(&desired, &playlist.entries);
    if !options.dry_run {
        reconcile(server, &playlist.id, &diff, &mut progress_callback)?;
    }

    progress_callback(ProgressEvent::Complete {
        added: diff.to_add.len(),
        removed: diff.to_remove.len(),
    });

    Ok(SyncReport {
        playlist,
        diff,
        cleanup,
        backlog: estimate(&catalog, now),
    })
}

/// Deletes finished episodes published more than `older_than` ago
///
/// In a dry run nothing is deleted; the episodes that would be deleted are
/// returned in [`CleanupReport::pending`].
pub fn cleanup_library<S, F>(
    server: &S,
    library_id: &str,
    older_than: TimeDelta,
    dry_run: bool,
    mut progress_callback: F,
) -> Result<CleanupReport, ListenNextError>
where
    S: MediaServer,
    F: FnMut(ProgressEvent),
{
    let catalog = load_catalog(server, library_id, &mut progress_callback)?;
    Ok(sweep(
        server,
        &catalog,
        older_than,
        Utc::now(),
        dry_run,
        &mut progress_callback,
    ))
}

/// Reads the catalog and estimates the unfinished backlog
pub fn estimate_backlog<S, F>(
    server: &S,
    library_id: &str,
    mut progress_callback: F,
) -> Result<BacklogEstimate, ListenNextError>
where
    S: MediaServer,
    F: FnMut(ProgressEvent),
{
    let catalog = load_catalog(server, library_id, &mut progress_callback)?;
    Ok(estimate(&catalog, Utc::now()))
}

fn load_catalog<S, F>(
    server: &S,
    library_id: &str,
    progress_callback: &mut F,
) -> Result<Catalog, MediaServerError>
where
    S: MediaServer,
    F: FnMut(ProgressEvent),
{
    progress_callback(ProgressEvent::ReadingCatalog {
        library_id: library_id.to_string(),
    });

    let catalog = read_catalog(server, library_id)?;

    progress_callback(ProgressEvent::CatalogRead {
        episode_count: catalog.episodes.len(),
        unfinished_count: catalog.unfinished().count(),
        failed_lookups: catalog.progress_failures.len(),
    });

    Ok(catalog)
}

fn sweep<S, F>(
    server: &S,
    catalog: &Catalog,
    older_than: TimeDelta,
    now: DateTime<Utc>,
    dry_run: bool,
    progress_callback: &mut F,
) -> CleanupReport
where
    S: MediaServer,
    F: FnMut(ProgressEvent),
{
    if dry_run {
        return CleanupReport {
            pending: cleanup_candidates(catalog, older_than, now)
                .into_iter()
                .cloned()
                .collect(),
            ..Default::default()
        };
    }

    cleanup(server, catalog, older_than, now, progress_callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_server::fake::{FakeServer, podcast, record};

    fn options(count: usize) -> SyncOptions {
        SyncOptions {
            playlist_name: "Listen Next".to_string(),
            skip: 0,
            count,
            retention: Some(TimeDelta::days(30)),
            dry_run: false,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::default() + TimeDelta::days(50)
    }

    fn server() -> FakeServer {
        FakeServer::with_podcasts(vec![
            podcast(
                "p1",
                &[],
                vec![
                    record("p1", "old_done", 1),
                    record("p1", "a", 2),
                    record("p1", "recent_done", 40),
                ],
            )
            .finished("old_done")
            .finished("recent_done"),
            podcast("p2", &[], vec![record("p2", "b", 3), record("p2", "c", 4)]),
            podcast("p3", &["backlog"], vec![record("p3", "x", 1)]),
        ])
    }

    fn playlist_ids(server: &FakeServer) -> Vec<String> {
        server.playlists.borrow()[0]
            .entries
            .iter()
            .map(|e| e.episode_id.clone())
            .collect()
    }

    #[test]
    fn test_first_sync_creates_and_fills_playlist() {
        let server = server();
        let mut events = Vec::new();

        let report =
            sync_playlist_at(&server, "lib", &options(2), now(), |e| events.push(e)).unwrap();

        assert_eq!(playlist_ids(&server), vec!["a", "b"]);
        assert!(report.playlist.entries.is_empty());
        assert_eq!(report.diff.to_add.len(), 2);
        assert!(report.diff.to_remove.is_empty());
        assert_eq!(report.backlog.episode_count, 3);
        assert_eq!(report.backlog.oldest.as_ref().map(|e| e.key()), Some("a"));

        let cleanup = report.cleanup.unwrap();
        let deleted: Vec<_> = cleanup.deleted.iter().map(|e| e.key()).collect();
        assert_eq!(deleted, vec!["old_done"]);

        let calls = server.calls.borrow();
        assert_eq!(calls.created, vec!["Listen Next".to_string()]);
        assert!(calls.removed.is_empty());
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::Complete { added: 2, removed: 0 })
        ));
    }

    #[test]
    fn test_second_sync_is_a_no_op() {
        let server = server();
        sync_playlist_at(&server, "lib", &options(2), now(), |_| {}).unwrap();
        let report = sync_playlist_at(&server, "lib", &options(2), now(), |_| {}).unwrap();

        assert!(report.diff.is_empty());
        let calls = server.calls.borrow();
        assert_eq!(calls.added.len(), 1);
        assert!(calls.removed.is_empty());
        assert_eq!(calls.created.len(), 1);
    }

    #[test]
    fn test_sync_moves_window_with_skip() {
        let server = server();
        sync_playlist_at(&server, "lib", &options(2), now(), |_| {}).unwrap();

        let mut shifted = options(2);
        shifted.skip = 1;
        let report = sync_playlist_at(&server, "lib", &shifted, now(), |_| {}).unwrap();

        assert_eq!(playlist_ids(&server), vec!["b", "c"]);
        assert_eq!(report.diff.to_add[0].episode_id, "c");
        assert_eq!(report.diff.to_remove[0].episode_id, "a");
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let server = server();
        let mut dry = options(2);
        dry.dry_run = true;

        let report = sync_playlist_at(&server, "lib", &dry, now(), |_| {}).unwrap();

        assert_eq!(report.diff.to_add.len(), 2);
        let pending: Vec<_> = report
            .cleanup
            .unwrap()
            .pending
            .iter()
            .map(|e| e.id.clone())
            .collect();
        assert_eq!(pending, vec!["old_done"]);

        let calls = server.calls.borrow();
        assert!(calls.created.is_empty());
        assert!(calls.added.is_empty());
        assert!(calls.deleted.is_empty());
        assert!(server.playlists.borrow().is_empty());
    }

    #[test]
    fn test_disabled_cleanup_deletes_nothing() {
        let server = server();
        let mut no_cleanup = options(2);
        no_cleanup.retention = None;

        let report = sync_playlist_at(&server, "lib", &no_cleanup, now(), |_| {}).unwrap();

        assert!(report.cleanup.is_none());
        assert!(server.calls.borrow().deleted.is_empty());
    }

    #[test]
    fn test_broken_progress_does_not_abort_sync() {
        let mut server = server();
        server.broken_progress.insert("a".to_string());
        let mut events = Vec::new();

        sync_playlist_at(&server, "lib", &options(10), now(), |e| events.push(e)).unwrap();

        assert_eq!(playlist_ids(&server), vec!["a", "b", "c"]);
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::CatalogRead {
                failed_lookups: 1,
                ..
            }
        )));
    }

    #[test]
    fn test_options_from_config() {
        let config: Config = toml::from_str(
            r#"
            [server]
            url = "https://abs.example.com"
            username = "me"

            [playlist]
            count = 4
            skip = 1

            [cleanup]
            older_than_days = 14
            "#,
        )
        .unwrap();

        let options = SyncOptions::from_config(&config);
        assert_eq!(options.count, 4);
        assert_eq!(options.skip, 1);
        assert_eq!(options.retention, Some(TimeDelta::days(14)));
        assert!(!options.dry_run);
    }
}
