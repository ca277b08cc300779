//! Episode catalog module
//!
//! This module collects every episode of every podcast in a library,
//! joins in the user's listening progress and orders the result by
//! publish time.

use crate::media_server::{
    EpisodeRecord, MediaServer, MediaServerError, MemoizedProgress, PodcastDetail,
};
use chrono::{DateTime, Utc};
use log::{debug, warn};

/// Podcasts carrying this tag are left out of the catalog entirely
pub const BACKLOG_TAG: &str = "backlog";

/// Whether the user has completed an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Unfinished,
    Finished,
}

/// A podcast episode together with the user's progress
///
/// Episodes are identified by [`Episode::key`]; two values describe the
/// same episode iff their ids match.
#[derive(Debug, Clone)]
pub struct Episode {
    pub id: String,
    pub podcast_id: String,
    pub library_item_id: String,
    pub podcast_name: String,
    pub title: String,
    pub duration_seconds: f64,
    pub published_at: DateTime<Utc>,
    pub completion_state: CompletionState,
    /// Playback position in seconds, 0 if never started
    pub listened_seconds: f64,
}

impl Episode {
    /// The identity of this episode
    pub fn key(&self) -> &str {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.completion_state == CompletionState::Finished
    }

    /// Seconds left to listen, never negative
    pub fn remaining_seconds(&self) -> f64 {
        (self.duration_seconds - self.listened_seconds).max(0.0)
    }
}

/// A progress lookup that failed and was treated as unfinished
#[derive(Debug, Clone)]
pub struct ProgressFailure {
    pub podcast_id: String,
    pub episode_id: String,
    pub reason: String,
}

/// All episodes visible to the current run, oldest first
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub episodes: Vec<Episode>,
    pub progress_failures: Vec<ProgressFailure>,
}

impl Catalog {
    /// Iterates over the episodes the user has not finished yet
    pub fn unfinished(&self) -> impl Iterator<Item = &Episode> {
        self.episodes.iter().filter(|e| !e.is_finished())
    }
}

/// Reads the episode catalog of a library
///
/// Podcasts tagged with [`BACKLOG_TAG`] are skipped. Each remaining episode
/// is classified as finished only if the server has a progress record for
/// it that says so. A failing progress lookup does not abort the read: the
/// episode counts as unfinished and the failure is recorded in
/// [`Catalog::progress_failures`]. A rejected session is the exception and
/// ends the read.
///
/// Episodes are sorted by publish time. Episodes published at the same time
/// keep the order in which they were discovered.
pub fn read_catalog<S: MediaServer>(
    server: &S,
    library_id: &str,
) -> Result<Catalog, MediaServerError> {
    let server = MemoizedProgress::new(server);
    let mut catalog = Catalog::default();

    for summary in server.list_library_items(library_id)? {
        let podcast = server.get_item_detail(&summary.id)?;

        if podcast.has_tag(BACKLOG_TAG) {
            debug!("Skipping backlogged podcast '{}'", podcast.title);
            continue;
        }

        for record in &podcast.episodes {
            let episode =
                join_progress(&server, &podcast, record, &mut catalog.progress_failures)?;
            catalog.episodes.push(episode);
        }
    }

    catalog.episodes.sort_by_key(|e| e.published_at);

    Ok(catalog)
}

/// Builds a catalog episode from its record and the user's progress
fn join_progress<S: MediaServer>(
    server: &S,
    podcast: &PodcastDetail,
    record: &EpisodeRecord,
    failures: &mut Vec<ProgressFailure>,
) -> Result<Episode, MediaServerError> {
    let progress = match server.get_episode_progress(&podcast.id, &record.id) {
        Ok(progress) => progress,
        Err(e @ MediaServerError::AuthenticationFailed(_)) => return Err(e),
        Err(e) => {
            warn!(
                "Could not read progress of '{}' ({}), treating it as unfinished: {}",
                record.title, record.id, e
            );
            failures.push(ProgressFailure {
                podcast_id: podcast.id.clone(),
                episode_id: record.id.clone(),
                reason: e.to_string(),
            });
            None
        }
    };

    let (completion_state, listened_seconds) = match progress {
        Some(p) if p.is_finished => (CompletionState::Finished, p.current_time),
        Some(p) => (CompletionState::Unfinished, p.current_time),
        None => (CompletionState::Unfinished, 0.0),
    };

    Ok(Episode {
        id: record.id.clone(),
        podcast_id: podcast.id.clone(),
        library_item_id: record.library_item_id.clone(),
        podcast_name: podcast.title.clone(),
        title: record.title.clone(),
        duration_seconds: record.duration_seconds,
        published_at: record
            .published_at_ms
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_default(),
        completion_state,
        listened_seconds,
    })
}
