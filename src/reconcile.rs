//! Playlist reconciliation and retention sweep
//!
//! This module applies a computed [`PlaylistDiff`] to the server playlist
//! and deletes old episodes the user has already finished.

use crate::ProgressEvent;
use crate::catalog::{Catalog, Episode};
use crate::media_server::{MediaServer, MediaServerError, Playlist};
use crate::playlist_diff::PlaylistDiff;
use chrono::{DateTime, TimeDelta, Utc};
use log::{info, warn};

/// Looks up a playlist of the given library by name
pub fn find_playlist<S: MediaServer>(
    server: &S,
    library_id: &str,
    name: &str,
) -> Result<Option<Playlist>, MediaServerError> {
    Ok(server
        .list_playlists()?
        .into_iter()
        .find(|p| p.name == name && p.library_id == library_id))
}

/// Looks up the target playlist by name, creating it if it does not exist
///
/// Only playlists of the given library are considered. A newly created
/// playlist is empty.
pub fn find_or_create_playlist<S, F>(
    server: &S,
    library_id: &str,
    name: &str,
    mut progress: F,
) -> Result<Playlist, MediaServerError>
where
    S: MediaServer,
    F: FnMut(ProgressEvent),
{
    if let Some(playlist) = find_playlist(server, library_id, name)? {
        return Ok(playlist);
    }

    info!("Playlist '{name}' not found, creating it");
    let playlist = server.create_playlist(library_id, name)?;
    progress(ProgressEvent::PlaylistCreated {
        name: playlist.name.clone(),
    });

    Ok(playlist)
}

/// Applies a diff to the playlist with one batch request per direction
///
/// Every entry is reported before its batch is sent. Empty batches are not
/// sent at all.
pub fn reconcile<S, F>(
    server: &S,
    playlist_id: &str,
    diff: &PlaylistDiff,
    mut progress: F,
) -> Result<(), MediaServerError>
where
    S: MediaServer,
    F: FnMut(ProgressEvent),
{
    if !diff.to_add.is_empty() {
        for entry in &diff.to_add {
            info!("Adding {} to playlist {playlist_id}", entry.display_name());
            progress(ProgressEvent::AddingEntry {
                name: entry.display_name().to_string(),
            });
        }
        server.batch_add_playlist_items(playlist_id, &diff.to_add)?;
    }

    if !diff.to_remove.is_empty() {
        for entry in &diff.to_remove {
            info!("Removing {} from playlist {playlist_id}", entry.display_name());
            progress(ProgressEvent::RemovingEntry {
                name: entry.display_name().to_string(),
            });
        }
        server.batch_remove_playlist_items(playlist_id, &diff.to_remove)?;
    }

    Ok(())
}

/// Outcome of a retention sweep
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    /// Episodes that would have been deleted in a dry run
    pub pending: Vec<Episode>,
    /// Episodes that were deleted
    pub deleted: Vec<Episode>,
    /// Episodes whose deletion failed, with the reason
    pub failed: Vec<(Episode, String)>,
}

/// Finds finished episodes published before `now - older_than`
///
/// A window reaching back past the earliest representable time selects
/// nothing.
pub fn cleanup_candidates(
    catalog: &Catalog,
    older_than: TimeDelta,
    now: DateTime<Utc>,
) -> Vec<&Episode> {
    let Some(cutoff) = now.checked_sub_signed(older_than) else {
        warn!(
            "Retention window of {} days is out of range, nothing to delete",
            older_than.num_days()
        );
        return Vec::new();
    };
    catalog
        .episodes
        .iter()
        .filter(|e| e.is_finished() && e.published_at < cutoff)
        .collect()
}

/// Hard-deletes every finished episode older than the retention window
///
/// Deletions are independent of each other: a failing deletion is logged
/// and reported, and the sweep carries on with the next episode.
pub fn cleanup<S, F>(
    server: &S,
    catalog: &Catalog,
    older_than: TimeDelta,
    now: DateTime<Utc>,
    mut progress: F,
) -> CleanupReport
where
    S: MediaServer,
    F: FnMut(ProgressEvent),
{
    let mut report = CleanupReport::default();

    for episode in cleanup_candidates(catalog, older_than, now) {
        progress(ProgressEvent::DeletingEpisode {
            podcast: episode.podcast_name.clone(),
            title: episode.title.clone(),
            published_at: episode.published_at,
        });

        match server.delete_episode(&episode.podcast_id, &episode.id) {
            Ok(()) => {
                info!("Deleted '{}' of {}", episode.title, episode.podcast_name);
                report.deleted.push(episode.clone());
            }
            Err(e) => {
                warn!("Failed to delete '{}' ({}): {}", episode.title, episode.id, e);
                progress(ProgressEvent::DeletionFailed {
                    title: episode.title.clone(),
                    reason: e.to_string(),
                });
                report.failed.push((episode.clone(), e.to_string()));
            }
        }
    }

    report
}
