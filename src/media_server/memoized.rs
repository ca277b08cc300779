//! Memoizing media server wrapper
//!
//! This module provides a wrapper for media servers that remembers the
//! progress lookups made during a single run, so repeated questions about
//! the same episode only hit the server once.

use super::{
    EpisodeProgress, MediaServer, MediaServerError, Playlist, PodcastDetail, PodcastSummary,
};
use crate::playlist_diff::PlaylistEntry;
use std::cell::RefCell;
use std::collections::HashMap;

/// A memoizing wrapper for media servers
///
/// Successful progress lookups are kept in memory, keyed by podcast and
/// episode id. Failed lookups are not remembered and will be retried on the
/// next request. All other operations are passed through unchanged.
pub(crate) struct MemoizedProgress<'a, S>
where
    S: MediaServer,
{
    /// The underlying media server
    server: &'a S,
    /// Progress lookups made so far
    progress: RefCell<HashMap<(String, String), Option<EpisodeProgress>>>,
}

impl<'a, S> MemoizedProgress<'a, S>
where
    S: MediaServer,
{
    /// Creates a new memoizing wrapper around the given server
    pub fn new(server: &'a S) -> Self {
        Self {
            server,
            progress: RefCell::new(HashMap::new()),
        }
    }
}

impl<S> MediaServer for MemoizedProgress<'_, S>
where
    S: MediaServer,
{
    fn list_library_items(
        &self,
        library_id: &str,
    ) -> Result<Vec<PodcastSummary>, MediaServerError> {
        self.server.list_library_items(library_id)
    }

    fn get_item_detail(&self, podcast_id: &str) -> Result<PodcastDetail, MediaServerError> {
        self.server.get_item_detail(podcast_id)
    }

    fn get_episode_progress(
        &self,
        podcast_id: &str,
        episode_id: &str,
    ) -> Result<Option<EpisodeProgress>, MediaServerError> {
        let key = (podcast_id.to_string(), episode_id.to_string());

        if let Some(progress) = self.progress.borrow().get(&key) {
            return Ok(progress.clone());
        }

        let progress = self.server.get_episode_progress(podcast_id, episode_id)?;
        self.progress.borrow_mut().insert(key, progress.clone());

        Ok(progress)
    }

    fn list_playlists(&self) -> Result<Vec<Playlist>, MediaServerError> {
        self.server.list_playlists()
    }

    fn create_playlist(&self, library_id: &str, name: &str) -> Result<Playlist, MediaServerError> {
        self.server.create_playlist(library_id, name)
    }

    fn batch_add_playlist_items(
        &self,
        playlist_id: &str,
        entries: &[PlaylistEntry],
    ) -> Result<(), MediaServerError> {
        self.server.batch_add_playlist_items(playlist_id, entries)
    }

    fn batch_remove_playlist_items(
        &self,
        playlist_id: &str,
        entries: &[PlaylistEntry],
    ) -> Result<(), MediaServerError> {
        self.server.batch_remove_playlist_items(playlist_id, entries)
    }

    fn delete_episode(&self, podcast_id: &str, episode_id: &str) -> Result<(), MediaServerError> {
        self.server.delete_episode(podcast_id, episode_id)
    }
}
