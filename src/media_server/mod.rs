//! Media server access
//!
//! This module provides typed records for everything the sync logic reads
//! from or writes to the media server, as well as the `MediaServer` trait
//! describing the operations an authenticated server session offers.
mod audiobookshelf;
mod audiobookshelf_types;
mod memoized;

pub use audiobookshelf::AudiobookshelfClient;
pub(crate) use memoized::MemoizedProgress;

use crate::playlist_diff::PlaylistEntry;
use thiserror::Error;

/// Errors that can occur while talking to the media server.
#[derive(Debug, Error)]
pub enum MediaServerError {
    /// The request could not be sent or the connection failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// The server answered with a non-success status code
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Login was rejected or a call was made without a session
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Failed to parse the server's JSON response
    #[error("Failed to parse server response: {0}")]
    ParseError(String),

    /// The server returned data that does not fit the expected shape
    #[error("Server returned invalid data: {0}")]
    InvalidData(String),
}

/// An authenticated session as returned by login.
#[derive(Debug, Clone)]
pub struct Session {
    /// Bearer token used for all subsequent API calls
    pub token: String,
    /// The library the user works in by default
    pub default_library_id: String,
}

/// A podcast as listed in a library.
#[derive(Debug, Clone)]
pub struct PodcastSummary {
    /// Library item id of the podcast
    pub id: String,
}

/// Full record of a single podcast including its episodes.
#[derive(Debug, Clone)]
pub struct PodcastDetail {
    /// Library item id of the podcast
    pub id: String,
    /// Podcast title
    pub title: String,
    /// Tags assigned to the podcast
    pub tags: Vec<String>,
    /// Episodes in the order the server lists them
    pub episodes: Vec<EpisodeRecord>,
}

impl PodcastDetail {
    /// Whether the podcast carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A single episode as stored on the server, without progress information.
#[derive(Debug, Clone)]
pub struct EpisodeRecord {
    pub id: String,
    pub library_item_id: String,
    pub title: String,
    /// Duration of the episode's audio file in seconds
    pub duration_seconds: f64,
    /// Publish time in milliseconds since the Unix epoch, if known
    pub published_at_ms: Option<i64>,
    /// Album tag of the audio file, used when the podcast has no title
    pub album: Option<String>,
}

/// Listening progress of the current user for one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeProgress {
    pub is_finished: bool,
    /// Playback position in seconds
    pub current_time: f64,
}

/// A playlist as stored on the server.
#[derive(Debug, Clone)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub library_id: String,
    pub entries: Vec<PlaylistEntry>,
}

/// Operations of an authenticated media server session.
///
/// The sync logic only ever talks to the server through this trait, which
/// keeps it independent of the wire format and lets tests run against an
/// in-memory server.
pub trait MediaServer {
    /// Lists all podcasts in a library.
    fn list_library_items(&self, library_id: &str)
    -> Result<Vec<PodcastSummary>, MediaServerError>;

    /// Fetches the detail record of a podcast, including its episodes.
    fn get_item_detail(&self, podcast_id: &str) -> Result<PodcastDetail, MediaServerError>;

    /// Fetches the user's progress for one episode.
    ///
    /// Returns `None` if the user never started the episode.
    fn get_episode_progress(
        &self,
        podcast_id: &str,
        episode_id: &str,
    ) -> Result<Option<EpisodeProgress>, MediaServerError>;

    /// Lists all playlists of the user.
    fn list_playlists(&self) -> Result<Vec<Playlist>, MediaServerError>;

    /// Creates an empty playlist in the given library.
    fn create_playlist(&self, library_id: &str, name: &str)
    -> Result<Playlist, MediaServerError>;

    /// Adds all entries to the playlist in a single request.
    fn batch_add_playlist_items(
        &self,
        playlist_id: &str,
        entries: &[PlaylistEntry],
    ) -> Result<(), MediaServerError>;

    /// Removes all entries from the playlist in a single request.
    fn batch_remove_playlist_items(
        &self,
        playlist_id: &str,
        entries: &[PlaylistEntry],
    ) -> Result<(), MediaServerError>;

    /// Permanently deletes an episode, including its audio file.
    fn delete_episode(&self, podcast_id: &str, episode_id: &str) -> Result<(), MediaServerError>;
}
