/// Audiobookshelf API request and response types.
///
/// These structures mirror the JSON format of the Audiobookshelf REST API.
/// Only the fields the sync logic needs are modelled.
use serde::{Deserialize, Serialize};

/// Response of `POST /login`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AbsLoginResponse {
    pub user: AbsUser,
    pub user_default_library_id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct AbsUser {
    pub token: String,
}

/// Response of `GET /api/libraries/{id}/items`.
#[derive(Debug, Deserialize)]
pub(super) struct AbsLibraryItems {
    pub results: Vec<AbsLibraryItemSummary>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AbsLibraryItemSummary {
    pub id: String,
}

/// Response of `GET /api/items/{id}` for a podcast.
#[derive(Debug, Deserialize)]
pub(super) struct AbsLibraryItem {
    pub id: String,
    pub media: AbsPodcastMedia,
}

#[derive(Debug, Deserialize)]
pub(super) struct AbsPodcastMedia {
    #[serde(default)]
    pub tags: Vec<String>,
    pub metadata: AbsPodcastMetadata,
    #[serde(default)]
    pub episodes: Vec<AbsEpisode>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AbsPodcastMetadata {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AbsEpisode {
    pub id: String,
    pub library_item_id: String,
    pub title: Option<String>,
    /// Milliseconds since the Unix epoch
    pub published_at: Option<i64>,
    pub audio_file: Option<AbsAudioFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AbsAudioFile {
    #[serde(default)]
    pub duration: f64,
    pub meta_tags: Option<AbsMetaTags>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AbsMetaTags {
    pub tag_album: Option<String>,
}

/// Response of `GET /api/items/{id}?expanded=1&include=progress&episode={eid}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AbsProgressResponse {
    #[serde(default)]
    pub user_media_progress: Option<AbsMediaProgress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AbsMediaProgress {
    pub is_finished: bool,
    #[serde(default)]
    pub current_time: f64,
}

/// Response of `GET /api/playlists`.
#[derive(Debug, Deserialize)]
pub(super) struct AbsPlaylists {
    pub playlists: Vec<AbsPlaylist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AbsPlaylist {
    pub id: String,
    pub name: String,
    pub library_id: String,
    #[serde(default)]
    pub items: Vec<AbsPlaylistItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AbsPlaylistItem {
    pub library_item_id: String,
    /// Absent for book entries
    pub episode_id: Option<String>,
    pub episode: Option<AbsPlaylistEpisode>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AbsPlaylistEpisode {
    pub title: Option<String>,
}

/// Body of `POST /api/playlists`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AbsCreatePlaylist<'a> {
    pub library_id: &'a str,
    pub name: &'a str,
    pub items: Vec<AbsBatchItem<'a>>,
}

/// Body of the playlist batch add/remove endpoints.
#[derive(Debug, Serialize)]
pub(super) struct AbsBatchItems<'a> {
    pub items: Vec<AbsBatchItem<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AbsBatchItem<'a> {
    pub episode_id: &'a str,
    pub library_item_id: &'a str,
}
