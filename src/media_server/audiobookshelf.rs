/// Audiobookshelf media server client.
use super::audiobookshelf_types::{
    AbsBatchItem, AbsBatchItems, AbsCreatePlaylist, AbsEpisode, AbsLibraryItem, AbsLibraryItems,
    AbsLoginResponse, AbsPlaylist, AbsPlaylists, AbsProgressResponse,
};
use super::{
    EpisodeProgress, EpisodeRecord, MediaServer, MediaServerError, Playlist, PodcastDetail,
    PodcastSummary, Session,
};
use crate::playlist_diff::PlaylistEntry;
use log::debug;
use reqwest::blocking::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Blocking client for the Audiobookshelf REST API.
///
/// The client must be authenticated with [`AudiobookshelfClient::authenticate`]
/// before any of the `MediaServer` operations can be used.
pub struct AudiobookshelfClient {
    client: reqwest::blocking::Client,
    base_url: String,
    token: Option<String>,
}

impl AudiobookshelfClient {
    /// Creates a new, unauthenticated client for the server at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MediaServerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaServerError::RequestError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Logs in with username and password.
    ///
    /// On success the returned token is kept and sent as bearer token with
    /// every following request.
    pub fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<Session, MediaServerError> {
        let url = self.url("login");
        debug!("POST {url} (user {username})");

        let response = self
            .client
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .map_err(|e| MediaServerError::RequestError(e.to_string()))?;

        if response.status() == 401 {
            return Err(MediaServerError::AuthenticationFailed(
                "Invalid username or password".to_string(),
            ));
        }
        let login: AbsLoginResponse = parse_json(check_status(response, &url)?)?;
        if login.user.token.is_empty() {
            return Err(MediaServerError::InvalidData(
                "Login response contains no token".to_string(),
            ));
        }

        self.token = Some(login.user.token.clone());

        Ok(Session {
            token: login.user.token,
            default_library_id: login.user_default_library_id,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Attaches the session token and sends the request.
    fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, MediaServerError> {
        let token = self.token.as_deref().ok_or_else(|| {
            MediaServerError::AuthenticationFailed("Not logged in".to_string())
        })?;

        let response = request
            .bearer_auth(token)
            .send()
            .map_err(|e| MediaServerError::RequestError(e.to_string()))?;

        if response.status() == 401 {
            return Err(MediaServerError::AuthenticationFailed(
                "Session token was rejected".to_string(),
            ));
        }
        check_status(response, url)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MediaServerError> {
        let url = self.url(path);
        debug!("GET {url} {query:?}");
        let response = self.send(self.client.get(&url).query(query), &url)?;
        parse_json(response)
    }

    fn post_batch(
        &self,
        playlist_id: &str,
        action: &str,
        entries: &[PlaylistEntry],
    ) -> Result<(), MediaServerError> {
        let url = self.url(&format!("api/playlists/{playlist_id}/batch/{action}"));
        debug!("POST {url} ({} item(s))", entries.len());

        let body = AbsBatchItems {
            items: entries.iter().map(batch_item).collect(),
        };
        self.send(self.client.post(&url).json(&body), &url)?;
        Ok(())
    }

    /// Converts an Audiobookshelf episode to our internal record.
    fn convert_episode(episode: AbsEpisode) -> EpisodeRecord {
        let (duration_seconds, album) = match episode.audio_file {
            Some(audio_file) => (
                audio_file.duration.max(0.0),
                audio_file.meta_tags.and_then(|tags| tags.tag_album),
            ),
            None => (0.0, None),
        };

        EpisodeRecord {
            id: episode.id,
            library_item_id: episode.library_item_id,
            title: episode.title.unwrap_or_else(|| "Unknown".to_string()),
            duration_seconds,
            published_at_ms: episode.published_at,
            album,
        }
    }

    fn convert_item(item: AbsLibraryItem) -> PodcastDetail {
        let episodes: Vec<EpisodeRecord> = item
            .media
            .episodes
            .into_iter()
            .map(Self::convert_episode)
            .collect();

        // Fall back to the album tag of the audio files for untitled podcasts
        let title = item
            .media
            .metadata
            .title
            .or_else(|| episodes.iter().find_map(|e| e.album.clone()))
            .unwrap_or_else(|| "Unknown".to_string());

        PodcastDetail {
            id: item.id,
            title,
            tags: item.media.tags,
            episodes,
        }
    }

    /// Converts a playlist, dropping entries that do not refer to an episode.
    fn convert_playlist(playlist: AbsPlaylist) -> Playlist {
        let entries = playlist
            .items
            .into_iter()
            .filter_map(|item| {
                let episode_id = item.episode_id?;
                let mut entry = PlaylistEntry::new(episode_id, item.library_item_id);
                entry.name = item.episode.and_then(|e| e.title);
                Some(entry)
            })
            .collect();

        Playlist {
            id: playlist.id,
            name: playlist.name,
            library_id: playlist.library_id,
            entries,
        }
    }
}

fn batch_item(entry: &PlaylistEntry) -> AbsBatchItem<'_> {
    AbsBatchItem {
        episode_id: &entry.episode_id,
        library_item_id: &entry.library_item_id,
    }
}

/// Ensures the response carries a success status.
fn check_status(response: Response, url: &str) -> Result<Response, MediaServerError> {
    if !response.status().is_success() {
        return Err(MediaServerError::HttpStatus {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response)
}

fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, MediaServerError> {
    response
        .json()
        .map_err(|e| MediaServerError::ParseError(e.to_string()))
}

impl MediaServer for AudiobookshelfClient {
    fn list_library_items(
        &self,
        library_id: &str,
    ) -> Result<Vec<PodcastSummary>, MediaServerError> {
        let items: AbsLibraryItems =
            self.get_json(&format!("api/libraries/{library_id}/items"), &[])?;

        Ok(items
            .results
            .into_iter()
            .map(|item| PodcastSummary { id: item.id })
            .collect())
    }

    fn get_item_detail(&self, podcast_id: &str) -> Result<PodcastDetail, MediaServerError> {
        let item: AbsLibraryItem = self.get_json(&format!("api/items/{podcast_id}"), &[])?;
        Ok(Self::convert_item(item))
    }

    fn get_episode_progress(
        &self,
        podcast_id: &str,
        episode_id: &str,
    ) -> Result<Option<EpisodeProgress>, MediaServerError> {
        let response: AbsProgressResponse = self.get_json(
            &format!("api/items/{podcast_id}"),
            &[
                ("expanded", "1"),
                ("include", "progress"),
                ("episode", episode_id),
            ],
        )?;

        Ok(response
            .user_media_progress
            .map(|progress| EpisodeProgress {
                is_finished: progress.is_finished,
                current_time: progress.current_time,
            }))
    }

    fn list_playlists(&self) -> Result<Vec<Playlist>, MediaServerError> {
        let playlists: AbsPlaylists = self.get_json("api/playlists", &[])?;
        Ok(playlists
            .playlists
            .into_iter()
            .map(Self::convert_playlist)
            .collect())
    }

    fn create_playlist(&self, library_id: &str, name: &str) -> Result<Playlist, MediaServerError> {
        let url = self.url("api/playlists");
        debug!("POST {url} (create '{name}')");

        let body = AbsCreatePlaylist {
            library_id,
            name,
            items: Vec::new(),
        };
        let response = self.send(self.client.post(&url).json(&body), &url)?;
        let playlist: AbsPlaylist = parse_json(response)?;

        Ok(Self::convert_playlist(playlist))
    }

    fn batch_add_playlist_items(
        &self,
        playlist_id: &str,
        entries: &[PlaylistEntry],
    ) -> Result<(), MediaServerError> {
        self.post_batch(playlist_id, "add", entries)
    }

    fn batch_remove_playlist_items(
        &self,
        playlist_id: &str,
        entries: &[PlaylistEntry],
    ) -> Result<(), MediaServerError> {
        self.post_batch(playlist_id, "remove", entries)
    }

    fn delete_episode(&self, podcast_id: &str, episode_id: &str) -> Result<(), MediaServerError> {
        let url = self.url(&format!("api/podcasts/{podcast_id}/episode/{episode_id}"));
        debug!("DELETE {url}");
        self.send(self.client.delete(&url).query(&[("hard", "1")]), &url)?;
        Ok(())
    }
}
