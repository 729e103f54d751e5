//! Content fetcher abstractions and concrete implementations.
//!
//! A fetcher resolves a playlist id to its track document and a track id to
//! a playable URI. The bridge performs exactly one fetch per load request;
//! any retry policy belongs to the fetcher implementation, not the bridge.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ContentConfig;
use crate::error::BridgeError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Playlist document shape: an ordered array of track records.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct PlaylistDocument {
    #[serde(rename = "Tracks", default)]
    pub tracks: Vec<PlaylistEntry>,
}

/// One track record in a playlist document.
///
/// Every field is optional in the document; absent fields deserialize to
/// empty strings rather than failing the load.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct PlaylistEntry {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Artist", default)]
    pub artist: String,
    #[serde(rename = "Image", default)]
    pub image: String,
}

/// Interface implemented by concrete content fetchers.
pub trait PlaylistFetcher: Send {
    /// Retrieves the document describing all tracks in a playlist.
    fn fetch_playlist(&self, playlist_id: &str) -> crate::Result<PlaylistDocument>;

    /// Constructs a playable URI for a track, given its id.
    fn track_uri(&self, track_id: &str) -> String;
}

/// Fetcher backed by `ureq`, for playlists served over HTTP.
///
/// Follows the same content layout the directory fetcher uses: playlist
/// documents live under `playlistdata/` and media under `music/`.
pub struct HttpPlaylistFetcher {
    http_client: ureq::Agent,
    endpoint: String,
}

impl HttpPlaylistFetcher {
    /// Creates a fetcher rooted at the given endpoint.
    pub fn new(endpoint: &str) -> Self {
        Self::with_timeouts(endpoint, CONNECT_TIMEOUT, READ_TIMEOUT)
    }

    /// Creates a fetcher from the content section of the crate config.
    pub fn from_config(config: &ContentConfig) -> Self {
        Self::with_timeouts(
            &config.endpoint,
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.read_timeout_ms),
        )
    }

    fn with_timeouts(endpoint: &str, connect_timeout: Duration, read_timeout: Duration) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout_read(read_timeout)
            .timeout_write(read_timeout)
            .build();
        Self {
            http_client,
            endpoint: endpoint_base(endpoint),
        }
    }

    fn playlist_url(endpoint: &str, playlist_id: &str) -> String {
        format!(
            "{}/playlistdata/{}.json",
            endpoint_base(endpoint),
            urlencoding::encode(playlist_id)
        )
    }

    fn music_url(endpoint: &str, track_id: &str) -> String {
        format!(
            "{}/music/{}.mp3",
            endpoint_base(endpoint),
            urlencoding::encode(track_id)
        )
    }
}

impl PlaylistFetcher for HttpPlaylistFetcher {
    fn fetch_playlist(&self, playlist_id: &str) -> crate::Result<PlaylistDocument> {
        let url = Self::playlist_url(&self.endpoint, playlist_id);
        let response = self
            .http_client
            .get(&url)
            .call()
            .map_err(|err| BridgeError::Fetch(format!("request failed ({url}): {err}")))?;
        let body = response.into_string()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn track_uri(&self, track_id: &str) -> String {
        Self::music_url(&self.endpoint, track_id)
    }
}

/// Fetcher reading playlist documents from a local content directory.
///
/// Expects the same layout as the HTTP fetcher: `<root>/playlistdata/<id>.json`
/// for documents and `<root>/music/<id>.mp3` for media files.
pub struct DirectoryPlaylistFetcher {
    root: PathBuf,
}

impl DirectoryPlaylistFetcher {
    /// Creates a fetcher rooted at the given content directory.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl PlaylistFetcher for DirectoryPlaylistFetcher {
    fn fetch_playlist(&self, playlist_id: &str) -> crate::Result<PlaylistDocument> {
        let path = self
            .root
            .join("playlistdata")
            .join(format!("{playlist_id}.json"));
        let body = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn track_uri(&self, track_id: &str) -> String {
        self.root
            .join("music")
            .join(format!("{track_id}.mp3"))
            .display()
            .to_string()
    }
}

fn endpoint_base(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_document_parses_with_missing_optional_fields() {
        let raw = r#"{"Tracks":[{"Id":"a","Title":"A"},{"Title":"Only A Title"},{}]}"#;
        let document: PlaylistDocument = serde_json::from_str(raw).expect("document should parse");

        assert_eq!(document.tracks.len(), 3);
        assert_eq!(document.tracks[0].id, "a");
        assert_eq!(document.tracks[0].artist, "");
        assert_eq!(document.tracks[0].image, "");
        assert_eq!(document.tracks[1].id, "");
        assert_eq!(document.tracks[1].title, "Only A Title");
        assert_eq!(document.tracks[2].id, "");
    }

    #[test]
    fn test_document_without_tracks_array_parses_empty() {
        let document: PlaylistDocument = serde_json::from_str("{}").expect("document should parse");
        assert!(document.tracks.is_empty());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let result = serde_json::from_str::<PlaylistDocument>(r#"{"Tracks": "nope"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_http_fetcher_builds_expected_urls() {
        assert_eq!(
            HttpPlaylistFetcher::playlist_url("https://media.example.com/", "jazz"),
            "https://media.example.com/playlistdata/jazz.json"
        );
        assert_eq!(
            HttpPlaylistFetcher::music_url("https://media.example.com", "track one"),
            "https://media.example.com/music/track%20one.mp3"
        );
    }

    #[test]
    fn test_directory_fetcher_reads_playlist_file() {
        let root = std::env::temp_dir().join("tunebridge_fetcher_reads_playlist");
        std::fs::create_dir_all(root.join("playlistdata")).expect("create content dir");
        std::fs::write(
            root.join("playlistdata").join("jazz.json"),
            r#"{"Tracks":[{"Id":"a","Title":"A","Artist":"Artist A"}]}"#,
        )
        .expect("write playlist file");

        let fetcher = DirectoryPlaylistFetcher::new(root.clone());
        let document = fetcher.fetch_playlist("jazz").expect("playlist should load");
        assert_eq!(document.tracks.len(), 1);
        assert_eq!(document.tracks[0].title, "A");

        let uri = fetcher.track_uri("a");
        assert!(uri.ends_with("a.mp3"), "unexpected track uri: {uri}");

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_directory_fetcher_missing_playlist_is_an_error() {
        let fetcher =
            DirectoryPlaylistFetcher::new(std::env::temp_dir().join("tunebridge_fetcher_missing"));
        assert!(fetcher.fetch_playlist("nope").is_err());
    }
}
