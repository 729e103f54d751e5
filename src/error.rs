//! Error types for tunebridge.

use thiserror::Error;

/// Errors surfaced by playlist loads.
///
/// A failed load is fatal to that one operation only: the initiating
/// `play_track`/`play_playlist` call returns the error and prior session
/// state is left as it was. Nothing in the bridge retries.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Playlist document could not be retrieved.
    #[error("playlist fetch failed: {0}")]
    Fetch(String),

    /// Playlist document was retrieved but did not parse.
    #[error("malformed playlist document: {0}")]
    MalformedPlaylist(#[from] serde_json::Error),

    /// Local playlist file could not be read.
    #[error("playlist read failed: {0}")]
    Io(#[from] std::io::Error),
}
