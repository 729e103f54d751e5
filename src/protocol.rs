//! Event-bus protocol shared by the session bridge runtime.
//!
//! This module defines the message payloads exchanged between host glue,
//! engine adapters, and the bridge's dispatch loop. Everything that wants to
//! touch session state from another thread sends one of these instead.

use crate::track_metadata::TrackMetadata;

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    /// Control request directed at the bridge.
    Command(BridgeCommand),
    /// Raw notification re-emitted by a playback engine adapter.
    Engine(EngineNotification),
}

/// Control requests a host (or transport-control integration) can issue.
#[derive(Debug, Clone)]
pub enum BridgeCommand {
    /// Load a playlist and start on the track with the given id.
    /// An empty track id selects the first track.
    PlayTrack {
        playlist_id: String,
        track_id: String,
    },
    /// Load a playlist and start from the beginning.
    PlayPlaylist { playlist_id: String },
    Play,
    Pause,
    SkipNext,
    SkipPrevious,
    /// Absolute seek position in seconds.
    Seek(f64),
    /// Volume between 0.0 and 1.0.
    SetVolume(f64),
    SetMuted(bool),
}

/// Raw notifications emitted by a playback engine adapter.
///
/// Engines may raise these on their own callback threads. They carry no
/// settled state beyond what is needed for reconciliation; subscribers are
/// expected to re-read the bridge once the notification has been handled on
/// the bound dispatch context.
#[derive(Debug, Clone)]
pub enum EngineNotification {
    /// The engine's playback position moved.
    PositionChanged,
    /// The engine's playback state changed.
    PlaybackStateChanged,
    /// Playback switched to another item in the active source list.
    ///
    /// `list_generation` identifies the source list instance the engine was
    /// playing from, so late notifications from a superseded list can be
    /// discarded instead of corrupting the current session's index.
    CurrentItemChanged {
        list_generation: u64,
        index: Option<usize>,
    },
}

/// Playback states reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePlaybackState {
    None,
    Opening,
    Buffering,
    Playing,
    Paused,
}

/// One entry in an engine source list.
///
/// Built in lockstep with the session playlist: one [`TrackMetadata`] always
/// maps to exactly one `PlaybackItem` at the same index. The display fields
/// let the engine surface now-playing information to the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackItem {
    /// Absolute URI of the media to play.
    pub source_uri: String,
    /// Track title for display surfaces.
    pub title: String,
    /// Artist name for display surfaces.
    pub artist: String,
    /// Thumbnail URI, empty when the track has none.
    pub thumbnail_uri: String,
}

impl PlaybackItem {
    /// Builds the engine item that backs the given track.
    pub fn from_track(track: &TrackMetadata) -> Self {
        Self {
            source_uri: track.src.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            thumbnail_uri: track.thumbnail_src.clone(),
        }
    }
}
