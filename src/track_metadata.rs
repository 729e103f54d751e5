//! Track metadata exposed across the host boundary.

/// Metadata for a single audio track.
///
/// Instances are built while loading a playlist and published to session
/// state as part of an immutable snapshot; hosts receive clones and never
/// mutate the bridge's copy.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
pub struct TrackMetadata {
    /// Absolute URL of the audio file to play.
    pub src: String,
    /// The title of the track.
    pub title: String,
    /// The name of the artist for the track.
    pub artist: String,
    /// URL to an image that can be used as a thumbnail for the track,
    /// such as album art. Empty when the track has none.
    pub thumbnail_src: String,
}
