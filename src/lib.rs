//! # Tunebridge
//!
//! Native playback session bridge for hosts that embed scriptable content.
//!
//! The bridge owns the current playlist and track index, drives an underlying
//! playback engine through a uniform control surface, and republishes a
//! stable event surface (time updates, playback-state updates, source
//! updates) to subscribers. All session state is mutated on a single bound
//! dispatch context; engine notifications raised on other threads are
//! marshaled onto that context through the event bus.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tokio::sync::broadcast;
//! use tunebridge::{
//!     BridgeCommand, BridgeRuntime, HttpPlaylistFetcher, Message, PlaybackConfig,
//!     SessionBridge, SilentEngine,
//! };
//!
//! let (bus_sender, _) = broadcast::channel(8192);
//! let fetcher = HttpPlaylistFetcher::new("https://media.example.com");
//! let engine = SilentEngine::new(bus_sender.clone());
//! let bridge = SessionBridge::new(
//!     Box::new(fetcher),
//!     Some(Box::new(engine)),
//!     &PlaybackConfig::default(),
//! );
//! bridge.on_source_update(|track| println!("now playing: {:?}", track));
//!
//! let mut runtime = BridgeRuntime::new(&bus_sender, bridge);
//! let _ = bus_sender.send(Message::Command(BridgeCommand::PlayPlaylist {
//!     playlist_id: "jazz".to_string(),
//! }));
//! runtime.run();
//! ```

pub mod bridge_runtime;
pub mod config;
pub mod error;
pub mod event_registry;
pub mod media_controls_manager;
pub mod playback_engine;
pub mod playlist_fetcher;
pub mod protocol;
pub mod session_bridge;
pub mod track_metadata;

pub use bridge_runtime::{spawn_bridge_runtime, BridgeRuntime};
pub use config::{sanitize_config, Config, ContentConfig, PlaybackConfig};
pub use error::BridgeError;
pub use event_registry::{EventRegistry, SubscriptionId};
pub use media_controls_manager::MediaControlsManager;
pub use playback_engine::{EngineCall, PlaybackEngine, SilentEngine};
pub use playlist_fetcher::{
    DirectoryPlaylistFetcher, HttpPlaylistFetcher, PlaylistDocument, PlaylistEntry,
    PlaylistFetcher,
};
pub use protocol::{
    BridgeCommand, EngineNotification, EnginePlaybackState, Message, PlaybackItem,
};
pub use session_bridge::SessionBridge;
pub use track_metadata::TrackMetadata;

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
