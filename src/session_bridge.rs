//! Playback session bridge.
//!
//! The bridge owns the current playlist and track index, drives the engine
//! through playlist loads and transport operations, and republishes a stable
//! event surface to subscribers. It wraps playback in native code so a host
//! can tear down its embedded content surface while playback continues
//! uninterrupted.

use std::sync::Arc;

use log::{debug, error};

use crate::config::PlaybackConfig;
use crate::event_registry::{EventRegistry, SubscriptionId};
use crate::playback_engine::PlaybackEngine;
use crate::playlist_fetcher::PlaylistFetcher;
use crate::protocol::{
    BridgeCommand, EngineNotification, EnginePlaybackState, Message, PlaybackItem,
};
use crate::track_metadata::TrackMetadata;

/// Stateful controller bridging a playback engine to host content.
///
/// All methods must be called on the bridge's bound dispatch context; at
/// runtime that is the [`BridgeRuntime`](crate::bridge_runtime::BridgeRuntime)
/// loop, which is also where engine notifications arriving on other threads
/// are redelivered before session state is touched.
pub struct SessionBridge {
    fetcher: Box<dyn PlaylistFetcher>,
    engine: Option<Box<dyn PlaybackEngine>>,

    // The playlist currently being played, published as one immutable
    // snapshot per load.
    playlist: Arc<[TrackMetadata]>,

    // Bridge-owned authoritative track index. The engine's own index updates
    // asynchronously; this value is written synchronously on load so callers
    // never observe a stale track while the engine catches up.
    current_track_index: Option<usize>,

    // Identifies the source list instance the engine currently holds.
    // Incremented at the start of every load; current-item notifications
    // tagged with an older generation belong to a superseded list and are
    // discarded.
    list_generation: u64,

    // Mirrors of the last volume/mute values, answered when no engine is
    // attached.
    volume: f64,
    muted: bool,

    time_update: EventRegistry<()>,
    playback_update: EventRegistry<()>,
    source_update: EventRegistry<Option<TrackMetadata>>,
}

impl SessionBridge {
    /// Creates a bridge around the given fetcher and engine.
    ///
    /// The configured default volume is applied immediately. A bridge
    /// without an engine still constructs; every engine-touching control
    /// operation becomes a no-op until one is attached.
    pub fn new(
        fetcher: Box<dyn PlaylistFetcher>,
        engine: Option<Box<dyn PlaybackEngine>>,
        config: &PlaybackConfig,
    ) -> Self {
        let volume = config.default_volume.clamp(0.0, 1.0);
        let mut bridge = Self {
            fetcher,
            engine,
            playlist: Arc::from(Vec::new()),
            current_track_index: None,
            list_generation: 0,
            volume,
            muted: false,
            time_update: EventRegistry::new(),
            playback_update: EventRegistry::new(),
            source_update: EventRegistry::new(),
        };
        if let Some(engine) = bridge.engine.as_mut() {
            engine.set_volume(volume);
        }
        bridge
    }

    /// Attaches an engine to a bridge constructed without one.
    pub fn attach_engine(&mut self, mut engine: Box<dyn PlaybackEngine>) {
        engine.set_volume(self.volume);
        engine.set_muted(self.muted);
        self.engine = Some(engine);
    }

    /// Loads a playlist and starts playback on a particular track.
    ///
    /// The whole playlist is handed to the engine as one source list, so the
    /// engine can keep playing through it after the selected track completes
    /// and can service next/previous transport presses itself.
    ///
    /// An empty `track_id` selects the first track.
    pub fn play_track(&mut self, playlist_id: &str, track_id: &str) -> crate::Result<()> {
        debug!("SessionBridge: loading playlist {playlist_id:?}, track {track_id:?}");

        // Detach the previous source list: from here on, current-item
        // notifications tagged with an older generation are discarded.
        self.list_generation += 1;
        let list_generation = self.list_generation;

        // The fetch is the only fallible step. Nothing below it runs on
        // failure, so the previous playlist and index survive a bad load.
        let document = self.fetcher.fetch_playlist(playlist_id)?;

        // Build the metadata list and the engine source list in lockstep,
        // one playback item per track, same index order.
        let mut tracks: Vec<TrackMetadata> = Vec::with_capacity(document.tracks.len());
        let mut items: Vec<PlaybackItem> = Vec::with_capacity(document.tracks.len());
        let mut initial_track_index = 0usize;
        for (index, entry) in document.tracks.iter().enumerate() {
            if !track_id.is_empty() && entry.id == track_id {
                initial_track_index = index;
            }
            let track = TrackMetadata {
                src: self.fetcher.track_uri(&entry.id),
                title: entry.title.clone(),
                artist: entry.artist.clone(),
                thumbnail_src: entry.image.clone(),
            };
            items.push(PlaybackItem::from_track(&track));
            tracks.push(track);
        }

        // Publish the new playlist as a single snapshot; no partially built
        // list is ever observable.
        self.playlist = tracks.into();

        // The engine's current-item index updates asynchronously; it may not
        // be set by the time this function returns. Record the intended index
        // here so callers reading it right after this call observe the new
        // track, and let the engine's own notification overwrite it once the
        // move settles.
        self.current_track_index = Some(initial_track_index);

        if let Some(engine) = self.engine.as_mut() {
            engine.set_source_list(list_generation, items);
            // Only valid once the list above is the engine's active source.
            engine.move_to(initial_track_index);
        }
        Ok(())
    }

    /// Loads a playlist and starts playback from the beginning.
    pub fn play_playlist(&mut self, playlist_id: &str) -> crate::Result<()> {
        self.play_track(playlist_id, "")
    }

    pub fn play(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.play();
        }
    }

    pub fn pause(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.pause();
        }
    }

    /// Switches to the next track, if able.
    pub fn skip_next(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.skip_next();
        }
    }

    /// Switches to the previous track, if able.
    pub fn skip_previous(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.skip_previous();
        }
    }

    /// Metadata of the currently playing track, when the current index
    /// points inside the playlist.
    pub fn current_track(&self) -> Option<TrackMetadata> {
        self.current_track_index
            .and_then(|index| self.playlist.get(index))
            .cloned()
    }

    /// Bridge-owned index of the current track in the playlist.
    pub fn current_track_index(&self) -> Option<usize> {
        self.current_track_index
    }

    /// Snapshot of the playlist currently being played.
    pub fn current_playlist(&self) -> Arc<[TrackMetadata]> {
        Arc::clone(&self.playlist)
    }

    /// Whether the engine is in the paused state.
    pub fn paused(&self) -> bool {
        self.engine
            .as_ref()
            .map(|engine| engine.playback_state() == EnginePlaybackState::Paused)
            .unwrap_or(true)
    }

    /// Whether the engine has played the current source through to
    /// completion: position equals the reported natural duration.
    pub fn ended(&self) -> bool {
        self.engine
            .as_ref()
            .map(|engine| engine.position_secs() == engine.duration_secs())
            .unwrap_or(false)
    }

    /// Playback position in the current track, in seconds.
    pub fn current_time(&self) -> f64 {
        self.engine
            .as_ref()
            .map(|engine| engine.position_secs())
            .unwrap_or(0.0)
    }

    pub fn set_current_time(&mut self, position_secs: f64) {
        if let Some(engine) = self.engine.as_mut() {
            engine.set_position_secs(position_secs);
        }
    }

    /// Total duration of the current track, in seconds.
    pub fn duration(&self) -> f64 {
        self.engine
            .as_ref()
            .map(|engine| engine.duration_secs())
            .unwrap_or(0.0)
    }

    /// Current volume, between 0.0 and 1.0.
    pub fn volume(&self) -> f64 {
        self.engine
            .as_ref()
            .map(|engine| engine.volume())
            .unwrap_or(self.volume)
    }

    pub fn set_volume(&mut self, volume: f64) {
        let volume = volume.clamp(0.0, 1.0);
        self.volume = volume;
        if let Some(engine) = self.engine.as_mut() {
            engine.set_volume(volume);
        }
    }

    pub fn muted(&self) -> bool {
        self.engine
            .as_ref()
            .map(|engine| engine.muted())
            .unwrap_or(self.muted)
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if let Some(engine) = self.engine.as_mut() {
            engine.set_muted(muted);
        }
    }

    /// Registers a callback fired when the playback position moves.
    /// Subscribers re-read [`current_time`](Self::current_time) and
    /// [`duration`](Self::duration); the event carries no payload.
    pub fn on_time_update(
        &self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.time_update.subscribe(move |_| callback())
    }

    pub fn remove_time_update(&self, id: &SubscriptionId) -> bool {
        self.time_update.unsubscribe(id)
    }

    /// Registers a callback fired when the playback state changes.
    /// Subscribers re-read [`paused`](Self::paused) and
    /// [`ended`](Self::ended).
    pub fn on_playback_update(
        &self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.playback_update.subscribe(move |_| callback())
    }

    pub fn remove_playback_update(&self, id: &SubscriptionId) -> bool {
        self.playback_update.unsubscribe(id)
    }

    /// Registers a callback fired when the current track changes. The
    /// payload is the new current track, or `None` when the engine moved
    /// outside the playlist.
    pub fn on_source_update(
        &self,
        callback: impl Fn(&Option<TrackMetadata>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.source_update.subscribe(callback)
    }

    pub fn remove_source_update(&self, id: &SubscriptionId) -> bool {
        self.source_update.unsubscribe(id)
    }

    /// Applies one bus message on the bound dispatch context.
    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::Command(command) => self.handle_command(command),
            Message::Engine(notification) => self.handle_engine_notification(notification),
        }
    }

    fn handle_command(&mut self, command: BridgeCommand) {
        match command {
            BridgeCommand::PlayTrack {
                playlist_id,
                track_id,
            } => {
                if let Err(err) = self.play_track(&playlist_id, &track_id) {
                    error!("SessionBridge: failed to play track {track_id:?} in playlist {playlist_id:?}: {err}");
                }
            }
            BridgeCommand::PlayPlaylist { playlist_id } => {
                if let Err(err) = self.play_playlist(&playlist_id) {
                    error!("SessionBridge: failed to play playlist {playlist_id:?}: {err}");
                }
            }
            BridgeCommand::Play => self.play(),
            BridgeCommand::Pause => self.pause(),
            BridgeCommand::SkipNext => self.skip_next(),
            BridgeCommand::SkipPrevious => self.skip_previous(),
            BridgeCommand::Seek(position_secs) => self.set_current_time(position_secs),
            BridgeCommand::SetVolume(volume) => self.set_volume(volume),
            BridgeCommand::SetMuted(muted) => self.set_muted(muted),
        }
    }

    fn handle_engine_notification(&mut self, notification: EngineNotification) {
        match notification {
            EngineNotification::PositionChanged => self.time_update.emit(&()),
            EngineNotification::PlaybackStateChanged => self.playback_update.emit(&()),
            EngineNotification::CurrentItemChanged {
                list_generation,
                index,
            } => {
                if list_generation != self.list_generation {
                    debug!(
                        "SessionBridge: discarding item change from superseded list \
                         (generation {list_generation}, current {})",
                        self.list_generation
                    );
                    return;
                }
                // The engine's index is now settled; it overwrites the
                // optimistic value written during the load.
                self.current_track_index = index;
                self.source_update.emit(&self.current_track());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaybackConfig;
    use crate::playback_engine::{EngineCall, SilentEngine};
    use crate::playlist_fetcher::PlaylistDocument;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::broadcast::{self, error::TryRecvError, Receiver};

    struct FakeFetcher {
        playlists: HashMap<String, String>,
    }

    impl FakeFetcher {
        fn new(playlists: &[(&str, &str)]) -> Self {
            Self {
                playlists: playlists
                    .iter()
                    .map(|(id, raw)| (id.to_string(), raw.to_string()))
                    .collect(),
            }
        }
    }

    impl PlaylistFetcher for FakeFetcher {
        fn fetch_playlist(&self, playlist_id: &str) -> crate::Result<PlaylistDocument> {
            let raw = self
                .playlists
                .get(playlist_id)
                .ok_or_else(|| crate::BridgeError::Fetch(format!("no playlist {playlist_id}")))?;
            Ok(serde_json::from_str(raw)?)
        }

        fn track_uri(&self, track_id: &str) -> String {
            format!("https://media.test/music/{track_id}.mp3")
        }
    }

    const JAZZ: &str = r#"{"Tracks":[
        {"Id":"a","Title":"A","Artist":"Artist A","Image":"a.png"},
        {"Id":"b","Title":"B","Artist":"Artist B"}
    ]}"#;
    const ROCK: &str = r#"{"Tracks":[
        {"Id":"x","Title":"X","Artist":"Artist X"},
        {"Id":"y","Title":"Y","Artist":"Artist Y"},
        {"Id":"z","Title":"Z","Artist":"Artist Z"}
    ]}"#;

    fn test_bridge() -> (SessionBridge, SilentEngine, Receiver<Message>) {
        let (bus_sender, receiver) = broadcast::channel(1024);
        let engine = SilentEngine::new(bus_sender);
        let fetcher = FakeFetcher::new(&[("jazz", JAZZ), ("rock", ROCK)]);
        let bridge = SessionBridge::new(
            Box::new(fetcher),
            Some(Box::new(engine.clone())),
            &PlaybackConfig::default(),
        );
        (bridge, engine, receiver)
    }

    fn pump(bridge: &mut SessionBridge, receiver: &mut Receiver<Message>) {
        loop {
            match receiver.try_recv() {
                Ok(message) => bridge.handle_message(message),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    fn record_source_updates(bridge: &SessionBridge) -> Arc<Mutex<Vec<Option<TrackMetadata>>>> {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        bridge.on_source_update(move |track| sink.lock().unwrap().push(track.clone()));
        updates
    }

    #[test]
    fn test_play_track_selects_requested_index_before_engine_confirms() {
        let (mut bridge, _engine, _receiver) = test_bridge();

        bridge.play_track("jazz", "b").expect("load should succeed");

        // No engine notification has been pumped yet; the index must
        // already be visible.
        assert_eq!(bridge.current_track_index(), Some(1));
        let track = bridge.current_track().expect("current track");
        assert_eq!(track.title, "B");
        assert_eq!(track.src, "https://media.test/music/b.mp3");
        assert_eq!(bridge.current_playlist().len(), 2);
    }

    #[test]
    fn test_play_track_with_empty_track_id_starts_at_first_track() {
        let (mut bridge, _engine, _receiver) = test_bridge();
        bridge.play_playlist("jazz").expect("load should succeed");
        assert_eq!(bridge.current_track_index(), Some(0));
        assert_eq!(bridge.current_track().unwrap().title, "A");
    }

    #[test]
    fn test_play_track_with_unknown_track_id_defaults_to_first_track() {
        let (mut bridge, _engine, _receiver) = test_bridge();
        bridge
            .play_track("jazz", "missing")
            .expect("load should succeed");
        assert_eq!(bridge.current_track_index(), Some(0));
    }

    #[test]
    fn test_failed_fetch_leaves_previous_session_state_untouched() {
        let (mut bridge, _engine, mut receiver) = test_bridge();
        bridge.play_track("jazz", "b").expect("load should succeed");
        pump(&mut bridge, &mut receiver);

        let before_playlist = bridge.current_playlist();
        let before_index = bridge.current_track_index();

        assert!(bridge.play_track("missing", "whatever").is_err());

        assert_eq!(bridge.current_track_index(), before_index);
        assert_eq!(*bridge.current_playlist(), *before_playlist);
        assert_eq!(bridge.current_track().unwrap().title, "B");
    }

    #[test]
    fn test_engine_sees_source_list_before_move() {
        let (mut bridge, engine, _receiver) = test_bridge();
        bridge.play_track("jazz", "b").expect("load should succeed");

        let calls = engine.recorded_calls();
        assert_eq!(
            calls,
            vec![
                EngineCall::SetVolume(0.1),
                EngineCall::SetSourceList {
                    list_generation: 1,
                    item_count: 2,
                },
                EngineCall::MoveTo(1),
            ]
        );
    }

    #[test]
    fn test_item_change_notification_overwrites_index_and_fires_source_update() {
        let (mut bridge, _engine, mut receiver) = test_bridge();
        let updates = record_source_updates(&bridge);

        bridge.play_track("jazz", "b").expect("load should succeed");
        pump(&mut bridge, &mut receiver);

        assert_eq!(bridge.current_track_index(), Some(1));
        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].as_ref().unwrap().title, "B");
    }

    #[test]
    fn test_duplicate_item_change_notifications_are_idempotent() {
        let (mut bridge, _engine, mut receiver) = test_bridge();
        let updates = record_source_updates(&bridge);

        bridge.play_track("jazz", "a").expect("load should succeed");
        pump(&mut bridge, &mut receiver);

        let duplicate = Message::Engine(EngineNotification::CurrentItemChanged {
            list_generation: 1,
            index: Some(0),
        });
        bridge.handle_message(duplicate.clone());
        bridge.handle_message(duplicate);

        assert_eq!(bridge.current_track_index(), Some(0));
        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[1], updates[2]);
        assert_eq!(updates[2].as_ref().unwrap().title, "A");
    }

    #[test]
    fn test_stale_list_notification_does_not_alter_session_state() {
        let (mut bridge, _engine, mut receiver) = test_bridge();
        let updates = record_source_updates(&bridge);

        // Load jazz but leave its engine confirmation queued, then supersede
        // it with rock. The queued notification belongs to the detached list.
        bridge.play_track("jazz", "b").expect("load should succeed");
        bridge.play_track("rock", "z").expect("load should succeed");
        pump(&mut bridge, &mut receiver);

        assert_eq!(bridge.current_track_index(), Some(2));
        assert_eq!(bridge.current_track().unwrap().title, "Z");
        // Only the rock confirmation fired a source update.
        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].as_ref().unwrap().title, "Z");
    }

    #[test]
    fn test_out_of_range_item_change_fires_empty_source_update() {
        let (mut bridge, _engine, mut receiver) = test_bridge();
        let updates = record_source_updates(&bridge);

        bridge.play_track("jazz", "a").expect("load should succeed");
        pump(&mut bridge, &mut receiver);

        bridge.handle_message(Message::Engine(EngineNotification::CurrentItemChanged {
            list_generation: 1,
            index: Some(99),
        }));

        assert!(bridge.current_track().is_none());
        let updates = updates.lock().unwrap();
        assert_eq!(updates.last().unwrap(), &None);
    }

    #[test]
    fn test_position_and_state_notifications_fire_their_events() {
        let (mut bridge, _engine, _receiver) = test_bridge();
        let time_updates = Arc::new(Mutex::new(0usize));
        let playback_updates = Arc::new(Mutex::new(0usize));

        let time_sink = Arc::clone(&time_updates);
        bridge.on_time_update(move || *time_sink.lock().unwrap() += 1);
        let playback_sink = Arc::clone(&playback_updates);
        bridge.on_playback_update(move || *playback_sink.lock().unwrap() += 1);

        bridge.handle_message(Message::Engine(EngineNotification::PositionChanged));
        bridge.handle_message(Message::Engine(EngineNotification::PositionChanged));
        bridge.handle_message(Message::Engine(EngineNotification::PlaybackStateChanged));

        assert_eq!(*time_updates.lock().unwrap(), 2);
        assert_eq!(*playback_updates.lock().unwrap(), 1);
    }

    #[test]
    fn test_unsubscribed_listener_stops_receiving() {
        let (mut bridge, _engine, _receiver) = test_bridge();
        let count = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&count);
        let id = bridge.on_time_update(move || *sink.lock().unwrap() += 1);

        bridge.handle_message(Message::Engine(EngineNotification::PositionChanged));
        assert!(bridge.remove_time_update(&id));
        bridge.handle_message(Message::Engine(EngineNotification::PositionChanged));

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_volume_and_mute_round_trip() {
        let (mut bridge, _engine, _receiver) = test_bridge();
        assert_eq!(bridge.volume(), 0.1);

        bridge.set_volume(0.25);
        assert_eq!(bridge.volume(), 0.25);
        bridge.set_volume(7.0);
        assert_eq!(bridge.volume(), 1.0);

        assert!(!bridge.muted());
        bridge.set_muted(true);
        assert!(bridge.muted());
    }

    #[test]
    fn test_ended_requires_exact_position_duration_match() {
        let (mut bridge, engine, _receiver) = test_bridge();
        bridge.play_track("jazz", "a").expect("load should succeed");

        engine.set_track_duration_secs(120.0);
        bridge.set_current_time(119.5);
        assert!(!bridge.ended());
        bridge.set_current_time(120.0);
        assert!(bridge.ended());
    }

    #[test]
    fn test_missing_document_fields_default_to_empty_strings() {
        let (bus_sender, _receiver) = broadcast::channel(64);
        let engine = SilentEngine::new(bus_sender);
        let fetcher = FakeFetcher::new(&[("sparse", r#"{"Tracks":[{"Id":"only-id"}]}"#)]);
        let mut bridge = SessionBridge::new(
            Box::new(fetcher),
            Some(Box::new(engine)),
            &PlaybackConfig::default(),
        );

        bridge.play_playlist("sparse").expect("load should succeed");
        let track = bridge.current_track().expect("current track");
        assert_eq!(track.src, "https://media.test/music/only-id.mp3");
        assert_eq!(track.title, "");
        assert_eq!(track.artist, "");
        assert_eq!(track.thumbnail_src, "");
    }

    #[test]
    fn test_bridge_without_engine_constructs_and_stays_inert() {
        let fetcher = FakeFetcher::new(&[("jazz", JAZZ)]);
        let mut bridge = SessionBridge::new(Box::new(fetcher), None, &PlaybackConfig::default());

        assert_eq!(bridge.volume(), 0.1);
        assert!(bridge.paused());
        assert!(!bridge.ended());
        assert_eq!(bridge.duration(), 0.0);

        // Control surface stays callable without an engine.
        bridge.play();
        bridge.pause();
        bridge.skip_next();
        bridge.skip_previous();
        bridge.set_current_time(10.0);
        assert_eq!(bridge.current_time(), 0.0);

        // Loads still update bridge-owned session state.
        bridge.play_track("jazz", "b").expect("load should succeed");
        assert_eq!(bridge.current_track_index(), Some(1));
        assert_eq!(bridge.current_playlist().len(), 2);

        bridge.set_volume(0.8);
        bridge.set_muted(true);
        assert_eq!(bridge.volume(), 0.8);
        assert!(bridge.muted());
    }

    #[test]
    fn test_end_to_end_jazz_scenario() {
        let (mut bridge, _engine, mut receiver) = test_bridge();
        let updates = record_source_updates(&bridge);

        bridge.play_track("jazz", "b").expect("load should succeed");
        assert_eq!(bridge.current_track_index(), Some(1));
        assert_eq!(bridge.current_track().unwrap().title, "B");

        pump(&mut bridge, &mut receiver);

        assert_eq!(bridge.current_track_index(), Some(1));
        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].as_ref().unwrap().title, "B");
    }
}
