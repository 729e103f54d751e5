//! OS media controls integration (MPRIS/SMTC/Now Playing).
//!
//! Maps platform transport-control events onto bridge commands and
//! publishes the bridge's playback state and current-track metadata back to
//! the OS via `souvlaki`. Transport events arrive on a platform callback
//! thread and are marshaled to the bridge through the bus like every other
//! off-context caller.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::warn;
use souvlaki::{MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, PlatformConfig};
use tokio::sync::broadcast::Sender;

use crate::protocol::{BridgeCommand, Message};
use crate::session_bridge::SessionBridge;

const MEDIA_CONTROLS_DISPLAY_NAME: &str = "Tunebridge";
const MEDIA_CONTROLS_DBUS_NAME: &str = "tunebridge";
const SEEK_STEP_SECS: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default)]
struct ControlState {
    is_playing: bool,
    elapsed_secs: f64,
    total_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaybackPublishState {
    Stopped,
    Paused,
    Playing,
}

#[derive(Debug, Clone, PartialEq)]
struct MetadataKey {
    title: String,
    artist: String,
    duration_ms: u64,
}

/// Publishes bridge playback state to the OS and forwards transport events.
pub struct MediaControlsManager {
    control_state: Arc<Mutex<ControlState>>,
    controls: Option<MediaControls>,
    last_published_playback: Option<PlaybackPublishState>,
    last_published_metadata: Option<Option<MetadataKey>>,
}

impl MediaControlsManager {
    /// Creates a manager and attempts to initialize platform media controls.
    pub fn new(bus_producer: Sender<Message>) -> Self {
        let control_state = Arc::new(Mutex::new(ControlState::default()));
        let controls = Self::create_controls(bus_producer, Arc::clone(&control_state));

        Self {
            control_state,
            controls,
            last_published_playback: None,
            last_published_metadata: None,
        }
    }

    #[cfg(not(target_os = "windows"))]
    fn create_controls(
        bus_producer: Sender<Message>,
        control_state: Arc<Mutex<ControlState>>,
    ) -> Option<MediaControls> {
        let mut controls = match MediaControls::new(PlatformConfig {
            display_name: MEDIA_CONTROLS_DISPLAY_NAME,
            dbus_name: MEDIA_CONTROLS_DBUS_NAME,
            hwnd: None,
        }) {
            Ok(controls) => controls,
            Err(err) => {
                warn!(
                    "MediaControlsManager: failed to create media controls backend: {}",
                    err
                );
                return None;
            }
        };

        if let Err(err) = controls.attach(move |event| {
            let snapshot = match control_state.lock() {
                Ok(state) => *state,
                Err(poisoned) => *poisoned.into_inner(),
            };

            if let Some(command) = Self::map_control_event(event, snapshot) {
                let _ = bus_producer.send(Message::Command(command));
            }
        }) {
            warn!(
                "MediaControlsManager: failed to attach media controls handler: {}",
                err
            );
            return None;
        }

        Some(controls)
    }

    #[cfg(target_os = "windows")]
    fn create_controls(
        _bus_producer: Sender<Message>,
        _control_state: Arc<Mutex<ControlState>>,
    ) -> Option<MediaControls> {
        // Souvlaki requires an HWND on Windows, which headless hosts do not
        // have to offer.
        warn!("MediaControlsManager: Windows media controls are disabled because no HWND is wired");
        None
    }

    fn map_control_event(event: MediaControlEvent, state: ControlState) -> Option<BridgeCommand> {
        match event {
            MediaControlEvent::Play => Some(BridgeCommand::Play),
            MediaControlEvent::Pause => Some(BridgeCommand::Pause),
            MediaControlEvent::Toggle => {
                if state.is_playing {
                    Some(BridgeCommand::Pause)
                } else {
                    Some(BridgeCommand::Play)
                }
            }
            MediaControlEvent::Next => Some(BridgeCommand::SkipNext),
            MediaControlEvent::Previous => Some(BridgeCommand::SkipPrevious),
            // There is no stop surface on the bridge; pausing is the
            // nearest observable state.
            MediaControlEvent::Stop => Some(BridgeCommand::Pause),
            MediaControlEvent::SetPosition(position) => {
                Self::seek_command_from_target_secs(state, position.0.as_secs_f64())
            }
            MediaControlEvent::SeekBy(direction, delta) => {
                let delta_secs = delta.as_secs_f64();
                let target_secs = match direction {
                    souvlaki::SeekDirection::Forward => state.elapsed_secs + delta_secs,
                    souvlaki::SeekDirection::Backward => (state.elapsed_secs - delta_secs).max(0.0),
                };
                Self::seek_command_from_target_secs(state, target_secs)
            }
            MediaControlEvent::Seek(direction) => {
                let target_secs = match direction {
                    souvlaki::SeekDirection::Forward => state.elapsed_secs + SEEK_STEP_SECS,
                    souvlaki::SeekDirection::Backward => {
                        (state.elapsed_secs - SEEK_STEP_SECS).max(0.0)
                    }
                };
                Self::seek_command_from_target_secs(state, target_secs)
            }
            MediaControlEvent::SetVolume(volume) => Some(BridgeCommand::SetVolume(volume)),
            MediaControlEvent::OpenUri(_) | MediaControlEvent::Raise | MediaControlEvent::Quit => {
                None
            }
        }
    }

    fn seek_command_from_target_secs(state: ControlState, target_secs: f64) -> Option<BridgeCommand> {
        if state.total_secs <= 0.0 {
            return None;
        }
        Some(BridgeCommand::Seek(target_secs.min(state.total_secs)))
    }

    /// Re-reads the bridge and republishes playback state and metadata when
    /// they changed. Called on the bound dispatch context after every
    /// message the runtime applies.
    pub fn publish(&mut self, bridge: &SessionBridge) {
        let current_track = bridge.current_track();
        let is_playing = !bridge.paused();
        {
            let mut state = match self.control_state.lock() {
                Ok(state) => state,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.is_playing = is_playing;
            state.elapsed_secs = bridge.current_time();
            state.total_secs = bridge.duration();
        }

        let desired_playback = match (&current_track, is_playing) {
            (None, _) => PlaybackPublishState::Stopped,
            (Some(_), true) => PlaybackPublishState::Playing,
            (Some(_), false) => PlaybackPublishState::Paused,
        };
        let duration_secs = bridge.duration();
        self.publish_playback_if_needed(desired_playback);
        self.publish_metadata_if_needed(current_track.as_ref().map(|track| MetadataKey {
            title: track.title.clone(),
            artist: track.artist.clone(),
            duration_ms: (duration_secs * 1000.0) as u64,
        }));
    }

    fn publish_playback_if_needed(&mut self, desired: PlaybackPublishState) {
        if self.last_published_playback == Some(desired) {
            return;
        }
        let Some(controls) = self.controls.as_mut() else {
            return;
        };

        let playback = match desired {
            PlaybackPublishState::Stopped => MediaPlayback::Stopped,
            PlaybackPublishState::Paused => MediaPlayback::Paused { progress: None },
            PlaybackPublishState::Playing => MediaPlayback::Playing { progress: None },
        };

        if let Err(err) = controls.set_playback(playback) {
            warn!(
                "MediaControlsManager: failed to publish playback state {:?}: {}",
                desired, err
            );
            return;
        }
        self.last_published_playback = Some(desired);
    }

    fn publish_metadata_if_needed(&mut self, key: Option<MetadataKey>) {
        if self.last_published_metadata.as_ref() == Some(&key) {
            return;
        }
        let Some(controls) = self.controls.as_mut() else {
            return;
        };

        let publish_result = if let Some(key) = key.as_ref() {
            let duration = (key.duration_ms > 0).then(|| Duration::from_millis(key.duration_ms));
            controls.set_metadata(MediaMetadata {
                title: Some(key.title.as_str()),
                artist: Some(key.artist.as_str()),
                album: None,
                cover_url: None,
                duration,
            })
        } else {
            controls.set_metadata(MediaMetadata::default())
        };

        if let Err(err) = publish_result {
            warn!("MediaControlsManager: failed to publish metadata: {}", err);
            return;
        }
        self.last_published_metadata = Some(key);
    }
}
