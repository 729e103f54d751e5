//! Playback engine adapter contract and the in-crate silent engine.
//!
//! An engine adapter presents a uniform control surface over whatever is
//! actually producing audio. Mutating operations are fire-and-forget: the
//! engine's position, state, and current index are not guaranteed to reflect
//! a just-issued command by the time the call returns. Callers rely on the
//! [`EngineNotification`]s the adapter re-emits over the bus, never on
//! return values, for settled state.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast::Sender;

use crate::protocol::{EngineNotification, EnginePlaybackState, Message, PlaybackItem};

/// Uniform control surface over a platform playback engine.
///
/// `move_to` must only be invoked after `set_source_list` has taken effect
/// for that list instance; invoking it against a stale list is undefined.
/// `skip_next`/`skip_previous` are no-ops when no source list is active.
pub trait PlaybackEngine: Send {
    /// Replaces the active source list. Subsequent current-item
    /// notifications carry `list_generation` so consumers can tell which
    /// list instance they belong to.
    fn set_source_list(&mut self, list_generation: u64, items: Vec<PlaybackItem>);
    fn move_to(&mut self, index: usize);
    fn play(&mut self);
    fn pause(&mut self);
    fn playback_state(&self) -> EnginePlaybackState;
    fn position_secs(&self) -> f64;
    fn set_position_secs(&mut self, position_secs: f64);
    fn duration_secs(&self) -> f64;
    fn volume(&self) -> f64;
    fn set_volume(&mut self, volume: f64);
    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    fn skip_next(&mut self);
    fn skip_previous(&mut self);
}

/// One control call observed by the silent engine, for inspection in tests
/// and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    SetSourceList {
        list_generation: u64,
        item_count: usize,
    },
    MoveTo(usize),
    Play,
    Pause,
    SetPosition(f64),
    SetVolume(f64),
    SetMuted(bool),
    SkipNext,
    SkipPrevious,
}

struct SilentEngineState {
    items: Vec<PlaybackItem>,
    list_generation: u64,
    current_index: Option<usize>,
    playback_state: EnginePlaybackState,
    position_secs: f64,
    duration_secs: f64,
    volume: f64,
    muted: bool,
    calls: Vec<EngineCall>,
}

/// Engine that tracks control state and emits notifications without
/// producing audio.
///
/// Used headless where no platform engine is available, and as the test
/// double for the bridge. Clones share one underlying state, so a clone
/// kept by a harness can observe and steer the instance handed to the
/// bridge.
#[derive(Clone)]
pub struct SilentEngine {
    bus_sender: Sender<Message>,
    state: Arc<Mutex<SilentEngineState>>,
}

impl SilentEngine {
    pub fn new(bus_sender: Sender<Message>) -> Self {
        Self {
            bus_sender,
            state: Arc::new(Mutex::new(SilentEngineState {
                items: Vec::new(),
                list_generation: 0,
                current_index: None,
                playback_state: EnginePlaybackState::None,
                position_secs: 0.0,
                duration_secs: 0.0,
                volume: 1.0,
                muted: false,
                calls: Vec::new(),
            })),
        }
    }

    /// Control calls observed so far, in order.
    pub fn recorded_calls(&self) -> Vec<EngineCall> {
        self.lock_state().calls.clone()
    }

    /// Sets the natural duration reported for the current track.
    pub fn set_track_duration_secs(&self, duration_secs: f64) {
        self.lock_state().duration_secs = duration_secs.max(0.0);
    }

    fn lock_state(&self) -> MutexGuard<'_, SilentEngineState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn notify(&self, notification: EngineNotification) {
        let _ = self.bus_sender.send(Message::Engine(notification));
    }

    fn move_index(&mut self, index: usize) {
        let list_generation = {
            let mut state = self.lock_state();
            state.current_index = Some(index);
            state.position_secs = 0.0;
            state.list_generation
        };
        self.notify(EngineNotification::CurrentItemChanged {
            list_generation,
            index: Some(index),
        });
    }
}

impl PlaybackEngine for SilentEngine {
    fn set_source_list(&mut self, list_generation: u64, items: Vec<PlaybackItem>) {
        let mut state = self.lock_state();
        state.calls.push(EngineCall::SetSourceList {
            list_generation,
            item_count: items.len(),
        });
        state.items = items;
        state.list_generation = list_generation;
        state.current_index = None;
        state.position_secs = 0.0;
        state.playback_state = EnginePlaybackState::Opening;
    }

    fn move_to(&mut self, index: usize) {
        self.lock_state().calls.push(EngineCall::MoveTo(index));
        self.move_index(index);
    }

    fn play(&mut self) {
        {
            let mut state = self.lock_state();
            state.calls.push(EngineCall::Play);
            state.playback_state = EnginePlaybackState::Playing;
        }
        self.notify(EngineNotification::PlaybackStateChanged);
    }

    fn pause(&mut self) {
        {
            let mut state = self.lock_state();
            state.calls.push(EngineCall::Pause);
            state.playback_state = EnginePlaybackState::Paused;
        }
        self.notify(EngineNotification::PlaybackStateChanged);
    }

    fn playback_state(&self) -> EnginePlaybackState {
        self.lock_state().playback_state
    }

    fn position_secs(&self) -> f64 {
        self.lock_state().position_secs
    }

    fn set_position_secs(&mut self, position_secs: f64) {
        {
            let mut state = self.lock_state();
            state.calls.push(EngineCall::SetPosition(position_secs));
            let duration = state.duration_secs;
            state.position_secs = if duration > 0.0 {
                position_secs.clamp(0.0, duration)
            } else {
                position_secs.max(0.0)
            };
        }
        self.notify(EngineNotification::PositionChanged);
    }

    fn duration_secs(&self) -> f64 {
        self.lock_state().duration_secs
    }

    fn volume(&self) -> f64 {
        self.lock_state().volume
    }

    fn set_volume(&mut self, volume: f64) {
        let mut state = self.lock_state();
        state.calls.push(EngineCall::SetVolume(volume));
        state.volume = volume.clamp(0.0, 1.0);
    }

    fn muted(&self) -> bool {
        self.lock_state().muted
    }

    fn set_muted(&mut self, muted: bool) {
        let mut state = self.lock_state();
        state.calls.push(EngineCall::SetMuted(muted));
        state.muted = muted;
    }

    fn skip_next(&mut self) {
        let next_index = {
            let mut state = self.lock_state();
            state.calls.push(EngineCall::SkipNext);
            match state.current_index {
                Some(index) if index + 1 < state.items.len() => Some(index + 1),
                _ => None,
            }
        };
        if let Some(index) = next_index {
            self.move_index(index);
        }
    }

    fn skip_previous(&mut self) {
        let previous_index = {
            let mut state = self.lock_state();
            state.calls.push(EngineCall::SkipPrevious);
            match state.current_index {
                Some(index) if index > 0 => Some(index - 1),
                _ => None,
            }
        };
        if let Some(index) = previous_index {
            self.move_index(index);
        }
    }
}
