//! Bound dispatch context for the session bridge.
//!
//! The runtime subscribes to the event bus and is the single place session
//! state is mutated: host commands and engine notifications raised on other
//! threads all arrive here as bus messages and are applied in order. This
//! keeps the bridge lock-free by construction.

use std::thread;

use log::{info, warn};
use tokio::sync::broadcast::{error::RecvError, error::TryRecvError, Receiver, Sender};

use crate::media_controls_manager::MediaControlsManager;
use crate::protocol::Message;
use crate::session_bridge::SessionBridge;

/// Owns a [`SessionBridge`] and drains the bus into it.
pub struct BridgeRuntime {
    bus_receiver: Receiver<Message>,
    bridge: SessionBridge,
    media_controls: Option<MediaControlsManager>,
}

impl BridgeRuntime {
    /// Binds the bridge to the bus. The subscription is taken here, so
    /// messages sent after this call are never missed.
    pub fn new(bus_sender: &Sender<Message>, bridge: SessionBridge) -> Self {
        Self {
            bus_receiver: bus_sender.subscribe(),
            bridge,
            media_controls: None,
        }
    }

    /// Adds an OS transport-controls integration, republished after every
    /// dispatched message.
    pub fn with_media_controls(mut self, media_controls: MediaControlsManager) -> Self {
        self.media_controls = Some(media_controls);
        self
    }

    pub fn bridge(&self) -> &SessionBridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut SessionBridge {
        &mut self.bridge
    }

    fn dispatch(&mut self, message: Message) {
        self.bridge.handle_message(message);
        if let Some(media_controls) = self.media_controls.as_mut() {
            media_controls.publish(&self.bridge);
        }
    }

    /// Applies every message currently queued, without blocking.
    pub fn drain_pending(&mut self) {
        loop {
            match self.bus_receiver.try_recv() {
                Ok(message) => self.dispatch(message),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("BridgeRuntime: bus lagged by {skipped} messages");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    /// Runs the blocking dispatch loop until the bus closes.
    ///
    /// A closed bus means the bound context is gone; the loop exits and no
    /// further subscriber callbacks are attempted.
    pub fn run(&mut self) {
        info!("BridgeRuntime: started");
        loop {
            match self.bus_receiver.blocking_recv() {
                Ok(message) => self.dispatch(message),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("BridgeRuntime: bus lagged by {skipped} messages");
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("BridgeRuntime: bus closed, event delivery stopped");
    }
}

/// Spawns the dispatch loop on its own thread.
pub fn spawn_bridge_runtime(mut runtime: BridgeRuntime) -> thread::JoinHandle<()> {
    thread::spawn(move || runtime.run())
}
