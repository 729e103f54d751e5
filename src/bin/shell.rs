//! Headless shell wiring the session bridge against the silent engine.
//!
//! Useful for exercising a content source end to end without a platform
//! engine or host surface: loads config, plays the requested playlist, and
//! logs every bridge event until interrupted.

use std::env;

use log::{debug, info, warn};
use tokio::sync::broadcast;

use tunebridge::{
    sanitize_config, BridgeCommand, BridgeRuntime, Config, DirectoryPlaylistFetcher,
    HttpPlaylistFetcher, MediaControlsManager, Message, PlaylistFetcher, SessionBridge,
    SilentEngine,
};

fn load_config() -> Config {
    let Some(config_root) = dirs::config_dir().map(|dir| dir.join("tunebridge")) else {
        warn!("No config directory available, using defaults");
        return sanitize_config(Config::default());
    };
    let config_file = config_root.join("config.toml");

    if !config_file.exists() {
        let default_config = sanitize_config(Config::default());
        info!(
            "Config file not found. Creating default config. path={}",
            config_file.display()
        );
        if let Err(err) = std::fs::create_dir_all(&config_root) {
            warn!("Failed to create config directory: {err}");
            return default_config;
        }
        let serialized = toml::to_string(&default_config).unwrap_or_default();
        if let Err(err) = std::fs::write(&config_file, serialized) {
            warn!("Failed to write default config: {err}");
        }
        return default_config;
    }

    let content = std::fs::read_to_string(&config_file).unwrap_or_default();
    sanitize_config(toml::from_str::<Config>(&content).unwrap_or_default())
}

fn main() {
    let mut clog = colog::default_builder();
    clog.init();

    let mut args = env::args().skip(1);
    let playlist_id = args.next().unwrap_or_else(|| "jazz".to_string());
    let track_id = args.next().unwrap_or_default();

    let config = load_config();
    let fetcher: Box<dyn PlaylistFetcher> = if config.content.endpoint.is_empty() {
        let root = env::current_dir().expect("current directory should be readable");
        info!("Reading content from {}", root.display());
        Box::new(DirectoryPlaylistFetcher::new(root))
    } else {
        info!("Fetching content from {}", config.content.endpoint);
        Box::new(HttpPlaylistFetcher::from_config(&config.content))
    };

    let (bus_sender, _) = broadcast::channel(8192);
    let engine = SilentEngine::new(bus_sender.clone());
    let bridge = SessionBridge::new(fetcher, Some(Box::new(engine)), &config.playback);

    bridge.on_source_update(|track| match track {
        Some(track) => info!("Now playing: {} - {}", track.artist, track.title),
        None => info!("Now playing: nothing"),
    });
    bridge.on_playback_update(|| debug!("Playback state changed"));
    bridge.on_time_update(|| debug!("Position changed"));

    let mut runtime = BridgeRuntime::new(&bus_sender, bridge)
        .with_media_controls(MediaControlsManager::new(bus_sender.clone()));

    let _ = bus_sender.send(Message::Command(BridgeCommand::PlayTrack {
        playlist_id,
        track_id,
    }));

    // Runs until the process is interrupted.
    runtime.run();
}
