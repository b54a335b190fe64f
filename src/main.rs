use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use elf::devices::{
    Actuator, CommandPlayer, CueId, Detector, LoggingActuator, NullDetector, ScriptedDetector, SilentPlayer,
    SoundPlayer,
};
use elf::kernel::config::load_json;
use elf::{BehaviorConfig, BehaviorController};

/// Harness settings around the behavior kernel. Loaded from the JSON file
/// given as the first argument; everything is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AppConfig {
    behavior: BehaviorConfig,
    /// Presence script replayed one character per poll (`T` present, `.` absent, `!` fault).
    /// Without it there is no sensor and the robot never freezes.
    detector_script: Option<String>,
    player: Option<PlayerConfig>,
}

#[derive(Debug, Deserialize)]
struct PlayerConfig {
    program: String,
    #[serde(default)]
    args: Vec<String>,
    ambient_file: Option<PathBuf>,
    startle_file: Option<PathBuf>,
}

fn load_config() -> anyhow::Result<AppConfig> {
    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        return Ok(AppConfig::default());
    };
    let config: AppConfig = load_json(&path)?;
    config.behavior.validate()?;
    Ok(config)
}

fn build_player(config: Option<PlayerConfig>) -> Arc<dyn SoundPlayer> {
    let Some(config) = config else {
        return Arc::new(SilentPlayer::default());
    };
    let mut player = CommandPlayer::new(config.program).with_args(config.args);
    if let Some(file) = config.ambient_file {
        player = player.with_file(CueId::Ambient, file);
    }
    if let Some(file) = config.startle_file {
        player = player.with_file(CueId::Startle, file);
    }
    Arc::new(player)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let config = load_config()?;
    tracing::info!("Elf booting...");

    let detector: Arc<dyn Detector> = match config.detector_script.as_deref() {
        Some(script) => Arc::new(ScriptedDetector::parse(script)),
        None => {
            tracing::info!("No detector configured, running in mock mode");
            Arc::new(NullDetector)
        }
    };
    let actuator: Arc<dyn Actuator> = Arc::new(LoggingActuator::new());
    let player = build_player(config.player);

    if let Err(e) = actuator.enable() {
        tracing::warn!("Motor enable failed: {}", e);
    }

    let handle = BehaviorController::start(config.behavior, detector, Arc::clone(&actuator), player)?;
    tracing::info!("Elf active. Press Ctrl+C to stop.");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
    }

    tracing::info!("Stopping (last state: {:?})", handle.state());
    handle.stop().await;

    if let Err(e) = actuator.disable() {
        tracing::warn!("Motor disable failed: {}", e);
    }
    tracing::info!("Goodbye");
    Ok(())
}
