use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::types::{CueId, StopSignal};
use crate::kernel::error::CueError;

/// Granularity at which players check their stop signal.
pub const CHUNK: Duration = Duration::from_millis(20);

/// Renders audio cues. Runs on a blocking worker.
///
/// `render` blocks until the cue finishes or `stop` is raised; it must check
/// `stop` at least once per audio chunk.
pub trait SoundPlayer: Send + Sync {
    fn render(&self, cue: CueId, stop: &StopSignal) -> Result<(), CueError>;
}

/// Plays nothing, but takes as long as the real cue would.
#[derive(Debug, Clone)]
pub struct SilentPlayer {
    ambient: Duration,
    startle: Duration,
}

impl SilentPlayer {
    pub fn new(ambient: Duration, startle: Duration) -> Self {
        Self { ambient, startle }
    }
}

impl Default for SilentPlayer {
    fn default() -> Self {
        Self::new(Duration::from_millis(2500), Duration::from_millis(800))
    }
}

impl SoundPlayer for SilentPlayer {
    fn render(&self, cue: CueId, stop: &StopSignal) -> Result<(), CueError> {
        let length = match cue {
            CueId::Ambient => self.ambient,
            CueId::Startle => self.startle,
        };
        info!("[Sound] {:?} (no audio device)", cue);

        let started = Instant::now();
        while started.elapsed() < length {
            if stop.is_stopped() {
                debug!("[Sound] {:?} stopped early", cue);
                return Ok(());
            }
            std::thread::sleep(CHUNK.min(length.saturating_sub(started.elapsed())));
        }
        Ok(())
    }
}

/// Plays cue files through an external program, e.g. `aplay <file>`.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    files: HashMap<CueId, PathBuf>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>) -> Self {
        let mut files = HashMap::new();
        files.insert(CueId::Ambient, PathBuf::from("wake_up.wav"));
        files.insert(CueId::Startle, PathBuf::from("go_sleep.wav"));
        Self {
            program: program.into(),
            args: Vec::new(),
            files,
        }
    }

    /// Extra arguments placed before the file path.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_file(mut self, cue: CueId, path: impl Into<PathBuf>) -> Self {
        self.files.insert(cue, path.into());
        self
    }
}

impl SoundPlayer for CommandPlayer {
    fn render(&self, cue: CueId, stop: &StopSignal) -> Result<(), CueError> {
        let file = self.files.get(&cue).ok_or(CueError::Unavailable)?;
        info!("[Sound] Playing {:?} via {} {}", cue, self.program, file.display());

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        loop {
            if let Some(status) = child.try_wait()? {
                return if status.success() {
                    Ok(())
                } else {
                    Err(CueError::PlayerExit(status.to_string()))
                };
            }
            if stop.is_stopped() {
                debug!("[Sound] Killing player for {:?}", cue);
                let _ = child.kill();
                let _ = child.wait();
                return Ok(());
            }
            std::thread::sleep(CHUNK);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_player_honours_stop() {
        let player = SilentPlayer::new(Duration::from_secs(5), Duration::from_secs(5));
        let stop = StopSignal::new();
        stop.stop();
        let started = Instant::now();
        player.render(CueId::Ambient, &stop).unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn command_player_reports_missing_program() {
        let player = CommandPlayer::new("definitely-not-a-real-audio-player");
        let result = player.render(CueId::Startle, &StopSignal::new());
        assert!(matches!(result, Err(CueError::Io(_))));
    }
}
