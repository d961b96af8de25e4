//! Core media engine for audio playback

use crate::playback_thread::{PlaybackCommand, PlaybackThread, SharedSink};
use crate::{AudioDecoder, EngineError, EngineResult};
use earshot_core::{AppError, AudioEngine, EngineEventSink, PlaybackRate, Result, Volume};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Symphonia + cpal implementation of [`AudioEngine`]
///
/// Each loaded file gets its own playback thread. Position, rate and volume
/// set before the thread exists are applied when it starts.
pub struct MediaEngine {
    thread: Option<PlaybackThread>,
    path: Option<PathBuf>,
    rate: f32,
    volume: f32,
    sink: SharedSink,
}

impl MediaEngine {
    pub fn new() -> Self {
        Self {
            thread: None,
            path: None,
            rate: PlaybackRate::DEFAULT,
            volume: Volume::default().effective(),
            sink: Arc::new(Mutex::new(None)),
        }
    }

    /// The currently loaded file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.thread.is_some()
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn loaded_thread(&self) -> EngineResult<&PlaybackThread> {
        self.thread
            .as_ref()
            .ok_or_else(|| EngineError::InvalidState("No file loaded".to_string()))
    }

    fn send_if_loaded(&self, command: PlaybackCommand) -> EngineResult<()> {
        match self.thread.as_ref() {
            Some(thread) => thread.send_command(command),
            None => Ok(()),
        }
    }
}

impl Default for MediaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for MediaEngine {
    fn load(&mut self, path: &Path) -> Result<Option<f64>> {
        let decoder = AudioDecoder::open(path).map_err(|e| e.into_load_error(path))?;
        let duration = decoder.duration();

        // Only replace the running thread once the new file is known to decode.
        let thread = PlaybackThread::start(decoder, Arc::clone(&self.sink)).map_err(|e| {
            log::error!("Could not start playback for {}: {}", path.display(), e);
            AppError::from(e)
        })?;
        thread.send_command(PlaybackCommand::SetSpeed(self.rate))?;
        thread.send_command(PlaybackCommand::SetVolume(self.volume))?;

        if let Some(mut previous) = self.thread.replace(thread) {
            previous.stop();
        }
        self.path = Some(path.to_path_buf());

        log::info!("Loaded {} (duration {:?})", path.display(), duration);
        Ok(duration)
    }

    fn play(&mut self, rate: f32, volume: f32) -> Result<()> {
        self.rate = PlaybackRate::clamped(rate).value();
        self.volume = volume.clamp(0.0, 1.0);

        let thread = self.loaded_thread()?;
        thread.send_command(PlaybackCommand::SetSpeed(self.rate))?;
        thread.send_command(PlaybackCommand::SetVolume(self.volume))?;
        thread.send_command(PlaybackCommand::Play)?;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.loaded_thread()?.send_command(PlaybackCommand::Pause)?;
        Ok(())
    }

    /// Halts output; the position is kept so playback can resume from it
    fn stop(&mut self) -> Result<()> {
        self.send_if_loaded(PlaybackCommand::Pause)?;
        Ok(())
    }

    fn set_current_time(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(AppError::InvalidArgument {
                argument: "position".to_string(),
                reason: format!("{} is not a valid time", seconds),
            });
        }
        let thread = self.loaded_thread()?;
        thread.set_position(seconds);
        thread.send_command(PlaybackCommand::Seek(seconds))?;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.thread.as_ref().map_or(0.0, |thread| thread.position())
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.rate = PlaybackRate::clamped(rate).value();
        self.send_if_loaded(PlaybackCommand::SetSpeed(self.rate))?;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.volume = volume.clamp(0.0, 1.0);
        self.send_if_loaded(PlaybackCommand::SetVolume(self.volume))?;
        Ok(())
    }

    fn subscribe(&mut self, sink: EngineEventSink) {
        match self.sink.lock() {
            Ok(mut guard) => *guard = Some(sink),
            Err(poisoned) => *poisoned.into_inner() = Some(sink),
        }
    }
}

impl Drop for MediaEngine {
    fn drop(&mut self) {
        if let Some(mut thread) = self.thread.take() {
            thread.stop();
        }
    }
}
