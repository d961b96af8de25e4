//! Collaborator contracts for the playback session
//!
//! The session owns exactly one implementation of each trait. All calls are
//! made from the session thread, so implementations only need to be `Send`.

use crate::types::{Audiobook, NowPlayingInfo};
use crate::Result;
use std::path::Path;

/// Notification raised by the audio engine outside of a direct call
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Playback reached the end of the stream. `success` is false when the
    /// stream ended because of an error.
    Finished { success: bool },
    /// Decoding failed mid-playback
    DecodeError(String),
}

/// Callback the engine uses to deliver [`EngineEvent`]s, possibly from another thread
pub type EngineEventSink = Box<dyn Fn(EngineEvent) + Send + Sync>;

/// Decodes and renders one audio file at a time
pub trait AudioEngine: Send {
    /// Opens `path` and prepares it for playback
    ///
    /// Returns the decoded duration in seconds when the container reports one.
    /// Fails with a load-category [`AppError`](crate::AppError) if the file is
    /// missing or not decodable; the previously loaded file stays active then.
    fn load(&mut self, path: &Path) -> Result<Option<f64>>;

    /// Starts or resumes output at the given rate and effective volume
    fn play(&mut self, rate: f32, volume: f32) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Halts output entirely
    fn stop(&mut self) -> Result<()>;

    fn set_current_time(&mut self, seconds: f64) -> Result<()>;

    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    fn set_rate(&mut self, rate: f32) -> Result<()>;

    fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Registers the sink for finish and decode-error notifications
    fn subscribe(&mut self, sink: EngineEventSink);
}

/// Durable storage for audiobook records
pub trait CatalogStore: Send {
    /// Persists the item. Failures are reported as
    /// [`AppError::PersistenceError`](crate::AppError::PersistenceError).
    fn save(&mut self, book: &Audiobook) -> Result<()>;
}

/// System-level now-playing display
pub trait NowPlayingSurface: Send {
    fn publish(&mut self, info: &NowPlayingInfo);

    /// Removes the now-playing entry (session shut down)
    fn clear(&mut self);
}
