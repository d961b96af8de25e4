//! Core domain types, errors and collaborator traits for Earshot

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, ErrorCategory, ErrorSeverity, RecoveryAction, Result};
pub use traits::{AudioEngine, CatalogStore, EngineEvent, EngineEventSink, NowPlayingSurface};
pub use types::{
    format_clock, Audiobook, AudiobookId, Chapter, Interruption, NowPlayingInfo, PlaybackRate,
    RemoteCommand, Timestamp, Validator, Volume,
};
