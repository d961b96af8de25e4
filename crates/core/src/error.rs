//! Error types and recovery strategies for Earshot
//!
//! Nothing in the playback session is process-fatal. Errors fall into four
//! categories:
//! - **Load**: the file could not be opened, probed or its chapters are unusable.
//!   The session keeps whatever it had loaded before.
//! - **Decode**: playback failed mid-stream. Playback stops, finished state is untouched.
//! - **Persistence**: the catalog store rejected a save. In-memory state stays authoritative.
//! - **Empty session**: a transport command arrived with nothing loaded. Reported as a no-op.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Recovery actions that can be taken when an error occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Retry with backoff on the next checkpoint (e.g., catalog store busy)
    RetryWithBackoff,
    /// Pick a different item; the requested one cannot be played
    SkipItem,
    /// Stop playback and keep the session state in memory
    StopPlayback,
    /// Nothing to do, the command was a no-op
    Ignore,
    /// No automatic recovery - user intervention required
    UserIntervention,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetryWithBackoff => write!(f, "Retrying with backoff"),
            Self::SkipItem => write!(f, "Skipping item"),
            Self::StopPlayback => write!(f, "Stopping playback"),
            Self::Ignore => write!(f, "Ignoring"),
            Self::UserIntervention => write!(f, "User intervention required"),
        }
    }
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Error can be automatically recovered from
    Recoverable,
    /// Feature degraded but the session continues
    Degraded,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
        }
    }
}

/// Broad category of an error, matching the session's error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Load,
    Decode,
    Persistence,
    EmptySession,
    Other,
}

/// Main error type for Earshot
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Load Errors =====
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Permission denied when opening a file
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Unsupported audio format
    #[error("Unsupported audio format: {format} in file {file}")]
    UnsupportedFormat { format: String, file: PathBuf },

    /// File could be opened but not probed as audio
    #[error("Corrupted audio file: {file} - {reason}")]
    CorruptedAudioFile { file: PathBuf, reason: String },

    /// Chapter list overlaps or is otherwise unusable
    #[error("Invalid chapters: {reason}")]
    InvalidChapters { reason: String },

    // ===== Playback Errors =====
    /// Audio decoding failed mid-stream
    #[error("Audio decode error: {message}")]
    AudioDecodeError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Audio playback device error
    #[error("Playback device error: {message}")]
    PlaybackDeviceError { message: String },

    // ===== Persistence Errors =====
    /// Catalog store failed to save an item
    #[error("Persistence error: {message}")]
    PersistenceError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== Session Errors =====
    /// Transport command issued with no item loaded
    #[error("No item loaded: cannot {command}")]
    CommandOnEmptySession { command: String },

    /// The session thread is gone
    #[error("Session closed")]
    SessionClosed,

    // ===== Generic Errors =====
    /// Generic internal error
    #[error("Internal error: {message}")]
    InternalError { message: String },

    /// Invalid argument provided
    #[error("Invalid argument: {argument} - {reason}")]
    InvalidArgument { argument: String, reason: String },
}

impl AppError {
    /// Returns the taxonomy category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FileNotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::UnsupportedFormat { .. }
            | Self::CorruptedAudioFile { .. }
            | Self::InvalidChapters { .. } => ErrorCategory::Load,

            Self::AudioDecodeError { .. } | Self::PlaybackDeviceError { .. } => {
                ErrorCategory::Decode
            }

            Self::PersistenceError { .. } => ErrorCategory::Persistence,

            Self::CommandOnEmptySession { .. } => ErrorCategory::EmptySession,

            Self::SessionClosed | Self::InternalError { .. } | Self::InvalidArgument { .. } => {
                ErrorCategory::Other
            }
        }
    }

    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Persistence | ErrorCategory::EmptySession => {
                ErrorSeverity::Recoverable
            }
            _ => ErrorSeverity::Degraded,
        }
    }

    /// Returns the recommended recovery action for this error
    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::PersistenceError { .. } => RecoveryAction::RetryWithBackoff,

            Self::PermissionDenied { .. } | Self::SessionClosed => {
                RecoveryAction::UserIntervention
            }

            Self::FileNotFound { .. }
            | Self::UnsupportedFormat { .. }
            | Self::CorruptedAudioFile { .. }
            | Self::InvalidChapters { .. } => RecoveryAction::SkipItem,

            Self::AudioDecodeError { .. } | Self::PlaybackDeviceError { .. } => {
                RecoveryAction::StopPlayback
            }

            Self::CommandOnEmptySession { .. } | Self::InvalidArgument { .. } => {
                RecoveryAction::Ignore
            }

            Self::InternalError { .. } => RecoveryAction::UserIntervention,
        }
    }

    /// Returns a user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            Self::FileNotFound { .. } => {
                "The audiobook file was not found. It may have been moved or deleted.".to_string()
            }
            Self::PermissionDenied { .. } => {
                "Permission denied. Please grant storage access in Settings.".to_string()
            }
            Self::UnsupportedFormat { format, .. } => {
                format!("This audio format ({}) is not supported.", format)
            }
            Self::CorruptedAudioFile { .. } => {
                "This audio file is damaged and cannot be played.".to_string()
            }
            Self::InvalidChapters { .. } => {
                "The chapter list of this audiobook is inconsistent.".to_string()
            }
            Self::AudioDecodeError { .. } => {
                "Playback stopped because the audio could not be decoded.".to_string()
            }
            Self::PlaybackDeviceError { .. } => {
                "Cannot access audio playback. Please check your device settings.".to_string()
            }
            Self::PersistenceError { .. } => {
                "Your listening position could not be saved. It will be retried.".to_string()
            }
            Self::CommandOnEmptySession { .. } => "Nothing is loaded yet.".to_string(),
            Self::SessionClosed => "The player has shut down.".to_string(),
            Self::InternalError { .. } => {
                "An unexpected error occurred. Please try again.".to_string()
            }
            Self::InvalidArgument { .. } => "Invalid input provided.".to_string(),
        }
    }

    /// Returns true if this error belongs to the load category
    pub fn is_load_error(&self) -> bool {
        self.category() == ErrorCategory::Load
    }

    /// Returns true if this error can be automatically retried
    pub fn is_retryable(&self) -> bool {
        self.recovery_action() == RecoveryAction::RetryWithBackoff
    }

    /// Helper to create an audio decode error from any error type
    pub fn audio_decode<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::AudioDecodeError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Helper to create a persistence error from any error type
    pub fn persistence<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::PersistenceError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Helper for the empty-session no-op
    pub fn empty_session(command: impl Into<String>) -> Self {
        Self::CommandOnEmptySession {
            command: command.into(),
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::FileNotFound {
                path: PathBuf::from("unknown"),
            },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: PathBuf::from("unknown"),
            },
            _ => Self::InternalError {
                message: err.to_string(),
            },
        }
    }
}
