//! Playback session for Earshot
//!
//! [`SessionController`] is the state machine for the one audiobook being
//! listened to. It drives an [`earshot_core::AudioEngine`], persists progress
//! through an [`earshot_core::CatalogStore`] and mirrors itself onto an
//! [`earshot_core::NowPlayingSurface`]. [`SessionRuntime`] moves a controller
//! onto its own thread so commands from anywhere are applied one at a time.

pub mod chapters;
pub mod commands;
pub mod controller;
pub mod runtime;
pub mod settings;
pub mod sleep_timer;
pub mod state;

pub use chapters::{ChapterIndex, RESTART_CHAPTER_THRESHOLD};
pub use commands::Command;
pub use controller::SessionController;
pub use runtime::{SessionHandle, SessionNotice, SessionRuntime};
pub use settings::SessionSettings;
pub use sleep_timer::{SleepTick, SleepTimer};
pub use state::{ChapterSnapshot, PlaybackPhase, SessionSnapshot};
