//! Domain types for Earshot
//!
//! - `book`: Audiobook and Chapter types
//! - `playback`: Playback rate and volume
//! - `now_playing`: The projection pushed to the system's now-playing surface
//! - `common`: Shared traits and utilities

mod book;
mod common;
mod now_playing;
mod playback;

pub use book::{Audiobook, AudiobookId, Chapter};
pub use common::{format_clock, Timestamp, Validator};
pub use now_playing::{Interruption, NowPlayingInfo, RemoteCommand};
pub use playback::{PlaybackRate, Volume};
