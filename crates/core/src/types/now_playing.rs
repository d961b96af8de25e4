//! Now-playing projection and the external inputs that feed the session

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the system-level now-playing display shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlayingInfo {
    pub title: String,
    pub author: Option<String>,
    pub duration: f64,
    pub elapsed: f64,
    /// Playback rate, or 0.0 while paused
    pub effective_rate: f32,
    pub artwork_path: Option<PathBuf>,
    pub chapter_title: Option<String>,
}

impl NowPlayingInfo {
    pub fn is_playing(&self) -> bool {
        self.effective_rate > 0.0
    }
}

/// Transport command coming from the now-playing surface (lock screen, headset, ...)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RemoteCommand {
    Play,
    Pause,
    TogglePlayPause,
    SkipForward,
    SkipBackward,
    Seek(f64),
}

/// Audio focus notification from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interruption {
    Began,
    Ended { should_resume: bool },
}
