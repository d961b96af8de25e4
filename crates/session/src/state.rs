//! Session state exposed to observers

use earshot_core::AudiobookId;
use serde::{Deserialize, Serialize};

/// Transport state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackPhase {
    /// Nothing loaded
    Idle,
    Paused,
    Playing,
    /// The loaded item played to its end; a manual seek returns to `Paused`
    Finished,
}

impl PlaybackPhase {
    pub fn has_item(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Paused => write!(f, "paused"),
            Self::Playing => write!(f, "playing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterSnapshot {
    pub index: usize,
    pub title: String,
    pub start_time: f64,
    pub end_time: f64,
}

/// Point-in-time copy of everything the session publishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: PlaybackPhase,
    pub item_id: Option<AudiobookId>,
    pub title: Option<String>,
    pub current_time: f64,
    pub duration: f64,
    pub playback_rate: f32,
    pub volume: f32,
    pub volume_boost: bool,
    pub effective_volume: f32,
    pub current_chapter: Option<ChapterSnapshot>,
    pub chapter_count: usize,
    pub sleep_timer_remaining: u64,
    pub is_finished: bool,
}

impl SessionSnapshot {
    pub fn is_playing(&self) -> bool {
        self.phase == PlaybackPhase::Playing
    }

    /// Progress through the item in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            0.0
        } else {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn remaining(&self) -> f64 {
        (self.duration - self.current_time).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(current_time: f64, duration: f64) -> SessionSnapshot {
        SessionSnapshot {
            phase: PlaybackPhase::Paused,
            item_id: None,
            title: None,
            current_time,
            duration,
            playback_rate: 1.0,
            volume: 1.0,
            volume_boost: false,
            effective_volume: 1.0,
            current_chapter: None,
            chapter_count: 0,
            sleep_timer_remaining: 0,
            is_finished: false,
        }
    }

    #[test]
    fn test_progress() {
        assert_eq!(snapshot(50.0, 100.0).progress(), 0.5);
        assert_eq!(snapshot(0.0, 0.0).progress(), 0.0);
    }

    #[test]
    fn test_remaining_never_negative() {
        assert_eq!(snapshot(120.0, 100.0).remaining(), 0.0);
        assert_eq!(snapshot(40.0, 100.0).remaining(), 60.0);
    }

    #[test]
    fn test_phase_has_item() {
        assert!(!PlaybackPhase::Idle.has_item());
        assert!(PlaybackPhase::Finished.has_item());
        assert_eq!(PlaybackPhase::Playing.to_string(), "playing");
    }
}
