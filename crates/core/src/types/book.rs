//! Audiobook and chapter domain models

use crate::types::{PlaybackRate, Timestamp, Validator};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for an audiobook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudiobookId(Uuid);

impl AudiobookId {
    /// Creates a new random AudiobookId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an AudiobookId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Returns the AudiobookId as a string
    pub fn as_string(&self) -> String {
        self.0.to_string()
    }
}

impl Default for AudiobookId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AudiobookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An audiobook as the catalog store hands it to the player
///
/// Times are seconds. `position`, `playback_rate`, `is_finished` and
/// `last_played` are written back by the playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audiobook {
    pub id: AudiobookId,
    pub title: String,
    pub author: Option<String>,
    pub file_path: PathBuf,
    pub artwork_path: Option<PathBuf>,
    /// Stored resume position in seconds
    pub position: f64,
    /// Stored duration in seconds
    pub duration: f64,
    pub playback_rate: f32,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub is_finished: bool,
    pub added_date: Timestamp,
    pub last_played: Option<Timestamp>,
}

impl Audiobook {
    /// Creates a new audiobook with required fields
    pub fn new(title: impl Into<String>, file_path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            id: AudiobookId::new(),
            title: title.into(),
            author: None,
            file_path: file_path.into(),
            artwork_path: None,
            position: 0.0,
            duration,
            playback_rate: PlaybackRate::DEFAULT,
            chapters: Vec::new(),
            is_finished: false,
            added_date: Timestamp::now(),
            last_played: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_chapters(mut self, chapters: Vec<Chapter>) -> Self {
        self.chapters = chapters;
        self
    }

    pub fn with_artwork(mut self, artwork_path: impl Into<PathBuf>) -> Self {
        self.artwork_path = Some(artwork_path.into());
        self
    }

    /// Records that the book was just played
    pub fn mark_played(&mut self) {
        self.last_played = Some(Timestamp::now());
    }

    /// Remaining listening time in seconds
    pub fn remaining(&self) -> f64 {
        (self.duration - self.position).max(0.0)
    }

    /// Progress through the book in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            0.0
        } else {
            (self.position / self.duration).clamp(0.0, 1.0)
        }
    }

    /// Clears the finished flag and rewinds to the beginning
    pub fn reset_progress(&mut self) {
        self.position = 0.0;
        self.is_finished = false;
    }
}

impl Validator for Audiobook {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Title cannot be empty".to_string());
        }

        if !self.duration.is_finite() || self.duration < 0.0 {
            errors.push("Duration must be a non-negative number".to_string());
        }

        if !self.position.is_finite() || self.position < 0.0 {
            errors.push("Position must be a non-negative number".to_string());
        }

        if !PlaybackRate::is_in_range(self.playback_rate) {
            errors.push(format!(
                "Playback rate must be between {} and {}",
                PlaybackRate::MIN,
                PlaybackRate::MAX
            ));
        }

        for chapter in &self.chapters {
            if let Err(chapter_errors) = chapter.validate() {
                errors.extend(chapter_errors);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A named sub-interval of an audiobook's timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    /// Start time in seconds
    pub start_time: f64,
    /// Length in seconds
    pub duration_seconds: f64,
}

impl Chapter {
    /// Creates a new chapter
    pub fn new(title: impl Into<String>, start_time: f64, duration_seconds: f64) -> Self {
        Self {
            title: title.into(),
            start_time,
            duration_seconds,
        }
    }

    /// End time in seconds (exclusive)
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration_seconds
    }

    /// Checks if a given position falls within `[start_time, end_time)`
    pub fn contains(&self, position: f64) -> bool {
        position >= self.start_time && position < self.end_time()
    }
}

impl Validator for Chapter {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.start_time.is_finite() || self.start_time < 0.0 {
            errors.push(format!(
                "Chapter '{}' has an invalid start time",
                self.title
            ));
        }

        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            errors.push(format!(
                "Chapter '{}' must have a positive duration",
                self.title
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
