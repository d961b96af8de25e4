//! Playback-related domain models

use serde::{Deserialize, Serialize};

/// Playback rate multiplier, always within `[MIN, MAX]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct PlaybackRate(f32);

impl PlaybackRate {
    pub const MIN: f32 = 0.5;
    pub const MAX: f32 = 3.0;
    pub const DEFAULT: f32 = 1.0;

    /// Creates a rate, clamping out-of-range values
    ///
    /// Non-finite input falls back to the default rate.
    pub fn clamped(rate: f32) -> Self {
        if rate.is_finite() {
            Self(rate.clamp(Self::MIN, Self::MAX))
        } else {
            Self(Self::DEFAULT)
        }
    }

    /// Returns true if `rate` is accepted without clamping
    pub fn is_in_range(rate: f32) -> bool {
        (Self::MIN..=Self::MAX).contains(&rate)
    }

    /// Returns the rate value
    pub fn value(&self) -> f32 {
        self.0
    }

    /// Checks if this is normal speed
    pub fn is_normal(&self) -> bool {
        (self.0 - Self::DEFAULT).abs() < f32::EPSILON
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl std::fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}x", self.0)
    }
}

/// Listener volume plus the optional boost for quiet recordings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    level: f32,
    boost_enabled: bool,
}

impl Volume {
    /// Gain applied when boost is on; the result is capped at 1.0
    pub const BOOST_FACTOR: f32 = 2.0;

    /// Creates a volume, clamping the level to `[0, 1]`
    pub fn new(level: f32, boost_enabled: bool) -> Self {
        Self {
            level: clamp_unit(level),
            boost_enabled,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn set_level(&mut self, level: f32) {
        self.level = clamp_unit(level);
    }

    pub fn boost_enabled(&self) -> bool {
        self.boost_enabled
    }

    pub fn set_boost(&mut self, enabled: bool) {
        self.boost_enabled = enabled;
    }

    /// Flips the boost and returns the new setting
    pub fn toggle_boost(&mut self) -> bool {
        self.boost_enabled = !self.boost_enabled;
        self.boost_enabled
    }

    /// The volume handed to the audio engine
    pub fn effective(&self) -> f32 {
        if self.boost_enabled {
            (self.level * Self::BOOST_FACTOR).min(1.0)
        } else {
            self.level
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self {
            level: 1.0,
            boost_enabled: false,
        }
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
