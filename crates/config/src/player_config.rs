//! Player configuration section

use crate::validation::{parse_field, unknown_field, ConfigSection, ValidationError, Validator};
use crate::ConfigResult;
use serde::{Deserialize, Serialize};

/// Playback session preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Starting volume level (0-100)
    pub default_volume: u8,

    /// Start sessions with the volume boost on
    pub volume_boost: bool,

    /// Playback rate given to newly added books (0.5 - 3.0)
    pub default_speed: f32,

    /// Default skip forward step in seconds
    pub skip_forward_secs: u64,

    /// Default skip backward step in seconds
    pub skip_backward_secs: u64,

    /// Rewinding this close to a chapter start rewinds by this amount instead
    pub smart_rewind_threshold_secs: u64,

    /// Autosave the position every this many seconds of playback
    pub autosave_interval_secs: u64,

    /// Books with less than this many seconds left count as finished
    pub finish_threshold_secs: u64,

    /// Engine position poll interval in milliseconds
    pub poll_interval_ms: u64,

    /// Start playing as soon as a book is opened
    pub auto_play_on_load: bool,

    /// Volume change step for increment/decrement (0-100)
    pub volume_step: u8,

    /// Playback speed change step
    pub speed_step: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: 70,
            volume_boost: false,
            default_speed: 1.0,
            skip_forward_secs: 30,
            skip_backward_secs: 30,
            smart_rewind_threshold_secs: 30,
            autosave_interval_secs: 30,
            finish_threshold_secs: 30,
            poll_interval_ms: 500,
            auto_play_on_load: true,
            volume_step: 5,
            speed_step: 0.25,
        }
    }
}

impl ConfigSection for PlayerConfig {
    const NAME: &'static str = "player";
    const FIELDS: &'static [&'static str] = &[
        "default_volume",
        "volume_boost",
        "default_speed",
        "skip_forward_secs",
        "skip_backward_secs",
        "smart_rewind_threshold_secs",
        "autosave_interval_secs",
        "finish_threshold_secs",
        "poll_interval_ms",
        "auto_play_on_load",
        "volume_step",
        "speed_step",
    ];

    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(self.default_volume, 0, 100, "player.default_volume"),
            Validator::in_range(self.default_speed, 0.5, 3.0, "player.default_speed"),
            Validator::in_range(self.skip_forward_secs, 1, 600, "player.skip_forward_secs"),
            Validator::in_range(
                self.skip_backward_secs,
                1,
                600,
                "player.skip_backward_secs",
            ),
            Validator::in_range(
                self.smart_rewind_threshold_secs,
                0,
                300,
                "player.smart_rewind_threshold_secs",
            ),
            Validator::in_range(
                self.autosave_interval_secs,
                1,
                300,
                "player.autosave_interval_secs",
            ),
            Validator::in_range(
                self.finish_threshold_secs,
                0,
                600,
                "player.finish_threshold_secs",
            ),
            Validator::in_range(self.poll_interval_ms, 16, 5000, "player.poll_interval_ms"),
            Validator::in_range(self.volume_step, 1, 50, "player.volume_step"),
            Validator::in_range(self.speed_step, 0.05, 0.5, "player.speed_step"),
        ])
    }

    fn set_field(&mut self, field: &str, raw: &str) -> ConfigResult<()> {
        let section = Self::NAME;
        match field {
            "default_volume" => parse_field(section, field, raw, &mut self.default_volume),
            "volume_boost" => parse_field(section, field, raw, &mut self.volume_boost),
            "default_speed" => parse_field(section, field, raw, &mut self.default_speed),
            "skip_forward_secs" => parse_field(section, field, raw, &mut self.skip_forward_secs),
            "skip_backward_secs" => parse_field(section, field, raw, &mut self.skip_backward_secs),
            "smart_rewind_threshold_secs" => {
                parse_field(section, field, raw, &mut self.smart_rewind_threshold_secs)
            }
            "autosave_interval_secs" => {
                parse_field(section, field, raw, &mut self.autosave_interval_secs)
            }
            "finish_threshold_secs" => {
                parse_field(section, field, raw, &mut self.finish_threshold_secs)
            }
            "poll_interval_ms" => parse_field(section, field, raw, &mut self.poll_interval_ms),
            "auto_play_on_load" => parse_field(section, field, raw, &mut self.auto_play_on_load),
            "volume_step" => parse_field(section, field, raw, &mut self.volume_step),
            "speed_step" => parse_field(section, field, raw, &mut self.speed_step),
            _ => Err(unknown_field(section, field)),
        }
    }
}
