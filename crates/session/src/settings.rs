//! Tunables for the playback session

use earshot_config::PlayerConfig;
use earshot_core::Volume;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Default step for skip forward, in seconds
    pub skip_forward: f64,
    /// Default step for skip backward, in seconds
    pub skip_backward: f64,
    /// Smart rewind kicks in this close to a chapter/track start while playing
    pub smart_rewind_threshold: f64,
    /// Autosave whenever the whole-second position is a multiple of this
    pub autosave_interval: u64,
    /// Items with less than this many seconds left count as finished
    pub finish_threshold: f64,
    /// How often the engine position is polled while playing
    pub poll_interval: Duration,
    /// Sleep timer resolution
    pub sleep_tick: Duration,
    pub initial_volume: Volume,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            skip_forward: 30.0,
            skip_backward: 30.0,
            smart_rewind_threshold: 30.0,
            autosave_interval: 30,
            finish_threshold: 30.0,
            poll_interval: Duration::from_millis(500),
            sleep_tick: Duration::from_secs(1),
            initial_volume: Volume::default(),
        }
    }
}

impl From<&PlayerConfig> for SessionSettings {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            skip_forward: config.skip_forward_secs as f64,
            skip_backward: config.skip_backward_secs as f64,
            smart_rewind_threshold: config.smart_rewind_threshold_secs as f64,
            autosave_interval: config.autosave_interval_secs.max(1),
            finish_threshold: config.finish_threshold_secs as f64,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            sleep_tick: Duration::from_secs(1),
            initial_volume: Volume::new(
                f32::from(config.default_volume) / 100.0,
                config.volume_boost,
            ),
        }
    }
}
