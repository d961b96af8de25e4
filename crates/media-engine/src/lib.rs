//! Media Engine - audio playback for Earshot
//!
//! Decodes with symphonia, resamples to the device rate with rubato, renders
//! through cpal and reports end-of-stream and decode failures through the
//! [`earshot_core::AudioEngine`] event sink.

mod decoder;
mod engine;
mod error;
mod output;
pub(crate) mod playback_thread;
mod resampler;

pub use decoder::{AudioDecoder, DecodedAudio};
pub use engine::MediaEngine;
pub use error::{EngineError, EngineResult};
pub use output::AudioOutput;
pub use resampler::Resampler;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = EngineError::UnsupportedFormat("xyz".to_string());
        assert!(format!("{}", error).contains("xyz"));
    }
}
