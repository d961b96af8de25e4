//! Sample-rate conversion from the decoded stream to the output device
//!
//! The playback rate rides on the same conversion: 1.5x is resampling by
//! `device_rate / (source_rate * 1.5)`, so pitch follows the rate.

use crate::error::{EngineError, EngineResult};
use earshot_core::PlaybackRate;
use rubato::{
    Resampler as _, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};

const CHUNK_FRAMES: usize = 1024;

/// Allowed swing of the ratio around the pure rate conversion, in either
/// direction; must stay above the widest playback rate range
const MAX_RELATIVE_RATIO: f64 = 4.0;

/// Interleaved `f32` resampler with an adjustable playback rate
pub struct Resampler {
    inner: SincFixedIn<f32>,
    channels: usize,
    from_rate: u32,
    to_rate: u32,
    rate: PlaybackRate,
    /// Input frames waiting for a full chunk, interleaved
    pending: Vec<f32>,
}

impl Resampler {
    pub fn new(from_rate: u32, to_rate: u32, channels: u16) -> EngineResult<Self> {
        if from_rate == 0 || to_rate == 0 || channels == 0 {
            return Err(EngineError::ResampleError(format!(
                "Cannot convert {} Hz to {} Hz with {} channels",
                from_rate, to_rate, channels
            )));
        }

        let params = SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.95,
            oversampling_factor: 256,
            interpolation: SincInterpolationType::Cubic,
            window: WindowFunction::BlackmanHarris,
        };
        let channels = usize::from(channels);
        let inner = SincFixedIn::<f32>::new(
            f64::from(to_rate) / f64::from(from_rate),
            MAX_RELATIVE_RATIO,
            params,
            CHUNK_FRAMES,
            channels,
        )
        .map_err(|e| EngineError::ResampleError(e.to_string()))?;

        log::debug!(
            "Resampling {} Hz -> {} Hz, {} channels",
            from_rate,
            to_rate,
            channels
        );

        Ok(Self {
            inner,
            channels,
            from_rate,
            to_rate,
            rate: PlaybackRate::default(),
            pending: Vec::new(),
        })
    }

    /// Sets the playback rate, clamped to the supported range
    pub fn set_rate(&mut self, rate: f32) -> EngineResult<()> {
        let rate = PlaybackRate::clamped(rate);
        if rate == self.rate {
            return Ok(());
        }
        self.inner
            .set_resample_ratio(self.ratio_at(rate), false)
            .map_err(|e| EngineError::ResampleError(e.to_string()))?;
        self.rate = rate;
        Ok(())
    }

    pub fn rate(&self) -> f32 {
        self.rate.value()
    }

    /// Output frames produced per input frame
    pub fn ratio(&self) -> f64 {
        self.ratio_at(self.rate)
    }

    fn ratio_at(&self, rate: PlaybackRate) -> f64 {
        f64::from(self.to_rate) / (f64::from(self.from_rate) * f64::from(rate.value()))
    }

    /// Resamples whole chunks of the buffered input and returns them interleaved
    ///
    /// A remainder shorter than a chunk stays buffered for the next call.
    pub fn process(&mut self, input: &[f32]) -> EngineResult<Vec<f32>> {
        if input.len() % self.channels != 0 {
            return Err(EngineError::ResampleError(format!(
                "{} samples is not a whole number of {}-channel frames",
                input.len(),
                self.channels
            )));
        }
        self.pending.extend_from_slice(input);

        let mut output = Vec::new();
        let mut consumed = 0;
        loop {
            let chunk_len = self.inner.input_frames_next() * self.channels;
            if self.pending.len() - consumed < chunk_len {
                break;
            }
            let waves = deinterleave(
                &self.pending[consumed..consumed + chunk_len],
                self.channels,
            );
            let resampled = self
                .inner
                .process(&waves, None)
                .map_err(|e| EngineError::ResampleError(e.to_string()))?;
            interleave_into(&resampled, &mut output);
            consumed += chunk_len;
        }
        self.pending.drain(..consumed);

        Ok(output)
    }

    /// Pushes out whatever input is still buffered, for the end of a stream
    pub fn flush(&mut self) -> EngineResult<Vec<f32>> {
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }
        let waves = deinterleave(&self.pending, self.channels);
        self.pending.clear();

        let resampled = self
            .inner
            .process_partial(Some(&waves), None)
            .map_err(|e| EngineError::ResampleError(e.to_string()))?;
        let mut output = Vec::new();
        interleave_into(&resampled, &mut output);
        Ok(output)
    }

    /// Drops buffered input and filter history, e.g. after a seek
    pub fn reset(&mut self) {
        self.pending.clear();
        self.inner.reset();
    }
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut waves = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (wave, &sample) in waves.iter_mut().zip(frame) {
            wave.push(sample);
        }
    }
    waves
}

fn interleave_into(waves: &[Vec<f32>], output: &mut Vec<f32>) {
    let frames = waves.first().map_or(0, Vec::len);
    output.reserve(frames * waves.len());
    for frame in 0..frames {
        for wave in waves {
            output.push(wave[frame]);
        }
    }
}
