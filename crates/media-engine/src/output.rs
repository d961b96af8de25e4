// crates/media-engine/src/output.rs
// Audio output on the default device

use crate::error::{EngineError, EngineResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use crossbeam_channel::{Receiver, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Streams interleaved `f32` chunks to the default output device
///
/// Not `Send`: create and drop it on the playback thread.
pub struct AudioOutput {
    device: Device,
    device_name: String,
    config: StreamConfig,
    stream: Option<Stream>,
}

impl AudioOutput {
    /// Opens the default output device at its default sample rate
    ///
    /// Keeps `source_channels` when the device can play that many at its
    /// default rate, otherwise falls back to the device's own layout.
    /// Callers resample to [`AudioOutput::sample_rate`] and remix to
    /// [`AudioOutput::channels`].
    pub fn new(source_channels: u16) -> EngineResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::OutputError("No default output device".to_string()))?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let default_config = device.default_output_config().map_err(|e| {
            EngineError::OutputError(format!("No output format for {}: {}", device_name, e))
        })?;
        let sample_rate = default_config.sample_rate();

        let channels = if supports_channels(&device, source_channels, sample_rate) {
            source_channels
        } else {
            log::info!(
                "{} cannot play {} channels at {} Hz, using {}",
                device_name,
                source_channels,
                sample_rate.0,
                default_config.channels()
            );
            default_config.channels()
        };

        let config = StreamConfig {
            channels,
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            device,
            device_name,
            config,
            stream: None,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Starts pulling chunks from `rx`
    ///
    /// Underruns are filled with silence. When the sender goes away `running`
    /// is cleared.
    pub fn play(&mut self, rx: Receiver<Vec<f32>>, running: Arc<AtomicBool>) -> EngineResult<()> {
        let mut buffer = Vec::new();
        let mut position = 0;

        let device_name = self.device_name.clone();

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for sample in data.iter_mut() {
                        while position >= buffer.len() {
                            match rx.try_recv() {
                                Ok(new_data) => {
                                    buffer = new_data;
                                    position = 0;
                                }
                                Err(TryRecvError::Empty) => break,
                                Err(TryRecvError::Disconnected) => {
                                    running.store(false, Ordering::Relaxed);
                                    break;
                                }
                            }
                        }

                        if position < buffer.len() {
                            *sample = buffer[position];
                            position += 1;
                        } else {
                            *sample = 0.0;
                        }
                    }
                },
                move |err| {
                    log::error!("Audio output error on device '{}': {}", device_name, err);
                },
                None,
            )
            .map_err(|e| EngineError::OutputError(format!("Failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| EngineError::OutputError(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        log::info!("Audio output started on device: {}", self.device_name);
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            log::info!("Audio output stopped on device: {}", self.device_name);
        }
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

fn supports_channels(device: &Device, channels: u16, rate: SampleRate) -> bool {
    match device.supported_output_configs() {
        Ok(mut ranges) => ranges.any(|range| {
            range.channels() == channels
                && range.min_sample_rate() <= rate
                && rate <= range.max_sample_rate()
        }),
        Err(e) => {
            log::debug!("Could not list output formats: {}", e);
            false
        }
    }
}

/// Maps interleaved frames from `from` channels to `to` channels
///
/// Mono is copied to every output channel and anything is averaged down to
/// mono. Otherwise channels are matched by position; extra output channels
/// are silent and extra input channels are dropped.
pub(crate) fn remix(samples: Vec<f32>, from: u16, to: u16) -> Vec<f32> {
    let (from, to) = (usize::from(from.max(1)), usize::from(to.max(1)));
    if from == to {
        return samples;
    }

    let frames = samples.chunks_exact(from);
    let mut out = Vec::with_capacity(frames.len() * to);
    for frame in frames {
        if from == 1 {
            out.extend(std::iter::repeat(frame[0]).take(to));
        } else if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            out.extend((0..to).map(|c| frame.get(c).copied().unwrap_or(0.0)));
        }
    }
    out
}
