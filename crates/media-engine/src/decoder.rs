// FILE: crates/media-engine/src/decoder.rs

use crate::error::{EngineError, EngineResult};
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, SampleBuffer, SignalSpec};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

/// Decodes the default audio track of one file into interleaved `f32` samples
pub struct AudioDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    spec: SignalSpec,
    duration: Option<f64>,
}

pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub spec: SignalSpec,
}

impl AudioDecoder {
    /// Opens and probes `path`
    pub fn open(path: &Path) -> EngineResult<Self> {
        if !path.exists() {
            return Err(EngineError::FileNotFound(path.to_path_buf()));
        }

        let file = std::fs::File::open(path)?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| match e {
                SymphoniaError::Unsupported(what) => EngineError::UnsupportedFormat(format!(
                    "{} ({})",
                    what,
                    path.extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or("no extension")
                )),
                other => EngineError::DecodeError(format!("Failed to probe format: {}", other)),
            })?;

        let reader = probed.format;

        let track = reader
            .default_track()
            .ok_or_else(|| EngineError::DecodeError("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| match e {
                SymphoniaError::Unsupported(codec) => {
                    EngineError::UnsupportedFormat(format!("codec {}", codec))
                }
                other => EngineError::DecodeError(format!("Failed to create decoder: {}", other)),
            })?;

        let spec = SignalSpec::new(
            codec_params.sample_rate.unwrap_or(44100),
            codec_params.channels.unwrap_or_default(),
        );

        let duration = match (codec_params.time_base, codec_params.n_frames) {
            (Some(time_base), Some(frames)) => {
                let time = time_base.calc_time(frames);
                Some(time.seconds as f64 + time.frac)
            }
            (None, Some(frames)) if spec.rate > 0 => Some(frames as f64 / spec.rate as f64),
            _ => None,
        };

        log::debug!(
            "Opened {}: {} Hz, {} channel(s), duration {:?}",
            path.display(),
            spec.rate,
            spec.channels.count(),
            duration
        );

        Ok(Self {
            reader,
            decoder,
            track_id,
            spec,
            duration,
        })
    }

    pub fn decode_next(&mut self) -> EngineResult<Option<DecodedAudio>> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(e) => {
                    return Err(EngineError::DecodeError(format!(
                        "Failed to read packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("Decode error, skipping packet: {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(EngineError::DecodeError(format!(
                        "Failed to decode packet: {}",
                        e
                    )));
                }
            };

            let spec = *decoded.spec();
            let samples = convert_to_f32(decoded);

            return Ok(Some(DecodedAudio { samples, spec }));
        }
    }

    pub fn spec(&self) -> &SignalSpec {
        &self.spec
    }

    /// Track length in seconds, when the container reports it
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn seek(&mut self, time_secs: f64) -> EngineResult<()> {
        self.reader
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time: Time::from(time_secs.max(0.0)),
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| EngineError::SeekError(format!("Failed to seek: {}", e)))?;

        self.decoder.reset();

        Ok(())
    }
}

/// Interleaves any decoded sample format as `f32`
fn convert_to_f32(decoded: AudioBufferRef) -> Vec<f32> {
    let spec = *decoded.spec();
    let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
    sample_buf.copy_interleaved_ref(decoded);
    sample_buf.samples().to_vec()
}
