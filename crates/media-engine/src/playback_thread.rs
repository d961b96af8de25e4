use crate::decoder::AudioDecoder;
use crate::error::{EngineError, EngineResult};
use crate::output::{remix, AudioOutput};
use crate::resampler::Resampler;
use crossbeam_channel::{bounded, Receiver, Sender};
use earshot_core::{EngineEvent, EngineEventSink};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration as StdDuration;

/// Sink shared between the engine and its playback thread
pub(crate) type SharedSink = Arc<Mutex<Option<EngineEventSink>>>;

pub(crate) fn emit(sink: &SharedSink, event: EngineEvent) {
    match sink.lock() {
        Ok(guard) => {
            if let Some(sink) = guard.as_ref() {
                sink(event);
            }
        }
        Err(_) => log::error!("Engine event sink poisoned, dropping {:?}", event),
    }
}

/// Commands sent to the playback thread
#[derive(Debug, Clone)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Seek(f64),
    SetVolume(f32),
    SetSpeed(f32),
    Shutdown,
}

/// Playback thread handle
pub struct PlaybackThread {
    handle: Option<thread::JoinHandle<()>>,
    command_tx: Sender<PlaybackCommand>,
    running: Arc<AtomicBool>,
    position: Arc<AtomicU64>,
}

impl PlaybackThread {
    /// Moves `decoder` onto a new thread with its own output stream
    ///
    /// Returns once the output device is open, or with the error that
    /// prevented it.
    pub fn start(decoder: AudioDecoder, sink: SharedSink) -> EngineResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let position = Arc::new(AtomicU64::new(0f64.to_bits()));
        let (command_tx, command_rx) = bounded(32);
        let (ready_tx, ready_rx) = bounded::<EngineResult<()>>(1);

        let running_clone = Arc::clone(&running);
        let position_clone = Arc::clone(&position);

        let handle = thread::Builder::new()
            .name("earshot-playback".to_string())
            .spawn(move || {
                let shared = Shared {
                    running: running_clone,
                    position: position_clone,
                    sink,
                };
                playback_main(decoder, command_rx, ready_tx, shared);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                handle: Some(handle),
                command_tx,
                running,
                position,
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(EngineError::InvalidState(
                    "Playback thread exited during startup".to_string(),
                ))
            }
        }
    }

    /// Send a command to the playback thread
    pub fn send_command(&self, cmd: PlaybackCommand) -> EngineResult<()> {
        self.command_tx
            .send(cmd)
            .map_err(|e| EngineError::InvalidState(format!("Failed to send command: {}", e)))
    }

    /// Get the current playback position in seconds
    pub fn position(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::Relaxed))
    }

    /// Records a new position before the thread has applied the seek
    pub fn set_position(&self, seconds: f64) {
        self.position.store(seconds.to_bits(), Ordering::Relaxed);
    }

    /// Check if the thread is still running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the playback thread
    pub fn stop(&mut self) {
        let _ = self.send_command(PlaybackCommand::Shutdown);
        self.running.store(false, Ordering::Relaxed);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Playback thread panicked");
            }
        }
    }
}

impl Drop for PlaybackThread {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Shared {
    running: Arc<AtomicBool>,
    position: Arc<AtomicU64>,
    sink: SharedSink,
}

fn playback_main(
    decoder: AudioDecoder,
    command_rx: Receiver<PlaybackCommand>,
    ready_tx: Sender<EngineResult<()>>,
    shared: Shared,
) {
    let spec = *decoder.spec();
    let source_channels = spec.channels.count() as u16;

    let (audio_tx, audio_rx) = bounded(4);
    let opened = AudioOutput::new(source_channels).and_then(|output| {
        let pipeline = Pipeline::new(spec.rate, source_channels, &output)?;
        Ok((output, pipeline))
    });
    let (mut output, pipeline) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    if let Err(e) = output.play(audio_rx, Arc::clone(&shared.running)) {
        let _ = ready_tx.send(Err(e));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    playback_loop(decoder, pipeline, command_rx, audio_tx, &shared);

    output.stop();
    shared.running.store(false, Ordering::Relaxed);
}

/// Turns decoded samples into what the output device expects
struct Pipeline {
    resampler: Resampler,
    source_channels: u16,
    device_channels: u16,
    volume: f32,
}

impl Pipeline {
    fn new(source_rate: u32, source_channels: u16, output: &AudioOutput) -> EngineResult<Self> {
        Self::for_device(
            source_rate,
            source_channels,
            output.sample_rate(),
            output.channels(),
        )
    }

    fn for_device(
        source_rate: u32,
        source_channels: u16,
        device_rate: u32,
        device_channels: u16,
    ) -> EngineResult<Self> {
        if source_rate != device_rate {
            log::info!(
                "Converting {} Hz audio to the device rate of {} Hz",
                source_rate,
                device_rate
            );
        }
        Ok(Self {
            resampler: Resampler::new(source_rate, device_rate, source_channels)?,
            source_channels,
            device_channels,
            volume: 1.0,
        })
    }

    fn render(&mut self, samples: &[f32]) -> EngineResult<Vec<f32>> {
        let resampled = self.resampler.process(samples)?;
        Ok(self.finish(resampled))
    }

    /// Renders the input still held by the resampler
    fn drain(&mut self) -> EngineResult<Vec<f32>> {
        let tail = self.resampler.flush()?;
        Ok(self.finish(tail))
    }

    fn finish(&self, resampled: Vec<f32>) -> Vec<f32> {
        let mut samples = remix(resampled, self.source_channels, self.device_channels);
        for sample in &mut samples {
            *sample *= self.volume;
        }
        samples
    }
}

/// The main playback loop
fn playback_loop(
    mut decoder: AudioDecoder,
    mut pipeline: Pipeline,
    command_rx: Receiver<PlaybackCommand>,
    audio_tx: Sender<Vec<f32>>,
    shared: &Shared,
) {
    let mut playing = false;
    let mut current_position = 0.0_f64;

    while shared.running.load(Ordering::Relaxed) {
        while let Ok(command) = command_rx.try_recv() {
            match command {
                PlaybackCommand::Play => playing = true,
                PlaybackCommand::Pause => playing = false,
                PlaybackCommand::Seek(time) => match decoder.seek(time) {
                    Ok(()) => {
                        pipeline.resampler.reset();
                        current_position = time;
                        shared.position.store(time.to_bits(), Ordering::Relaxed);
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        shared
                            .position
                            .store(current_position.to_bits(), Ordering::Relaxed);
                    }
                },
                PlaybackCommand::SetVolume(vol) => pipeline.volume = vol.clamp(0.0, 1.0),
                PlaybackCommand::SetSpeed(rate) => {
                    if let Err(e) = pipeline.resampler.set_rate(rate) {
                        log::warn!("Keeping rate {}: {}", pipeline.resampler.rate(), e);
                    }
                }
                PlaybackCommand::Shutdown => return,
            }
        }

        if !playing {
            thread::sleep(StdDuration::from_millis(10));
            continue;
        }

        let rendered = match decoder.decode_next() {
            Ok(Some(decoded)) => {
                // Position advances in source time regardless of rate.
                let frames = decoded.samples.len() / decoded.spec.channels.count().max(1);
                current_position += frames as f64 / decoded.spec.rate as f64;
                shared
                    .position
                    .store(current_position.to_bits(), Ordering::Relaxed);

                pipeline.render(&decoded.samples)
            }
            Ok(None) => {
                playing = false;
                if let Ok(tail) = pipeline.drain() {
                    let _ = audio_tx.send(tail);
                }
                log::info!("Playback finished at {:.1}s", current_position);
                emit(&shared.sink, EngineEvent::Finished { success: true });
                continue;
            }
            Err(e) => Err(e),
        };

        match rendered {
            Ok(samples) => {
                if audio_tx.send(samples).is_err() {
                    break;
                }
            }
            Err(e) => {
                playing = false;
                log::error!("Playback stopped: {}", e);
                emit(&shared.sink, EngineEvent::DecodeError(e.to_string()));
            }
        }
    }
}
