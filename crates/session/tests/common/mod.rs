//! In-memory collaborators for session tests
//!
//! Each fake keeps its state behind an `Arc<Mutex<_>>` so a test can hand the
//! fake to the controller and still inspect or steer it through a probe.

#![allow(dead_code)]

use earshot_core::{
    AppError, AudioEngine, Audiobook, AudiobookId, CatalogStore, EngineEvent, EngineEventSink,
    NowPlayingInfo, NowPlayingSurface, Result,
};
use earshot_session::{SessionController, SessionSettings};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct EngineState {
    pub loaded: Option<PathBuf>,
    pub load_calls: Vec<PathBuf>,
    pub position: f64,
    pub playing: bool,
    pub rate: f32,
    pub volume: f32,
    pub reported_duration: Option<f64>,
    pub fail_load: bool,
    pub fail_rate: bool,
    pub sink: Option<EngineEventSink>,
}

#[derive(Clone, Default)]
pub struct FakeEngine {
    pub state: Arc<Mutex<EngineState>>,
}

impl FakeEngine {
    /// Simulates playback advancing to `seconds`
    pub fn advance_to(&self, seconds: f64) {
        self.state.lock().unwrap().position = seconds;
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    pub fn rate(&self) -> f32 {
        self.state.lock().unwrap().rate
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    pub fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    pub fn fail_next_loads(&self, fail: bool) {
        self.state.lock().unwrap().fail_load = fail;
    }

    pub fn reject_rate_changes(&self, reject: bool) {
        self.state.lock().unwrap().fail_rate = reject;
    }

    /// Delivers an event through the subscribed sink, as the playback thread would
    pub fn emit(&self, event: EngineEvent) {
        let state = self.state.lock().unwrap();
        if let Some(sink) = state.sink.as_ref() {
            sink(event);
        }
    }
}

impl AudioEngine for FakeEngine {
    fn load(&mut self, path: &Path) -> Result<Option<f64>> {
        let mut state = self.state.lock().unwrap();
        state.load_calls.push(path.to_path_buf());
        if state.fail_load {
            return Err(AppError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        state.loaded = Some(path.to_path_buf());
        state.position = 0.0;
        state.playing = false;
        Ok(state.reported_duration)
    }

    fn play(&mut self, rate: f32, volume: f32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.playing = true;
        state.rate = rate;
        state.volume = volume;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.state.lock().unwrap().playing = false;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.state.lock().unwrap().playing = false;
        Ok(())
    }

    fn set_current_time(&mut self, seconds: f64) -> Result<()> {
        self.state.lock().unwrap().position = seconds;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_rate {
            return Err(AppError::PlaybackDeviceError {
                message: "rate change rejected".to_string(),
            });
        }
        state.rate = rate;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.state.lock().unwrap().volume = volume;
        Ok(())
    }

    fn subscribe(&mut self, sink: EngineEventSink) {
        self.state.lock().unwrap().sink = Some(sink);
    }
}

#[derive(Default)]
pub struct CatalogState {
    pub saves: Vec<Audiobook>,
    pub fail: bool,
}

#[derive(Clone, Default)]
pub struct MemoryCatalog {
    pub state: Arc<Mutex<CatalogState>>,
}

impl MemoryCatalog {
    pub fn save_count(&self) -> usize {
        self.state.lock().unwrap().saves.len()
    }

    /// The most recent record written for `id`
    pub fn last_saved(&self, id: AudiobookId) -> Option<Audiobook> {
        self.state
            .lock()
            .unwrap()
            .saves
            .iter()
            .rev()
            .find(|book| book.id == id)
            .cloned()
    }

    pub fn set_failing(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }
}

impl CatalogStore for MemoryCatalog {
    fn save(&mut self, book: &Audiobook) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail {
            return Err(AppError::PersistenceError {
                message: "disk full".to_string(),
                source: None,
            });
        }
        state.saves.push(book.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct SurfaceState {
    pub published: Vec<NowPlayingInfo>,
    pub cleared: bool,
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub state: Arc<Mutex<SurfaceState>>,
}

impl RecordingSurface {
    pub fn last(&self) -> Option<NowPlayingInfo> {
        self.state.lock().unwrap().published.last().cloned()
    }

    pub fn publish_count(&self) -> usize {
        self.state.lock().unwrap().published.len()
    }

    pub fn was_cleared(&self) -> bool {
        self.state.lock().unwrap().cleared
    }
}

impl NowPlayingSurface for RecordingSurface {
    fn publish(&mut self, info: &NowPlayingInfo) {
        let mut state = self.state.lock().unwrap();
        state.published.push(info.clone());
        state.cleared = false;
    }

    fn clear(&mut self) {
        self.state.lock().unwrap().cleared = true;
    }
}

pub type TestController = SessionController<FakeEngine, MemoryCatalog, RecordingSurface>;

pub struct Harness {
    pub controller: TestController,
    pub engine: FakeEngine,
    pub catalog: MemoryCatalog,
    pub surface: RecordingSurface,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(SessionSettings::default())
    }

    pub fn with_settings(settings: SessionSettings) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let engine = FakeEngine::default();
        let catalog = MemoryCatalog::default();
        let surface = RecordingSurface::default();
        let controller =
            SessionController::new(engine.clone(), catalog.clone(), surface.clone(), settings);

        Self {
            controller,
            engine,
            catalog,
            surface,
        }
    }

    /// Loads `book` and returns its id
    pub fn load(&mut self, book: Audiobook) -> AudiobookId {
        let id = book.id;
        self.controller.load_item(book).expect("load should succeed");
        id
    }

    /// Moves the fake engine to `seconds` and runs one poll tick
    pub fn play_until(&mut self, seconds: f64) {
        self.engine.advance_to(seconds);
        self.controller.poll_tick();
    }
}

pub fn book(duration: f64) -> Audiobook {
    Audiobook::new("The Long Walk", "/books/long-walk.m4b", duration).with_author("R. Bachman")
}

/// 3600 s book with two 1800 s chapters
pub fn two_chapter_book() -> Audiobook {
    book(3600.0).with_chapters(vec![
        earshot_core::Chapter::new("Ch1", 0.0, 1800.0),
        earshot_core::Chapter::new("Ch2", 1800.0, 1800.0),
    ])
}
