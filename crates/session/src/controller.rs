//! The playback session controller
//!
//! Owns the single active session: which audiobook is loaded, where playback
//! is, which chapter that falls in, the sleep timer, and the side effects on
//! the audio engine, the catalog store and the now-playing surface.
//!
//! Every mutating operation ends with the same explicit steps: recompute the
//! derived chapter, then checkpoint and/or publish as the operation requires.
//! Nothing here is reactive and nothing blocks apart from [`SessionController::load_item`],
//! which waits for the engine to open the file.

use crate::chapters::ChapterIndex;
use crate::sleep_timer::{whole_seconds, SleepTick, SleepTimer};
use crate::state::{ChapterSnapshot, PlaybackPhase, SessionSnapshot};
use crate::SessionSettings;
use earshot_core::{
    AppError, AudioEngine, Audiobook, CatalogStore, Chapter, EngineEvent, EngineEventSink,
    NowPlayingInfo, NowPlayingSurface, PlaybackRate, Result, Volume,
};

pub struct SessionController<E, C, N> {
    engine: E,
    catalog: C,
    surface: N,
    settings: SessionSettings,

    item: Option<Audiobook>,
    chapters: ChapterIndex,
    phase: PlaybackPhase,
    current_time: f64,
    duration: f64,
    rate: PlaybackRate,
    volume: Volume,
    current_chapter: Option<usize>,
    sleep_timer: SleepTimer,
    last_autosave_second: Option<u64>,
}

impl<E, C, N> SessionController<E, C, N>
where
    E: AudioEngine,
    C: CatalogStore,
    N: NowPlayingSurface,
{
    /// Creates an idle session
    pub fn new(engine: E, catalog: C, surface: N, settings: SessionSettings) -> Self {
        let volume = settings.initial_volume;
        Self {
            engine,
            catalog,
            surface,
            settings,
            item: None,
            chapters: ChapterIndex::new(),
            phase: PlaybackPhase::Idle,
            current_time: 0.0,
            duration: 0.0,
            rate: PlaybackRate::default(),
            volume,
            current_chapter: None,
            sleep_timer: SleepTimer::new(),
            last_autosave_second: None,
        }
    }

    // ===== Accessors =====

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlaybackPhase::Playing
    }

    pub fn loaded_item(&self) -> Option<&Audiobook> {
        self.item.as_ref()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn playback_rate(&self) -> f32 {
        self.rate.value()
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.current_chapter.and_then(|idx| self.chapters.get(idx))
    }

    pub fn current_chapter_index(&self) -> Option<usize> {
        self.current_chapter
    }

    pub fn chapters(&self) -> &ChapterIndex {
        &self.chapters
    }

    pub fn sleep_timer_remaining(&self) -> u64 {
        self.sleep_timer.remaining()
    }

    pub fn sleep_timer_active(&self) -> bool {
        self.sleep_timer.is_active()
    }

    /// Changes whenever a sleep countdown is (re)started
    pub fn sleep_timer_generation(&self) -> u64 {
        self.sleep_timer.generation()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn surface(&self) -> &N {
        &self.surface
    }

    /// Hands the engine the sink for its finish and decode-error notifications
    pub fn subscribe_engine(&mut self, sink: EngineEventSink) {
        self.engine.subscribe(sink);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let current_chapter = self.current_chapter.and_then(|index| {
            self.chapters.get(index).map(|ch| ChapterSnapshot {
                index,
                title: ch.title.clone(),
                start_time: ch.start_time,
                end_time: ch.end_time(),
            })
        });

        SessionSnapshot {
            phase: self.phase,
            item_id: self.item.as_ref().map(|item| item.id),
            title: self.item.as_ref().map(|item| item.title.clone()),
            current_time: self.current_time,
            duration: self.duration,
            playback_rate: self.rate.value(),
            volume: self.volume.level(),
            volume_boost: self.volume.boost_enabled(),
            effective_volume: self.volume.effective(),
            current_chapter,
            chapter_count: self.chapters.len(),
            sleep_timer_remaining: self.sleep_timer.remaining(),
            is_finished: self.item.as_ref().is_some_and(|item| item.is_finished),
        }
    }

    // ===== Loading =====

    /// Replaces the loaded item
    ///
    /// On failure nothing changes: the previous item (if any) stays loaded.
    /// Playback is not started.
    pub fn load_item(&mut self, item: Audiobook) -> Result<()> {
        let chapters = ChapterIndex::build(item.chapters.clone()).inspect_err(|e| {
            log::warn!("Rejecting '{}': {}", item.title, e);
        })?;

        if self.is_playing() {
            self.refresh_time_from_engine();
        }

        let engine_duration = self.engine.load(&item.file_path).inspect_err(|e| {
            log::error!("Failed to load '{}': {}", item.file_path.display(), e);
        })?;

        // The outgoing item gets its final checkpoint before it is replaced.
        if self.item.is_some() {
            self.checkpoint();
        }

        let mut item = item;
        let duration = engine_duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(item.duration)
            .max(0.0);
        item.duration = duration;

        self.duration = duration;
        self.current_time = clamp_time(item.position, duration);
        self.rate = PlaybackRate::clamped(item.playback_rate);
        self.chapters = chapters;
        self.phase = PlaybackPhase::Paused;
        self.last_autosave_second = None;

        log::info!(
            "Loaded '{}' at {:.1}s of {:.1}s ({})",
            item.title,
            self.current_time,
            duration,
            self.rate
        );
        self.item = Some(item);

        if self.current_time > 0.0 {
            if let Err(e) = self.engine.set_current_time(self.current_time) {
                log::warn!("Engine could not restore position: {}", e);
            }
        }
        if let Err(e) = self.engine.set_rate(self.rate.value()) {
            log::warn!("Engine could not apply playback rate: {}", e);
        }
        if let Err(e) = self.engine.set_volume(self.volume.effective()) {
            log::warn!("Engine could not apply volume: {}", e);
        }

        self.recompute_chapter();
        self.publish_now_playing();
        Ok(())
    }

    // ===== Transport =====

    /// Starts playback of the loaded item
    ///
    /// From `Finished` the item restarts from the beginning.
    pub fn play(&mut self) -> Result<()> {
        self.require_item("play")?;

        if self.is_playing() {
            return Ok(());
        }

        if self.phase == PlaybackPhase::Finished {
            self.seek(0.0)?;
            if let Some(item) = self.item.as_mut() {
                item.is_finished = false;
            }
            log::info!("Restarting finished item from the beginning");
        }

        self.engine
            .play(self.rate.value(), self.volume.effective())
            .inspect_err(|e| log::error!("Engine refused to play: {}", e))?;

        self.phase = PlaybackPhase::Playing;
        if let Some(item) = self.item.as_mut() {
            item.mark_played();
        }
        log::info!("Playing from {:.1}s", self.current_time);

        self.persist();
        self.publish_now_playing();
        Ok(())
    }

    /// Pauses playback and checkpoints the position. Idempotent.
    pub fn pause(&mut self) -> Result<()> {
        self.require_item("pause")?;

        if self.is_playing() {
            self.refresh_time_from_engine();
            if let Err(e) = self.engine.pause() {
                log::warn!("Engine pause failed: {}", e);
            }
            self.phase = PlaybackPhase::Paused;
            log::info!("Paused at {:.1}s", self.current_time);
        }

        self.recompute_chapter();
        self.checkpoint();
        self.publish_now_playing();
        Ok(())
    }

    /// Pauses, cancels the sleep timer and halts engine output
    ///
    /// Safe to call repeatedly and with nothing loaded.
    pub fn stop(&mut self) -> Result<()> {
        self.sleep_timer.cancel();

        if self.item.is_none() {
            return Ok(());
        }

        if self.is_playing() {
            self.refresh_time_from_engine();
            self.phase = PlaybackPhase::Paused;
        }
        if let Err(e) = self.engine.stop() {
            log::warn!("Engine stop failed: {}", e);
        }

        self.recompute_chapter();
        self.checkpoint();
        self.publish_now_playing();
        Ok(())
    }

    /// Stops the session for good and clears the now-playing entry
    pub fn shutdown(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Stop during shutdown failed: {}", e);
        }
        self.surface.clear();
        log::info!("Session shut down");
    }

    /// Moves to `seconds`, clamped to `[0, duration]`, and checkpoints immediately
    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        self.require_item("seek")?;

        let target = clamp_time(seconds, self.duration);
        self.engine
            .set_current_time(target)
            .inspect_err(|e| log::warn!("Engine seek to {:.1}s failed: {}", target, e))?;

        self.current_time = target;
        if self.phase == PlaybackPhase::Finished && target < self.duration {
            self.phase = PlaybackPhase::Paused;
        }

        self.recompute_chapter();
        self.checkpoint();
        self.publish_now_playing();
        Ok(())
    }

    pub fn skip_forward(&mut self, seconds: Option<f64>) -> Result<()> {
        self.require_item("skip forward")?;
        let step = seconds.unwrap_or(self.settings.skip_forward);

        if self.is_playing() {
            self.refresh_time_from_engine();
        }
        self.seek(self.current_time + step)
    }

    /// Rewinds with the smart-rewind policy
    ///
    /// While playing and less than the smart-rewind threshold past the start of
    /// the current chapter (or the track when outside any chapter), the rewind is
    /// the threshold rather than `seconds`.
    pub fn skip_backward(&mut self, seconds: Option<f64>) -> Result<()> {
        self.require_item("skip backward")?;
        let requested = seconds.unwrap_or(self.settings.skip_backward);

        if self.is_playing() {
            self.refresh_time_from_engine();
            self.recompute_chapter();
        }

        let anchor = self.current_chapter().map_or(0.0, |ch| ch.start_time);
        let threshold = self.settings.smart_rewind_threshold;

        let step = if self.is_playing() && self.current_time - anchor < threshold {
            log::debug!(
                "Smart rewind: {:.1}s into segment, rewinding {:.0}s",
                self.current_time - anchor,
                threshold
            );
            threshold
        } else {
            requested
        };

        self.seek(self.current_time - step)
    }

    /// Seeks to the start of the chapter at `index`
    pub fn jump_to_chapter(&mut self, index: usize) -> Result<()> {
        self.require_item("jump to chapter")?;

        let start = self
            .chapters
            .get(index)
            .map(|ch| ch.start_time)
            .ok_or_else(|| AppError::InvalidArgument {
                argument: "chapter".to_string(),
                reason: format!("index {} out of {} chapters", index, self.chapters.len()),
            })?;

        self.seek(start)
    }

    /// Seeks to the next chapter start; no-op on the last chapter
    pub fn next_chapter(&mut self) -> Result<()> {
        self.require_item("next chapter")?;
        match self.chapters.next_start(self.current_time) {
            Some(start) => self.seek(start),
            None => Ok(()),
        }
    }

    /// Restarts the current chapter, or goes to the previous one when close to its start
    pub fn previous_chapter(&mut self) -> Result<()> {
        self.require_item("previous chapter")?;
        match self.chapters.previous_start(self.current_time) {
            Some(start) => self.seek(start),
            None => self.seek(0.0),
        }
    }

    // ===== Rate & volume =====

    /// Sets the playback rate, clamped to `[0.5, 3.0]`, and stores it on the item
    pub fn set_playback_rate(&mut self, rate: f32) -> Result<()> {
        let rate = PlaybackRate::clamped(rate);

        if self.is_playing() {
            self.engine
                .set_rate(rate.value())
                .inspect_err(|e| log::warn!("Engine rejected rate {}: {}", rate, e))?;
        }

        self.rate = rate;
        if let Some(item) = self.item.as_mut() {
            item.playback_rate = self.rate.value();
        }
        log::info!("Playback rate set to {}", self.rate);

        self.persist();
        self.publish_now_playing();
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.volume.set_level(volume);
        self.apply_volume()
    }

    /// Flips the volume boost and returns the new setting
    pub fn toggle_volume_boost(&mut self) -> Result<bool> {
        let enabled = self.volume.toggle_boost();
        log::info!("Volume boost {}", if enabled { "on" } else { "off" });
        self.apply_volume()?;
        Ok(enabled)
    }

    fn apply_volume(&mut self) -> Result<()> {
        self.engine.set_volume(self.volume.effective())
    }

    // ===== Sleep timer =====

    /// Starts (or restarts) the sleep timer. Zero seconds cancels it.
    pub fn start_sleep_timer(&mut self, seconds: u64) {
        self.sleep_timer.cancel();
        self.sleep_timer.start(seconds);
        log::info!("Sleep timer set for {}s", seconds);
    }

    pub fn cancel_sleep_timer(&mut self) {
        if self.sleep_timer.is_active() {
            log::info!("Sleep timer cancelled");
        }
        self.sleep_timer.cancel();
    }

    /// Seconds until the current chapter ends, for the "end of chapter" sleep option
    pub fn seconds_to_chapter_end(&self) -> Option<f64> {
        self.current_chapter()
            .map(|ch| (ch.end_time() - self.current_time).max(0.0))
    }

    /// Sleep timer that fires when the current chapter ends
    pub fn sleep_at_chapter_end(&mut self) -> Result<()> {
        let seconds = self
            .seconds_to_chapter_end()
            .ok_or_else(|| AppError::InvalidArgument {
                argument: "sleep timer".to_string(),
                reason: "no current chapter".to_string(),
            })?;
        self.start_sleep_timer(whole_seconds(seconds));
        Ok(())
    }

    /// Advances the sleep timer by one tick, pausing when it runs out
    pub fn sleep_tick(&mut self) -> SleepTick {
        let tick = self.sleep_timer.tick();
        if tick == SleepTick::Expired {
            log::info!("Sleep timer expired");
            if self.item.is_some() {
                if let Err(e) = self.pause() {
                    log::warn!("Sleep timer could not pause: {}", e);
                }
            }
            self.sleep_timer.cancel();
        }
        tick
    }

    // ===== Periodic poll =====

    /// Reads the engine position while playing
    ///
    /// Also autosaves on whole-second multiples of the autosave interval and
    /// marks the item finished once it is within the finish threshold of the end.
    pub fn poll_tick(&mut self) {
        if !self.is_playing() {
            return;
        }

        let previous_chapter = self.current_chapter;
        self.refresh_time_from_engine();
        self.recompute_chapter();

        let newly_finished = self.check_finish_proximity();

        let second = self.current_time.floor() as u64;
        let interval = self.settings.autosave_interval.max(1);
        if second % interval == 0 && self.last_autosave_second != Some(second) {
            self.last_autosave_second = Some(second);
            log::debug!("Autosave at {}s", second);
            self.checkpoint();
        } else if newly_finished {
            self.persist();
        }

        if self.current_chapter != previous_chapter {
            self.publish_now_playing();
        }
    }

    // ===== Engine notifications =====

    /// Applies a notification from the audio engine
    ///
    /// A clean finish marks the item finished at its full duration. Decode
    /// errors stop playback and are returned without touching the persisted
    /// position or finished flag.
    pub fn handle_engine_event(&mut self, event: EngineEvent) -> Result<()> {
        match event {
            EngineEvent::Finished { success: true } => {
                if !self.is_playing() {
                    log::debug!("Ignoring finish notification while {}", self.phase);
                    return Ok(());
                }
                self.phase = PlaybackPhase::Finished;
                self.current_time = self.duration;
                if let Some(item) = self.item.as_mut() {
                    item.is_finished = true;
                    item.position = self.duration;
                    log::info!("Finished '{}'", item.title);
                }
                self.recompute_chapter();
                self.persist();
                self.publish_now_playing();
                Ok(())
            }
            EngineEvent::Finished { success: false } => {
                self.halt_after_failure("playback ended with an error".to_string())
            }
            EngineEvent::DecodeError(message) => self.halt_after_failure(message),
        }
    }

    fn halt_after_failure(&mut self, message: String) -> Result<()> {
        log::error!("Playback failed: {}", message);
        if self.is_playing() {
            self.phase = PlaybackPhase::Paused;
            if let Err(e) = self.engine.pause() {
                log::warn!("Engine pause after failure failed: {}", e);
            }
            self.publish_now_playing();
        }
        Err(AppError::AudioDecodeError {
            message,
            source: None,
        })
    }

    // ===== Internal steps =====

    fn require_item(&self, command: &str) -> Result<()> {
        if self.item.is_none() {
            log::warn!("Ignoring '{}': no item loaded", command);
            return Err(AppError::empty_session(command));
        }
        Ok(())
    }

    fn refresh_time_from_engine(&mut self) {
        self.current_time = clamp_time(self.engine.current_time(), self.duration);
    }

    /// Derived state: the chapter containing `current_time`
    fn recompute_chapter(&mut self) {
        self.current_chapter = self.chapters.index_at(self.current_time);
    }

    /// Returns true if this call flipped the item to finished
    fn check_finish_proximity(&mut self) -> bool {
        let near_end = self.duration - self.current_time < self.settings.finish_threshold;
        match self.item.as_mut() {
            Some(item) if near_end && !item.is_finished => {
                item.is_finished = true;
                log::info!(
                    "'{}' marked finished with {:.1}s left",
                    item.title,
                    self.duration - self.current_time
                );
                true
            }
            _ => false,
        }
    }

    /// Writes the current position onto the loaded item and saves it
    fn checkpoint(&mut self) {
        self.check_finish_proximity();
        if let Some(item) = self.item.as_mut() {
            item.position = self.current_time;
            item.playback_rate = self.rate.value();
        }
        self.persist();
    }

    /// Fire-and-forget save; failures leave the in-memory state authoritative
    fn persist(&mut self) {
        if let Some(item) = self.item.as_ref() {
            if let Err(e) = self.catalog.save(item) {
                log::warn!("Could not save '{}': {}", item.title, e);
            }
        }
    }

    fn now_playing_info(&self) -> Option<NowPlayingInfo> {
        let item = self.item.as_ref()?;
        Some(NowPlayingInfo {
            title: item.title.clone(),
            author: item.author.clone(),
            duration: self.duration,
            elapsed: self.current_time,
            effective_rate: if self.is_playing() {
                self.rate.value()
            } else {
                0.0
            },
            artwork_path: item.artwork_path.clone(),
            chapter_title: self.current_chapter().map(|ch| ch.title.clone()),
        })
    }

    fn publish_now_playing(&mut self) {
        if let Some(info) = self.now_playing_info() {
            self.surface.publish(&info);
        }
    }
}

fn clamp_time(seconds: f64, duration: f64) -> f64 {
    if seconds.is_finite() {
        seconds.clamp(0.0, duration.max(0.0))
    } else {
        0.0
    }
}
