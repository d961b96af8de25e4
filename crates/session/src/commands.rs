//! Command entry points: UI commands, remote commands from the now-playing
//! surface, and audio interruptions all funnel into the same controller calls.

use crate::controller::SessionController;
use earshot_core::{
    AudioEngine, CatalogStore, Interruption, NowPlayingSurface, RemoteCommand, Result,
};
use serde::{Deserialize, Serialize};

/// A transport or settings command for the session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Play,
    Pause,
    TogglePlayPause,
    Stop,
    Seek(f64),
    /// Skip forward by the given seconds, or the configured default
    SkipForward(Option<f64>),
    /// Skip backward by the given seconds, or the configured default
    SkipBackward(Option<f64>),
    JumpToChapter(usize),
    NextChapter,
    PreviousChapter,
    SetPlaybackRate(f32),
    SetVolume(f32),
    ToggleVolumeBoost,
    StartSleepTimer(u64),
    SleepAtChapterEnd,
    CancelSleepTimer,
    Remote(RemoteCommand),
    Interruption(Interruption),
}

impl From<RemoteCommand> for Command {
    fn from(command: RemoteCommand) -> Self {
        Self::Remote(command)
    }
}

impl From<Interruption> for Command {
    fn from(interruption: Interruption) -> Self {
        Self::Interruption(interruption)
    }
}

impl<E, C, N> SessionController<E, C, N>
where
    E: AudioEngine,
    C: CatalogStore,
    N: NowPlayingSurface,
{
    /// Runs one command to completion
    pub fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::TogglePlayPause => self.toggle_play_pause(),
            Command::Stop => self.stop(),
            Command::Seek(seconds) => self.seek(seconds),
            Command::SkipForward(seconds) => self.skip_forward(seconds),
            Command::SkipBackward(seconds) => self.skip_backward(seconds),
            Command::JumpToChapter(index) => self.jump_to_chapter(index),
            Command::NextChapter => self.next_chapter(),
            Command::PreviousChapter => self.previous_chapter(),
            Command::SetPlaybackRate(rate) => self.set_playback_rate(rate),
            Command::SetVolume(volume) => self.set_volume(volume),
            Command::ToggleVolumeBoost => self.toggle_volume_boost().map(|_| ()),
            Command::StartSleepTimer(seconds) => {
                self.start_sleep_timer(seconds);
                Ok(())
            }
            Command::SleepAtChapterEnd => self.sleep_at_chapter_end(),
            Command::CancelSleepTimer => {
                self.cancel_sleep_timer();
                Ok(())
            }
            Command::Remote(remote) => self.handle_remote_command(remote),
            Command::Interruption(interruption) => self.handle_interruption(interruption),
        }
    }

    pub fn toggle_play_pause(&mut self) -> Result<()> {
        if self.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Remote commands take exactly the same path as UI commands
    pub fn handle_remote_command(&mut self, command: RemoteCommand) -> Result<()> {
        log::debug!("Remote command: {:?}", command);
        match command {
            RemoteCommand::Play => self.play(),
            RemoteCommand::Pause => self.pause(),
            RemoteCommand::TogglePlayPause => self.toggle_play_pause(),
            RemoteCommand::SkipForward => self.skip_forward(None),
            RemoteCommand::SkipBackward => self.skip_backward(None),
            RemoteCommand::Seek(seconds) => self.seek(seconds),
        }
    }

    /// Pauses when audio focus is lost; resumes only when the platform says so
    pub fn handle_interruption(&mut self, interruption: Interruption) -> Result<()> {
        match interruption {
            Interruption::Began => {
                log::info!("Audio interruption began");
                if self.loaded_item().is_some() {
                    self.pause()
                } else {
                    Ok(())
                }
            }
            Interruption::Ended { should_resume } => {
                log::info!("Audio interruption ended (resume: {})", should_resume);
                if should_resume && self.loaded_item().is_some() {
                    self.play()
                } else {
                    Ok(())
                }
            }
        }
    }
}
