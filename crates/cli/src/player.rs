use crate::catalog::JsonCatalog;
use anyhow::{Context, Result};
use console::{style, Key, Term};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use earshot_config::{Config, PlayerConfig};
use earshot_core::{format_clock, Audiobook, NowPlayingInfo, NowPlayingSurface, PlaybackRate};
use earshot_session::{
    Command, PlaybackPhase, SessionController, SessionHandle, SessionRuntime, SessionSettings,
    SessionSnapshot,
};
use media_engine::MediaEngine;
use std::thread;
use std::time::Duration as StdDuration;

const REDRAW_INTERVAL: StdDuration = StdDuration::from_millis(250);
const DEFAULT_SLEEP_MINUTES: u64 = 15;

/// Options from the `play` subcommand
#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    pub sleep_minutes: Option<u64>,
    pub rate: Option<f32>,
}

/// Shows now-playing information in the terminal window title
pub struct TerminalSurface {
    term: Term,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }
}

impl NowPlayingSurface for TerminalSurface {
    fn publish(&mut self, info: &NowPlayingInfo) {
        self.term.set_title(window_title(info));
    }

    fn clear(&mut self) {
        self.term.set_title("earshot");
    }
}

fn window_title(info: &NowPlayingInfo) -> String {
    let marker = if info.is_playing() { "▶" } else { "⏸" };
    match &info.chapter_title {
        Some(chapter) => format!("{} {} - {}", marker, info.title, chapter),
        None => format!("{} {}", marker, info.title),
    }
}

pub fn start_playback(
    catalog: JsonCatalog,
    config: &Config,
    book: Audiobook,
    options: PlayOptions,
) -> Result<()> {
    let settings = SessionSettings::from(&config.player);
    let controller =
        SessionController::new(MediaEngine::new(), catalog, TerminalSurface::new(), settings);
    let runtime = SessionRuntime::spawn(controller).context("Failed to start playback session")?;
    let handle = runtime.handle();

    let result = prepare_session(&handle, &config.player, book, &options)
        .and_then(|()| run_player_ui(&handle, &config.player));

    // Persists the final position.
    runtime.shutdown();
    result
}

fn prepare_session(
    handle: &SessionHandle,
    player: &PlayerConfig,
    book: Audiobook,
    options: &PlayOptions,
) -> Result<()> {
    handle
        .load_item_blocking(book)
        .context("Failed to load audio file")?;

    if let Some(rate) = options.rate {
        handle
            .execute(Command::SetPlaybackRate(rate))
            .context("Failed to set playback rate")?;
    }
    if let Some(minutes) = options.sleep_minutes {
        handle
            .execute(Command::StartSleepTimer(minutes * 60))
            .context("Failed to start sleep timer")?;
    }
    if player.auto_play_on_load {
        handle
            .execute(Command::Play)
            .context("Failed to start playback")?;
    }
    Ok(())
}

/// What a key press asks the player to do
#[derive(Debug, Clone, PartialEq)]
enum KeyAction {
    Send(Command),
    Quit,
    Ignore,
}

fn key_action(key: &Key, snapshot: &SessionSnapshot, player: &PlayerConfig) -> KeyAction {
    let volume_step = f32::from(player.volume_step) / 100.0;
    match key {
        Key::Char(' ') => KeyAction::Send(Command::TogglePlayPause),
        Key::Char('q') | Key::Escape => KeyAction::Quit,
        Key::ArrowLeft => KeyAction::Send(Command::SkipBackward(None)),
        Key::ArrowRight => KeyAction::Send(Command::SkipForward(None)),
        Key::Char('n') => KeyAction::Send(Command::NextChapter),
        Key::Char('p') => KeyAction::Send(Command::PreviousChapter),
        Key::Char('+') | Key::Char('=') => {
            KeyAction::Send(Command::SetVolume((snapshot.volume + volume_step).min(1.0)))
        }
        Key::Char('-') | Key::Char('_') => {
            KeyAction::Send(Command::SetVolume((snapshot.volume - volume_step).max(0.0)))
        }
        Key::Char('b') => KeyAction::Send(Command::ToggleVolumeBoost),
        Key::Char('[') => KeyAction::Send(Command::SetPlaybackRate(
            (snapshot.playback_rate - player.speed_step).max(PlaybackRate::MIN),
        )),
        Key::Char(']') => KeyAction::Send(Command::SetPlaybackRate(
            (snapshot.playback_rate + player.speed_step).min(PlaybackRate::MAX),
        )),
        Key::Char('s') if snapshot.sleep_timer_remaining > 0 => {
            KeyAction::Send(Command::CancelSleepTimer)
        }
        Key::Char('s') => KeyAction::Send(Command::StartSleepTimer(DEFAULT_SLEEP_MINUTES * 60)),
        Key::Char('e') => KeyAction::Send(Command::SleepAtChapterEnd),
        _ => KeyAction::Ignore,
    }
}

fn spawn_key_reader() -> Result<Receiver<Key>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("earshot-keys".to_string())
        .spawn(move || {
            let term = Term::stdout();
            while let Ok(key) = term.read_key() {
                if tx.send(key).is_err() {
                    break;
                }
            }
        })
        .context("Failed to start key reader")?;
    Ok(rx)
}

fn run_player_ui(handle: &SessionHandle, player: &PlayerConfig) -> Result<()> {
    let term = Term::stdout();
    if term.hide_cursor().is_err() {
        log::warn!("Failed to hide cursor");
    }

    let keys = spawn_key_reader()?;
    let result = player_loop(&term, handle, player, &keys);

    let _ = term.show_cursor();
    result
}

fn player_loop(
    term: &Term,
    handle: &SessionHandle,
    player: &PlayerConfig,
    keys: &Receiver<Key>,
) -> Result<()> {
    let mut last_notice: Option<String> = None;

    loop {
        if let Some(notice) = handle.notices().try_iter().last() {
            last_notice = Some(notice.user_message);
        }

        let snapshot = handle.snapshot().context("Playback session stopped")?;
        term.clear_screen().context("Failed to clear screen")?;
        draw_player_ui(term, &snapshot, last_notice.as_deref())?;

        let key = match keys.recv_timeout(REDRAW_INTERVAL) {
            Ok(key) => key,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match key_action(&key, &snapshot, player) {
            KeyAction::Send(command) => {
                handle.send(command).context("Playback session stopped")?;
            }
            KeyAction::Quit => break,
            KeyAction::Ignore => {}
        }
    }

    Ok(())
}

fn draw_player_ui(term: &Term, snapshot: &SessionSnapshot, notice: Option<&str>) -> Result<()> {
    let title = snapshot.title.as_deref().unwrap_or("Nothing loaded");
    term.write_line(&format!("\n  {}", style(title).bold().cyan()))
        .context("Failed to write title")?;

    if let Some(chapter) = &snapshot.current_chapter {
        term.write_line(&format!(
            "  Chapter {}/{}: {}",
            chapter.index + 1,
            snapshot.chapter_count,
            style(&chapter.title).dim()
        ))
        .context("Failed to write chapter")?;
    }

    term.write_line("").context("Failed to write blank line")?;
    term.write_line(&format!(
        "  {} / {}  (-{})",
        format_clock(snapshot.current_time),
        format_clock(snapshot.duration),
        format_clock(snapshot.remaining())
    ))
    .context("Failed to write position")?;
    term.write_line(&progress_bar(snapshot.progress(), 50))
        .context("Failed to write progress bar")?;
    term.write_line("").context("Failed to write blank line")?;

    let status = match snapshot.phase {
        PlaybackPhase::Playing => style("Playing").green(),
        PlaybackPhase::Paused => style("Paused").yellow(),
        PlaybackPhase::Finished => style("Finished").cyan(),
        PlaybackPhase::Idle => style("Idle").dim(),
    };
    term.write_line(&format!("  Status: {}", status))
        .context("Failed to write status")?;
    term.write_line(&format!("  Speed: {:.2}x", snapshot.playback_rate))
        .context("Failed to write speed")?;
    term.write_line(&format!(
        "  Volume: {:.0}%{}",
        snapshot.volume * 100.0,
        if snapshot.volume_boost { " (boost)" } else { "" }
    ))
    .context("Failed to write volume")?;
    if snapshot.sleep_timer_remaining > 0 {
        term.write_line(&format!(
            "  Sleep in: {}",
            format_clock(snapshot.sleep_timer_remaining as f64)
        ))
        .context("Failed to write sleep timer")?;
    }
    if let Some(notice) = notice {
        term.write_line(&format!("  {}", style(notice).red()))
            .context("Failed to write notice")?;
    }

    term.write_line("").context("Failed to write blank line")?;
    for line in [
        "  Controls:",
        "    Space   - Play/Pause",
        "    ←/→     - Skip back/forward",
        "    p/n     - Previous/next chapter",
        "    +/-     - Volume up/down   b - Boost",
        "    [/]     - Speed down/up",
        "    s       - Sleep timer on/off   e - Sleep at chapter end",
        "    Q/Esc   - Quit",
    ] {
        term.write_line(line).context("Failed to write controls")?;
    }

    Ok(())
}

fn progress_bar(progress: f64, width: usize) -> String {
    let percent = (progress.clamp(0.0, 1.0) * 100.0) as usize;
    let filled = (percent * width / 100).min(width);
    format!(
        "  [{}{}] {}%",
        "=".repeat(filled),
        " ".repeat(width - filled),
        percent
    )
}
