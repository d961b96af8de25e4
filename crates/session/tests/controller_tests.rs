//! Behavioural tests for the session controller, driven synchronously

mod common;

use common::{book, two_chapter_book, Harness};
use earshot_core::{
    AppError, Chapter, EngineEvent, ErrorCategory, Interruption, RemoteCommand, Volume,
};
use earshot_session::{Command, PlaybackPhase, SessionSettings, SleepTick};
use proptest::prelude::*;

// ===== Loading =====

#[test]
fn test_load_starts_paused_at_saved_position() {
    let mut h = Harness::new();
    let mut b = book(3600.0);
    b.position = 120.0;
    b.playback_rate = 1.5;
    h.load(b);

    assert_eq!(h.controller.phase(), PlaybackPhase::Paused);
    assert_eq!(h.controller.current_time(), 120.0);
    assert_eq!(h.controller.playback_rate(), 1.5);
    assert_eq!(h.engine.position(), 120.0);
    assert_eq!(h.engine.rate(), 1.5);
    assert!(!h.engine.is_playing());
}

#[test]
fn test_load_prefers_engine_duration() {
    let mut h = Harness::new();
    h.engine.state.lock().unwrap().reported_duration = Some(4000.0);
    h.load(book(3600.0));

    assert_eq!(h.controller.duration(), 4000.0);
    assert_eq!(h.controller.loaded_item().unwrap().duration, 4000.0);
}

#[test]
fn test_load_clamps_out_of_range_saved_rate() {
    let mut h = Harness::new();
    let mut b = book(600.0);
    b.playback_rate = 9.0;
    h.load(b);
    assert_eq!(h.controller.playback_rate(), 3.0);
}

#[test]
fn test_failed_load_keeps_previous_item() {
    let mut h = Harness::new();
    let first = h.load(book(3600.0));
    h.controller.seek(100.0).unwrap();

    h.engine.fail_next_loads(true);
    let err = h
        .controller
        .load_item(book(1200.0))
        .expect_err("load should fail");

    assert!(err.is_load_error());
    assert_eq!(h.controller.loaded_item().map(|b| b.id), Some(first));
    assert_eq!(h.controller.current_time(), 100.0);
    assert_eq!(h.controller.duration(), 3600.0);
    assert_eq!(h.controller.phase(), PlaybackPhase::Paused);
}

#[test]
fn test_overlapping_chapters_rejected_before_engine_load() {
    let mut h = Harness::new();
    let bad = book(600.0).with_chapters(vec![
        Chapter::new("A", 0.0, 400.0),
        Chapter::new("B", 300.0, 300.0),
    ]);

    let err = h.controller.load_item(bad).unwrap_err();
    assert!(matches!(err, AppError::InvalidChapters { .. }));
    assert!(h.engine.state.lock().unwrap().load_calls.is_empty());
    assert_eq!(h.controller.phase(), PlaybackPhase::Idle);
}

#[test]
fn test_switching_items_checkpoints_outgoing_position() {
    let mut h = Harness::new();
    let first = h.load(book(3600.0));
    h.controller.play().unwrap();
    h.engine.advance_to(250.0);

    let second = h.load(book(1200.0));

    let saved = h.catalog.last_saved(first).unwrap();
    assert_eq!(saved.position, 250.0);
    assert_eq!(h.controller.loaded_item().map(|b| b.id), Some(second));
    assert_eq!(h.controller.current_time(), 0.0);
    assert_eq!(h.controller.phase(), PlaybackPhase::Paused);
}

// ===== Transport =====

#[test]
fn test_transport_on_empty_session_is_reported() {
    let mut h = Harness::new();

    for result in [
        h.controller.play(),
        h.controller.pause(),
        h.controller.seek(10.0),
        h.controller.skip_forward(None),
        h.controller.skip_backward(None),
        h.controller.next_chapter(),
    ] {
        let err = result.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::EmptySession);
    }

    // Stop is always safe
    assert!(h.controller.stop().is_ok());
    assert!(h.controller.stop().is_ok());
    assert_eq!(h.controller.phase(), PlaybackPhase::Idle);
}

#[test]
fn test_play_pause_round_trip() {
    let mut h = Harness::new();
    let id = h.load(book(3600.0));

    h.controller.play().unwrap();
    assert!(h.controller.is_playing());
    assert!(h.engine.is_playing());
    assert!(h.controller.loaded_item().unwrap().last_played.is_some());

    h.engine.advance_to(75.5);
    h.controller.pause().unwrap();
    assert!(!h.controller.is_playing());
    assert!(!h.engine.is_playing());
    assert_eq!(h.controller.current_time(), 75.5);
    assert_eq!(h.catalog.last_saved(id).unwrap().position, 75.5);

    // Pausing twice is harmless
    h.controller.pause().unwrap();
    assert_eq!(h.controller.phase(), PlaybackPhase::Paused);
}

#[test]
fn test_toggle_play_pause() {
    let mut h = Harness::new();
    h.load(book(600.0));

    h.controller.execute(Command::TogglePlayPause).unwrap();
    assert!(h.controller.is_playing());
    h.controller.execute(Command::TogglePlayPause).unwrap();
    assert!(!h.controller.is_playing());
}

#[test]
fn test_stop_cancels_sleep_timer_and_checkpoints() {
    let mut h = Harness::new();
    let id = h.load(book(3600.0));
    h.controller.play().unwrap();
    h.controller.start_sleep_timer(600);
    h.engine.advance_to(42.0);

    h.controller.stop().unwrap();

    assert!(!h.controller.is_playing());
    assert!(!h.controller.sleep_timer_active());
    assert_eq!(h.controller.sleep_timer_remaining(), 0);
    assert_eq!(h.catalog.last_saved(id).unwrap().position, 42.0);
    // Still loaded
    assert!(h.controller.loaded_item().is_some());
}

#[test]
fn test_seek_checkpoints_immediately() {
    let mut h = Harness::new();
    let id = h.load(book(3600.0));
    let before = h.catalog.save_count();

    h.controller.seek(1234.0).unwrap();

    assert_eq!(h.catalog.save_count(), before + 1);
    assert_eq!(h.catalog.last_saved(id).unwrap().position, 1234.0);
    assert_eq!(h.engine.position(), 1234.0);
}

#[test]
fn test_skip_forward_uses_default_step() {
    let mut h = Harness::new();
    h.load(book(3600.0));
    h.controller.seek(100.0).unwrap();

    h.controller.skip_forward(None).unwrap();
    assert_eq!(h.controller.current_time(), 130.0);

    h.controller.skip_forward(Some(15.0)).unwrap();
    assert_eq!(h.controller.current_time(), 145.0);

    h.controller.seek(3590.0).unwrap();
    h.controller.skip_forward(None).unwrap();
    assert_eq!(h.controller.current_time(), 3600.0);
}

#[test]
fn test_skip_backward_by_requested_amount_past_threshold() {
    let mut h = Harness::new();
    h.load(book(3600.0));
    h.controller.play().unwrap();
    h.play_until(100.0);

    h.controller.skip_backward(None).unwrap();
    assert_eq!(h.controller.current_time(), 70.0);

    h.controller.skip_backward(Some(10.0)).unwrap();
    assert_eq!(h.controller.current_time(), 60.0);
}

#[test]
fn test_smart_rewind_near_track_start() {
    let mut h = Harness::new();
    h.load(book(3600.0));
    h.controller.play().unwrap();
    h.play_until(10.0);

    h.controller.skip_backward(Some(5.0)).unwrap();
    assert_eq!(h.controller.current_time(), 0.0);
}

#[test]
fn test_smart_rewind_near_chapter_start() {
    let mut h = Harness::new();
    h.load(two_chapter_book());
    h.controller.play().unwrap();
    h.play_until(1810.0);

    h.controller.skip_backward(Some(5.0)).unwrap();

    assert_eq!(h.controller.current_time(), 1780.0);
    assert_eq!(h.controller.current_chapter().unwrap().title, "Ch1");
}

#[test]
fn test_no_smart_rewind_while_paused() {
    let mut h = Harness::new();
    h.load(two_chapter_book());
    h.controller.seek(1810.0).unwrap();

    h.controller.skip_backward(Some(5.0)).unwrap();
    assert_eq!(h.controller.current_time(), 1805.0);
}

// ===== Chapters =====

#[test]
fn test_two_chapter_scenario() {
    let mut h = Harness::new();
    let id = h.load(two_chapter_book());

    h.controller.seek(1900.0).unwrap();
    assert_eq!(h.controller.current_chapter().unwrap().title, "Ch2");

    h.controller.seek(100.0).unwrap();
    assert_eq!(h.controller.current_chapter().unwrap().title, "Ch1");

    h.controller.seek(5000.0).unwrap();
    assert_eq!(h.controller.current_time(), 3600.0);
    assert!(h.controller.loaded_item().unwrap().is_finished);
    assert!(h.catalog.last_saved(id).unwrap().is_finished);
}

#[test]
fn test_chapter_tracks_playback_ticks() {
    let mut h = Harness::new();
    h.load(two_chapter_book());
    h.controller.play().unwrap();

    h.play_until(1799.0);
    assert_eq!(h.controller.current_chapter_index(), Some(0));

    h.play_until(1800.0);
    assert_eq!(h.controller.current_chapter_index(), Some(1));
    assert_eq!(
        h.surface.last().unwrap().chapter_title.as_deref(),
        Some("Ch2")
    );
}

#[test]
fn test_next_and_previous_chapter() {
    let mut h = Harness::new();
    h.load(two_chapter_book());

    h.controller.seek(100.0).unwrap();
    h.controller.next_chapter().unwrap();
    assert_eq!(h.controller.current_time(), 1800.0);

    // On the last chapter there is nothing to skip to
    h.controller.next_chapter().unwrap();
    assert_eq!(h.controller.current_time(), 1800.0);

    // Just past a chapter start goes to the previous chapter
    h.controller.seek(1801.0).unwrap();
    h.controller.previous_chapter().unwrap();
    assert_eq!(h.controller.current_time(), 0.0);

    // Well into a chapter restarts it
    h.controller.seek(1900.0).unwrap();
    h.controller.previous_chapter().unwrap();
    assert_eq!(h.controller.current_time(), 1800.0);
}

#[test]
fn test_jump_to_chapter() {
    let mut h = Harness::new();
    h.load(two_chapter_book());

    h.controller.execute(Command::JumpToChapter(1)).unwrap();
    assert_eq!(h.controller.current_time(), 1800.0);

    let err = h.controller.jump_to_chapter(5).unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument { .. }));
    assert_eq!(h.controller.current_time(), 1800.0);
}

#[test]
fn test_chapter_gap_maps_to_no_chapter() {
    let mut h = Harness::new();
    h.load(book(1000.0).with_chapters(vec![
        Chapter::new("A", 0.0, 100.0),
        Chapter::new("B", 200.0, 100.0),
    ]));

    h.controller.seek(150.0).unwrap();
    assert!(h.controller.current_chapter().is_none());
    assert_eq!(h.controller.chapters().progress_label(None), "-/2");
}

// ===== Rate & volume =====

#[test]
fn test_playback_rate_is_clamped() {
    let mut h = Harness::new();
    let id = h.load(book(600.0));

    h.controller.set_playback_rate(5.0).unwrap();
    assert_eq!(h.controller.playback_rate(), 3.0);
    assert_eq!(h.catalog.last_saved(id).unwrap().playback_rate, 3.0);

    h.controller.set_playback_rate(0.1).unwrap();
    assert_eq!(h.controller.playback_rate(), 0.5);
}

#[test]
fn test_rate_applies_to_engine_while_playing() {
    let mut h = Harness::new();
    h.load(book(600.0));
    h.controller.play().unwrap();

    h.controller.set_playback_rate(1.75).unwrap();
    assert_eq!(h.engine.rate(), 1.75);
    assert_eq!(h.surface.last().unwrap().effective_rate, 1.75);
}

#[test]
fn test_rejected_rate_leaves_session_rate_unchanged() {
    let mut h = Harness::new();
    let id = h.load(book(3600.0));
    h.controller.set_playback_rate(1.5).unwrap();
    h.controller.play().unwrap();

    h.engine.reject_rate_changes(true);
    let err = h.controller.set_playback_rate(2.0).unwrap_err();

    assert!(matches!(err, AppError::PlaybackDeviceError { .. }));
    assert_eq!(h.controller.playback_rate(), 1.5);
    assert_eq!(h.controller.loaded_item().unwrap().playback_rate, 1.5);
    assert_eq!(h.catalog.last_saved(id).unwrap().playback_rate, 1.5);
}

#[test]
fn test_rate_without_item_is_allowed() {
    let mut h = Harness::new();
    h.controller.set_playback_rate(2.0).unwrap();
    assert_eq!(h.controller.playback_rate(), 2.0);
    assert_eq!(h.catalog.save_count(), 0);
}

#[test]
fn test_volume_boost_doubles_and_caps() {
    let mut h = Harness::with_settings(SessionSettings {
        initial_volume: Volume::new(0.5, false),
        ..Default::default()
    });
    h.load(book(600.0));
    assert_eq!(h.controller.volume().effective(), 0.5);

    let enabled = h.controller.toggle_volume_boost().unwrap();
    assert!(enabled);
    assert_eq!(h.controller.volume().effective(), 1.0);
    assert_eq!(h.engine.volume(), 1.0);

    h.controller.set_volume(0.8).unwrap();
    assert_eq!(h.controller.volume().effective(), 1.0);

    h.controller.toggle_volume_boost().unwrap();
    assert_eq!(h.engine.volume(), 0.8);
}

// ===== Periodic poll =====

#[test]
fn test_autosave_on_interval_boundaries() {
    let mut h = Harness::new();
    let id = h.load(book(3600.0));
    h.controller.play().unwrap();
    let baseline = h.catalog.save_count();

    h.play_until(29.5);
    assert_eq!(h.catalog.save_count(), baseline);

    h.play_until(30.2);
    assert_eq!(h.catalog.save_count(), baseline + 1);
    assert_eq!(h.catalog.last_saved(id).unwrap().position, 30.2);

    // Same whole second, no second write
    h.play_until(30.7);
    assert_eq!(h.catalog.save_count(), baseline + 1);

    h.play_until(60.1);
    assert_eq!(h.catalog.save_count(), baseline + 2);
}

#[test]
fn test_poll_is_idle_when_paused() {
    let mut h = Harness::new();
    h.load(book(3600.0));
    h.engine.advance_to(900.0);

    h.controller.poll_tick();
    assert_eq!(h.controller.current_time(), 0.0);
}

#[test]
fn test_finish_by_proximity_during_playback() {
    let mut h = Harness::new();
    let id = h.load(book(3600.0));
    h.controller.play().unwrap();

    h.play_until(3500.0);
    assert!(!h.controller.loaded_item().unwrap().is_finished);

    h.play_until(3575.2);
    assert!(h.controller.loaded_item().unwrap().is_finished);
    assert!(h.catalog.last_saved(id).unwrap().is_finished);
    // Proximity does not stop playback
    assert!(h.controller.is_playing());
}

// ===== Sleep timer =====

#[test]
fn test_sleep_timer_pauses_on_expiry() {
    let mut h = Harness::new();
    h.load(book(3600.0));
    h.controller.play().unwrap();
    h.controller.start_sleep_timer(3);

    assert_eq!(h.controller.sleep_tick(), SleepTick::Running(2));
    assert_eq!(h.controller.sleep_tick(), SleepTick::Running(1));
    assert!(h.controller.is_playing());
    assert_eq!(h.controller.sleep_tick(), SleepTick::Expired);

    assert!(!h.controller.is_playing());
    assert_eq!(h.controller.sleep_timer_remaining(), 0);
    assert_eq!(h.controller.sleep_tick(), SleepTick::Inactive);
}

#[test]
fn test_sleep_timer_restart_and_cancel() {
    let mut h = Harness::new();
    h.load(book(3600.0));
    h.controller.start_sleep_timer(10);
    h.controller.sleep_tick();
    h.controller.start_sleep_timer(60);
    assert_eq!(h.controller.sleep_timer_remaining(), 60);

    h.controller.cancel_sleep_timer();
    h.controller.cancel_sleep_timer();
    assert!(!h.controller.sleep_timer_active());
}

#[test]
fn test_sleep_at_chapter_end() {
    let mut h = Harness::new();
    h.load(two_chapter_book());
    h.controller.seek(1700.5).unwrap();

    h.controller.sleep_at_chapter_end().unwrap();
    assert_eq!(h.controller.sleep_timer_remaining(), 100);
}

#[test]
fn test_sleep_at_chapter_end_needs_a_chapter() {
    let mut h = Harness::new();
    h.load(book(600.0));
    assert!(h.controller.sleep_at_chapter_end().is_err());
    assert!(!h.controller.sleep_timer_active());
}

// ===== Engine notifications =====

#[test]
fn test_natural_finish_then_replay_from_start() {
    let mut h = Harness::new();
    let id = h.load(book(600.0));
    h.controller.play().unwrap();
    h.engine.advance_to(599.0);

    h.controller
        .handle_engine_event(EngineEvent::Finished { success: true })
        .unwrap();

    assert_eq!(h.controller.phase(), PlaybackPhase::Finished);
    assert_eq!(h.controller.current_time(), 600.0);
    let saved = h.catalog.last_saved(id).unwrap();
    assert!(saved.is_finished);
    assert_eq!(saved.position, 600.0);

    h.controller.play().unwrap();
    assert!(h.controller.is_playing());
    assert_eq!(h.controller.current_time(), 0.0);
    assert!(!h.controller.loaded_item().unwrap().is_finished);
    let saved = h.catalog.last_saved(id).unwrap();
    assert!(!saved.is_finished);
    assert_eq!(saved.position, 0.0);
}

#[test]
fn test_seek_leaves_finished_phase() {
    let mut h = Harness::new();
    h.load(book(600.0));
    h.controller.play().unwrap();
    h.controller
        .handle_engine_event(EngineEvent::Finished { success: true })
        .unwrap();

    h.controller.seek(100.0).unwrap();
    assert_eq!(h.controller.phase(), PlaybackPhase::Paused);
}

#[test]
fn test_stale_finish_is_ignored() {
    let mut h = Harness::new();
    h.load(book(600.0));

    h.controller
        .handle_engine_event(EngineEvent::Finished { success: true })
        .unwrap();
    assert_eq!(h.controller.phase(), PlaybackPhase::Paused);
    assert!(!h.controller.loaded_item().unwrap().is_finished);
}

#[test]
fn test_decode_error_stops_without_touching_progress() {
    let mut h = Harness::new();
    h.load(book(3600.0));
    h.controller.play().unwrap();
    h.engine.advance_to(321.0);
    let saves = h.catalog.save_count();

    let err = h
        .controller
        .handle_engine_event(EngineEvent::DecodeError("bad frame".to_string()))
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Decode);
    assert!(!h.controller.is_playing());
    assert!(!h.engine.is_playing());
    assert!(!h.controller.loaded_item().unwrap().is_finished);
    assert_eq!(h.catalog.save_count(), saves);
}

// ===== Persistence =====

#[test]
fn test_persistence_failure_is_not_fatal() {
    let mut h = Harness::new();
    let id = h.load(book(3600.0));
    h.catalog.set_failing(true);

    h.controller.seek(50.0).unwrap();
    h.controller.play().unwrap();
    assert_eq!(h.controller.current_time(), 50.0);
    assert!(h.controller.is_playing());

    h.catalog.set_failing(false);
    h.controller.pause().unwrap();
    assert_eq!(h.catalog.last_saved(id).unwrap().position, 50.0);
}

#[test]
fn test_latest_write_reflects_latest_position() {
    let mut h = Harness::new();
    let id = h.load(book(3600.0));
    h.controller.play().unwrap();
    h.play_until(30.0);
    h.controller.seek(500.0).unwrap();
    h.engine.advance_to(510.0);
    h.controller.pause().unwrap();

    assert_eq!(h.catalog.last_saved(id).unwrap().position, 510.0);
}

// ===== Now playing, remote commands, interruptions =====

#[test]
fn test_now_playing_reflects_transport() {
    let mut h = Harness::new();
    h.load(
        two_chapter_book()
            .with_artwork("/books/cover.jpg")
            .with_author("R. Bachman"),
    );

    let info = h.surface.last().unwrap();
    assert_eq!(info.title, "The Long Walk");
    assert_eq!(info.duration, 3600.0);
    assert_eq!(info.effective_rate, 0.0);
    assert_eq!(info.chapter_title.as_deref(), Some("Ch1"));
    assert!(info.artwork_path.is_some());

    h.controller.set_playback_rate(1.25).unwrap();
    h.controller.play().unwrap();
    assert_eq!(h.surface.last().unwrap().effective_rate, 1.25);

    h.controller.shutdown();
    assert!(h.surface.was_cleared());
    assert!(!h.engine.is_playing());
}

#[test]
fn test_remote_commands_use_transport_paths() {
    let mut h = Harness::new();
    h.load(book(3600.0));

    h.controller
        .handle_remote_command(RemoteCommand::Seek(200.0))
        .unwrap();
    h.controller
        .handle_remote_command(RemoteCommand::SkipForward)
        .unwrap();
    assert_eq!(h.controller.current_time(), 230.0);

    h.controller.execute(RemoteCommand::Play.into()).unwrap();
    assert!(h.controller.is_playing());
    h.controller
        .handle_remote_command(RemoteCommand::TogglePlayPause)
        .unwrap();
    assert!(!h.controller.is_playing());
}

#[test]
fn test_interruption_round_trip() {
    let mut h = Harness::new();
    h.load(book(3600.0));
    h.controller.play().unwrap();
    h.play_until(120.0);

    h.controller.handle_interruption(Interruption::Began).unwrap();
    assert!(!h.controller.is_playing());
    let paused_at = h.controller.current_time();

    h.controller
        .handle_interruption(Interruption::Ended {
            should_resume: true,
        })
        .unwrap();
    assert!(h.controller.is_playing());
    assert_eq!(h.controller.current_time(), paused_at);
}

#[test]
fn test_interruption_without_resume_stays_paused() {
    let mut h = Harness::new();
    h.load(book(3600.0));
    h.controller.play().unwrap();

    h.controller.handle_interruption(Interruption::Began).unwrap();
    h.controller
        .handle_interruption(Interruption::Ended {
            should_resume: false,
        })
        .unwrap();
    assert!(!h.controller.is_playing());
}

#[test]
fn test_snapshot_mirrors_controller() {
    let mut h = Harness::new();
    let id = h.load(two_chapter_book());
    h.controller.seek(1900.0).unwrap();
    h.controller.start_sleep_timer(90);

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.item_id, Some(id));
    assert_eq!(snapshot.current_time, 1900.0);
    assert_eq!(snapshot.chapter_count, 2);
    assert_eq!(snapshot.current_chapter.as_ref().unwrap().title, "Ch2");
    assert_eq!(snapshot.sleep_timer_remaining, 90);
    assert!(!snapshot.is_playing());
}

proptest! {
    #[test]
    fn prop_seek_clamps_to_duration(target in -10_000.0f64..10_000.0) {
        let mut h = Harness::new();
        h.load(book(3600.0));

        h.controller.seek(target).unwrap();
        prop_assert_eq!(h.controller.current_time(), target.clamp(0.0, 3600.0));
    }

    #[test]
    fn prop_current_chapter_contains_position(target in 0.0f64..3600.0) {
        let mut h = Harness::new();
        h.load(two_chapter_book());

        h.controller.seek(target).unwrap();
        let chapter = h.controller.current_chapter().unwrap();
        prop_assert!(chapter.contains(h.controller.current_time()));
    }

    #[test]
    fn prop_rate_always_in_range(rate in -10.0f32..10.0) {
        let mut h = Harness::new();
        h.load(book(600.0));

        h.controller.set_playback_rate(rate).unwrap();
        let applied = h.controller.playback_rate();
        prop_assert!((0.5..=3.0).contains(&applied));
    }
}
