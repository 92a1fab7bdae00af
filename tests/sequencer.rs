//! Behaviour of the sequencer core driven through its public API, with
//! recording instruments standing in for the audio engine.

mod common;

use common::{Rec, recording, take, take_pads};
use ondas::audio_api::AudioCommand;
use ondas::pipeline::generator::Vibe;
use ondas::pipeline::persistence;
use ondas::pipeline::project::{DubMode, InstrumentSource, ParamLocks, ParamName, TrigKind};
use ondas::pipeline::scenes::{SceneBank, SceneSnapshot};
use ondas::sequencer::Sequencer;
use ondas::shared::{HISTORY_LIMIT, MAX_STEPS, NUM_TRACKS, SequencerEvent};

// ─── Helpers ───────────────────────────────────────────────────────────────

fn recorded() -> (Sequencer, common::Log) {
    let (instruments, log) = recording();
    (Sequencer::new(instruments).with_seed(7), log)
}

fn active_steps(seq: &Sequencer, track: usize) -> Vec<usize> {
    (0..seq.pattern_length())
        .filter(|&s| seq.step(track, s).is_some_and(|st| st.active))
        .collect()
}

// ─── Transport & tick ──────────────────────────────────────────────────────

#[test]
fn a_full_pass_wraps_and_counts_every_track() {
    let (mut seq, _log) = recorded();
    seq.set_mute(2, true);
    seq.set_solo(3, true);
    seq.play();

    for _ in 0..16 {
        seq.tick();
    }
    assert_eq!(seq.current_step(), 0);
    assert_eq!(seq.loop_count(), 1);
    for t in 0..NUM_TRACKS {
        assert_eq!(seq.track_play_count(t), 1, "track {t}");
    }
}

#[test]
fn wrap_follows_the_slot_length() {
    let (mut seq, _log) = recorded();
    seq.set_pattern_length(5);
    seq.play();
    let played: Vec<usize> = (0..7).map(|_| seq.tick()).collect();
    assert_eq!(played, vec![0, 1, 2, 3, 4, 0, 1]);
    assert_eq!(seq.loop_count(), 1);
}

#[test]
fn solo_wins_over_unmuted_tracks_and_mute_always_skips() {
    let (mut seq, log) = recorded();
    for t in 0..3 {
        seq.set_step(t, 0, true);
    }
    seq.set_solo(0, true); // A
    seq.set_mute(2, true); // C; B (1) is plain
    seq.play();
    seq.tick();
    assert_eq!(take_pads(&log), vec![0]);
}

#[test]
fn nth_condition_fires_on_multiples_of_n() {
    let (mut seq, log) = recorded();
    seq.set_pattern_length(1);
    seq.set_step(0, 0, true);
    seq.set_trig_condition(0, 0, TrigKind::Nth, 3, None);
    seq.play();

    let mut fired = Vec::new();
    for pass in 0..10 {
        seq.tick();
        if !take_pads(&log).is_empty() {
            fired.push(pass);
        }
    }
    assert_eq!(fired, vec![0, 3, 6, 9]);
}

#[test]
fn muted_tracks_keep_counting_for_nth() {
    let (mut seq, log) = recorded();
    seq.set_pattern_length(1);
    seq.set_step(0, 0, true);
    seq.set_trig_condition(0, 0, TrigKind::Nth, 2, None);
    seq.set_mute(0, true);
    seq.play();
    seq.tick(); // pass 0 swallowed by the mute
    seq.set_mute(0, false);
    seq.tick(); // pass 1: not a multiple of 2
    assert!(take_pads(&log).is_empty());
    seq.tick(); // pass 2
    assert_eq!(take_pads(&log), vec![0]);
}

#[test]
fn neighbour_condition_reads_only_the_neighbours_active_flag() {
    let (mut seq, log) = recorded();
    seq.set_step(1, 0, true);
    seq.set_trig_condition(1, 0, TrigKind::Neighbor, 0, Some(0));
    seq.play();
    seq.tick();
    assert!(take_pads(&log).is_empty());

    // the neighbour never fires itself, but being active is enough
    seq.set_step(0, 0, true);
    seq.set_trig_condition(0, 0, TrigKind::Probability, 0, None);
    seq.stop();
    seq.play();
    seq.tick();
    assert_eq!(take_pads(&log), vec![1]);
}

#[test]
fn neighbour_without_a_track_always_fires() {
    let (mut seq, log) = recorded();
    seq.set_step(4, 0, true);
    seq.set_trig_condition(4, 0, TrigKind::Neighbor, 0, None);
    seq.play();
    seq.tick();
    assert_eq!(take_pads(&log), vec![4]);
}

#[test]
fn fill_and_not_fill_follow_the_flag() {
    let (mut seq, log) = recorded();
    seq.set_step(0, 0, true);
    seq.set_trig_condition(0, 0, TrigKind::Fill, 0, None);
    seq.set_step(1, 0, true);
    seq.set_trig_condition(1, 0, TrigKind::NotFill, 0, None);
    seq.play();

    seq.tick();
    assert_eq!(take_pads(&log), vec![1]);

    seq.set_fill_mode(true);
    seq.stop();
    seq.play();
    seq.tick();
    assert_eq!(take_pads(&log), vec![0]);
}

#[test]
fn probability_extremes() {
    let (mut seq, log) = recorded();
    seq.set_pattern_length(1);
    seq.set_step(0, 0, true);
    seq.set_step_probability(0, 0, 0);
    seq.set_step(1, 0, true);
    seq.set_trig_condition(1, 0, TrigKind::Probability, 100, None);
    // the condition value wins over the step's own probability
    seq.set_step_probability(1, 0, 0);
    seq.play();
    for _ in 0..50 {
        seq.tick();
    }
    let pads = take_pads(&log);
    assert_eq!(pads.len(), 50);
    assert!(pads.iter().all(|&p| p == 1));
}

#[test]
fn effect_locks_land_before_the_hit() {
    let (mut seq, log) = recorded();
    seq.set_step(0, 0, true);
    seq.set_param_lock(0, 0, ParamName::Filter, Some(50));
    seq.set_param_lock(0, 0, ParamName::Reverb, Some(30));
    seq.play();
    seq.tick();

    let recs = take(&log);
    assert!(matches!(recs[0], Rec::Filter(hz) if (hz - 4000.0).abs() < 1e-3));
    assert!(matches!(recs[1], Rec::Reverb(p) if (p - 30.0).abs() < 1e-3));
    assert!(matches!(recs[2], Rec::Hit(InstrumentSource::Sampler, AudioCommand::Sample(_))));
    assert_eq!(recs.len(), 3);
}

#[test]
fn sources_get_their_own_command_shape() {
    let (mut seq, log) = recorded();
    seq.set_track_source(4, InstrumentSource::Synth);
    seq.set_track_source(6, InstrumentSource::Radio);
    seq.set_step(4, 0, true);
    seq.set_param_lock(4, 0, ParamName::Pitch, Some(12));
    seq.set_step(6, 0, true);
    seq.play();
    seq.tick();

    let recs = take(&log);
    assert_eq!(recs.len(), 2);
    match &recs[0] {
        Rec::Hit(InstrumentSource::Synth, AudioCommand::Note(n)) => {
            assert!((n.frequency - 440.0).abs() < 1e-2);
        }
        other => panic!("expected synth note, got {other:?}"),
    }
    assert!(matches!(
        &recs[1],
        Rec::Hit(InstrumentSource::Radio, AudioCommand::Pulse { .. })
    ));
}

#[test]
fn observers_see_steps_stops_and_pattern_changes() {
    let (mut seq, _log) = recorded();
    let events = seq.subscribe();
    seq.set_step(0, 0, true);
    seq.play();
    seq.tick();
    seq.tick();
    seq.stop();
    seq.select_pattern(3);

    let got: Vec<SequencerEvent> = events.try_iter().collect();
    assert_eq!(
        got,
        vec![
            SequencerEvent::PadTriggered(0),
            SequencerEvent::Step(0),
            SequencerEvent::Step(1),
            SequencerEvent::Stopped,
            SequencerEvent::PatternChanged,
        ]
    );
    assert_eq!(seq.current_step(), 0);
}

#[test]
fn dropped_observers_are_forgotten() {
    let (mut seq, _log) = recorded();
    drop(seq.subscribe());
    let live = seq.subscribe();
    seq.play();
    seq.tick();
    assert_eq!(live.try_recv(), Ok(SequencerEvent::Step(0)));
}

// ─── Pattern store ─────────────────────────────────────────────────────────

#[test]
fn slots_are_independent() {
    let (mut seq, _log) = recorded();
    seq.toggle_step(0, 3);
    assert!(seq.pattern_has_data(0));

    seq.play();
    seq.tick();
    seq.select_pattern(1);
    assert_eq!(seq.current_step(), 0);
    assert!(!seq.pattern_has_data(1));
    assert!(active_steps(&seq, 0).is_empty());

    seq.select_pattern(0);
    assert_eq!(active_steps(&seq, 0), vec![3]);

    seq.select_pattern(8);
    assert_eq!(seq.current_pattern_slot(), 0);
}

#[test]
fn out_of_range_edits_are_ignored() {
    let (mut seq, _log) = recorded();
    seq.set_step(NUM_TRACKS, 0, true);
    seq.set_step(0, 16, true); // past the 16-step window
    assert!(!seq.toggle_step(9, 9));
    assert!(!seq.pattern_has_data(0));
    assert!(seq.step(0, 16).is_none());
}

#[test]
fn length_is_clamped() {
    let (mut seq, _log) = recorded();
    seq.set_pattern_length(0);
    assert_eq!(seq.pattern_length(), 1);
    seq.set_pattern_length(500);
    assert_eq!(seq.pattern_length(), MAX_STEPS);
}

#[test]
fn clear_all_resets_counters() {
    let (mut seq, _log) = recorded();
    seq.set_pattern_length(2);
    seq.set_step(0, 1, true);
    seq.play();
    for _ in 0..4 {
        seq.tick();
    }
    assert_eq!(seq.loop_count(), 2);
    seq.clear_all_tracks();
    assert_eq!(seq.loop_count(), 0);
    assert_eq!(seq.track_play_count(0), 0);
    assert!(!seq.pattern_has_data(0));
}

#[test]
fn tempo_is_clamped() {
    let (mut seq, _log) = recorded();
    seq.set_tempo(1000.0);
    assert_eq!(seq.tempo(), 300.0);
    seq.set_tempo(-5.0);
    assert_eq!(seq.tempo(), 30.0);
}

#[test]
fn param_locks_are_clamped_and_clearable() {
    let (mut seq, _log) = recorded();
    seq.set_param_lock(0, 0, ParamName::Pitch, Some(99));
    assert_eq!(seq.param_lock(0, 0, ParamName::Pitch), Some(24));
    seq.set_param_lock(0, 0, ParamName::Pan, Some(-300));
    assert_eq!(seq.param_lock(0, 0, ParamName::Pan), Some(-100));
    assert!(seq.has_param_locks(0, 0));
    seq.clear_param_lock(0, 0, ParamName::Pitch);
    assert_eq!(seq.param_lock(0, 0, ParamName::Pitch), None);
    seq.clear_all_param_locks(0, 0);
    assert!(!seq.has_param_locks(0, 0));
}

// ─── Generators ────────────────────────────────────────────────────────────

#[test]
fn four_on_the_floor() {
    let (mut seq, _log) = recorded();
    seq.apply_euclidean(0, 4, 16, 0);
    assert_eq!(active_steps(&seq, 0), vec![0, 4, 8, 12]);
    for s in [0, 4, 8, 12] {
        let step = seq.step(0, s).unwrap();
        assert_eq!(step.probability, 100);
        assert_eq!(step.velocity, 100);
    }
}

#[test]
fn euclid_leaves_locks_and_blanks_the_tail() {
    let (mut seq, _log) = recorded();
    seq.set_pattern_length(32);
    seq.set_step(0, 20, true);
    seq.set_param_lock(0, 4, ParamName::Slice, Some(3));
    seq.apply_euclidean(0, 4, 16, 0);
    assert_eq!(active_steps(&seq, 0), vec![0, 4, 8, 12]);
    assert_eq!(seq.param_lock(0, 4, ParamName::Slice), Some(3));
}

#[test]
fn calm_silences_the_snare() {
    let (mut seq, _log) = recorded();
    for s in 0..16 {
        seq.set_step(1, s, true);
    }
    seq.generate_vibe_pattern(Vibe::Calm, 100.0, 0.0);
    let track = seq.track(1).unwrap();
    assert!(track.steps.iter().all(|s| !s.active));
}

#[test]
fn vibe_density_zero_empties_everything() {
    let (mut seq, _log) = recorded();
    seq.generate_vibe_pattern(Vibe::Chaos, 0.0, 0.0);
    assert!(!seq.pattern_has_data(0));
}

#[test]
fn high_complexity_scatters_probabilities() {
    let (mut seq, _log) = recorded();
    seq.generate_vibe_pattern(Vibe::Urban, 100.0, 100.0);
    let mut seen = 0;
    for t in 0..NUM_TRACKS {
        for s in 0..16 {
            let step = seq.step(t, s).unwrap();
            if step.active {
                seen += 1;
                assert!((50..100).contains(&step.probability));
            }
        }
    }
    assert!(seen > 0);
}

#[test]
fn surprise_stays_in_range() {
    let (mut seq, _log) = recorded();
    let s = seq.generate_surprise();
    assert!((80.0..160.0).contains(&s.tempo));
    assert_eq!(seq.tempo(), s.tempo);
    assert!((30.0..90.0).contains(&s.density));
}

// ─── History ───────────────────────────────────────────────────────────────

#[test]
fn undo_then_redo_a_toggle() {
    let (mut seq, _log) = recorded();
    seq.save_history();
    seq.toggle_step(0, 0);
    assert!(seq.undo());
    assert!(!seq.step(0, 0).unwrap().active);
    assert!(seq.redo());
    assert!(seq.step(0, 0).unwrap().active);
    assert!(!seq.redo());
}

#[test]
fn undo_restores_sources_and_length() {
    let (mut seq, _log) = recorded();
    seq.save_history();
    seq.set_track_source(2, InstrumentSource::Mic);
    seq.set_pattern_length(7);
    seq.undo();
    assert_eq!(seq.track_source(2), InstrumentSource::Sampler);
    assert_eq!(seq.pattern_length(), 16);
}

#[test]
fn empty_history_fails_cleanly() {
    let (mut seq, _log) = recorded();
    assert!(!seq.can_undo());
    assert!(!seq.undo());
    assert!(!seq.redo());
}

#[test]
fn history_is_capped() {
    let (mut seq, _log) = recorded();
    for i in 0..HISTORY_LIMIT + 10 {
        seq.save_history();
        seq.toggle_step(0, i % 16);
    }
    let mut undone = 0;
    while seq.undo() {
        undone += 1;
    }
    assert_eq!(undone, HISTORY_LIMIT);
}

#[test]
fn fresh_checkpoint_clears_redo() {
    let (mut seq, _log) = recorded();
    seq.save_history();
    seq.toggle_step(0, 0);
    seq.undo();
    assert!(seq.can_redo());
    seq.save_history();
    assert!(!seq.can_redo());
}

// ─── Clipboard ─────────────────────────────────────────────────────────────

#[test]
fn paste_needs_a_copy_first() {
    let (mut seq, _log) = recorded();
    assert!(!seq.paste_track(1));
    assert!(!seq.has_clipboard());
}

#[test]
fn paste_copies_steps_and_source_by_value() {
    let (mut seq, _log) = recorded();
    seq.apply_euclidean(0, 3, 8, 0);
    seq.set_track_source(0, InstrumentSource::Synth);
    assert!(seq.copy_track(0));

    seq.clear_track(0);
    assert!(seq.paste_track(5));
    assert_eq!(active_steps(&seq, 5), vec![0, 3, 6]);
    assert_eq!(seq.track_source(5), InstrumentSource::Synth);
    assert!(active_steps(&seq, 0).is_empty());

    seq.toggle_step(5, 1);
    assert!(seq.paste_track(6));
    assert_eq!(active_steps(&seq, 6), vec![0, 3, 6]);
}

// ─── Dub recording ─────────────────────────────────────────────────────────

#[test]
fn dub_keeps_existing_steps_overdub_replaces_them() {
    let (mut seq, _log) = recorded();
    seq.set_step(2, 0, true);
    seq.set_param_lock(2, 0, ParamName::Pitch, Some(5));
    seq.play();

    let incoming = ParamLocks {
        pitch: Some(-3),
        ..Default::default()
    };
    seq.set_dub_mode(DubMode::Dub);
    assert!(!seq.record_dub_trigger(2, &incoming, 40));
    assert_eq!(seq.param_lock(2, 0, ParamName::Pitch), Some(5));
    assert_eq!(seq.step(2, 0).unwrap().velocity, 100);

    seq.set_dub_mode(DubMode::Overdub);
    assert!(seq.record_dub_trigger(2, &incoming, 40));
    assert_eq!(seq.param_lock(2, 0, ParamName::Pitch), Some(-3));
    assert_eq!(seq.step(2, 0).unwrap().velocity, 40);
}

#[test]
fn dub_fills_empty_steps() {
    let (mut seq, _log) = recorded();
    seq.play();
    seq.set_dub_mode(DubMode::Dub);
    assert!(seq.record_dub_trigger(3, &ParamLocks::default(), 70));
    assert!(seq.step(3, 0).unwrap().active);
}

#[test]
fn no_recording_while_off_or_stopped() {
    let (mut seq, _log) = recorded();
    seq.set_dub_mode(DubMode::Overdub);
    assert!(!seq.record_dub_trigger(0, &ParamLocks::default(), 100));
    seq.play();
    seq.set_dub_mode(DubMode::Off);
    assert!(!seq.record_dub_trigger(0, &ParamLocks::default(), 100));
    assert!(!seq.pattern_has_data(0));
}

#[test]
fn presses_queued_while_stopped_are_dropped_on_play() {
    let (mut seq, _log) = recorded();
    let input = seq.dub_input();
    seq.set_dub_mode(DubMode::Overdub);
    assert!(!seq.record_dub_trigger(4, &ParamLocks::default(), 90));
    assert!(input.record(4, 90, ParamLocks::default()));

    seq.play();
    seq.tick();
    assert!(!seq.step(4, 0).unwrap().active);
    assert!(!seq.pattern_has_data(0));
}

#[test]
fn queued_pad_presses_land_on_the_next_tick() {
    let (mut seq, _log) = recorded();
    let input = seq.dub_input();
    seq.set_dub_mode(DubMode::Overdub);
    seq.play();

    let pad = std::thread::spawn(move || input.record(5, 80, ParamLocks::default()));
    assert!(pad.join().unwrap());

    assert_eq!(seq.tick(), 0);
    let step = seq.step(5, 0).unwrap();
    assert!(step.active);
    assert_eq!(step.velocity, 80);
}

// ─── Scenes & persistence ──────────────────────────────────────────────────

#[test]
fn scene_round_trips_through_json_without_sharing() {
    let (mut seq, _log) = recorded();
    seq.apply_euclidean(0, 5, 16, 2);
    seq.set_track_source(3, InstrumentSource::Radio);
    seq.set_tempo(97.0);
    let scene = seq.capture_scene();

    let json = serde_json::to_string(&scene).unwrap();
    let back: SceneSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, scene);

    seq.clear_all_tracks();
    seq.set_tempo(140.0);
    seq.recall_scene(&back);
    assert_eq!(seq.capture_scene(), scene);

    // editing after recall must not reach back into the snapshot
    seq.toggle_step(0, 1);
    assert!(!back.tracks[0].steps[1].active);
}

#[test]
fn scene_bank_holds_four() {
    let (mut seq, _log) = recorded();
    let mut bank = SceneBank::default();
    seq.toggle_step(0, 0);
    assert!(bank.store(1, seq.capture_scene()));
    assert!(!bank.store(4, seq.capture_scene()));
    assert!(bank.has_scene(1));
    assert!(bank.recall(0).is_none());

    seq.clear_all_tracks();
    let scene = bank.recall(1).unwrap();
    seq.recall_scene(&scene);
    assert_eq!(active_steps(&seq, 0), vec![0]);
    assert_eq!(bank.current(), 1);
}

#[test]
fn project_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let (mut seq, _log) = recorded();
    seq.apply_euclidean(0, 4, 16, 0);
    seq.select_pattern(2);
    seq.apply_euclidean(1, 3, 8, 1);
    seq.set_trig_condition(1, 0, TrigKind::Nth, 2, None);
    seq.set_track_source(7, InstrumentSource::Mic);
    seq.set_mute(7, true);
    seq.set_swing(40.0);
    persistence::save_project(dir.path(), &seq.project_state()).unwrap();

    let state = persistence::load_project(dir.path()).unwrap().unwrap();
    let (instruments, _log) = recording();
    let restored = Sequencer::with_project(instruments, state);
    assert_eq!(restored.project_state(), seq.project_state());
    assert_eq!(restored.current_pattern_slot(), 2);
    assert!(restored.pattern_has_data(0));
    assert!(restored.is_muted(7));
}
