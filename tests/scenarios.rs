use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use voicestars::audio::ScriptedSource;
use voicestars::engine::{apply_amplitude, complete_level};
use voicestars::{
    DifficultyProfile, DifficultyRegistry, GameState, MemorySettingsStore, SessionController,
    SettingsStore, LEVEL_COUNT, MAX_POSITION,
};

fn session(values: Vec<f32>) -> SessionController<ScriptedSource, MemorySettingsStore> {
    SessionController::new(
        ScriptedSource::new(values),
        MemorySettingsStore::default(),
        DifficultyRegistry::with_presets(),
    )
}

#[test]
fn scenario_a_first_star_on_easy() {
    let mut state = GameState::initial(DifficultyProfile::easy());
    while state.position_y < 0.25 {
        state = apply_amplitude(&state, 6.0, 0.1);
    }
    assert_eq!(state.current_level_index, 1);
    assert_eq!(state.collected_stars, [true, false, false]);
}

#[test]
fn scenario_b_last_level_brings_fireworks() {
    let mut state = GameState::initial(DifficultyProfile::easy());
    state = complete_level(&state, 0).unwrap();
    state = complete_level(&state, 1).unwrap();
    state.should_play_star_animation = false;
    state.position_y = 0.74;
    assert_eq!(state.current_level_index, 2);

    let state = apply_amplitude(&state, 6.0, 0.1);
    assert_eq!(state.collected_stars, [true, true, true]);
    assert_eq!(state.current_level_index, 3);
    assert!(state.should_show_fireworks);
    assert!(state.should_play_star_animation);
}

#[test]
fn scenario_c_silence_falls_by_fall_speed() {
    let profile = DifficultyProfile {
        name: "gentle".into(),
        fall_speed: 0.5,
        ..DifficultyProfile::easy()
    };
    let mut state = GameState::initial(profile);
    state.position_y = 0.2;

    let expected = [0.15, 0.10, 0.05, 0.0, 0.0, 0.0];
    for want in expected {
        state = apply_amplitude(&state, 1.0, 0.1);
        assert!((state.position_y - want).abs() < 1e-5, "{} vs {want}", state.position_y);
        assert!(!state.is_speaking);
    }

    // Preset speeds drop straight to the floor.
    let mut easy = GameState::initial(DifficultyProfile::easy());
    easy.position_y = 0.9;
    let easy = apply_amplitude(&easy, 0.0, 0.1);
    assert_eq!(easy.position_y, 0.0);
}

#[test]
fn scenario_d_out_of_turn_tap_is_ignored() {
    let mut c = session(Vec::new());
    let before = c.state().clone();
    c.on_star_manually_collected(2);
    assert_eq!(c.state(), &before);
}

#[test]
fn scenario_e_difficulty_change_resets_mid_session() {
    let mut c = session(vec![20.0, 20.0]);
    c.start().unwrap();
    c.pump();
    assert_eq!(c.state().current_level_index, 2);

    c.set_difficulty(DifficultyProfile::hard()).unwrap();
    let state = c.state();
    assert_eq!(state.position_y, 0.0);
    assert_eq!(state.current_level_index, 0);
    assert_eq!(state.collected_stars, [false; LEVEL_COUNT]);
    assert_eq!(state.difficulty, DifficultyProfile::hard());
    assert_eq!(c.settings().load().as_deref(), Some("hard"));
}

#[test]
fn stop_twice_matches_stop_once() {
    let mut c = session(vec![20.0]);
    c.start().unwrap();
    c.pump();
    c.stop();
    let once = c.state().clone();
    c.stop();
    assert_eq!(c.state(), &once);
    assert!(!c.state().is_detecting);
}

#[test]
fn random_play_keeps_invariants() {
    let mut rng = StdRng::seed_from_u64(2024);
    for profile in DifficultyProfile::presets() {
        let profile = DifficultyProfile {
            rise_speed: profile.rise_speed / 400.0,
            fall_speed: profile.fall_speed / 400.0,
            ..profile
        };
        let mut state = GameState::initial(profile);
        for _ in 0..2000 {
            let amplitude = rng.gen_range(-10.0f32..40.0);
            let dt = rng.gen_range(0.0f32..0.5);
            let next = apply_amplitude(&state, amplitude, dt);

            assert!(next.current_level_index >= state.current_level_index);
            assert!(next.current_level_index - state.current_level_index <= 1);
            assert!(next.stars_consistent());
            assert!(next.position_y >= 0.0 && next.position_y <= MAX_POSITION);
            state = next;
        }
    }
}

#[test]
fn full_session_with_scripted_voice() {
    let mut c = session(vec![20.0, 0.0, 20.0, 20.0, 0.0]);
    let updates = c.subscribe();
    c.start().unwrap();
    assert_eq!(c.wait_for_samples(Duration::from_millis(50)), 5);

    let seen: Vec<GameState> = updates.try_iter().collect();
    assert!(seen.iter().all(|s| s.stars_consistent()));
    assert!(seen
        .windows(2)
        .all(|w| w[1].current_level_index >= w[0].current_level_index));

    let last = c.state();
    assert_eq!(last.collected_stars, [true; LEVEL_COUNT]);
    assert!(last.should_show_fireworks);
    assert_eq!(last.position_y, 0.0);
}
