//! Progression rules: amplitude in, next `GameState` out.
//!
//! Every function here is pure. Positions are normalized bottom-up, clamped to
//! `[0, MAX_POSITION]`; pixel conversion belongs to the presentation layer
//! (see [`crate::hud`]).

use crate::{DifficultyProfile, GameState, LEVEL_COUNT, MAX_POSITION};

/// A completion request for a level that is not the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("stale level event: level {requested} requested while level {current} is current")]
pub struct StaleLevelEvent {
    pub requested: usize,
    pub current: usize,
}

/// Advance `state` by one amplitude sample covering `delta_seconds`.
///
/// At most one level completes per sample: only the current level's threshold
/// is checked, even when the movement jumps past several.
pub fn apply_amplitude(state: &GameState, amplitude: f32, delta_seconds: f32) -> GameState {
    let amplitude = sanitize(amplitude);
    let dt = sanitize(delta_seconds);
    let difficulty = &state.difficulty;

    let speaking = amplitude > difficulty.amplitude_threshold;
    let delta = if speaking {
        difficulty.rise_speed * dt
    } else {
        -difficulty.fall_speed * dt
    };

    let mut next = state.clone();
    next.position_y = clamp_position(state.position_y + delta);
    next.is_speaking = speaking;

    let level = next.current_level_index;
    if level < LEVEL_COUNT && !next.collected_stars[level] {
        if let Some(height) = difficulty.level_height(level) {
            if next.position_y >= height {
                log::debug!(
                    "height {:.3} reached level {level} threshold {height:.3}",
                    next.position_y
                );
                return complete_level(&next, level).unwrap_or(next);
            }
        }
    }
    next
}

/// Mark `level` as completed, awarding its star and advancing the level index.
///
/// Only the current level can be completed; anything else is reported as a
/// [`StaleLevelEvent`] and the caller keeps its state.
pub fn complete_level(state: &GameState, level: usize) -> Result<GameState, StaleLevelEvent> {
    if level != state.current_level_index || level >= LEVEL_COUNT {
        return Err(StaleLevelEvent {
            requested: level,
            current: state.current_level_index,
        });
    }

    let mut next = state.clone();
    next.collected_stars[level] = true;
    next.current_level_index = level + 1;
    next.should_play_star_animation = true;
    if level == LEVEL_COUNT - 1 {
        next.should_show_fireworks = true;
    }
    log::info!(
        "level {} completed on '{}' ({} of {LEVEL_COUNT} stars)",
        level + 1,
        next.difficulty.name,
        next.stars_collected()
    );
    Ok(next)
}

/// A fresh game using `difficulty`.
pub fn reset(difficulty: DifficultyProfile) -> GameState {
    GameState::initial(difficulty)
}

#[inline]
fn clamp_position(y: f32) -> f32 {
    y.clamp(0.0, MAX_POSITION)
}

/// Negative and NaN readings count as silence / no elapsed time.
#[inline]
fn sanitize(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.max(0.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    /// Easy preset slowed down so a level takes several samples.
    fn slow_easy() -> DifficultyProfile {
        DifficultyProfile {
            name: "slow".into(),
            rise_speed: 0.6,
            fall_speed: 0.2,
            ..DifficultyProfile::easy()
        }
    }

    #[test]
    fn sustained_voice_completes_first_level() {
        let mut state = GameState::initial(DifficultyProfile::easy());
        let mut guard = 0;
        while state.position_y < 0.25 {
            state = apply_amplitude(&state, 6.0, 0.1);
            guard += 1;
            assert!(guard < 100);
        }
        assert_eq!(state.current_level_index, 1);
        assert_eq!(state.collected_stars, [true, false, false]);
        assert!(state.is_speaking);
        assert!(state.should_play_star_animation);
        assert!(!state.should_show_fireworks);
    }

    #[test]
    fn slow_rise_crosses_each_threshold_in_turn() {
        let mut state = GameState::initial(slow_easy());
        let mut history = vec![0];
        for _ in 0..40 {
            state = apply_amplitude(&state, 9.0, 0.1);
            history.push(state.current_level_index);
            assert!(state.stars_consistent());
        }
        assert!(history.windows(2).all(|w| w[1] >= w[0] && w[1] - w[0] <= 1));
        assert_eq!(state.current_level_index, 3);
        assert!(state.should_show_fireworks);
        // 0.06 per step: past 0.25 at step 5, 0.5 at step 9, 0.75 at step 13.
        assert_eq!(history[4], 0);
        assert_eq!(history[5], 1);
        assert_eq!(history[8], 1);
        assert_eq!(history[9], 2);
        assert_eq!(history[12], 2);
        assert_eq!(history[13], 3);
    }

    #[test]
    fn final_level_shows_fireworks() {
        let mut state = GameState::initial(DifficultyProfile::easy());
        state.current_level_index = 2;
        state.collected_stars = [true, true, false];
        state.position_y = 0.7;

        let state = apply_amplitude(&state, 6.0, 0.1);
        assert_eq!(state.collected_stars, [true, true, true]);
        assert_eq!(state.current_level_index, 3);
        assert!(state.should_show_fireworks);
    }

    #[test]
    fn silence_falls_and_clamps_at_zero() {
        let mut state = GameState::initial(slow_easy());
        state.position_y = 0.1;
        let state1 = apply_amplitude(&state, 1.0, 0.1);
        assert!((state1.position_y - 0.08).abs() < EPS);
        assert!(!state1.is_speaking);

        let mut state = state1;
        for _ in 0..10 {
            state = apply_amplitude(&state, 0.0, 0.1);
        }
        assert_eq!(state.position_y, 0.0);
    }

    #[test]
    fn amplitude_equal_to_threshold_is_silence() {
        let state = GameState::initial(DifficultyProfile::easy());
        let next = apply_amplitude(&state, 5.0, 0.1);
        assert!(!next.is_speaking);
        assert_eq!(next.position_y, 0.0);
    }

    #[test]
    fn position_stays_in_bounds_for_wild_input() {
        let mut state = GameState::initial(DifficultyProfile::hard());
        for amp in [1e9, -5.0, f32::NAN, f32::INFINITY, 16.0, 0.0] {
            for dt in [0.1, 10.0, -1.0, f32::NAN] {
                state = apply_amplitude(&state, amp, dt);
                assert!(state.position_y >= 0.0 && state.position_y <= MAX_POSITION);
            }
        }
    }

    #[test]
    fn one_level_per_sample_even_when_overshooting() {
        let state = GameState::initial(DifficultyProfile::easy());
        // 100 * 1.0 would clear every threshold at once.
        let next = apply_amplitude(&state, 50.0, 1.0);
        assert_eq!(next.position_y, MAX_POSITION);
        assert_eq!(next.current_level_index, 1);
        assert_eq!(next.collected_stars, [true, false, false]);
    }

    #[test]
    fn cleared_game_keeps_moving_without_completions() {
        let mut state = GameState::initial(slow_easy());
        state.current_level_index = LEVEL_COUNT;
        state.collected_stars = [true; LEVEL_COUNT];
        state.position_y = 0.8;

        let up = apply_amplitude(&state, 9.0, 0.1);
        assert!((up.position_y - 0.86).abs() < EPS);
        assert_eq!(up.current_level_index, LEVEL_COUNT);

        let down = apply_amplitude(&up, 0.0, 0.1);
        assert!((down.position_y - 0.84).abs() < EPS);
        assert_eq!(down.current_level_index, LEVEL_COUNT);
    }

    #[test]
    fn complete_level_rejects_out_of_turn_requests() {
        let state = GameState::initial(DifficultyProfile::easy());
        assert_eq!(
            complete_level(&state, 2),
            Err(StaleLevelEvent { requested: 2, current: 0 })
        );

        let done = complete_level(&state, 0).unwrap();
        assert_eq!(
            complete_level(&done, 0),
            Err(StaleLevelEvent { requested: 0, current: 1 })
        );
    }

    #[test]
    fn complete_level_past_the_end_is_stale() {
        let mut state = GameState::initial(DifficultyProfile::easy());
        state.current_level_index = LEVEL_COUNT;
        state.collected_stars = [true; LEVEL_COUNT];
        assert!(complete_level(&state, LEVEL_COUNT).is_err());
    }

    #[test]
    fn reset_returns_initial_state() {
        let state = reset(DifficultyProfile::hard());
        assert_eq!(state, GameState::initial(DifficultyProfile::hard()));
        assert_eq!(state.difficulty.name, "hard");
    }
}
