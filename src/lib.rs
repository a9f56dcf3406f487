//! voicestars — voice-driven progression logic, renderer-agnostic.
//!
//! A player's sustained voice (microphone amplitude) lifts an avatar through
//! three height thresholds; each one reached earns a star. Silence lets the
//! avatar fall. Positions are normalized bottom-up fractions of the playfield
//! height, so nothing in here knows about pixels or screens.
//!
//! # Example
//! ```
//! use voicestars::{engine, DifficultyProfile, GameState};
//! let state = GameState::initial(DifficultyProfile::easy());
//! let state = engine::apply_amplitude(&state, 6.0, 0.1);
//! assert_eq!(state.current_level_index, 1);
//! assert_eq!(state.collected_stars, [true, false, false]);
//! ```

pub mod audio;
pub mod config;
pub mod difficulty;
pub mod engine;
pub mod hud;
pub mod session;
pub mod settings;

// Main exports
pub use audio::{AmplitudeSample, AmplitudeSource, AudioError, SampleSink};
pub use config::Config;
pub use difficulty::{DifficultyError, DifficultyProfile, DifficultyRegistry};
pub use engine::StaleLevelEvent;
pub use session::{GameEvent, SessionController, StateSubscription};
pub use settings::{MemorySettingsStore, SettingsError, SettingsStore, TomlSettingsStore};

/// Number of levels (and stars) in a game.
pub const LEVEL_COUNT: usize = 3;

/// Top of the playfield in normalized units.
pub const MAX_POSITION: f32 = 1.0;

/// Live state of one game session.
#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    /// Avatar height, normalized to `[0, MAX_POSITION]`, bottom-up.
    pub position_y: f32,
    /// Next uncompleted level; `LEVEL_COUNT` once everything is cleared.
    pub current_level_index: usize,
    pub is_speaking: bool,
    pub is_detecting: bool,
    pub collected_stars: [bool; LEVEL_COUNT],
    /// One-shot trigger for the star animation, cleared once consumed.
    pub should_play_star_animation: bool,
    pub should_show_fireworks: bool,
    pub difficulty: DifficultyProfile,
}

impl GameState {
    /// Fresh state at the bottom of the playfield with no stars.
    pub fn initial(difficulty: DifficultyProfile) -> Self {
        Self {
            position_y: 0.0,
            current_level_index: 0,
            is_speaking: false,
            is_detecting: false,
            collected_stars: [false; LEVEL_COUNT],
            should_play_star_animation: false,
            should_show_fireworks: false,
            difficulty,
        }
    }

    #[inline]
    pub fn level_count(&self) -> usize { LEVEL_COUNT }

    /// `true` once every level has been cleared.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current_level_index >= LEVEL_COUNT
    }

    /// Threshold the avatar must reach next, if any level is left.
    pub fn next_level_height(&self) -> Option<f32> {
        self.difficulty.level_height(self.current_level_index)
    }

    pub fn stars_collected(&self) -> usize {
        self.collected_stars.iter().filter(|&&s| s).count()
    }

    /// Every level below the current index has its star.
    pub fn stars_consistent(&self) -> bool {
        self.collected_stars
            .iter()
            .take(self.current_level_index)
            .all(|&s| s)
    }
}

impl Default for GameState {
    fn default() -> Self { Self::initial(DifficultyProfile::easy()) }
}
