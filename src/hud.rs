//! Presentation helpers: the only place normalized positions meet pixels.

use crate::{GameState, LEVEL_COUNT, MAX_POSITION};

/// Relative width of one level column.
pub const LEVEL_WIDTH: f32 = 0.25;

/// Screen size the game is drawn into, in points. Y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Top-down screen y of a bottom-up normalized position.
    pub fn avatar_y(&self, position: f32) -> f32 {
        self.height * (1.0 - position.clamp(0.0, MAX_POSITION))
    }

    /// Screen y of a level's threshold line.
    pub fn level_line_y(&self, state: &GameState, level: usize) -> Option<f32> {
        state.difficulty.level_height(level).map(|h| self.avatar_y(h))
    }

    /// Horizontal centre of the column for `level`; the avatar moves one
    /// column right per completed level.
    pub fn level_x(&self, level: usize) -> f32 {
        self.width * LEVEL_WIDTH * (level.min(LEVEL_COUNT) as f32 + 0.5)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(390.0, 844.0)
    }
}

/// One-line text rendering of a state, e.g.
/// `[**.] level 3/3 |#######.............| 0.35 speaking`.
pub fn status_line(state: &GameState) -> String {
    const BAR: usize = 20;

    let stars: String = state
        .collected_stars
        .iter()
        .map(|&s| if s { '*' } else { '.' })
        .collect();
    let filled = (state.position_y.clamp(0.0, MAX_POSITION) * BAR as f32).round() as usize;
    let bar = format!("{}{}", "#".repeat(filled), ".".repeat(BAR - filled));
    let level = if state.is_complete() {
        "done".to_string()
    } else {
        format!("level {}/{LEVEL_COUNT}", state.current_level_index + 1)
    };
    let voice = if state.is_speaking { "speaking" } else { "quiet" };

    format!("[{stars}] {level} |{bar}| {:.2} {voice}", state.position_y)
}
