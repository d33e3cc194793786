//! Keyboard sampling for local player movement

use crate::game::MoveInput;
use macroquad::prelude::*;

/// Collects movement keys each frame and detects edge-triggered controls
pub struct InputManager {
    current_input: MoveInput,

    // Previous frame key state for edge detection
    prev_key_h: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            current_input: MoveInput::default(),
            prev_key_h: false,
        }
    }

    /// Samples the keyboard. Returns the movement intent and whether the HUD toggle was pressed.
    pub fn update(&mut self) -> (MoveInput, bool) {
        // Support both WASD and arrow keys
        let input = MoveInput {
            forward: is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            backward: is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
            left: is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            right: is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
        };

        let key_h = is_key_down(KeyCode::H);
        let hud_toggle = key_h && !self.prev_key_h;
        self.prev_key_h = key_h;

        self.current_input = input;
        (input, hud_toggle)
    }

    pub fn get_current_input(&self) -> &MoveInput {
        &self.current_input
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
