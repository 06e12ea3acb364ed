//! Input controller: maps keyboard and on-screen controls to movement intents.
//!
//! Every triggering input produces a direction immediately. There is no
//! debouncing, no suppression of repeated directions, and no legality check:
//! the remote authority is the sole arbiter of whether a turn is allowed.

use macroquad::prelude::*;
use shared::Direction;

const KEY_BINDINGS: [(KeyCode, Direction); 8] = [
    (KeyCode::Up, Direction::Up),
    (KeyCode::W, Direction::Up),
    (KeyCode::Left, Direction::Left),
    (KeyCode::A, Direction::Left),
    (KeyCode::Down, Direction::Down),
    (KeyCode::S, Direction::Down),
    (KeyCode::Right, Direction::Right),
    (KeyCode::D, Direction::Right),
];

const PAD_BUTTON: f32 = 40.0;
const PAD_GAP: f32 = 6.0;

/// Captures key presses and taps on the on-screen directional pad. Touch
/// input arrives here too: macroquad synthesizes pointer presses from touches.
pub struct InputController {
    pad_origin: Vec2,
}

impl InputController {
    /// `pad_origin` is the top-left corner of the 3x3 pad overlay.
    pub fn new(pad_origin: Vec2) -> Self {
        InputController { pad_origin }
    }

    /// Returns a direction if any bound key or pad button was pressed this
    /// frame. Only called while the game view is active, so no intent can
    /// leak from other views.
    pub fn poll(&self) -> Option<Direction> {
        for (key, direction) in KEY_BINDINGS {
            if is_key_pressed(key) {
                return Some(direction);
            }
        }

        if is_mouse_button_pressed(MouseButton::Left) {
            let (x, y) = mouse_position();
            return self.pad_hit(vec2(x, y));
        }

        None
    }

    /// The four pad buttons laid out as a plus shape.
    fn pad_rects(&self) -> [(Rect, Direction); 4] {
        let step = PAD_BUTTON + PAD_GAP;
        let cell = |col: f32, row: f32| {
            Rect::new(
                self.pad_origin.x + col * step,
                self.pad_origin.y + row * step,
                PAD_BUTTON,
                PAD_BUTTON,
            )
        };
        [
            (cell(1.0, 0.0), Direction::Up),
            (cell(0.0, 1.0), Direction::Left),
            (cell(2.0, 1.0), Direction::Right),
            (cell(1.0, 2.0), Direction::Down),
        ]
    }

    fn pad_hit(&self, point: Vec2) -> Option<Direction> {
        self.pad_rects()
            .into_iter()
            .find(|(rect, _)| rect.contains(point))
            .map(|(_, direction)| direction)
    }

    pub fn draw_pad(&self) {
        for (rect, direction) in self.pad_rects() {
            draw_rectangle(
                rect.x,
                rect.y,
                rect.w,
                rect.h,
                Color::from_rgba(255, 255, 255, 40),
            );
            draw_rectangle_lines(
                rect.x,
                rect.y,
                rect.w,
                rect.h,
                1.0,
                Color::from_rgba(255, 255, 255, 90),
            );

            let glyph = match direction {
                Direction::Up => "^",
                Direction::Down => "v",
                Direction::Left => "<",
                Direction::Right => ">",
            };
            draw_text(
                glyph,
                rect.x + rect.w / 2.0 - 5.0,
                rect.y + rect.h / 2.0 + 6.0,
                20.0,
                WHITE,
            );
        }
    }
}
