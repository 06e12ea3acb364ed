//! Paints the authoritative world onto the grid surface.
//!
//! Painting is a pure function of the latest snapshot: it holds no state of
//! its own, tolerates a missing or partial snapshot (background and grid
//! only), and skips any entity whose coordinates fall outside the play
//! field. Draw order per frame: background, grid, foods, players (body
//! segments before head decoration), in snapshot-map order.

use macroquad::prelude::*;
use shared::{
    darken_color, in_bounds, parse_hex_color, Direction, FoodItem, FoodKind, PlayerState,
    Snapshot, DEFAULT_COLOR, GRID_HEIGHT, GRID_WIDTH,
};

pub const CELL_SIZE: f32 = 20.0;
pub const BOARD_WIDTH: f32 = GRID_WIDTH as f32 * CELL_SIZE;
pub const BOARD_HEIGHT: f32 = GRID_HEIGHT as f32 * CELL_SIZE;
pub const EYE_SIZE: f32 = CELL_SIZE / 5.0;

/// How much body-segment corner accents are darkened, in percent.
const ACCENT_DARKEN: u32 = 20;

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// The reference grid is cosmetic; skipping it is the reduced-motion
    /// variant.
    pub draw_grid: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig { draw_grid: true }
    }
}

pub struct Renderer {
    origin: Vec2,
    config: RenderConfig,
}

/// Top-left pixel of a grid cell.
pub fn cell_origin(origin: Vec2, x: i32, y: i32) -> Vec2 {
    vec2(
        origin.x + x as f32 * CELL_SIZE,
        origin.y + y as f32 * CELL_SIZE,
    )
}

/// In-cell pixel offsets of the two eye marks for a facing direction.
/// Mirrors the four fixed presets of the original sprite work.
pub fn eye_offsets(direction: Direction) -> (Vec2, Vec2) {
    let edge = CELL_SIZE - EYE_SIZE - 2.0;
    let near = CELL_SIZE / 3.0;
    let far = CELL_SIZE - EYE_SIZE - near;

    match direction {
        Direction::Right => (vec2(edge, near), vec2(edge, far)),
        Direction::Left => (vec2(2.0, near), vec2(2.0, far)),
        Direction::Up => (vec2(near, 2.0), vec2(far, 2.0)),
        Direction::Down => (vec2(near, edge), vec2(far, edge)),
    }
}

/// Eye preset for a possibly-unreported direction; faces right by default so
/// the choice is stable across frames.
pub fn head_eye_offsets(direction: Option<Direction>) -> (Vec2, Vec2) {
    eye_offsets(direction.unwrap_or(Direction::Right))
}

/// Converts a `#rrggbb` string to a drawable color, falling back to the
/// default snake color rather than failing on bad input.
pub fn color_from_hex(hex: &str) -> Color {
    let (r, g, b) = parse_hex_color(hex)
        .or_else(|| parse_hex_color(DEFAULT_COLOR))
        .unwrap_or((77, 255, 145));
    Color::from_rgba(r, g, b, 255)
}

impl Renderer {
    pub fn new(origin: Vec2, config: RenderConfig) -> Self {
        Renderer { origin, config }
    }

    /// Paints one frame. Safe to call with `None` while no snapshot has
    /// arrived yet; only the background and grid are drawn then.
    pub fn draw(&self, snapshot: Option<&Snapshot>) {
        draw_rectangle(
            self.origin.x,
            self.origin.y,
            BOARD_WIDTH,
            BOARD_HEIGHT,
            Color::from_rgba(15, 52, 96, 255),
        );

        if self.config.draw_grid {
            self.draw_grid();
        }

        let Some(snapshot) = snapshot else {
            return;
        };

        for food in &snapshot.foods {
            self.draw_food(food);
        }
        for player in snapshot.players.values() {
            self.draw_player(player);
        }
    }

    fn draw_grid(&self) {
        let line = Color::from_rgba(255, 255, 255, 13);

        for x in 0..=GRID_WIDTH {
            let px = self.origin.x + x as f32 * CELL_SIZE;
            draw_line(
                px,
                self.origin.y,
                px,
                self.origin.y + BOARD_HEIGHT,
                1.0,
                line,
            );
        }
        for y in 0..=GRID_HEIGHT {
            let py = self.origin.y + y as f32 * CELL_SIZE;
            draw_line(
                self.origin.x,
                py,
                self.origin.x + BOARD_WIDTH,
                py,
                1.0,
                line,
            );
        }
    }

    fn draw_food(&self, food: &FoodItem) {
        let (x, y) = food.position;
        if !in_bounds(x, y) {
            return;
        }

        let cell = cell_origin(self.origin, x, y);
        let cx = cell.x + CELL_SIZE / 2.0;
        let cy = cell.y + CELL_SIZE / 2.0;

        match food.kind {
            FoodKind::Golden => {
                // Glow halo stands in for the canvas shadow blur.
                draw_circle(cx, cy, CELL_SIZE * 0.55, Color::from_rgba(255, 215, 0, 70));
                draw_circle(cx, cy, CELL_SIZE / 3.0, Color::from_rgba(255, 215, 0, 255));
            }
            FoodKind::Normal => {
                draw_circle(cx, cy, CELL_SIZE / 3.0, Color::from_rgba(255, 71, 87, 255));
            }
        }
    }

    fn draw_player(&self, player: &PlayerState) {
        if player.body.is_empty() {
            return;
        }

        let color = color_from_hex(&player.color);
        let accent = color_from_hex(&darken_color(&player.color, ACCENT_DARKEN));

        // Body segments first so the head decoration paints on top.
        for &(x, y) in player.body.iter().skip(1) {
            if !in_bounds(x, y) {
                continue;
            }
            let cell = cell_origin(self.origin, x, y);
            draw_rectangle(cell.x, cell.y, CELL_SIZE, CELL_SIZE, color);

            // Corner accents distinguish body links without a second sprite.
            let corner = CELL_SIZE / 4.0;
            let fx = cell.x + CELL_SIZE - corner;
            let fy = cell.y + CELL_SIZE - corner;
            draw_rectangle(cell.x, cell.y, corner, corner, accent);
            draw_rectangle(fx, cell.y, corner, corner, accent);
            draw_rectangle(cell.x, fy, corner, corner, accent);
            draw_rectangle(fx, fy, corner, corner, accent);
        }

        let (hx, hy) = player.body[0];
        if !in_bounds(hx, hy) {
            return;
        }
        let head = cell_origin(self.origin, hx, hy);
        draw_rectangle(head.x, head.y, CELL_SIZE, CELL_SIZE, color);

        if player.alive {
            self.draw_head_decoration(head, player);
        } else {
            self.draw_death_marker(head);
        }
    }

    fn draw_head_decoration(&self, head: Vec2, player: &PlayerState) {
        let (eye_a, eye_b) = head_eye_offsets(player.direction);
        draw_rectangle(head.x + eye_a.x, head.y + eye_a.y, EYE_SIZE, EYE_SIZE, BLACK);
        draw_rectangle(head.x + eye_b.x, head.y + eye_b.y, EYE_SIZE, EYE_SIZE, BLACK);

        if !player.username.is_empty() {
            let label = measure_text(&player.username, None, 12, 1.0);
            draw_text(
                &player.username,
                head.x + CELL_SIZE / 2.0 - label.width / 2.0,
                head.y - 5.0,
                12.0,
                WHITE,
            );
        }
    }

    /// A dead snake keeps its body on screen until the next snapshot drops
    /// it; only the head decoration changes to a marker.
    fn draw_death_marker(&self, head: Vec2) {
        let inset = 4.0;
        let a = head + vec2(inset, inset);
        let b = head + vec2(CELL_SIZE - inset, CELL_SIZE - inset);
        draw_line(a.x, a.y, b.x, b.y, 2.0, WHITE);
        draw_line(a.x, b.y, b.x, a.y, 2.0, WHITE);
    }
}
