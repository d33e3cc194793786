use crate::network::ConnectionStatus;
use crate::round::RoundStatus;
use crate::sync::{PresentationHooks, SyncEngine};
use crate::world::{Gate, WallInstance};
use macroquad::prelude::*;
use shared::{Grid, Player};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const BANNER_DURATION: Duration = Duration::from_secs(3);
const HUD_HEIGHT: f32 = 40.0;

/// Top-down maze view fed by sync notifications
pub struct Renderer {
    width: f32,
    height: f32,
    walls: Vec<(usize, usize)>,
    gate: Option<(usize, usize)>,
    visuals: HashMap<u32, Color>,
    banner: Option<(String, Instant)>,
    show_hud: bool,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Renderer {
            width: width as f32,
            height: height as f32,
            walls: Vec::new(),
            gate: None,
            visuals: HashMap::new(),
            banner: None,
            show_hud: true,
        }
    }

    pub fn toggle_hud(&mut self) {
        self.show_hud = !self.show_hud;
    }

    pub fn render(&self, engine: &SyncEngine, status: ConnectionStatus) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        let cell = self.cell_pixels(engine.world().grid());
        self.draw_maze(cell);

        for player in engine.players().all() {
            let is_local = engine.players().is_local(player.id);
            self.draw_player(player, cell, is_local);
        }

        if self.show_hud {
            self.draw_hud(engine, status);
        }
        self.draw_banner();
    }

    /// Side of one cell in pixels, so the whole grid fits below the HUD
    fn cell_pixels(&self, grid: &Grid) -> f32 {
        let (w, d) = (grid.width(), grid.depth());
        if w == 0 || d == 0 {
            return 0.0;
        }
        (self.width / w as f32).min((self.height - HUD_HEIGHT) / d as f32)
    }

    fn draw_maze(&self, cell: f32) {
        for &(x, z) in &self.walls {
            draw_rectangle(
                x as f32 * cell,
                HUD_HEIGHT + z as f32 * cell,
                cell,
                cell,
                Color::from_rgba(68, 68, 68, 255),
            );
        }

        if let Some((x, z)) = self.gate {
            draw_rectangle(x as f32 * cell, HUD_HEIGHT + z as f32 * cell, cell, cell, GOLD);
        }
    }

    fn draw_player(&self, player: &Player, cell: f32, is_local: bool) {
        // Positions are in cell units, cell centers at integer coordinates
        let cx = (player.position.x + 0.5) * cell;
        let cy = HUD_HEIGHT + (player.position.z + 0.5) * cell;
        let radius = cell * 0.35;

        let color = self.visuals.get(&player.id).copied().unwrap_or(GRAY);
        draw_circle(cx, cy, radius, color);

        if is_local {
            draw_circle_lines(cx, cy, radius, 2.0, WHITE);
        }

        let yaw = player.rotation.y;
        draw_line(
            cx,
            cy,
            cx + yaw.sin() * radius,
            cy + yaw.cos() * radius,
            2.0,
            WHITE,
        );

        draw_text(&player.name, cx - radius, cy - radius - 4.0, 14.0, WHITE);
    }

    fn draw_hud(&self, engine: &SyncEngine, status: ConnectionStatus) {
        let (connection_color, connection_text) = match status {
            ConnectionStatus::Connecting => (YELLOW, "connecting".to_string()),
            ConnectionStatus::Connected(id) => (GREEN, format!("player {}", id)),
            ConnectionStatus::Disconnected => (RED, "disconnected".to_string()),
        };
        draw_rectangle(10.0, 12.0, 8.0, 8.0, connection_color);
        draw_text(&connection_text, 24.0, 20.0, 16.0, WHITE);

        let round_text = match engine.status() {
            RoundStatus::Active => format!("round {}", engine.round().round()),
            RoundStatus::Escaped => format!("round {} over", engine.round().round()),
        };
        draw_text(&round_text, 160.0, 20.0, 16.0, WHITE);

        let player_text = format!("{} players", engine.players().len());
        draw_text(&player_text, 300.0, 20.0, 16.0, WHITE);
    }

    fn draw_banner(&self) {
        if let Some((text, _)) = self.banner.as_ref().filter(|(_, at)| at.elapsed() < BANNER_DURATION) {
            let size = measure_text(text, None, 32, 1.0);
            draw_text(
                text,
                (self.width - size.width) / 2.0,
                self.height / 2.0,
                32.0,
                GOLD,
            );
        }
    }

    fn show_banner(&mut self, text: String) {
        self.banner = Some((text, Instant::now()));
    }

    /// Players with a constructed visual
    pub fn ready_players(&self) -> usize {
        self.visuals.len()
    }
}

impl PresentationHooks for Renderer {
    fn on_player_added(&mut self, record: &Player) {
        self.visuals.insert(record.id, parse_color(&record.color));
    }

    fn on_player_removed(&mut self, record: &Player) {
        self.visuals.remove(&record.id);
    }

    fn on_world_rebuilt(&mut self, walls: &[WallInstance], gate: Option<Gate>) {
        self.walls = walls.iter().map(|w| w.cell).collect();
        self.gate = gate.map(|g| g.cell);
    }

    fn on_round_escaped(&mut self, escaper: &Player) {
        self.show_banner(format!("{} escaped!", escaper.name));
    }

    fn on_round_reset(&mut self) {
        self.show_banner("New maze!".to_string());
    }
}

/// Parses a color name or `#rrggbb`, falling back to light gray.
pub fn parse_color(name: &str) -> Color {
    if let Some(hex) = name.strip_prefix('#') {
        if hex.len() == 6 {
            if let Ok(rgb) = u32::from_str_radix(hex, 16) {
                return Color::from_hex(rgb);
            }
        }
        return LIGHTGRAY;
    }

    match name.to_ascii_lowercase().as_str() {
        "red" => RED,
        "green" => GREEN,
        "blue" => BLUE,
        "yellow" => YELLOW,
        "purple" => PURPLE,
        "orange" => ORANGE,
        "magenta" => MAGENTA,
        "cyan" => Color::from_rgba(0, 255, 255, 255),
        "white" => WHITE,
        _ => LIGHTGRAY,
    }
}
