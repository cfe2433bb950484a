//! Character canvas - composes a snapshot into a grid of styled cells
//!
//! Kept free of terminal I/O so the scene can be drawn and inspected in tests.

use crate::core::types::{EntityId, Facing, Vec2};
use crate::simulation::effects::{Effect, EffectKind};
use crate::simulation::entity::AgentPhase;
use crate::simulation::environment::{EnvironmentState, SkyBody, Weather};
use crate::simulation::snapshot::{EntityView, EntityViewKind, Snapshot};

use super::art::{self, Sprite};
use super::palette::{self, Color};

/// Ticks per animation frame
const FRAME_TICKS: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
}

#[derive(Debug, Clone)]
pub struct Canvas {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        let blank = Cell {
            ch: ' ',
            fg: palette::LABEL,
            bg: palette::DEEP_WATER,
        };
        Self {
            width,
            height,
            cells: vec![blank; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        (x < self.width && y < self.height).then(|| &self.cells[y * self.width + x])
    }

    pub fn row(&self, y: usize) -> &[Cell] {
        let start = (y * self.width).min(self.cells.len());
        let end = (start + self.width).min(self.cells.len());
        &self.cells[start..end]
    }

    /// Text of one row, for tests and headless dumps
    pub fn row_text(&self, y: usize) -> String {
        self.row(y).iter().map(|c| c.ch).collect()
    }

    pub fn put_char(&mut self, x: i32, y: i32, ch: char, fg: Color) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let cell = &mut self.cells[y as usize * self.width + x as usize];
        cell.ch = ch;
        cell.fg = fg;
    }

    /// Write text; spaces are transparent so sprites overlap cleanly
    pub fn put_str(&mut self, x: i32, y: i32, text: &str, fg: Color) {
        for (i, ch) in text.chars().enumerate() {
            if ch != ' ' {
                self.put_char(x + i as i32, y, ch, fg);
            }
        }
    }

    pub fn put_sprite(&mut self, x: i32, y: i32, sprite: &Sprite, facing: Facing, fg: Color) {
        for (row, line) in sprite.lines(facing).iter().enumerate() {
            self.put_str(x, y + row as i32, line, fg);
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for cell in self.cells.iter_mut().skip(y * self.width).take(self.width) {
            cell.bg = bg;
        }
    }

    /// Draw a whole scene
    pub fn draw_snapshot(&mut self, snapshot: &Snapshot, selected: Option<EntityId>) {
        let frame = snapshot.tick / FRAME_TICKS;
        let env = &snapshot.environment;
        self.draw_backdrop(env, snapshot.bounds.surface_row() as usize, frame);

        for entity in &snapshot.entities {
            self.draw_entity(entity, env, frame, selected == Some(entity.id));
        }
        for effect in &snapshot.effects {
            self.draw_effect(effect, snapshot.sim_time);
        }
    }

    fn draw_backdrop(&mut self, env: &EnvironmentState, surface: usize, frame: u64) {
        let sky = palette::sky_color(env);
        let floor = self.height.saturating_sub(1);
        let water_rows = floor.saturating_sub(surface).max(1) as f32;

        for y in 0..self.height {
            let bg = if y < surface {
                sky
            } else if y >= floor {
                palette::SAND
            } else {
                palette::water_color(env, (y - surface) as f32 / water_rows)
            };
            self.fill_row(y, bg);
        }

        // Sky body, clouds and stars
        let body_x = self.width.saturating_sub(12) as i32;
        match env.sky_body {
            SkyBody::Sun => self.put_sprite(body_x, 0, &art::SUN, Facing::Right, palette::GOLD),
            SkyBody::Moon => {
                self.put_sprite(body_x, 0, &art::MOON, Facing::Right, palette::FOAM);
                for i in 0..self.width / 9 {
                    let x = (i * 9 + (i * 7) % 5) as i32;
                    let star = art::STAR_CHARS[(i + frame as usize / 5) % art::STAR_CHARS.len()];
                    self.put_char(x, (i % surface.max(1)) as i32, star, palette::FOAM);
                }
            }
        }
        if env.weather != Weather::Clear {
            let drift = (frame / 2) as usize;
            for (i, cloud) in art::CLOUDS.iter().enumerate() {
                let x = ((i * self.width / 2 + drift) % self.width.max(1)) as i32;
                self.put_sprite(x, i as i32 % 2, cloud, Facing::Right, palette::FOAM);
            }
        }
        if matches!(env.weather, Weather::Rain | Weather::Storm) {
            for x in (0..self.width).step_by(4) {
                let y = ((x as u64 + frame) % surface.max(1) as u64) as i32;
                self.put_char(x as i32, y, '/', palette::FOAM);
            }
        }

        // Waves
        let wave = art::WAVE_PATTERN[(frame % 2) as usize];
        for y in surface..(surface + 2).min(self.height) {
            let line: String = wave.chars().cycle().skip(y - surface).take(self.width).collect();
            self.put_str(0, y as i32, &line, palette::FOAM);
        }

        // Sand
        let sand: String = art::FLOOR_PATTERN.chars().cycle().take(self.width).collect();
        self.put_str(0, floor as i32, &sand, palette::SAND.darken(0.6));
    }

    fn draw_entity(&mut self, entity: &EntityView, env: &EnvironmentState, frame: u64, selected: bool) {
        let x = entity.position.x.round() as i32;
        let y = entity.position.y.round() as i32;
        let light = env.light_level;

        match &entity.kind {
            EntityViewKind::Agent {
                agent_id,
                agent_type,
                phase,
                exit_variant,
                orphan,
                ..
            } => {
                let sprite = art::agent_sprite(agent_id, agent_type.as_deref());
                let mut color = palette::lit(palette::agent_color(*phase, *exit_variant, *orphan), light);
                if selected {
                    color = palette::GOLD;
                }
                if *phase == AgentPhase::Exiting && exit_variant.is_some() && frame % 2 == 1 {
                    color = color.darken(0.7);
                }
                self.put_sprite(x, y, sprite, entity.facing, color);
                if selected {
                    self.put_char(x - 1, y, '[', palette::GOLD);
                    self.put_char(x + sprite.width as i32, y, ']', palette::GOLD);
                }
            }
            EntityViewKind::Tool { style, .. } => {
                let color = palette::tool_color(*style);
                match art::tool_sprite(*style) {
                    Some(sprite) => self.put_sprite(x, y, sprite, entity.facing, color),
                    None => self.put_char(x, y, art::BUBBLE, color),
                }
            }
            EntityViewKind::Marker { completions, .. } => {
                self.put_sprite(x, y, &art::SHELL, Facing::Right, palette::GOLD);
                if *completions > 1 {
                    self.put_str(x + 5, y, &format!("x{}", completions), palette::GOLD);
                }
            }
            EntityViewKind::Ambient { species } => {
                let sprite = art::ambient_sprite(*species, frame);
                let color = palette::lit(palette::ambient_color(*species), light);
                self.put_sprite(x, y, sprite, entity.facing, color);
            }
        }

        if let Some(label) = &entity.label {
            if label.opacity > 0.0 {
                let color = palette::LABEL.darken(0.3 + 0.7 * label.opacity);
                self.put_str(x, y - 1, &label.text, color);
            }
        }
    }

    fn draw_effect(&mut self, effect: &Effect, now: f64) {
        match &effect.kind {
            EffectKind::Alert { message } => {
                let color = palette::ALERT.darken(1.0 - effect.progress(now) * 0.5);
                let pos = effect.origin + Vec2::new(0.0, -2.0);
                self.put_str(pos.x.round() as i32, pos.y.round() as i32, &format!("! {}", message), color);
            }
            EffectKind::Milestone { message } => {
                let text = format!("*** {} ***", message);
                let x = (self.width as i32 - text.chars().count() as i32) / 2;
                self.put_str(x.max(0), 1, &text, palette::GOLD);
            }
            _ => {}
        }
        let color = match effect.kind {
            EffectKind::Burst { .. } | EffectKind::Splash => palette::FOAM,
            _ => palette::GOLD,
        };
        for particle in &effect.particles {
            self.put_char(
                particle.position.x.round() as i32,
                particle.position.y.round() as i32,
                particle.glyph,
                color,
            );
        }
    }
}
