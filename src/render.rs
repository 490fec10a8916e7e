//! The seam between the core and whatever draws it.
//!
//! The core never touches images. It hands a `SpriteSink` the cell codes worth
//! drawing and one `SpriteFrame` per entity, picked from the counters every
//! `EntityView` exposes. `TextSink` is the headless implementation used by the
//! simulator and the tests.

use crate::constants::{SPRITE_INSET, TILE_SIZE};
use crate::grid::TileGrid;
use crate::types::{CellCode, Direction, EntityKind, EntityView, GhostName, Snapshot, SpriteSet};

/// Which image of which atlas to draw for one entity this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteFrame {
    pub kind: EntityKind,
    pub sprite: SpriteSet,
    /// `None` for sets drawn the same whatever the facing.
    pub facing: Option<Direction>,
    pub image_idx: u32,
}

impl SpriteFrame {
    /// Stable name of the image in an atlas, e.g. `pinky_alive_left_1`.
    pub fn atlas_key(&self) -> String {
        let owner = match self.kind {
            EntityKind::Player => "player",
            EntityKind::Ghost(name) => name.label(),
        };
        let set = match self.sprite {
            SpriteSet::PlayerAlive | SpriteSet::GhostAlive => "alive",
            SpriteSet::PlayerDeath => "death",
            SpriteSet::GhostScared => "scared",
            SpriteSet::GhostEyes => "eyes",
        };
        match self.facing {
            Some(facing) => format!("{owner}_{set}_{}_{}", facing_label(facing), self.image_idx),
            None => format!("{owner}_{set}_{}", self.image_idx),
        }
    }
}

pub trait SpriteSink {
    /// `x`, `y` are the sprite's top-left in board pixels.
    fn draw_sprite(&mut self, frame: SpriteFrame, x: i32, y: i32);
    /// Walls, the base door and visible pickups, top-left of the tile.
    fn draw_cell(&mut self, code: CellCode, x: i32, y: i32);
}

pub fn current_image_frame(entity: &EntityView) -> SpriteFrame {
    let sprite = entity.animation.sprite;
    let last = sprite.image_count().saturating_sub(1);
    SpriteFrame {
        kind: entity.kind,
        sprite,
        facing: sprite.is_directional().then_some(entity.facing),
        image_idx: entity.animation.image_idx.min(last),
    }
}

/// Issues every draw call for one frame: cells first, then ghosts, then the
/// player on top.
pub fn draw_frame<S: SpriteSink + ?Sized>(grid: &TileGrid, snapshot: &Snapshot, sink: &mut S) {
    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            let Ok(code) = grid.cell_at(row, col) else {
                continue;
            };
            let hidden = code == CellCode::BigPickup && !snapshot.big_pickup_visible;
            if code == CellCode::Empty || hidden {
                continue;
            }
            sink.draw_cell(code, col * TILE_SIZE, row * TILE_SIZE);
        }
    }

    let ghosts = snapshot.entities.iter().filter(|e| e.kind != EntityKind::Player);
    let players = snapshot.entities.iter().filter(|e| e.kind == EntityKind::Player);
    for entity in ghosts.chain(players) {
        sink.draw_sprite(
            current_image_frame(entity),
            entity.x - SPRITE_INSET,
            entity.y - SPRITE_INSET,
        );
    }
}

fn facing_label(facing: Direction) -> &'static str {
    match facing {
        Direction::Up => "up",
        Direction::Down => "down",
        Direction::Left => "left",
        Direction::Right => "right",
    }
}

/// Draws onto a character grid, one character per tile.
#[derive(Clone, Debug)]
pub struct TextSink {
    cols: i32,
    cells: Vec<Vec<char>>,
}

impl TextSink {
    pub fn new(rows: i32, cols: i32) -> Self {
        let width = cols.max(0) as usize;
        Self {
            cols,
            cells: vec![vec![' '; width]; rows.max(0) as usize],
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.cells.iter().map(|row| row.iter().collect()).collect()
    }

    pub fn render(&self) -> String {
        self.lines().join("\n")
    }

    fn put(&mut self, px: i32, py: i32, symbol: char) {
        if self.cols <= 0 {
            return;
        }
        let row = py.div_euclid(TILE_SIZE);
        let col = px.div_euclid(TILE_SIZE).rem_euclid(self.cols);
        if let Some(cell) = usize::try_from(row)
            .ok()
            .and_then(|row| self.cells.get_mut(row))
            .and_then(|line| line.get_mut(col as usize))
        {
            *cell = symbol;
        }
    }
}

impl SpriteSink for TextSink {
    fn draw_sprite(&mut self, frame: SpriteFrame, x: i32, y: i32) {
        let symbol = match (frame.kind, frame.sprite) {
            (EntityKind::Player, SpriteSet::PlayerDeath) => 'x',
            (EntityKind::Player, _) => '@',
            (EntityKind::Ghost(_), SpriteSet::GhostScared) => 'w',
            (EntityKind::Ghost(_), SpriteSet::GhostEyes) => '"',
            (EntityKind::Ghost(GhostName::Blinky), _) => 'B',
            (EntityKind::Ghost(GhostName::Clyde), _) => 'C',
            (EntityKind::Ghost(GhostName::Inky), _) => 'I',
            (EntityKind::Ghost(GhostName::Pinky), _) => 'P',
        };
        let centre = SPRITE_INSET + TILE_SIZE / 2;
        self.put(x + centre, y + centre, symbol);
    }

    fn draw_cell(&mut self, code: CellCode, x: i32, y: i32) {
        self.put(x, y, code.to_char());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_MS;
    use crate::engine::GameEngine;
    use crate::types::{AnimationView, EntityId, Mode, Tile};

    fn view(kind: EntityKind, sprite: SpriteSet, image_idx: u32) -> EntityView {
        EntityView {
            id: EntityId(0),
            kind,
            x: 0,
            y: 0,
            tile: Tile::new(0, 0),
            facing: Direction::Up,
            mode: Mode::Normal,
            stuck: false,
            animation: AnimationView {
                sprite,
                image_idx,
                frame_idx: 0,
                completed_cycle: false,
            },
        }
    }

    #[test]
    fn image_frame_follows_sprite_set_and_facing() {
        let frame = current_image_frame(&view(
            EntityKind::Ghost(GhostName::Pinky),
            SpriteSet::GhostAlive,
            1,
        ));
        assert_eq!(frame.facing, Some(Direction::Up));
        assert_eq!(frame.atlas_key(), "pinky_alive_up_1");

        let scared = current_image_frame(&view(
            EntityKind::Ghost(GhostName::Inky),
            SpriteSet::GhostScared,
            0,
        ));
        assert_eq!(scared.facing, None);
        assert_eq!(scared.atlas_key(), "inky_scared_0");

        let dying = current_image_frame(&view(EntityKind::Player, SpriteSet::PlayerDeath, 40));
        assert_eq!(dying.image_idx, 11);
    }

    #[test]
    fn text_frame_shows_maze_and_entities() {
        let mut engine = GameEngine::classic(12);
        let snapshot = engine.build_snapshot(false);
        let mut sink = TextSink::new(engine.world.grid.rows(), engine.world.grid.cols());
        draw_frame(&engine.world.grid, &snapshot, &mut sink);

        let lines = sink.lines();
        assert_eq!(lines.len(), 24);
        assert_eq!(lines[0], "#####################");
        assert_eq!(lines[17].chars().nth(10), Some('@'));
        assert_eq!(lines[2].chars().nth(1), Some('o'));
        assert_eq!(lines[9].chars().nth(10), Some('-'));
        let base = lines[11].chars().nth(10);
        assert!(matches!(base, Some('B' | 'C' | 'I' | 'P')));
    }

    #[test]
    fn big_pickups_blink_out() {
        let mut engine = GameEngine::classic(12);
        for _ in 0..30 {
            engine.step(TICK_MS);
        }
        let snapshot = engine.build_snapshot(false);
        assert!(!snapshot.big_pickup_visible);
        let mut sink = TextSink::new(engine.world.grid.rows(), engine.world.grid.cols());
        draw_frame(&engine.world.grid, &snapshot, &mut sink);
        assert_eq!(sink.lines()[2].chars().nth(1), Some(' '));
        assert!(!sink.render().contains('o'));
    }
}
