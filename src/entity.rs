use crate::constants::{DEATH_FRAMES_PER_IMAGE, FRAMES_PER_IMAGE, TILE_SIZE};
use crate::grid::{BlockSet, TileGrid};
use crate::pathfinding::first_step;
use crate::rng::Rng;
use crate::types::{
    AnimationView, CellCode, Direction, EntityId, EntityKind, EntityView, GhostName, Mode,
    ModeEvent, SpriteSet, Tile,
};

impl Mode {
    /// Transition table for every entity. `confined` tells whether the entity is
    /// still held behind the base door, which decides where it comes to rest.
    /// Returns `None` for pairs that no rule of the game can produce.
    pub fn transition(self, event: ModeEvent, confined: bool) -> Option<Mode> {
        use Mode::{Dead, Fleeing, FrozenAtBase, Normal};
        use ModeEvent::{Killed, PowerExpired, PowerStarted, ReachedSpawn, Released};

        let resting = if confined { FrozenAtBase } else { Normal };
        match (self, event) {
            (FrozenAtBase, Released) => Some(Normal),
            (Normal | Fleeing | Dead, Released) => Some(self),

            (Normal | FrozenAtBase | Fleeing, PowerStarted) => Some(Fleeing),
            (Dead, PowerStarted) => Some(Dead),

            (Fleeing, PowerExpired) => Some(resting),
            (Normal | FrozenAtBase | Dead, PowerExpired) => Some(self),

            (Normal | Fleeing, Killed) => Some(Dead),
            (FrozenAtBase | Dead, Killed) => None,

            (Dead, ReachedSpawn) => Some(resting),
            (Normal | Fleeing | FrozenAtBase, ReachedSpawn) => None,
        }
    }
}

/// Frame counters the renderer reads to pick an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Animation {
    pub sprite: SpriteSet,
    pub frames_per_image: u32,
    pub frame_idx: u32,
    pub image_idx: u32,
    pub completed_cycle: bool,
}

impl Animation {
    pub fn new(sprite: SpriteSet, frames_per_image: u32) -> Self {
        Self {
            sprite,
            frames_per_image: frames_per_image.max(1),
            frame_idx: 0,
            image_idx: 0,
            completed_cycle: false,
        }
    }

    pub fn advance(&mut self, animate: bool) {
        if animate {
            self.frame_idx += 1;
        }
        if self.frame_idx >= self.frames_per_image {
            self.frame_idx = 0;
            self.image_idx += 1;
        }
        if self.image_idx >= self.sprite.image_count() {
            self.completed_cycle = true;
            self.image_idx = 0;
        }
    }

    /// Ticks until the first full cycle completes from a fresh start.
    pub fn cycle_ticks(&self) -> u32 {
        self.frames_per_image * self.sprite.image_count()
    }
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Collision box top-left in board pixels; `x` stays within the board width.
    pub x: i32,
    pub y: i32,
    pub facing: Direction,
    /// Player only: direction to take at the next tile boundary that allows it.
    pub queued: Option<Direction>,
    pub speed: i32,
    pub mode: Mode,
    pub blockers: BlockSet,
    /// Entity this one paths toward. Looked up by id each decision.
    pub target: Option<EntityId>,
    pub spawn: Tile,
    pub stuck: bool,
    pub animation: Animation,
    base_speed: i32,
    dead_speed: i32,
}

impl Entity {
    pub fn player(id: EntityId, spawn: Tile, speed: i32) -> Self {
        let mut entity = Self {
            id,
            kind: EntityKind::Player,
            x: 0,
            y: 0,
            facing: Direction::Right,
            queued: None,
            speed,
            mode: Mode::Normal,
            blockers: BlockSet::CONFINED,
            target: None,
            spawn,
            stuck: false,
            animation: Animation::new(SpriteSet::PlayerAlive, FRAMES_PER_IMAGE),
            base_speed: speed,
            dead_speed: speed,
        };
        entity.place_at(spawn);
        entity
    }

    pub fn ghost(
        id: EntityId,
        name: GhostName,
        spawn: Tile,
        speed: i32,
        dead_speed: i32,
        target: Option<EntityId>,
    ) -> Self {
        let mut entity = Self {
            id,
            kind: EntityKind::Ghost(name),
            x: 0,
            y: 0,
            facing: Direction::Right,
            queued: None,
            speed,
            mode: Mode::FrozenAtBase,
            blockers: BlockSet::CONFINED,
            target,
            spawn,
            stuck: false,
            animation: Animation::new(SpriteSet::GhostAlive, FRAMES_PER_IMAGE),
            base_speed: speed,
            dead_speed,
        };
        entity.place_at(spawn);
        entity
    }

    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }

    pub fn ghost_name(&self) -> Option<GhostName> {
        match self.kind {
            EntityKind::Ghost(name) => Some(name),
            EntityKind::Player => None,
        }
    }

    pub fn place_at(&mut self, tile: Tile) {
        self.x = tile.col * TILE_SIZE;
        self.y = tile.row * TILE_SIZE;
    }

    pub fn is_aligned(&self) -> bool {
        self.x.rem_euclid(TILE_SIZE) == 0 && self.y.rem_euclid(TILE_SIZE) == 0
    }

    pub fn is_confined(&self) -> bool {
        self.blockers.contains(CellCode::RestrictedWall)
    }

    /// Dead ghosts may cross the base door on their way home.
    pub fn effective_blockers(&self) -> BlockSet {
        if self.mode == Mode::Dead {
            BlockSet::WALLS
        } else {
            self.blockers
        }
    }

    pub fn middle_tile(&self, cols: i32) -> Tile {
        tile_of(self.x + TILE_SIZE / 2, self.y + TILE_SIZE / 2, cols)
    }

    fn left_top_tile(&self, cols: i32) -> Tile {
        tile_of(self.x, self.y, cols)
    }

    fn right_bottom_tile(&self, cols: i32) -> Tile {
        tile_of(self.x + TILE_SIZE - 1, self.y + TILE_SIZE - 1, cols)
    }

    /// Whether the tile the box is about to enter in `dir` lets this entity in.
    /// Columns wrap around the board edge; rows past the edge block.
    pub fn can_move(&self, grid: &TileGrid, dir: Direction) -> bool {
        let cols = grid.cols();
        let from = match dir {
            Direction::Right | Direction::Down => self.left_top_tile(cols),
            Direction::Left | Direction::Up => self.right_bottom_tile(cols),
        };
        let ahead = from.step(dir);
        if ahead.row < 0 || ahead.row >= grid.rows() {
            return false;
        }
        let ahead = Tile::new(ahead.row, ahead.col.rem_euclid(cols));
        grid.is_passable(ahead, self.effective_blockers())
    }

    pub fn can_turn(&self, grid: &TileGrid, dir: Direction) -> bool {
        self.is_aligned() && self.can_move(grid, dir)
    }

    pub fn available_directions(&self, grid: &TileGrid) -> Vec<Direction> {
        Direction::SCAN_ORDER
            .into_iter()
            .filter(|dir| self.can_turn(grid, *dir))
            .collect()
    }

    /// Takes the queued direction once the grid allows it; otherwise keeps it queued.
    pub fn apply_queued_turn(&mut self, grid: &TileGrid) {
        let Some(dir) = self.queued else {
            return;
        };
        if self.can_turn(grid, dir) {
            self.facing = dir;
            self.queued = None;
        }
    }

    /// Advances one tick along `facing`. Returns false and marks the entity stuck
    /// when the way ahead is blocked.
    pub fn step(&mut self, grid: &TileGrid) -> bool {
        self.stuck = false;
        if !self.can_move(grid, self.facing) {
            self.stuck = true;
            return false;
        }
        let (drow, dcol) = self.facing.delta();
        let board_width = grid.cols() * TILE_SIZE;
        self.x = (self.x + dcol * self.speed).rem_euclid(board_width);
        self.y += drow * self.speed;
        true
    }

    /// AI direction choice, made only on tile boundaries. Returns true when a
    /// dead ghost reached its spawn tile and came back to life.
    pub fn decide(
        &mut self,
        grid: &TileGrid,
        target: Option<Tile>,
        pursuit_probability: f32,
        rng: &mut Rng,
    ) -> bool {
        if !self.is_aligned() {
            return false;
        }
        let here = self.middle_tile(grid.cols());

        let mut revived = false;
        if self.mode == Mode::Dead && here == self.spawn {
            self.apply(ModeEvent::ReachedSpawn);
            revived = true;
        }

        let blockers = self.effective_blockers();
        let available = self.available_directions(grid);
        let step_toward = |goal: Tile| {
            first_step(grid, here, goal, blockers).and_then(|next| here.direction_to(next))
        };

        let chosen = match self.mode {
            Mode::Dead => step_toward(self.spawn).or_else(|| rng.pick(&available)),
            Mode::Normal | Mode::FrozenAtBase | Mode::Fleeing => {
                let toward = if rng.chance(pursuit_probability) {
                    target.and_then(step_toward)
                } else {
                    None
                };
                match (self.mode, toward) {
                    (Mode::Fleeing, Some(dir)) => {
                        let away: Vec<Direction> =
                            available.iter().copied().filter(|d| *d != dir).collect();
                        rng.pick(&away).or(Some(dir))
                    }
                    (_, Some(dir)) => Some(dir),
                    (_, None) => rng.pick(&available),
                }
            }
        };

        if let Some(dir) = chosen {
            self.facing = dir;
        }
        revived
    }

    /// Runs one mode transition and its side effects on speed, sprites and,
    /// for a ghost being caught, position.
    ///
    /// Panics on a pair the transition table leaves undefined.
    pub fn apply(&mut self, event: ModeEvent) -> Mode {
        let previous = self.mode;
        let Some(next) = previous.transition(event, self.is_confined()) else {
            panic!(
                "undefined mode transition: {:?} in {:?} for {:?}",
                event, previous, self.kind
            );
        };
        if event == ModeEvent::Released {
            self.blockers = self.blockers.without(CellCode::RestrictedWall);
        }
        self.mode = next;

        if next == Mode::Dead && previous != Mode::Dead && !self.is_player() {
            self.snap_to_tile();
            self.speed = self.dead_speed;
        }
        if previous == Mode::Dead && next != Mode::Dead {
            self.speed = self.base_speed;
        }
        self.sync_sprite();
        next
    }

    /// Floors the box onto the tile boundary it currently starts in.
    pub fn snap_to_tile(&mut self) {
        self.x -= self.x.rem_euclid(TILE_SIZE);
        self.y -= self.y.rem_euclid(TILE_SIZE);
    }

    pub fn advance_animation(&mut self) {
        let animate = !self.stuck || self.mode == Mode::Dead;
        self.animation.advance(animate);
    }

    pub fn view(&self, cols: i32) -> EntityView {
        EntityView {
            id: self.id,
            kind: self.kind,
            x: self.x,
            y: self.y,
            tile: self.middle_tile(cols),
            facing: self.facing,
            mode: self.mode,
            stuck: self.stuck,
            animation: AnimationView {
                sprite: self.animation.sprite,
                image_idx: self.animation.image_idx,
                frame_idx: self.animation.frame_idx,
                completed_cycle: self.animation.completed_cycle,
            },
        }
    }

    fn sync_sprite(&mut self) {
        let (sprite, frames_per_image) = match (self.kind, self.mode) {
            (EntityKind::Player, Mode::Dead) => (SpriteSet::PlayerDeath, DEATH_FRAMES_PER_IMAGE),
            (EntityKind::Player, _) => (SpriteSet::PlayerAlive, FRAMES_PER_IMAGE),
            (EntityKind::Ghost(_), Mode::Dead) => (SpriteSet::GhostEyes, FRAMES_PER_IMAGE),
            (EntityKind::Ghost(_), Mode::Fleeing) => (SpriteSet::GhostScared, FRAMES_PER_IMAGE),
            (EntityKind::Ghost(_), _) => (SpriteSet::GhostAlive, FRAMES_PER_IMAGE),
        };
        if self.animation.sprite != sprite {
            self.animation = Animation::new(sprite, frames_per_image);
        }
    }
}

fn tile_of(px: i32, py: i32, cols: i32) -> Tile {
    Tile::new(
        py.div_euclid(TILE_SIZE),
        px.div_euclid(TILE_SIZE).rem_euclid(cols.max(1)),
    )
}
