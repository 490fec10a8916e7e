use serde::Serialize;

use crate::constants::{
    speed_is_aligned, DEAD_GHOST_SPEED, GHOST_SPEED, PLAYER_SPEED, POWER_DURATION_MS,
    PURSUIT_PROBABILITY, RELEASE_INTERVAL_MS, TICK_RATE,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Order in which an AI entity lists its locally available moves.
    pub const SCAN_ORDER: [Direction; 4] = [
        Direction::Right,
        Direction::Left,
        Direction::Up,
        Direction::Down,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// (drow, dcol) of one step.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// Content of one maze cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellCode {
    Empty,
    SmallPickup,
    BigPickup,
    Wall,
    RestrictedWall,
}

impl CellCode {
    pub const ALL: [CellCode; 5] = [
        CellCode::Empty,
        CellCode::SmallPickup,
        CellCode::BigPickup,
        CellCode::Wall,
        CellCode::RestrictedWall,
    ];

    pub fn parse(c: char) -> Option<Self> {
        match c {
            ' ' => Some(Self::Empty),
            '.' => Some(Self::SmallPickup),
            'o' => Some(Self::BigPickup),
            '#' => Some(Self::Wall),
            '-' => Some(Self::RestrictedWall),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Self::Empty => ' ',
            Self::SmallPickup => '.',
            Self::BigPickup => 'o',
            Self::Wall => '#',
            Self::RestrictedWall => '-',
        }
    }

    pub fn is_pickup(self) -> bool {
        matches!(self, Self::SmallPickup | Self::BigPickup)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Tile {
    pub row: i32,
    pub col: i32,
}

impl Tile {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dr, dc) = dir.delta();
        Self {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// Direction of a single orthogonal step from `self` to `to`.
    pub fn direction_to(self, to: Tile) -> Option<Direction> {
        if self.row < to.row {
            Some(Direction::Down)
        } else if self.row > to.row {
            Some(Direction::Up)
        } else if self.col < to.col {
            Some(Direction::Right)
        } else if self.col > to.col {
            Some(Direction::Left)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostName {
    Blinky,
    Clyde,
    Inky,
    Pinky,
}

impl GhostName {
    pub const ROSTER: [GhostName; 4] = [
        GhostName::Blinky,
        GhostName::Clyde,
        GhostName::Inky,
        GhostName::Pinky,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GhostName::Blinky => "blinky",
            GhostName::Clyde => "clyde",
            GhostName::Inky => "inky",
            GhostName::Pinky => "pinky",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Ghost(GhostName),
}

/// Behaviour mode of an entity. The player only ever uses `Normal` and `Dead`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Normal,
    Fleeing,
    Dead,
    FrozenAtBase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeEvent {
    Released,
    PowerStarted,
    PowerExpired,
    Killed,
    ReachedSpawn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpriteSet {
    PlayerAlive,
    PlayerDeath,
    GhostAlive,
    GhostScared,
    GhostEyes,
}

impl SpriteSet {
    /// Images in one full animation cycle, per facing where the set is directional.
    pub fn image_count(self) -> u32 {
        match self {
            SpriteSet::PlayerAlive => 2,
            SpriteSet::PlayerDeath => 12,
            SpriteSet::GhostAlive => 2,
            SpriteSet::GhostScared => 2,
            SpriteSet::GhostEyes => 1,
        }
    }

    pub fn is_directional(self) -> bool {
        matches!(
            self,
            SpriteSet::PlayerAlive | SpriteSet::GhostAlive | SpriteSet::GhostEyes
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Won,
    Lost,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputCommand {
    Turn(Direction),
    Quit,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameConfig {
    #[serde(rename = "tickRate")]
    pub tick_rate: u32,
    #[serde(rename = "powerDurationMs")]
    pub power_duration_ms: u64,
    #[serde(rename = "releaseIntervalMs")]
    pub release_interval_ms: u64,
    #[serde(rename = "pursuitProbability")]
    pub pursuit_probability: f32,
    #[serde(rename = "playerSpeed")]
    pub player_speed: i32,
    #[serde(rename = "ghostSpeed")]
    pub ghost_speed: i32,
    #[serde(rename = "deadGhostSpeed")]
    pub dead_ghost_speed: i32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            power_duration_ms: POWER_DURATION_MS,
            release_interval_ms: RELEASE_INTERVAL_MS,
            pursuit_probability: PURSUIT_PROBABILITY,
            player_speed: PLAYER_SPEED,
            ghost_speed: GHOST_SPEED,
            dead_ghost_speed: DEAD_GHOST_SPEED,
        }
    }
}

impl GameConfig {
    /// Replaces speeds that would never land on a tile boundary with the defaults.
    pub fn sanitized(mut self) -> Self {
        if !speed_is_aligned(self.player_speed) {
            self.player_speed = PLAYER_SPEED;
        }
        if !speed_is_aligned(self.ghost_speed) {
            self.ghost_speed = GHOST_SPEED;
        }
        if !speed_is_aligned(self.dead_ghost_speed) {
            self.dead_ghost_speed = DEAD_GHOST_SPEED;
        }
        self.pursuit_probability = self.pursuit_probability.clamp(0.0, 1.0);
        self.tick_rate = self.tick_rate.max(1);
        self
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AnimationView {
    pub sprite: SpriteSet,
    #[serde(rename = "imageIdx")]
    pub image_idx: u32,
    #[serde(rename = "frameIdx")]
    pub frame_idx: u32,
    #[serde(rename = "completedCycle")]
    pub completed_cycle: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Collision box top-left, board pixels.
    pub x: i32,
    pub y: i32,
    pub tile: Tile,
    pub facing: Direction,
    pub mode: Mode,
    pub stuck: bool,
    pub animation: AnimationView,
}

#[derive(Clone, Debug, Serialize)]
pub struct WorldInit {
    pub rows: i32,
    pub cols: i32,
    #[serde(rename = "tileSize")]
    pub tile_size: i32,
    #[serde(rename = "spriteInset")]
    pub sprite_inset: i32,
    pub tiles: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    PickupEaten {
        tile: Tile,
        code: CellCode,
    },
    PowerModeStarted {
        #[serde(rename = "untilMs")]
        until_ms: u64,
    },
    PowerModeEnded,
    GhostReleased {
        ghost: GhostName,
    },
    GhostEaten {
        ghost: GhostName,
    },
    GhostRevived {
        ghost: GhostName,
    },
    PlayerDied {
        by: GhostName,
    },
    Won,
    Lost,
    Quit,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub status: SessionStatus,
    pub score: i32,
    #[serde(rename = "powerLeftMs")]
    pub power_left_ms: u64,
    #[serde(rename = "pickupsLeft")]
    pub pickups_left: usize,
    #[serde(rename = "bigPickupVisible")]
    pub big_pickup_visible: bool,
    pub entities: Vec<EntityView>,
    /// Events recorded since the previous draining snapshot.
    pub events: Vec<GameEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSummary {
    pub status: SessionStatus,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub ticks: u64,
    pub score: i32,
    #[serde(rename = "pickupsEaten")]
    pub pickups_eaten: usize,
    #[serde(rename = "pickupsLeft")]
    pub pickups_left: usize,
    #[serde(rename = "ghostsEaten")]
    pub ghosts_eaten: u32,
    #[serde(rename = "powerModes")]
    pub power_modes: u32,
}
