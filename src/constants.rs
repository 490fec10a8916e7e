pub const TICK_RATE: u32 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

/// Collision box edge, in pixels. Every tile is square.
pub const TILE_SIZE: i32 = 40;
/// Sprites are drawn this many pixels up and left of the collision box.
pub const SPRITE_INSET: i32 = 4;
pub const SPRITE_SIZE: i32 = TILE_SIZE + 3 * SPRITE_INSET;

pub const PLAYER_SPEED: i32 = 4;
pub const GHOST_SPEED: i32 = 4;
pub const DEAD_GHOST_SPEED: i32 = 8;

pub const POWER_DURATION_MS: u64 = 5_000;
pub const RELEASE_INTERVAL_MS: u64 = 5_000;
pub const PURSUIT_PROBABILITY: f32 = 0.8;

/// Two entities touch when both axis distances are below this.
pub const HIT_DISTANCE: i32 = 20;
/// The player eats a pickup when its box centre is this close to the tile centre.
pub const PICKUP_REACH: i32 = 12;

pub const SMALL_PICKUP_SCORE: i32 = 10;
pub const BIG_PICKUP_SCORE: i32 = 50;
pub const GHOST_EATEN_SCORE: i32 = 200;

pub const FRAMES_PER_IMAGE: u32 = 6;
pub const DEATH_FRAMES_PER_IMAGE: u32 = 12;
pub const BIG_PICKUP_BLINK_TICKS: u64 = 30;

pub fn speed_is_aligned(speed: i32) -> bool {
    speed > 0 && TILE_SIZE % speed == 0
}
