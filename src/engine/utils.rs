use crate::constants::TILE_SIZE;
use crate::entity::Entity;
use crate::types::{EntityId, Tile};

/// Shortest horizontal distance between two x positions on a board that wraps
/// every `board_width` pixels.
pub(super) fn wrapped_delta(ax: i32, bx: i32, board_width: i32) -> i32 {
    if board_width <= 0 {
        return (ax - bx).abs();
    }
    let dx = (ax - bx).rem_euclid(board_width);
    dx.min(board_width - dx)
}

pub(super) fn tile_origin(tile: Tile) -> (i32, i32) {
    (tile.col * TILE_SIZE, tile.row * TILE_SIZE)
}

/// Ghosts leave the base in reverse roster order.
pub(super) fn release_order(entities: &[Entity]) -> Vec<EntityId> {
    entities
        .iter()
        .rev()
        .filter(|entity| !entity.is_player())
        .map(|entity| entity.id)
        .collect()
}
