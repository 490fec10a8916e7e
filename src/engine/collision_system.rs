use super::*;

/// Box overlap on the horizontally wrapping board.
pub(super) fn overlaps(a: &Entity, b: &Entity, board_width: i32) -> bool {
    wrapped_delta(a.x, b.x, board_width) < HIT_DISTANCE && (a.y - b.y).abs() < HIT_DISTANCE
}

impl GameEngine {
    /// Player against one AI entity, run right after that entity moved.
    pub(super) fn resolve_ghost_collision(&mut self, ghost_idx: usize) {
        let board_width = self.world.board_width();
        let Some(ghost) = self.entities.get(ghost_idx) else {
            return;
        };
        let player = &self.entities[PLAYER_IDX];
        if player.mode == Mode::Dead || !overlaps(player, ghost, board_width) {
            return;
        }
        let Some(name) = ghost.ghost_name() else {
            return;
        };
        let mode = ghost.mode;

        match mode {
            Mode::Normal | Mode::FrozenAtBase => {
                self.entities[PLAYER_IDX].apply(ModeEvent::Killed);
                self.events.push(GameEvent::PlayerDied { by: name });
            }
            Mode::Fleeing => {
                self.entities[ghost_idx].apply(ModeEvent::Killed);
                self.score += GHOST_EATEN_SCORE;
                self.stats.ghosts_eaten += 1;
                self.events.push(GameEvent::GhostEaten { ghost: name });
            }
            Mode::Dead => {}
        }
    }

    /// Clears the pickup under the player, if the player's centre is close
    /// enough to the centre of that tile. A box one tile wide can only reach
    /// the tile holding its centre.
    pub(super) fn resolve_pickups(&mut self) {
        let cols = self.world.grid.cols();
        let board_width = self.world.board_width();
        let player = &self.entities[PLAYER_IDX];
        if player.mode == Mode::Dead {
            return;
        }

        let tile = player.middle_tile(cols);
        let Ok(code) = self.world.grid.cell_at(tile.row, tile.col) else {
            return;
        };
        if !code.is_pickup() {
            return;
        }
        // box origin against tile origin is the same distance as centre against centre
        let (tile_x, tile_y) = tile_origin(tile);
        let dx = wrapped_delta(player.x, tile_x, board_width);
        let dy = (player.y - tile_y).abs();
        if dx > PICKUP_REACH || dy > PICKUP_REACH {
            return;
        }
        if self
            .world
            .grid
            .set_cell(tile.row, tile.col, CellCode::Empty)
            .is_err()
        {
            return;
        }

        self.stats.pickups_eaten += 1;
        self.events.push(GameEvent::PickupEaten { tile, code });
        if code == CellCode::BigPickup {
            self.score += BIG_PICKUP_SCORE;
            self.start_power_mode();
        } else {
            self.score += SMALL_PICKUP_SCORE;
        }
    }
}
