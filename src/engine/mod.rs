use std::collections::VecDeque;

use crate::constants::{
    BIG_PICKUP_BLINK_TICKS, BIG_PICKUP_SCORE, GHOST_EATEN_SCORE, HIT_DISTANCE, PICKUP_REACH,
    SMALL_PICKUP_SCORE,
};
use crate::entity::Entity;
use crate::rng::Rng;
use crate::types::{
    CellCode, EntityId, GameConfig, GameEvent, GameSummary, GhostName, InputCommand, Mode,
    ModeEvent, SessionStatus, Snapshot, WorldInit,
};
use crate::world::{classic_world, to_world_init, World};

mod collision_system;
mod mode_controller;
mod utils;

pub use self::mode_controller::ModeController;
use self::utils::{release_order, tile_origin, wrapped_delta};

/// The player is always the first entity.
pub const PLAYER_IDX: usize = 0;

#[derive(Clone, Debug, Default)]
struct SessionStats {
    pickups_eaten: usize,
    ghosts_eaten: u32,
    power_modes: u32,
}

/// One play session: grid, entities, timers and score, advanced one tick at a
/// time by `step`.
#[derive(Clone, Debug)]
pub struct GameEngine {
    pub config: GameConfig,
    pub world: World,

    rng: Rng,
    entities: Vec<Entity>,
    modes: ModeController,
    pending_input: VecDeque<InputCommand>,
    events: Vec<GameEvent>,
    stats: SessionStats,

    status: SessionStatus,
    score: i32,
    elapsed_ms: u64,
    tick_counter: u64,
}

impl GameEngine {
    pub fn new(world: World, config: GameConfig, seed: u32) -> Self {
        let config = config.sanitized();
        let player_id = EntityId(PLAYER_IDX);
        let mut entities = vec![Entity::player(
            player_id,
            world.player_spawn,
            config.player_speed,
        )];
        for name in GhostName::ROSTER {
            let id = EntityId(entities.len());
            entities.push(Entity::ghost(
                id,
                name,
                world.ghost_spawn,
                config.ghost_speed,
                config.dead_ghost_speed,
                Some(player_id),
            ));
        }
        let modes = ModeController::new(&release_order(&entities), config.release_interval_ms);

        Self {
            config,
            world,
            rng: Rng::new(seed),
            entities,
            modes,
            pending_input: VecDeque::new(),
            events: Vec::new(),
            stats: SessionStats::default(),
            status: SessionStatus::Running,
            score: 0,
            elapsed_ms: 0,
            tick_counter: 0,
        }
    }

    pub fn classic(seed: u32) -> Self {
        Self::new(classic_world(), GameConfig::default(), seed)
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_ended(&self) -> bool {
        self.status != SessionStatus::Running
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn player(&self) -> &Entity {
        &self.entities[PLAYER_IDX]
    }

    pub fn get_world_init(&self) -> WorldInit {
        to_world_init(&self.world.grid)
    }

    /// Queues a command for the start of the next tick.
    pub fn receive_input(&mut self, command: InputCommand) {
        self.pending_input.push_back(command);
    }

    pub fn step(&mut self, dt_ms: u64) {
        if self.is_ended() {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);

        self.process_input();
        if self.is_ended() {
            return;
        }
        if !self.world.grid.has_pickups() {
            self.finish(SessionStatus::Won);
            return;
        }

        self.update_timers();
        self.update_player();
        self.update_ghosts();
        self.resolve_pickups();
        self.advance_animations();
        self.check_game_over();
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let cols = self.world.grid.cols();
        Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            status: self.status,
            score: self.score,
            power_left_ms: self.modes.power_left_ms(self.elapsed_ms),
            pickups_left: self.world.grid.pickup_count(),
            big_pickup_visible: (self.tick_counter / BIG_PICKUP_BLINK_TICKS) % 2 == 0,
            entities: self.entities.iter().map(|e| e.view(cols)).collect(),
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        }
    }

    pub fn build_summary(&self) -> GameSummary {
        GameSummary {
            status: self.status,
            duration_ms: self.elapsed_ms,
            ticks: self.tick_counter,
            score: self.score,
            pickups_eaten: self.stats.pickups_eaten,
            pickups_left: self.world.grid.pickup_count(),
            ghosts_eaten: self.stats.ghosts_eaten,
            power_modes: self.stats.power_modes,
        }
    }

    fn process_input(&mut self) {
        while let Some(command) = self.pending_input.pop_front() {
            match command {
                InputCommand::Turn(dir) => {
                    self.entities[PLAYER_IDX].queued = Some(dir);
                }
                InputCommand::Quit => {
                    self.pending_input.clear();
                    self.finish(SessionStatus::Quit);
                    return;
                }
            }
        }
    }

    fn update_player(&mut self) {
        let player = &mut self.entities[PLAYER_IDX];
        if player.mode == Mode::Dead {
            return;
        }
        player.apply_queued_turn(&self.world.grid);
        player.step(&self.world.grid);
    }

    /// Decide, move, then collide, one AI entity at a time. Everything stops
    /// as soon as the player is dead.
    fn update_ghosts(&mut self) {
        let cols = self.world.grid.cols();
        for idx in 0..self.entities.len() {
            if idx == PLAYER_IDX {
                continue;
            }
            if self.player_is_dead() {
                return;
            }

            let target = self.entities[idx]
                .target
                .and_then(|id| self.entities.get(id.0))
                .map(|target| target.middle_tile(cols));
            let ghost = &mut self.entities[idx];
            let revived = ghost.decide(
                &self.world.grid,
                target,
                self.config.pursuit_probability,
                &mut self.rng,
            );
            ghost.step(&self.world.grid);
            if revived {
                if let Some(name) = ghost.ghost_name() {
                    self.events.push(GameEvent::GhostRevived { ghost: name });
                }
            }

            self.resolve_ghost_collision(idx);
        }
    }

    /// Frozen ghosts keep their frame while the death animation plays.
    fn advance_animations(&mut self) {
        let player_dead = self.player_is_dead();
        for entity in &mut self.entities {
            if player_dead && !entity.is_player() {
                continue;
            }
            entity.advance_animation();
        }
    }

    fn check_game_over(&mut self) {
        if !self.world.grid.has_pickups() {
            self.finish(SessionStatus::Won);
            return;
        }
        let player = self.player();
        if player.mode == Mode::Dead && player.animation.completed_cycle {
            self.finish(SessionStatus::Lost);
        }
    }

    fn finish(&mut self, status: SessionStatus) {
        self.status = status;
        let event = match status {
            SessionStatus::Won => GameEvent::Won,
            SessionStatus::Lost => GameEvent::Lost,
            SessionStatus::Quit => GameEvent::Quit,
            SessionStatus::Running => return,
        };
        self.events.push(event);
    }

    fn player_is_dead(&self) -> bool {
        self.player().mode == Mode::Dead
    }

    fn ghosts_mut(&mut self) -> impl Iterator<Item = &mut Entity> + '_ {
        self.entities.iter_mut().filter(|entity| !entity.is_player())
    }
}
