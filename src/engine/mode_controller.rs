use super::*;

/// Session timers: the staggered release schedule and the power-mode deadline.
/// Both are measured on the engine clock (`elapsed_ms`) and reset only by
/// building a new engine.
#[derive(Clone, Debug, Default)]
pub struct ModeController {
    power_until_ms: Option<u64>,
    release_queue: VecDeque<(u64, EntityId)>,
}

impl ModeController {
    /// `release_order[i]` is released at `i * interval_ms`.
    pub fn new(release_order: &[EntityId], interval_ms: u64) -> Self {
        let release_queue = release_order
            .iter()
            .enumerate()
            .map(|(idx, id)| (idx as u64 * interval_ms, *id))
            .collect();
        Self {
            power_until_ms: None,
            release_queue,
        }
    }

    pub fn due_releases(&mut self, now_ms: u64) -> Vec<EntityId> {
        let mut due = Vec::new();
        while let Some(&(at_ms, id)) = self.release_queue.front() {
            if at_ms > now_ms {
                break;
            }
            self.release_queue.pop_front();
            due.push(id);
        }
        due
    }

    pub fn pending_releases(&self) -> usize {
        self.release_queue.len()
    }

    /// Sets the deadline to `now_ms + duration_ms`, replacing any running one.
    pub fn start_power(&mut self, now_ms: u64, duration_ms: u64) -> u64 {
        let until = now_ms.saturating_add(duration_ms);
        self.power_until_ms = Some(until);
        until
    }

    /// True exactly once per power mode: on the first check at or past the deadline.
    pub fn power_expired(&mut self, now_ms: u64) -> bool {
        match self.power_until_ms {
            Some(until) if now_ms >= until => {
                self.power_until_ms = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_power_active(&self) -> bool {
        self.power_until_ms.is_some()
    }

    pub fn power_left_ms(&self, now_ms: u64) -> u64 {
        self.power_until_ms
            .map(|until| until.saturating_sub(now_ms))
            .unwrap_or(0)
    }
}

impl GameEngine {
    pub(super) fn update_timers(&mut self) {
        let now_ms = self.elapsed_ms;
        for id in self.modes.due_releases(now_ms) {
            let Some(ghost) = self.entities.get_mut(id.0) else {
                continue;
            };
            ghost.apply(ModeEvent::Released);
            if let Some(name) = ghost.ghost_name() {
                self.events.push(GameEvent::GhostReleased { ghost: name });
            }
        }

        if self.modes.power_expired(now_ms) {
            for ghost in self.ghosts_mut() {
                ghost.apply(ModeEvent::PowerExpired);
            }
            self.events.push(GameEvent::PowerModeEnded);
        }
    }

    pub(super) fn start_power_mode(&mut self) {
        let until_ms = self
            .modes
            .start_power(self.elapsed_ms, self.config.power_duration_ms);
        for ghost in self.ghosts_mut() {
            ghost.apply(ModeEvent::PowerStarted);
        }
        self.stats.power_modes += 1;
        self.events.push(GameEvent::PowerModeStarted { until_ms });
    }
}
