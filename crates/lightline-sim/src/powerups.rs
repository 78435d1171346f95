use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use rand::Rng;

use lightline_core::player::PlayerId;
use lightline_core::powerup::{PowerupId, PowerupInfo, PowerupKind};

use crate::config::Tuning;
use crate::snake::{Effect, Snake};

/// A live effect instance awaiting expiry. Ordered by `active_until`, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ActivePowerup {
    pub active_until: u64,
    pub id: PowerupId,
    pub kind: PowerupKind,
    pub activator: PlayerId,
}

/// The effect a kind leaves on each snake it targets. `None` for instant kinds.
pub fn effect_of(kind: PowerupKind, tuning: &Tuning) -> Option<Effect> {
    match kind {
        PowerupKind::SpeedSelf | PowerupKind::SpeedOthers => Some(Effect::Speed(tuning.speed_effect)),
        PowerupKind::SlowSelf | PowerupKind::SlowOthers => Some(Effect::Speed(-tuning.speed_effect)),
        PowerupKind::ThinSelf => Some(Effect::Fatness(-tuning.fatness_effect)),
        PowerupKind::FatOthers => Some(Effect::Fatness(tuning.fatness_effect)),
        PowerupKind::GhostSelf => Some(Effect::Ghost),
        PowerupKind::ReverseOthers => Some(Effect::Reverse),
        PowerupKind::Swap => None,
    }
}

/// Spawn ramp, placed items, and the expiry queue for one round.
#[derive(Debug, Clone)]
pub struct PowerupScheduler {
    chance: f32,
    next_id: PowerupId,
    placed: BTreeMap<PowerupId, PowerupInfo>,
    active: BinaryHeap<Reverse<ActivePowerup>>,
}

impl PowerupScheduler {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            chance: tuning.powerup_chance_base,
            next_id: 1,
            placed: BTreeMap::new(),
            active: BinaryHeap::new(),
        }
    }

    pub fn chance(&self) -> f32 {
        self.chance
    }

    pub fn placed(&self) -> impl Iterator<Item = &PowerupInfo> {
        self.placed.values()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Roll the spawn ramp once. On success a new power-up is placed and
    /// the ramp resets; otherwise the chance grows.
    pub fn maybe_spawn(&mut self, rng: &mut impl Rng, tuning: &Tuning) -> Option<PowerupInfo> {
        if self.placed.len() >= tuning.max_powerups {
            return None;
        }
        if rng.random::<f32>() >= self.chance {
            self.chance += tuning.powerup_chance_increment;
            return None;
        }
        self.chance = tuning.powerup_chance_base;
        let kind = PowerupKind::from_roll(rng.random_range(0..PowerupKind::total_weight()));
        let margin_x = tuning.powerup_margin.min(tuning.arena_width * 0.5);
        let margin_y = tuning.powerup_margin.min(tuning.arena_height * 0.5);
        let x = margin_x + rng.random::<f32>() * (tuning.arena_width - 2.0 * margin_x);
        let y = margin_y + rng.random::<f32>() * (tuning.arena_height - 2.0 * margin_y);
        Some(self.place(kind, x, y))
    }

    /// Put a specific power-up on the field.
    pub fn place(&mut self, kind: PowerupKind, x: f32, y: f32) -> PowerupInfo {
        let info = PowerupInfo {
            id: self.next_id,
            kind,
            x,
            y,
        };
        self.next_id += 1;
        self.placed.insert(info.id, info);
        info
    }

    /// Remove and return every placed power-up touched by a live snake.
    /// Each item goes to the first snake, in id order, that reaches it.
    pub fn collect_pickups<'a>(
        &mut self,
        snakes: impl IntoIterator<Item = &'a Snake>,
        tuning: &Tuning,
    ) -> Vec<(PowerupInfo, PlayerId)> {
        let mut picked = Vec::new();
        let r2 = tuning.pickup_radius * tuning.pickup_radius;
        for snake in snakes {
            if !snake.alive {
                continue;
            }
            let reach = snake.fatness * snake.fatness + r2;
            let hits: Vec<PowerupId> = self
                .placed
                .values()
                .filter(|p| {
                    let dx = snake.x - p.x;
                    let dy = snake.y - p.y;
                    dx * dx + dy * dy < reach
                })
                .map(|p| p.id)
                .collect();
            for id in hits {
                if let Some(info) = self.placed.remove(&id) {
                    picked.push((info, snake.id));
                }
            }
        }
        picked
    }

    /// Track a timed effect until `active_until`. Instant kinds are not queued.
    pub fn activate(
        &mut self,
        powerup: PowerupInfo,
        activator: PlayerId,
        active_until: u64,
    ) -> Option<ActivePowerup> {
        if !powerup.kind.is_timed() {
            return None;
        }
        let active = ActivePowerup {
            active_until,
            id: powerup.id,
            kind: powerup.kind,
            activator,
        };
        self.active.push(Reverse(active));
        Some(active)
    }

    /// Pop every effect with `active_until <= now`, earliest first.
    pub fn expire(&mut self, now: u64) -> Vec<ActivePowerup> {
        let mut expired = Vec::new();
        while let Some(Reverse(next)) = self.active.peek() {
            if next.active_until > now {
                break;
            }
            if let Some(Reverse(active)) = self.active.pop() {
                expired.push(active);
            }
        }
        expired
    }
}
