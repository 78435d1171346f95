use lightline_core::net::actions::{SnakeInit, SnakeUpdate, TurnDirection};
use lightline_core::player::PlayerId;
use lightline_core::powerup::PowerupId;
use lightline_core::trail::{TailEvent, TailPart};

use crate::config::Tuning;
use crate::geometry::{build_continuation_segment, build_start_segment, segment_end};

/// What a timed power-up does to the snake carrying it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Additive speed change in units per tick.
    Speed(f32),
    /// Additive width change.
    Fatness(f32),
    /// No tail emission and no collisions.
    Ghost,
    /// Steering is mirrored.
    Reverse,
}

/// A live effect, tagged with the power-up that caused it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedEffect {
    pub powerup: PowerupId,
    pub effect: Effect,
    pub active_until: u64,
}

impl TimedEffect {
    /// Strength in `[0, 1]`: full until the fade window, then linear to zero.
    fn weight(&self, now: u64, fade_ticks: u64) -> f32 {
        let remaining = self.active_until.saturating_sub(now);
        if fade_ticks == 0 || remaining >= fade_ticks {
            1.0
        } else {
            remaining as f32 / fade_ticks as f32
        }
    }
}

/// Result of one [`Snake::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub part: Option<TailPart>,
    /// Points to test for collisions this tick.
    pub probe: [[f32; 2]; 3],
}

/// One player's moving entity for the current round.
#[derive(Debug, Clone)]
pub struct Snake {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    /// Effective units per tick, derived from base speed and effects.
    pub speed: f32,
    /// Effective trail width, derived from base width and effects.
    pub fatness: f32,
    pub alive: bool,
    pub last_x: f32,
    pub last_y: f32,
    pub last_fatness: f32,
    pub hole_chance: f32,
    pub skip_tail_ticker: f32,
    pub tail_id: u32,
    /// Leading edge of the last emitted part while the strip is unbroken.
    pub last_segment_end: Option<[f32; 4]>,
    pub ghost: bool,
    pub reversed: bool,
    pub effects: Vec<TimedEffect>,
}

impl Snake {
    pub fn spawn(id: PlayerId, x: f32, y: f32, rotation: f32, tuning: &Tuning) -> Self {
        Self {
            id,
            x,
            y,
            rotation,
            speed: tuning.speed,
            fatness: tuning.fatness,
            alive: true,
            last_x: x,
            last_y: y,
            last_fatness: tuning.fatness,
            hole_chance: tuning.hole_chance_base,
            skip_tail_ticker: 0.0,
            tail_id: 0,
            last_segment_end: None,
            ghost: false,
            reversed: false,
            effects: Vec::new(),
        }
    }

    pub fn init(&self) -> SnakeInit {
        SnakeInit {
            id: self.id,
            x: self.x,
            y: self.y,
            rotation: self.rotation,
            fatness: self.fatness,
        }
    }

    pub fn update(&self, part: Option<&TailPart>) -> SnakeUpdate {
        SnakeUpdate {
            id: self.id,
            x: self.x,
            y: self.y,
            rotation: self.rotation,
            alive: self.alive,
            fatness: self.fatness,
            tail: TailEvent::from_part(part),
        }
    }

    /// Advance one tick: move, wrap, refresh effects, emit geometry.
    /// `r` is the uniform draw deciding whether a hole starts.
    pub fn step(&mut self, now: u64, r: f32, tuning: &Tuning) -> Step {
        if !self.alive {
            return Step {
                part: None,
                probe: [[self.x, self.y]; 3],
            };
        }
        self.x += self.rotation.sin() * self.speed;
        self.y -= self.rotation.cos() * self.speed;
        self.wrap(tuning);
        self.refresh_effects(now, tuning);
        let probe = self.probe_points();
        let part = self.create_tail_part(r, tuning);
        Step { part, probe }
    }

    /// Teleport across an edge once the head is fully outside the arena.
    fn wrap(&mut self, tuning: &Tuning) {
        let f = self.fatness;
        let mut wrapped = false;
        if self.x < -f {
            self.x = tuning.arena_width + f;
            self.last_x = self.x + 1.0;
            wrapped = true;
        } else if self.x > tuning.arena_width + f {
            self.x = -f;
            self.last_x = self.x - 1.0;
            wrapped = true;
        }
        if self.y < -f {
            self.y = tuning.arena_height + f;
            self.last_y = self.y + 1.0;
            wrapped = true;
        } else if self.y > tuning.arena_height + f {
            self.y = -f;
            self.last_y = self.y - 1.0;
            wrapped = true;
        }
        if wrapped {
            self.last_segment_end = None;
        }
    }

    /// Recompute effective values from base tuning plus faded effects.
    pub fn refresh_effects(&mut self, now: u64, tuning: &Tuning) {
        let mut speed = tuning.speed;
        let mut fatness = tuning.fatness;
        let mut ghost = false;
        let mut reversed = false;
        for effect in &self.effects {
            let w = effect.weight(now, tuning.effect_fade_ticks);
            match effect.effect {
                Effect::Speed(delta) => speed += delta * w,
                Effect::Fatness(delta) => fatness += delta * w,
                Effect::Ghost => ghost = true,
                Effect::Reverse => reversed = true,
            }
        }
        self.speed = speed.max(tuning.min_speed);
        self.fatness = fatness.max(tuning.min_fatness);
        self.ghost = ghost;
        self.reversed = reversed;
    }

    pub fn add_effect(&mut self, effect: TimedEffect) {
        self.effects.push(effect);
    }

    /// Drop every effect caused by `powerup`. Returns whether any was removed.
    pub fn remove_effect(&mut self, powerup: PowerupId) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.powerup != powerup);
        self.effects.len() != before
    }

    /// Tail emission state machine for one tick.
    pub fn create_tail_part(&mut self, r: f32, tuning: &Tuning) -> Option<TailPart> {
        let part = if self.ghost {
            self.last_segment_end = None;
            None
        } else if self.skip_tail_ticker > 0.0 {
            self.skip_tail_ticker -= 1.0;
            None
        } else if r > self.hole_chance {
            let (vertices, is_tail_start) = match self.last_segment_end {
                None => (
                    build_start_segment(
                        [self.last_x, self.last_y],
                        [self.x, self.y],
                        self.last_fatness,
                        self.fatness,
                    ),
                    true,
                ),
                Some(end) => (
                    build_continuation_segment(
                        [self.x, self.y],
                        self.fatness,
                        end,
                        [self.last_x, self.last_y],
                    ),
                    false,
                ),
            };
            self.hole_chance += tuning.hole_chance_increment;
            self.last_segment_end = Some(segment_end(&vertices));
            Some(TailPart {
                vertices,
                player_id: self.id,
                tail_id: self.tail_id,
                is_tail_start,
            })
        } else {
            self.skip_tail_ticker = self.fatness * tuning.hole_skip_multiplier;
            self.hole_chance = tuning.hole_chance_base;
            self.tail_id += 1;
            self.last_segment_end = None;
            None
        };
        self.last_x = self.x;
        self.last_y = self.y;
        self.last_fatness = self.fatness;
        part
    }

    /// One steering step. Mirrored while reversed.
    pub fn rotate(&mut self, direction: TurnDirection, tuning: &Tuning) {
        if !self.alive {
            return;
        }
        let sign = if self.reversed {
            -direction.sign()
        } else {
            direction.sign()
        };
        self.rotation = (self.rotation + sign * tuning.rotation_speed(self.fatness))
            .rem_euclid(std::f32::consts::TAU);
    }

    /// Points tested against tails: the leading corners of this tick's
    /// movement quad and the head centre. Only meaningful before the tail
    /// anchor advances, so [`step`](Self::step) captures it.
    pub fn probe_points(&self) -> [[f32; 2]; 3] {
        let v = build_start_segment(
            [self.last_x, self.last_y],
            [self.x, self.y],
            self.last_fatness,
            self.fatness,
        );
        [[v[2], v[3]], [v[4], v[5]], [self.x, self.y]]
    }

    /// Trailing strip edges excluded from self-collision.
    pub fn self_exclusion(&self) -> usize {
        (self.fatness / self.speed.max(f32::EPSILON)).ceil() as usize + 1
    }

    /// Move to another snake's place and heading, breaking the strip.
    pub fn teleport(&mut self, x: f32, y: f32, rotation: f32, last_x: f32, last_y: f32) {
        self.x = x;
        self.y = y;
        self.rotation = rotation;
        self.last_x = last_x;
        self.last_y = last_y;
        self.last_segment_end = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    fn tuning() -> Tuning {
        Tuning::from_config(&SimConfig {
            tick_rate: 64,
            base_speed: 64.0,
            base_fatness: 4.0,
            hole_chance_base: -0.5,
            hole_chance_increment: 0.1,
            hole_skip_multiplier: 2.0,
            effect_fade_ms: 0,
            ..SimConfig::default()
        })
    }

    fn snake(t: &Tuning) -> Snake {
        Snake::spawn(1, 100.0, 100.0, std::f32::consts::FRAC_PI_2, t)
    }

    // ================================================================
    // Motion
    // ================================================================

    #[test]
    fn moves_along_heading() {
        let t = tuning();
        let mut s = Snake::spawn(1, 100.0, 100.0, 0.0, &t);
        s.step(1, 1.0, &t);
        // Heading 0 moves toward -y.
        assert!((s.x - 100.0).abs() < 1e-4);
        assert!((s.y - 99.0).abs() < 1e-4);
    }

    #[test]
    fn dead_snake_stays_put() {
        let t = tuning();
        let mut s = snake(&t);
        s.alive = false;
        assert!(s.step(1, 1.0, &t).part.is_none());
        assert_eq!((s.x, s.y), (100.0, 100.0));
    }

    #[test]
    fn wraps_after_leaving_by_more_than_fatness() {
        let t = tuning();
        let mut s = Snake::spawn(1, t.arena_width + 4.5, 50.0, std::f32::consts::FRAC_PI_2, &t);
        s.last_segment_end = Some([0.0; 4]);
        s.step(1, 1.0, &t);
        assert!(s.x < 0.0, "x was {}", s.x);
        assert!(s.x >= -s.fatness);
    }

    #[test]
    fn wrap_forces_fresh_strip() {
        let t = tuning();
        let mut s = Snake::spawn(1, t.arena_width + 4.5, 50.0, std::f32::consts::FRAC_PI_2, &t);
        s.last_segment_end = Some([0.0; 4]);
        let part = s.step(1, 1.0, &t).part.expect("emits");
        assert!(part.is_tail_start);
        // The wrapped quad spans one unit, not the whole arena.
        let width = (part.vertices[2] - part.vertices[0]).abs();
        assert!(width <= 1.0 + 1e-4, "quad spans {width}");
    }

    #[test]
    fn rotation_direction_and_reverse() {
        let t = tuning();
        let mut s = snake(&t);
        let start = s.rotation;
        s.rotate(TurnDirection::Right, &t);
        assert!(s.rotation > start);

        let mut r = snake(&t);
        r.reversed = true;
        r.rotate(TurnDirection::Right, &t);
        assert!(r.rotation < start);

        let mut n = snake(&t);
        n.rotate(TurnDirection::None, &t);
        assert_eq!(n.rotation, start);
    }

    // ================================================================
    // Tail emission
    // ================================================================

    #[test]
    fn first_part_starts_strip_then_continues() {
        let t = tuning();
        let mut s = snake(&t);
        let a = s.step(1, 1.0, &t).part.expect("first part");
        let b = s.step(2, 1.0, &t).part.expect("second part");
        assert!(a.is_tail_start);
        assert!(!b.is_tail_start);
        assert_eq!(b.vertices[0..2], a.vertices[2..4]);
        assert_eq!(b.vertices[6..8], a.vertices[4..6]);
    }

    #[test]
    fn emission_raises_hole_chance() {
        let t = tuning();
        let mut s = snake(&t);
        s.step(1, 1.0, &t);
        assert!((s.hole_chance - (t.hole_chance_base + t.hole_chance_increment)).abs() < 1e-6);
    }

    #[test]
    fn hole_start_resets_state() {
        let t = tuning();
        let mut s = snake(&t);
        s.step(1, 1.0, &t);
        s.hole_chance = 0.5;
        assert!(s.step(2, 0.1, &t).part.is_none());
        assert_eq!(s.tail_id, 1);
        assert_eq!(s.skip_tail_ticker, 8.0);
        assert_eq!(s.hole_chance, t.hole_chance_base);
        assert!(s.last_segment_end.is_none());
    }

    #[test]
    fn ghost_emits_nothing_and_breaks_strip() {
        let t = tuning();
        let mut s = snake(&t);
        s.step(1, 1.0, &t);
        s.add_effect(TimedEffect {
            powerup: 3,
            effect: Effect::Ghost,
            active_until: 100,
        });
        assert!(s.step(2, 1.0, &t).part.is_none());
        assert!(s.last_segment_end.is_none());
        assert!(s.remove_effect(3));
        let part = s.step(3, 1.0, &t).part.expect("emits again");
        assert!(part.is_tail_start);
    }

    #[test]
    fn anchor_always_advances() {
        let t = tuning();
        let mut s = snake(&t);
        s.skip_tail_ticker = 3.0;
        s.step(1, 1.0, &t);
        assert_eq!((s.last_x, s.last_y), (s.x, s.y));
    }

    // ================================================================
    // Effects
    // ================================================================

    #[test]
    fn effects_are_derived_not_accumulated() {
        let t = tuning();
        let mut s = snake(&t);
        s.add_effect(TimedEffect {
            powerup: 1,
            effect: Effect::Fatness(4.0),
            active_until: 50,
        });
        s.refresh_effects(1, &t);
        s.refresh_effects(2, &t);
        assert_eq!(s.fatness, t.fatness + 4.0);
        s.remove_effect(1);
        s.refresh_effects(3, &t);
        assert_eq!(s.fatness, t.fatness);
    }

    #[test]
    fn shrink_is_floored() {
        let t = tuning();
        let mut s = snake(&t);
        for id in 0..5 {
            s.add_effect(TimedEffect {
                powerup: id,
                effect: Effect::Fatness(-4.0),
                active_until: 50,
            });
        }
        s.refresh_effects(1, &t);
        assert_eq!(s.fatness, t.min_fatness);
    }

    #[test]
    fn effect_fades_linearly() {
        let mut t = tuning();
        t.effect_fade_ticks = 10;
        let mut s = snake(&t);
        s.add_effect(TimedEffect {
            powerup: 1,
            effect: Effect::Fatness(4.0),
            active_until: 20,
        });
        s.refresh_effects(5, &t);
        assert_eq!(s.fatness, t.fatness + 4.0);
        s.refresh_effects(15, &t);
        assert!((s.fatness - (t.fatness + 2.0)).abs() < 1e-5);
    }

    #[test]
    fn probe_sits_on_leading_edge() {
        let t = tuning();
        let mut s = snake(&t);
        s.step(1, 1.0, &t);
        let step = s.step(2, 1.0, &t);
        let part = step.part.expect("continuation");
        assert_eq!(step.probe[0], [part.vertices[2], part.vertices[3]]);
        assert_eq!(step.probe[1], [part.vertices[4], part.vertices[5]]);
        assert_eq!(step.probe[2], [s.x, s.y]);
    }

    #[test]
    fn exclusion_grows_with_fatness() {
        let t = tuning();
        let mut s = snake(&t);
        let thin = s.self_exclusion();
        s.fatness = 12.0;
        assert!(s.self_exclusion() > thin);
    }
}
