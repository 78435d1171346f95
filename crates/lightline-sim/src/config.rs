use serde::{Deserialize, Serialize};

use lightline_core::net::protocol::DEFAULT_TICK_RATE_HZ;

/// Data-driven configuration for a room's simulation.
///
/// Rates are expressed per second; [`Tuning`] converts them to per-tick
/// values once, when a round starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    pub arena_width: f32,
    pub arena_height: f32,
    /// Base snake speed (units/s).
    pub base_speed: f32,
    /// Lower bound on effective speed (units/s).
    pub min_speed: f32,
    /// Base trail width.
    pub base_fatness: f32,
    /// Lower bound on effective trail width.
    pub min_fatness: f32,
    /// Hole probability right after a hole. Negative values give a grace period.
    pub hole_chance_base: f32,
    /// Hole probability added for every emitted tail part.
    pub hole_chance_increment: f32,
    /// Hole length in ticks per unit of fatness.
    pub hole_skip_multiplier: f32,
    /// Turn rate numerator (rad/s times fatness).
    pub turn_coefficient: f32,
    /// Turn rate floor (rad/s).
    pub turn_offset: f32,
    /// Per-tick spawn probability right after a spawn.
    pub powerup_chance_base: f32,
    /// Spawn probability added on every tick without a spawn.
    pub powerup_chance_increment: f32,
    /// Most power-ups that may lie on the field at once.
    pub max_powerups: usize,
    pub pickup_radius: f32,
    /// Distance from the arena edge kept free of power-ups.
    pub powerup_margin: f32,
    pub powerup_duration_ms: u64,
    /// Length of the linear fade at the end of each timed effect.
    pub effect_fade_ms: u64,
    /// Speed change applied by speed and slow power-ups (units/s).
    pub speed_effect: f32,
    /// Width change applied by thin and fat power-ups.
    pub fatness_effect: f32,
    /// Distance from the arena edge kept free of spawns.
    pub spawn_margin: f32,
    pub countdown_ms: u64,
    pub round_over_ms: u64,
    /// Round points needed to win the match.
    pub score_to_win: u32,
    pub max_players: usize,
    /// RNG seed. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE_HZ,
            arena_width: 1024.0,
            arena_height: 768.0,
            base_speed: 96.0,
            min_speed: 32.0,
            base_fatness: 4.0,
            min_fatness: 1.0,
            hole_chance_base: -0.2,
            hole_chance_increment: 0.0006,
            hole_skip_multiplier: 2.0,
            turn_coefficient: 6.0,
            turn_offset: 1.5,
            powerup_chance_base: 0.0,
            powerup_chance_increment: 0.000_01,
            max_powerups: 4,
            pickup_radius: 10.0,
            powerup_margin: 40.0,
            powerup_duration_ms: 6_000,
            effect_fade_ms: 1_000,
            speed_effect: 48.0,
            fatness_effect: 4.0,
            spawn_margin: 120.0,
            countdown_ms: 2_000,
            round_over_ms: 3_000,
            score_to_win: 5,
            max_players: 8,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("LIGHTLINE_SIM_CONFIG")
            && let Ok(contents) = std::fs::read_to_string(&path)
        {
            match toml::from_str::<Self>(&contents) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path, error = %e, "Ignoring unparsable sim config"),
            }
        }
        if let Ok(contents) = std::fs::read_to_string("config/sim.toml")
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        Self::default()
    }

    /// Same config with a fixed RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Per-tick constants derived from a [`SimConfig`] at round start.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    pub tick_rate: u32,
    pub arena_width: f32,
    pub arena_height: f32,
    /// Units per tick.
    pub speed: f32,
    pub min_speed: f32,
    pub speed_effect: f32,
    pub fatness: f32,
    pub min_fatness: f32,
    pub fatness_effect: f32,
    pub hole_chance_base: f32,
    pub hole_chance_increment: f32,
    pub hole_skip_multiplier: f32,
    /// Radians per tick, before division by fatness.
    pub turn_coefficient: f32,
    /// Radians per tick.
    pub turn_offset: f32,
    pub powerup_chance_base: f32,
    pub powerup_chance_increment: f32,
    pub max_powerups: usize,
    pub pickup_radius: f32,
    pub powerup_margin: f32,
    pub powerup_duration_ticks: u64,
    pub effect_fade_ticks: u64,
    pub spawn_margin: f32,
    pub countdown_ticks: u64,
    pub round_over_ticks: u64,
}

impl Tuning {
    pub fn from_config(config: &SimConfig) -> Self {
        let rate = config.tick_rate.max(1);
        let per_tick = 1.0 / rate as f32;
        let ticks = |ms: u64| ms * u64::from(rate) / 1000;
        Self {
            tick_rate: rate,
            arena_width: config.arena_width,
            arena_height: config.arena_height,
            speed: config.base_speed * per_tick,
            min_speed: config.min_speed * per_tick,
            speed_effect: config.speed_effect * per_tick,
            fatness: config.base_fatness.max(config.min_fatness),
            min_fatness: config.min_fatness.max(f32::EPSILON),
            fatness_effect: config.fatness_effect,
            hole_chance_base: config.hole_chance_base,
            hole_chance_increment: config.hole_chance_increment,
            hole_skip_multiplier: config.hole_skip_multiplier,
            turn_coefficient: config.turn_coefficient * per_tick,
            turn_offset: config.turn_offset * per_tick,
            powerup_chance_base: config.powerup_chance_base,
            powerup_chance_increment: config.powerup_chance_increment,
            max_powerups: config.max_powerups,
            pickup_radius: config.pickup_radius,
            powerup_margin: config.powerup_margin,
            powerup_duration_ticks: ticks(config.powerup_duration_ms).max(1),
            effect_fade_ticks: ticks(config.effect_fade_ms),
            spawn_margin: config.spawn_margin,
            countdown_ticks: ticks(config.countdown_ms),
            round_over_ticks: ticks(config.round_over_ms),
        }
    }

    /// Turn step for one `ROTATE` at the given width.
    pub fn rotation_speed(&self, fatness: f32) -> f32 {
        self.turn_coefficient / fatness.max(self.min_fatness) + self.turn_offset
    }
}
