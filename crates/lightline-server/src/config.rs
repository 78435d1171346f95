use serde::Deserialize;

use lightline_sim::SimConfig;

/// Default config file, read from the working directory.
pub const CONFIG_FILE: &str = "lightline.toml";

/// Top-level server configuration, loaded from `lightline.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub limits: LimitsConfig,
    /// Simulation settings every new room starts with.
    pub sim: SimConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            limits: LimitsConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub max_rooms: usize,
    /// Connections allowed in one room, players and spectators alike.
    pub max_room_connections: usize,
    pub ws_rate_limit_per_sec: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            max_rooms: 64,
            max_room_connections: 16,
            ws_rate_limit_per_sec: 120.0,
        }
    }
}

impl ServerConfig {
    /// Validate configuration. Invalid values are fatal.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }
        if let Err(problem) = self.check() {
            tracing::error!("{problem}");
            std::process::exit(1);
        }
    }

    /// The non-fatal half of [`validate`](Self::validate).
    pub fn check(&self) -> Result<(), String> {
        if self.limits.max_ws_connections == 0 {
            return Err("limits.max_ws_connections must be > 0".to_string());
        }
        if self.limits.max_rooms == 0 {
            return Err("limits.max_rooms must be > 0".to_string());
        }
        if self.limits.max_room_connections == 0 {
            return Err("limits.max_room_connections must be > 0".to_string());
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            return Err("limits.ws_rate_limit_per_sec must be > 0".to_string());
        }
        if self.sim.tick_rate == 0 {
            return Err("sim.tick_rate must be > 0".to_string());
        }
        if self.sim.max_players == 0 {
            return Err("sim.max_players must be > 0".to_string());
        }
        if self.sim.arena_width <= 0.0 || self.sim.arena_height <= 0.0 {
            return Err("sim arena dimensions must be > 0".to_string());
        }
        Ok(())
    }

    /// Load config from `LIGHTLINE_CONFIG` or `lightline.toml`, then apply
    /// env var overrides.
    pub fn load() -> Self {
        let path = std::env::var("LIGHTLINE_CONFIG").unwrap_or_else(|_| CONFIG_FILE.to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(path = %path, "Failed to parse config: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(path = %path, "No config file found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("LIGHTLINE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(val) = std::env::var("LIGHTLINE_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_ws_connections = n;
        }
        if let Ok(val) = std::env::var("LIGHTLINE_SEED")
            && let Ok(seed) = val.parse::<u64>()
        {
            config.sim.seed = Some(seed);
        }

        config
    }
}
