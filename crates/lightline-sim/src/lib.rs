pub mod arena;
pub mod config;
pub mod geometry;
pub mod observer;
pub mod powerups;
pub mod scoring;
pub mod snake;
pub mod snapshot;
pub mod tail;

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lightline_core::net::actions::{ClientAction, ScoreEntry, ServerAction, TurnDirection};
use lightline_core::net::connection::{ActionQueue, Connection};
use lightline_core::player::{ConnectionId, Player, PlayerColor, PlayerId, PlayerInfo};
use lightline_core::powerup::{PowerupInfo, PowerupKind, PowerupTarget};
use lightline_core::room::RoomPhase;

pub use config::{SimConfig, Tuning};
pub use observer::ObserverView;
pub use snapshot::RenderSnapshot;

use powerups::PowerupScheduler;
use snake::{Snake, TimedEffect};
use snapshot::{PowerupSprite, SnakeSprite};
use tail::TailStore;

/// Longest accepted player name, in characters.
pub const MAX_NAME_LEN: usize = 24;

/// Everything that lives for exactly one round.
#[derive(Debug)]
pub struct Round {
    pub number: u32,
    /// Running ticks completed in this round.
    pub tick: u64,
    pub tuning: Tuning,
    pub snakes: BTreeMap<PlayerId, Snake>,
    pub tails: TailStore,
    pub powerups: PowerupScheduler,
}

impl Round {
    pub fn alive(&self) -> Vec<PlayerId> {
        self.snakes
            .values()
            .filter(|s| s.alive)
            .map(|s| s.id)
            .collect()
    }
}

/// The room authority: owns players, observers and the round in play, and
/// is the only writer of simulation state.
pub struct Simulation {
    config: SimConfig,
    rng: StdRng,
    players: BTreeMap<PlayerId, Player>,
    observers: Vec<Box<dyn Connection<ServerAction>>>,
    phase: RoomPhase,
    round: Option<Round>,
    round_number: u32,
    next_player_id: PlayerId,
    /// Ticks left in the countdown or round-over pause.
    phase_ticks: u64,
    banner: Option<String>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            rng,
            players: BTreeMap::new(),
            observers: Vec::new(),
            phase: RoomPhase::Lobby,
            round: None,
            round_number: 0,
            next_player_id: 1,
            phase_ticks: 0,
            banner: None,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// Direct access to the round in play, for hosts and tests that stage
    /// positions.
    pub fn round_mut(&mut self) -> Option<&mut Round> {
        self.round.as_mut()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Attach an observer and bring it up to date with the lobby roster.
    pub fn add_observer(&mut self, conn: Box<dyn Connection<ServerAction>>) {
        conn.send(&ServerAction::Lobby {
            players: self.roster(),
        });
        tracing::info!(connection = conn.id(), "Observer attached");
        self.observers.push(conn);
    }

    /// Detach a connection: close its observer and drop its players. Their
    /// snakes die where they are.
    pub fn remove_connection(&mut self, id: ConnectionId) {
        self.observers.retain(|o| {
            if o.id() == id {
                o.close();
                false
            } else {
                true
            }
        });
        let gone: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| p.connection_id == id)
            .map(|p| p.id)
            .collect();
        for pid in &gone {
            self.players.remove(pid);
            if let Some(snake) = self.round.as_mut().and_then(|r| r.snakes.get_mut(pid)) {
                snake.alive = false;
            }
        }
        tracing::info!(connection = id, players_removed = gone.len(), "Connection detached");
        if !gone.is_empty() && self.phase == RoomPhase::Lobby {
            self.broadcast(&ServerAction::Lobby {
                players: self.roster(),
            });
        }
    }

    /// Close and forget every observer.
    pub fn close_observers(&mut self) {
        for observer in self.observers.drain(..) {
            observer.close();
        }
    }

    /// Apply every action queued since the last drain, in arrival order.
    pub fn drain(&mut self, queue: &ActionQueue<ClientAction>) {
        for (from, action) in queue.drain() {
            self.handle_action(from, action);
        }
    }

    pub fn handle_action(&mut self, from: ConnectionId, action: ClientAction) {
        match action {
            ClientAction::AddPlayer { name, color } => self.add_player(from, &name, color),
            ClientAction::Rotate {
                direction,
                snake_id,
            } => self.rotate(from, snake_id, direction),
            ClientAction::Start => self.start(from),
        }
    }

    fn add_player(&mut self, from: ConnectionId, name: &str, color: Option<PlayerColor>) {
        if self.phase != RoomPhase::Lobby {
            tracing::debug!(from, phase = ?self.phase, "Ignored ADD_PLAYER outside lobby");
            return;
        }
        if self.players.len() >= self.config.max_players {
            tracing::debug!(from, max = self.config.max_players, "Ignored ADD_PLAYER: room full");
            return;
        }
        let id = self.next_player_id;
        self.next_player_id += 1;
        let name: String = name.trim().chars().take(MAX_NAME_LEN).collect();
        let name = if name.is_empty() {
            format!("Player{id}")
        } else {
            name
        };
        let player = Player {
            id,
            name,
            color: color.unwrap_or_else(|| PlayerColor::for_index(self.players.len())),
            connection_id: from,
            score: 0,
        };
        tracing::info!(player_id = id, connection = from, name = %player.name, "Player joined");
        self.players.insert(id, player);
        self.broadcast(&ServerAction::Lobby {
            players: self.roster(),
        });
    }

    fn start(&mut self, from: ConnectionId) {
        if self.phase != RoomPhase::Lobby {
            tracing::debug!(from, phase = ?self.phase, "Ignored START: game in progress");
            return;
        }
        if self.players.is_empty() {
            tracing::debug!(from, "Ignored START: no players");
            return;
        }
        for player in self.players.values_mut() {
            player.score = 0;
        }
        self.round_number = 0;
        self.banner = None;
        tracing::info!(players = self.players.len(), "Match started");
        self.broadcast(&ServerAction::Started {
            players: self.roster(),
        });
        self.start_round();
    }

    fn rotate(&mut self, from: ConnectionId, snake_id: PlayerId, direction: TurnDirection) {
        let owned = self
            .players
            .get(&snake_id)
            .is_some_and(|p| p.connection_id == from);
        if !owned {
            tracing::debug!(from, snake_id, "Ignored ROTATE for a snake the sender does not own");
            return;
        }
        if self.phase != RoomPhase::Running {
            return;
        }
        if let Some(round) = self.round.as_mut()
            && let Some(snake) = round.snakes.get_mut(&snake_id)
        {
            snake.rotate(direction, &round.tuning);
        }
    }

    fn start_round(&mut self) {
        if self.players.is_empty() {
            tracing::info!("All players left, back to lobby");
            self.phase = RoomPhase::Lobby;
            self.round = None;
            return;
        }
        self.round_number += 1;
        let tuning = Tuning::from_config(&self.config);
        let spawns = arena::spawn_points(&mut self.rng, self.players.len(), &tuning);
        let snakes: BTreeMap<PlayerId, Snake> = self
            .players
            .keys()
            .zip(spawns)
            .map(|(&id, p)| (id, Snake::spawn(id, p.x, p.y, p.rotation, &tuning)))
            .collect();
        let inits = snakes.values().map(Snake::init).collect();

        self.phase = RoomPhase::Countdown;
        self.phase_ticks = tuning.countdown_ticks;
        self.banner = Some(snapshot::round_banner(self.round_number));
        self.round = Some(Round {
            number: self.round_number,
            tick: 0,
            powerups: PowerupScheduler::new(&tuning),
            tuning,
            snakes,
            tails: TailStore::new(),
        });
        tracing::info!(round = self.round_number, "Round starting");
        self.broadcast(&ServerAction::Round {
            round: self.round_number,
            snakes: inits,
            start_delay_ms: self.config.countdown_ms,
        });
    }

    /// Run one simulation tick.
    pub fn tick(&mut self) {
        match self.phase {
            RoomPhase::Lobby => {},
            RoomPhase::Countdown => {
                if self.phase_ticks > 0 {
                    self.phase_ticks -= 1;
                    return;
                }
                self.phase = RoomPhase::Running;
                self.banner = None;
                self.run_round_tick();
            },
            RoomPhase::Running => self.run_round_tick(),
            RoomPhase::RoundOver => {
                if self.phase_ticks > 0 {
                    self.phase_ticks -= 1;
                    return;
                }
                self.start_round();
            },
        }
    }

    fn run_round_tick(&mut self) {
        let Some(round) = self.round.as_mut() else {
            return;
        };
        round.tick += 1;
        let now = round.tick;
        let tuning = &round.tuning;

        // Expired effects never take part in the tick that expires them.
        for active in round.powerups.expire(now) {
            for snake in round.snakes.values_mut() {
                snake.remove_effect(active.id);
            }
            tracing::trace!(powerup = active.id, kind = ?active.kind, now, "Power-up expired");
        }

        let mut steps = Vec::with_capacity(round.snakes.len());
        for snake in round.snakes.values_mut() {
            let r = self.rng.random::<f32>();
            steps.push((snake.id, snake.step(now, r, tuning)));
        }
        for (_, step) in &steps {
            if let Some(part) = step.part {
                round.tails.add(part);
            }
        }

        let mut crashed = Vec::new();
        for (id, step) in &steps {
            let Some(snake) = round.snakes.get(id) else {
                continue;
            };
            if !snake.alive || snake.ghost {
                continue;
            }
            if let Some(owner) = round.tails.hit(&step.probe, *id, snake.self_exclusion()) {
                tracing::debug!(player_id = id, hit = owner, tick = now, "Snake crashed");
                crashed.push(*id);
            }
        }
        for id in &crashed {
            if let Some(snake) = round.snakes.get_mut(id) {
                snake.alive = false;
            }
        }

        let mut outgoing = Vec::new();
        let picked = round.powerups.collect_pickups(round.snakes.values(), tuning);
        for (info, activator) in &picked {
            apply_powerup(round, &mut self.rng, *info, *activator, now);
            outgoing.push(ServerAction::PowerupFetch {
                id: info.id,
                player_id: *activator,
            });
        }
        if let Some(powerup) = round.powerups.maybe_spawn(&mut self.rng, &round.tuning) {
            outgoing.push(ServerAction::PowerupSpawn { powerup });
        }

        let updates = steps
            .iter()
            .filter_map(|(id, step)| round.snakes.get(id).map(|s| s.update(step.part.as_ref())))
            .collect();
        let alive = round.alive();
        let contestants = round.snakes.len();

        self.broadcast(&ServerAction::UpdatePlayers {
            tick: now,
            snakes: updates,
        });
        for action in &outgoing {
            self.broadcast(action);
        }

        if scoring::round_over(alive.len(), contestants) {
            self.end_round(scoring::round_winner(&alive, contestants));
        }
    }

    fn end_round(&mut self, winner: Option<PlayerId>) {
        scoring::award(&mut self.players, winner);
        let round = self.round_number;
        tracing::info!(round, winner = ?winner, "Round over");
        self.broadcast(&ServerAction::RoundEnd {
            round,
            winner,
            scores: self.scores(),
        });

        if let Some(champion) = scoring::match_winner(&self.players, self.config.score_to_win) {
            tracing::info!(winner = champion, "Match over");
            self.banner = Some(snapshot::match_end_banner(self.name_of(Some(champion))));
            self.phase = RoomPhase::Lobby;
            self.broadcast(&ServerAction::End {
                winner: Some(champion),
            });
            self.broadcast(&ServerAction::Lobby {
                players: self.roster(),
            });
        } else {
            self.banner = Some(snapshot::round_end_banner(round, self.name_of(winner)));
            self.phase = RoomPhase::RoundOver;
            self.phase_ticks = self.round.as_ref().map_or(0, |r| r.tuning.round_over_ticks);
        }
    }

    /// Immutable view of the last completed tick.
    pub fn snapshot(&self) -> RenderSnapshot {
        let tick = self.round.as_ref().map_or(0, |r| r.tick);
        let mut snap = RenderSnapshot::new(
            tick,
            self.round_number,
            self.phase,
            self.config.arena_width,
            self.config.arena_height,
        );
        if let Some(round) = &self.round {
            for s in round.snakes.values() {
                snap.push_snake(SnakeSprite {
                    id: s.id,
                    x: s.x,
                    y: s.y,
                    rotation: s.rotation,
                    size: s.fatness,
                    color: self.color_of(s.id),
                    alive: s.alive,
                });
            }
            for part in round.tails.parts() {
                snap.push_part(part, self.color_of(part.player_id));
            }
            for p in round.powerups.placed() {
                snap.push_powerup(PowerupSprite {
                    id: p.id,
                    kind: p.kind,
                    x: p.x,
                    y: p.y,
                    radius: round.tuning.pickup_radius,
                });
            }
        }
        if let Some(text) = &self.banner {
            snap.push_banner(text.clone());
        }
        snap
    }

    fn broadcast(&self, action: &ServerAction) {
        for conn in &self.observers {
            conn.send(action);
        }
    }

    fn roster(&self) -> Vec<PlayerInfo> {
        self.players.values().map(Player::info).collect()
    }

    fn scores(&self) -> Vec<ScoreEntry> {
        self.players
            .values()
            .map(|p| ScoreEntry {
                player_id: p.id,
                score: p.score,
            })
            .collect()
    }

    fn name_of(&self, id: Option<PlayerId>) -> Option<&str> {
        id.and_then(|id| self.players.get(&id))
            .map(|p| p.name.as_str())
    }

    fn color_of(&self, id: PlayerId) -> PlayerColor {
        self.players
            .get(&id)
            .map(|p| p.color)
            .unwrap_or_default()
    }
}

/// Apply a picked-up power-up to its targets and queue its expiry.
fn apply_powerup(
    round: &mut Round,
    rng: &mut impl Rng,
    info: PowerupInfo,
    activator: PlayerId,
    now: u64,
) {
    if info.kind == PowerupKind::Swap {
        swap_with_random_rival(round, rng, activator);
        return;
    }
    let Some(effect) = powerups::effect_of(info.kind, &round.tuning) else {
        return;
    };
    let active_until = now + round.tuning.powerup_duration_ticks;
    for snake in round.snakes.values_mut() {
        let targeted = match info.kind.target() {
            PowerupTarget::Activator => snake.id == activator,
            PowerupTarget::Others => snake.id != activator && snake.alive,
        };
        if targeted {
            snake.add_effect(TimedEffect {
                powerup: info.id,
                effect,
                active_until,
            });
        }
    }
    round.powerups.activate(info, activator, active_until);
    tracing::debug!(powerup = info.id, kind = ?info.kind, activator, active_until, "Power-up active");
}

/// Exchange places and headings with a random living rival.
fn swap_with_random_rival(round: &mut Round, rng: &mut impl Rng, activator: PlayerId) {
    let rivals: Vec<PlayerId> = round
        .snakes
        .values()
        .filter(|s| s.alive && s.id != activator)
        .map(|s| s.id)
        .collect();
    if rivals.is_empty() {
        return;
    }
    let rival = rivals[rng.random_range(0..rivals.len())];
    let (Some(a), Some(b)) = (
        round.snakes.get(&activator).cloned(),
        round.snakes.get(&rival).cloned(),
    ) else {
        return;
    };
    if let Some(s) = round.snakes.get_mut(&activator) {
        s.teleport(b.x, b.y, b.rotation, b.last_x, b.last_y);
    }
    if let Some(s) = round.snakes.get_mut(&rival) {
        s.teleport(a.x, a.y, a.rotation, a.last_x, a.last_y);
    }
    tracing::debug!(activator, rival, "Swapped positions");
}
