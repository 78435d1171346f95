use std::collections::BTreeMap;
use std::sync::Mutex;

use lightline_core::net::actions::{ServerAction, SnakeUpdate};
use lightline_core::net::connection::ActionSink;
use lightline_core::player::{ConnectionId, PlayerId, PlayerInfo};
use lightline_core::powerup::{PowerupId, PowerupInfo};
use lightline_core::room::RoomPhase;
use lightline_core::trail::{TailEvent, TailPart};

use crate::config::SimConfig;
use crate::snapshot::{
    PowerupSprite, RenderSnapshot, SnakeSprite, match_end_banner, round_banner, round_end_banner,
};

#[derive(Debug, Default)]
struct Mirror {
    phase: Option<RoomPhase>,
    round: u32,
    tick: u64,
    players: BTreeMap<PlayerId, PlayerInfo>,
    snakes: BTreeMap<PlayerId, SnakeUpdate>,
    parts: Vec<TailPart>,
    powerups: BTreeMap<PowerupId, PowerupInfo>,
    banner: Option<String>,
    winner: Option<PlayerId>,
}

impl Mirror {
    fn name_of(&self, id: Option<PlayerId>) -> Option<&str> {
        id.and_then(|id| self.players.get(&id)).map(|p| p.name.as_str())
    }

    fn apply(&mut self, action: ServerAction) {
        match action {
            ServerAction::Started { players } => {
                self.players = players.into_iter().map(|p| (p.id, p)).collect();
                self.banner = None;
                self.winner = None;
            },
            ServerAction::Lobby { players } => {
                self.players = players.into_iter().map(|p| (p.id, p)).collect();
                self.phase = Some(RoomPhase::Lobby);
            },
            ServerAction::Round {
                round,
                snakes,
                start_delay_ms: _,
            } => {
                self.round = round;
                self.tick = 0;
                self.parts.clear();
                self.powerups.clear();
                self.snakes = snakes
                    .into_iter()
                    .map(|s| {
                        let update = SnakeUpdate {
                            id: s.id,
                            x: s.x,
                            y: s.y,
                            rotation: s.rotation,
                            alive: true,
                            fatness: s.fatness,
                            tail: TailEvent::Gap,
                        };
                        (s.id, update)
                    })
                    .collect();
                self.phase = Some(RoomPhase::Countdown);
                self.banner = Some(round_banner(round));
            },
            ServerAction::UpdatePlayers { tick, snakes } => {
                self.tick = tick;
                self.phase = Some(RoomPhase::Running);
                self.banner = None;
                for update in snakes {
                    if let Some(part) = update.tail.into_part(update.id) {
                        self.parts.push(part);
                    }
                    self.snakes.insert(update.id, update);
                }
            },
            ServerAction::PowerupSpawn { powerup } => {
                self.powerups.insert(powerup.id, powerup);
            },
            ServerAction::PowerupFetch { id, player_id: _ } => {
                self.powerups.remove(&id);
            },
            ServerAction::RoundEnd {
                round,
                winner,
                scores,
            } => {
                for entry in scores {
                    if let Some(p) = self.players.get_mut(&entry.player_id) {
                        p.score = entry.score;
                    }
                }
                self.phase = Some(RoomPhase::RoundOver);
                self.banner = Some(round_end_banner(round, self.name_of(winner)));
            },
            ServerAction::End { winner } => {
                self.winner = winner;
                self.phase = Some(RoomPhase::Lobby);
                self.banner = Some(match_end_banner(self.name_of(winner)));
            },
        }
    }
}

/// Client-side mirror rebuilt purely from the authority's action stream.
///
/// A lost `UPDATE_PLAYERS` leaves a permanent gap in that snake's trail here;
/// the authority is unaffected.
#[derive(Debug)]
pub struct ObserverView {
    arena_width: f32,
    arena_height: f32,
    pickup_radius: f32,
    state: Mutex<Mirror>,
}

impl ObserverView {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            arena_width: config.arena_width,
            arena_height: config.arena_height,
            pickup_radius: config.pickup_radius,
            state: Mutex::new(Mirror::default()),
        }
    }

    pub fn phase(&self) -> RoomPhase {
        self.with(|m| m.phase.unwrap_or(RoomPhase::Lobby))
    }

    pub fn players(&self) -> Vec<PlayerInfo> {
        self.with(|m| m.players.values().cloned().collect())
    }

    /// Match winner announced by the last `END`, if any.
    pub fn winner(&self) -> Option<PlayerId> {
        self.with(|m| m.winner)
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        self.with(|m| {
            let color_of = |id: PlayerId| {
                m.players
                    .get(&id)
                    .map(|p| p.color)
                    .unwrap_or_default()
            };
            let mut snap = RenderSnapshot::new(
                m.tick,
                m.round,
                m.phase.unwrap_or(RoomPhase::Lobby),
                self.arena_width,
                self.arena_height,
            );
            for s in m.snakes.values() {
                snap.push_snake(SnakeSprite {
                    id: s.id,
                    x: s.x,
                    y: s.y,
                    rotation: s.rotation,
                    size: s.fatness,
                    color: color_of(s.id),
                    alive: s.alive,
                });
            }
            for part in &m.parts {
                snap.push_part(part, color_of(part.player_id));
            }
            for p in m.powerups.values() {
                snap.push_powerup(PowerupSprite {
                    id: p.id,
                    kind: p.kind,
                    x: p.x,
                    y: p.y,
                    radius: self.pickup_radius,
                });
            }
            if let Some(text) = &m.banner {
                snap.push_banner(text.clone());
            }
            snap
        })
    }

    fn with<T>(&self, f: impl FnOnce(&Mirror) -> T) -> T {
        match self.state.lock() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}

impl ActionSink<ServerAction> for ObserverView {
    fn deliver(&self, _from: ConnectionId, action: ServerAction) {
        match self.state.lock() {
            Ok(mut guard) => guard.apply(action),
            Err(poisoned) => poisoned.into_inner().apply(action),
        }
    }
}
