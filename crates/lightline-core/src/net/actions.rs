use serde::{Deserialize, Serialize};

use crate::player::{PlayerColor, PlayerId, PlayerInfo};
use crate::powerup::{PowerupId, PowerupInfo};
use crate::trail::TailEvent;

/// Steering input for one rotation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    None,
    Left,
    Right,
}

impl TurnDirection {
    /// Rotation sign: left is counter-clockwise.
    pub fn sign(self) -> f32 {
        match self {
            Self::None => 0.0,
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// Actions sent from an observer to the room authority.
///
/// Serialized as `{"type": "...", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientAction {
    /// Register a local player on the sending connection.
    AddPlayer {
        name: String,
        #[serde(default)]
        color: Option<PlayerColor>,
    },
    /// Turn one step. Only honored for snakes owned by the sender.
    Rotate {
        direction: TurnDirection,
        snake_id: PlayerId,
    },
    /// Leave the lobby and start the first round.
    Start,
}

impl ClientAction {
    /// Wire tag of this action, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddPlayer { .. } => "ADD_PLAYER",
            Self::Rotate { .. } => "ROTATE",
            Self::Start => "START",
        }
    }
}

/// Actions sent from the room authority to every observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerAction {
    /// The game left the lobby with these players.
    Started { players: Vec<PlayerInfo> },
    /// Current lobby roster.
    Lobby { players: Vec<PlayerInfo> },
    /// A new round is about to start from these spawns.
    Round {
        round: u32,
        snakes: Vec<SnakeInit>,
        start_delay_ms: u64,
    },
    /// Full positional snapshot of every snake for one tick.
    UpdatePlayers { tick: u64, snakes: Vec<SnakeUpdate> },
    PowerupSpawn { powerup: PowerupInfo },
    PowerupFetch { id: PowerupId, player_id: PlayerId },
    RoundEnd {
        round: u32,
        winner: Option<PlayerId>,
        scores: Vec<ScoreEntry>,
    },
    /// The match is over; the room returns to the lobby.
    End { winner: Option<PlayerId> },
}

impl ServerAction {
    /// Wire tag of this action, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "STARTED",
            Self::Lobby { .. } => "LOBBY",
            Self::Round { .. } => "ROUND",
            Self::UpdatePlayers { .. } => "UPDATE_PLAYERS",
            Self::PowerupSpawn { .. } => "POWERUP_SPAWN",
            Self::PowerupFetch { .. } => "POWERUP_FETCH",
            Self::RoundEnd { .. } => "ROUND_END",
            Self::End { .. } => "END",
        }
    }
}

/// Spawn state of a snake at round start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnakeInit {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub fatness: f32,
}

/// Per-tick state of one snake.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnakeUpdate {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub alive: bool,
    pub fatness: f32,
    pub tail: TailEvent,
}

/// Cumulative score of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub player_id: PlayerId,
    pub score: u32,
}
