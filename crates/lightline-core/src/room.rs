use serde::{Deserialize, Serialize};

/// Maximum length of a room name accepted by [`normalize_room_name`].
pub const MAX_ROOM_NAME_LEN: usize = 32;

/// Lifecycle phase of a room's simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    /// Players are joining; no round exists.
    Lobby,
    /// A round has been announced and snakes are frozen at their spawns.
    Countdown,
    /// Snakes are moving.
    Running,
    /// The round is decided and scores are being shown.
    RoundOver,
}

impl RoomPhase {
    pub fn in_game(self) -> bool {
        !matches!(self, Self::Lobby)
    }
}

/// Trim and lowercase a room name, rejecting empty, oversized, or
/// non-alphanumeric names (`-` and `_` are allowed).
pub fn normalize_room_name(raw: &str) -> Option<String> {
    let name = raw.trim().to_ascii_lowercase();
    if name.is_empty() || name.len() > MAX_ROOM_NAME_LEN {
        return None;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return None;
    }
    Some(name)
}
