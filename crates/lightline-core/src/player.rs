use serde::{Deserialize, Serialize};

/// Unique identifier for a player within a room. Also used as the snake id.
pub type PlayerId = u64;

/// Identity token of a connection attached to a room.
pub type ConnectionId = u64;

/// A player registered in a room. Persists across rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: PlayerColor,
    /// The connection that added this player and may steer its snake.
    pub connection_id: ConnectionId,
    pub score: u32,
}

impl Player {
    /// Public view of the player sent to observers.
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name.clone(),
            color: self.color,
            score: self.score,
        }
    }
}

/// What observers know about a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub color: PlayerColor,
    pub score: u32,
}

/// Trail color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for PlayerColor {
    fn default() -> Self {
        Self::PALETTE[0]
    }
}

impl PlayerColor {
    /// Colors handed out to players in join order.
    pub const PALETTE: &[PlayerColor] = &[
        PlayerColor {
            r: 255,
            g: 87,
            b: 87,
        }, // Red
        PlayerColor {
            r: 78,
            g: 205,
            b: 196,
        }, // Teal
        PlayerColor {
            r: 255,
            g: 195,
            b: 18,
        }, // Yellow
        PlayerColor {
            r: 130,
            g: 88,
            b: 255,
        }, // Purple
        PlayerColor {
            r: 46,
            g: 213,
            b: 115,
        }, // Green
        PlayerColor {
            r: 255,
            g: 148,
            b: 77,
        }, // Orange
        PlayerColor {
            r: 83,
            g: 152,
            b: 255,
        }, // Blue
        PlayerColor {
            r: 255,
            g: 107,
            b: 175,
        }, // Pink
    ];

    /// Palette color for the `index`-th player, wrapping around.
    pub fn for_index(index: usize) -> Self {
        Self::PALETTE[index % Self::PALETTE.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_wraps() {
        let n = PlayerColor::PALETTE.len();
        assert_eq!(PlayerColor::for_index(0), PlayerColor::for_index(n));
        assert_ne!(PlayerColor::for_index(0), PlayerColor::for_index(1));
    }

    #[test]
    fn info_carries_score() {
        let player = Player {
            id: 3,
            name: "Ada".to_string(),
            color: PlayerColor::default(),
            connection_id: 9,
            score: 4,
        };
        let info = player.info();
        assert_eq!(info.id, 3);
        assert_eq!(info.score, 4);
        assert_eq!(info.name, "Ada");
    }
}
