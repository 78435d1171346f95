//! Immutable per-tick view handed to a renderer.

use serde::{Deserialize, Serialize};

use lightline_core::player::{PlayerColor, PlayerId};
use lightline_core::powerup::{PowerupId, PowerupKind};
use lightline_core::room::RoomPhase;
use lightline_core::trail::TailPart;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnakeSprite {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    /// Head diameter.
    pub size: f32,
    pub color: PlayerColor,
    pub alive: bool,
}

/// Triangle mesh of all trail parts of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailMesh {
    pub player_id: PlayerId,
    pub color: PlayerColor,
    pub vertices: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerupSprite {
    pub id: PowerupId,
    pub kind: PowerupKind,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Everything needed to draw one completed tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub tick: u64,
    pub round: u32,
    pub phase: RoomPhase,
    pub arena_width: f32,
    pub arena_height: f32,
    pub snakes: Vec<SnakeSprite>,
    pub trails: Vec<TrailMesh>,
    pub powerups: Vec<PowerupSprite>,
    pub labels: Vec<TextLabel>,
}

impl RenderSnapshot {
    pub fn new(tick: u64, round: u32, phase: RoomPhase, arena_width: f32, arena_height: f32) -> Self {
        Self {
            tick,
            round,
            phase,
            arena_width,
            arena_height,
            snakes: Vec::new(),
            trails: Vec::new(),
            powerups: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn push_snake(&mut self, sprite: SnakeSprite) {
        self.snakes.push(sprite);
    }

    /// Append a part's quad to its owner's mesh as two triangles.
    pub fn push_part(&mut self, part: &TailPart, color: PlayerColor) {
        let idx = match self.trails.iter().position(|m| m.player_id == part.player_id) {
            Some(i) => i,
            None => {
                self.trails.push(TrailMesh {
                    player_id: part.player_id,
                    color,
                    vertices: Vec::new(),
                    indices: Vec::new(),
                });
                self.trails.len() - 1
            },
        };
        let mesh = &mut self.trails[idx];
        let base = mesh.vertices.len() as u32;
        for v in part.vertices.chunks_exact(2) {
            mesh.vertices.push([v[0], v[1]]);
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    pub fn push_powerup(&mut self, sprite: PowerupSprite) {
        self.powerups.push(sprite);
    }

    /// Centred banner text.
    pub fn push_banner(&mut self, text: impl Into<String>) {
        self.labels.push(TextLabel {
            text: text.into(),
            x: self.arena_width * 0.5,
            y: self.arena_height * 0.5,
        });
    }
}

/// Banner shown while a round counts down.
pub fn round_banner(round: u32) -> String {
    format!("Round {round}")
}

/// Banner shown between rounds.
pub fn round_end_banner(round: u32, winner: Option<&str>) -> String {
    match winner {
        Some(name) => format!("{name} wins round {round}"),
        None => format!("Round {round}: no winner"),
    }
}

/// Banner shown back in the lobby after a match.
pub fn match_end_banner(winner: Option<&str>) -> String {
    match winner {
        Some(name) => format!("{name} wins the match"),
        None => "Match over".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(player_id: PlayerId) -> TailPart {
        TailPart {
            vertices: [0.0, 1.0, 2.0, 1.0, 2.0, -1.0, 0.0, -1.0],
            player_id,
            tail_id: 0,
            is_tail_start: true,
        }
    }

    #[test]
    fn parts_become_two_triangles_each() {
        let mut snap = RenderSnapshot::new(1, 1, RoomPhase::Running, 100.0, 100.0);
        snap.push_part(&part(1), PlayerColor::default());
        snap.push_part(&part(1), PlayerColor::default());
        assert_eq!(snap.trails.len(), 1);
        let mesh = &snap.trails[0];
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn meshes_are_per_player() {
        let mut snap = RenderSnapshot::new(1, 1, RoomPhase::Running, 100.0, 100.0);
        snap.push_part(&part(1), PlayerColor::for_index(0));
        snap.push_part(&part(2), PlayerColor::for_index(1));
        assert_eq!(snap.trails.len(), 2);
        assert_eq!(snap.trails[1].player_id, 2);
    }

    #[test]
    fn banner_is_centred() {
        let mut snap = RenderSnapshot::new(0, 0, RoomPhase::Lobby, 200.0, 100.0);
        snap.push_banner("Ready");
        assert_eq!(snap.labels[0].x, 100.0);
        assert_eq!(snap.labels[0].y, 50.0);
    }

    #[test]
    fn serializes_for_renderers() {
        let snap = RenderSnapshot::new(3, 1, RoomPhase::Countdown, 10.0, 10.0);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["phase"], "countdown");
        assert_eq!(json["tick"], 3);
    }
}
