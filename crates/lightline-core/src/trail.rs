use serde::{Deserialize, Serialize};

use crate::player::PlayerId;

/// One quad of a trail, emitted in a single tick.
///
/// `vertices` holds four points in the order `[H1, H2, L2, L1]`: the high
/// side from the segment start to its end, then the low side back. Every
/// consumer (collision, mesh building) depends on this order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailPart {
    pub vertices: [f32; 8],
    pub player_id: PlayerId,
    pub tail_id: u32,
    pub is_tail_start: bool,
}

impl TailPart {
    /// Trailing cross edge `[H1x, H1y, L1x, L1y]`.
    pub fn start_edge(&self) -> [f32; 4] {
        let v = &self.vertices;
        [v[0], v[1], v[6], v[7]]
    }

    /// Leading cross edge `[H2x, H2y, L2x, L2y]`.
    pub fn end_edge(&self) -> [f32; 4] {
        let v = &self.vertices;
        [v[2], v[3], v[4], v[5]]
    }
}

/// The trail outcome of one snake in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TailEvent {
    Gap,
    Part {
        vertices: [f32; 8],
        tail_id: u32,
        is_tail_start: bool,
    },
}

impl TailEvent {
    pub fn from_part(part: Option<&TailPart>) -> Self {
        match part {
            Some(p) => Self::Part {
                vertices: p.vertices,
                tail_id: p.tail_id,
                is_tail_start: p.is_tail_start,
            },
            None => Self::Gap,
        }
    }

    /// Rebuild the part for `player_id`, if this event carried one.
    pub fn into_part(self, player_id: PlayerId) -> Option<TailPart> {
        match self {
            Self::Gap => None,
            Self::Part {
                vertices,
                tail_id,
                is_tail_start,
            } => Some(TailPart {
                vertices,
                player_id,
                tail_id,
                is_tail_start,
            }),
        }
    }
}
