use serde::{Deserialize, Serialize};

/// Identifier of a placed power-up, unique within a round.
pub type PowerupId = u32;

/// Every collectible power-up type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerupKind {
    SpeedSelf,
    SpeedOthers,
    SlowSelf,
    SlowOthers,
    ThinSelf,
    FatOthers,
    GhostSelf,
    ReverseOthers,
    Swap,
}

/// Who receives a power-up's effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerupTarget {
    /// Only the snake that picked it up.
    Activator,
    /// Every snake except the one that picked it up.
    Others,
}

impl PowerupKind {
    /// Spawn table with relative weights.
    pub const WEIGHTED: &[(PowerupKind, u32)] = &[
        (PowerupKind::SpeedSelf, 4),
        (PowerupKind::SpeedOthers, 3),
        (PowerupKind::SlowSelf, 4),
        (PowerupKind::SlowOthers, 3),
        (PowerupKind::ThinSelf, 3),
        (PowerupKind::FatOthers, 3),
        (PowerupKind::GhostSelf, 2),
        (PowerupKind::ReverseOthers, 2),
        (PowerupKind::Swap, 1),
    ];

    pub fn target(self) -> PowerupTarget {
        match self {
            Self::SpeedSelf | Self::SlowSelf | Self::ThinSelf | Self::GhostSelf | Self::Swap => {
                PowerupTarget::Activator
            },
            Self::SpeedOthers | Self::SlowOthers | Self::FatOthers | Self::ReverseOthers => {
                PowerupTarget::Others
            },
        }
    }

    /// Whether the effect lasts for a duration and must be reversed on expiry.
    pub fn is_timed(self) -> bool {
        !matches!(self, Self::Swap)
    }

    /// Sum of all spawn weights.
    pub fn total_weight() -> u32 {
        Self::WEIGHTED.iter().map(|(_, w)| w).sum()
    }

    /// Pick a kind from the spawn table given a roll in `0..total_weight()`.
    pub fn from_roll(roll: u32) -> Self {
        let mut acc = 0;
        for &(kind, weight) in Self::WEIGHTED {
            acc += weight;
            if roll < acc {
                return kind;
            }
        }
        Self::WEIGHTED[Self::WEIGHTED.len() - 1].0
    }
}

/// A power-up lying in the arena, as sent to observers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerupInfo {
    pub id: PowerupId,
    pub kind: PowerupKind,
    pub x: f32,
    pub y: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_covers_every_kind() {
        let mut seen = Vec::new();
        for roll in 0..PowerupKind::total_weight() {
            let kind = PowerupKind::from_roll(roll);
            if !seen.contains(&kind) {
                seen.push(kind);
            }
        }
        assert_eq!(seen.len(), PowerupKind::WEIGHTED.len());
    }

    #[test]
    fn roll_out_of_range_clamps_to_last() {
        assert_eq!(PowerupKind::from_roll(u32::MAX), PowerupKind::Swap);
    }

    #[test]
    fn swap_is_instant() {
        assert!(!PowerupKind::Swap.is_timed());
        assert!(PowerupKind::GhostSelf.is_timed());
        assert_eq!(PowerupKind::FatOthers.target(), PowerupTarget::Others);
    }
}
