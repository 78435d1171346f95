use std::collections::BTreeMap;

use lightline_core::player::PlayerId;
use lightline_core::trail::TailPart;

use crate::geometry::{BoundingBox, point_in_strip};

/// Geometry of one `tail_id` of one player: a box around every part and
/// the unbroken strips inside it, each stored as flat cross edges.
#[derive(Debug, Clone, Default)]
pub struct Tail {
    pub bbox: BoundingBox,
    pub strips: Vec<Vec<f32>>,
}

impl Tail {
    fn add(&mut self, part: &TailPart) {
        self.bbox.extend_flat(&part.vertices);
        let open_new = part.is_tail_start || self.strips.is_empty();
        if open_new {
            let mut strip = Vec::with_capacity(64);
            strip.extend_from_slice(&part.start_edge());
            self.strips.push(strip);
        }
        if let Some(strip) = self.strips.last_mut() {
            strip.extend_from_slice(&part.end_edge());
        }
    }
}

/// Append-only store of every tail part emitted during a round.
#[derive(Debug, Clone, Default)]
pub struct TailStore {
    parts: Vec<TailPart>,
    by_player: BTreeMap<PlayerId, Vec<usize>>,
    tails: BTreeMap<(PlayerId, u32), Tail>,
    /// Tail id of each player's most recently added part.
    newest: BTreeMap<PlayerId, u32>,
}

impl TailStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, part: TailPart) {
        self.tails
            .entry((part.player_id, part.tail_id))
            .or_default()
            .add(&part);
        self.newest.insert(part.player_id, part.tail_id);
        self.by_player
            .entry(part.player_id)
            .or_default()
            .push(self.parts.len());
        self.parts.push(part);
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Every part in emission order.
    pub fn parts(&self) -> &[TailPart] {
        &self.parts
    }

    pub fn player_parts(&self, player: PlayerId) -> impl Iterator<Item = &TailPart> {
        self.by_player
            .get(&player)
            .into_iter()
            .flatten()
            .map(|&i| &self.parts[i])
    }

    pub fn tail(&self, player: PlayerId, tail_id: u32) -> Option<&Tail> {
        self.tails.get(&(player, tail_id))
    }

    /// Owner of the first tail any probe point lies in, if any.
    ///
    /// For `querying_player`'s most recent strip the trailing `exclusion`
    /// segments are skipped: the probe sits on their leading edge by
    /// construction. Older strips, including earlier strips of the same
    /// tail, are tested in full.
    pub fn hit(
        &self,
        probe: &[[f32; 2]],
        querying_player: PlayerId,
        exclusion: usize,
    ) -> Option<PlayerId> {
        let newest = self.newest.get(&querying_player).copied();
        for (&(owner, tail_id), tail) in &self.tails {
            if !probe.iter().any(|p| tail.bbox.contains(p[0], p[1])) {
                continue;
            }
            let is_newest = owner == querying_player && Some(tail_id) == newest;
            let last = tail.strips.len().saturating_sub(1);
            for (i, strip) in tail.strips.iter().enumerate() {
                let edges = if is_newest && i == last {
                    let keep = (strip.len() / 4).saturating_sub(exclusion);
                    &strip[..keep * 4]
                } else {
                    &strip[..]
                };
                if probe.iter().any(|p| point_in_strip(edges, p[0], p[1])) {
                    return Some(owner);
                }
            }
        }
        None
    }

    pub fn collides_with(
        &self,
        probe: &[[f32; 2]],
        querying_player: PlayerId,
        exclusion: usize,
    ) -> bool {
        self.hit(probe, querying_player, exclusion).is_some()
    }
}
