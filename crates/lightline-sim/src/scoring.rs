use std::collections::BTreeMap;

use lightline_core::player::{Player, PlayerId};

/// Points for being the last snake alive.
pub const SURVIVE_POINTS: u32 = 1;

/// Round winner: the only survivor of a round that had rivals.
/// A solo round, or one where nobody survived, has no winner.
pub fn round_winner(alive: &[PlayerId], contestants: usize) -> Option<PlayerId> {
    match alive {
        [only] if contestants >= 2 => Some(*only),
        _ => None,
    }
}

/// Whether a round is over: fewer than two alive with rivals, or nobody
/// alive in a solo round.
pub fn round_over(alive: usize, contestants: usize) -> bool {
    if contestants >= 2 {
        alive < 2
    } else {
        alive == 0
    }
}

/// Credit the round winner. Returns the new score, if it still plays.
pub fn award(players: &mut BTreeMap<PlayerId, Player>, winner: Option<PlayerId>) -> Option<u32> {
    let player = players.get_mut(&winner?)?;
    player.score += SURVIVE_POINTS;
    Some(player.score)
}

/// The player who reached `score_to_win`, highest score first, lowest id on ties.
pub fn match_winner(players: &BTreeMap<PlayerId, Player>, score_to_win: u32) -> Option<PlayerId> {
    players
        .values()
        .filter(|p| p.score >= score_to_win)
        .max_by(|a, b| a.score.cmp(&b.score).then(b.id.cmp(&a.id)))
        .map(|p| p.id)
}
