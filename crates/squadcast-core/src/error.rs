// Squad construction and lineup errors.

use thiserror::Error;

use crate::formation::FormationVerdict;
use crate::player::{PlayerId, Position};

/// Errors raised when a squad operation would break a squad invariant.
///
/// All of them signal invalid input from the caller; none are retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SquadError {
    #[error("squad is full ({capacity} players)")]
    Capacity { capacity: usize },

    #[error("position quota exceeded for {position}: {count} > {max}")]
    Position {
        position: Position,
        count: usize,
        max: usize,
    },

    #[error("club limit exceeded for {team}: {count} > {max}")]
    ClubLimit {
        team: String,
        count: usize,
        max: usize,
    },

    #[error("budget exceeded: total price {total} > budget {budget}")]
    Budget { total: u64, budget: u32 },

    #[error("no legal starting lineup: {verdict}")]
    Formation { verdict: FormationVerdict },

    #[error("player {id} is already in the squad")]
    DuplicatePlayer { id: PlayerId },

    #[error("player {id} is not in the squad")]
    UnknownPlayer { id: PlayerId },
}
