// Starting lineup selection, captaincy and expected-points aggregation.
//
// Selection is a pure function of the squad's players, the rules and the
// cached predictions. It never mutates players, so recomputing a lineup is
// always idempotent.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SquadError;
use crate::formation::{check_starting, FormationVerdict, PositionCounts, SquadRules};
use crate::player::{Player, PlayerId, Position};

/// Captain points multiplier.
pub const CAPTAIN_MULTIPLIER: f64 = 2.0;

/// Captain points multiplier while the triple captain chip is active.
pub const TRIPLE_CAPTAIN_MULTIPLIER: f64 = 3.0;

/// Differences smaller than this are treated as ties.
pub(crate) const POINTS_EPSILON: f64 = 1e-9;

/// Chips that change how a lineup is scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chips {
    /// Bench players score too.
    pub bench_boost: bool,
    /// Captain scores three times instead of twice.
    pub triple_captain: bool,
}

/// The selected starting eleven, bench and captaincy for one gameweek.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineup {
    pub gameweek: u32,
    pub method: String,
    /// Starters in squad order.
    pub starters: Vec<PlayerId>,
    /// Bench in substitution order: goalkeeper first, then outfield players
    /// by predicted points.
    pub bench: Vec<PlayerId>,
    pub captain: PlayerId,
    pub vice_captain: PlayerId,
    /// Starter counts per position.
    pub formation: PositionCounts,
    /// Predicted points used for every squad member.
    pub points: BTreeMap<PlayerId, f64>,
}

impl Lineup {
    pub fn is_starting(&self, id: PlayerId) -> bool {
        self.starters.contains(&id)
    }

    pub fn is_captain(&self, id: PlayerId) -> bool {
        self.captain == id
    }

    pub fn is_vice_captain(&self, id: PlayerId) -> bool {
        self.vice_captain == id
    }

    /// Predicted points the selection used for a player (0 if unknown).
    pub fn points_for(&self, id: PlayerId) -> f64 {
        self.points.get(&id).copied().unwrap_or(0.0)
    }

    /// Starters' points with the captain doubled.
    pub fn expected_points(&self) -> f64 {
        self.expected_points_with_chips(Chips::default())
    }

    pub fn expected_points_with_chips(&self, chips: Chips) -> f64 {
        let multiplier = if chips.triple_captain {
            TRIPLE_CAPTAIN_MULTIPLIER
        } else {
            CAPTAIN_MULTIPLIER
        };

        let starters: f64 = self.starters.iter().map(|&id| self.points_for(id)).sum();
        let captain_bonus = self.points_for(self.captain) * (multiplier - 1.0);
        let bench = if chips.bench_boost {
            self.bench.iter().map(|&id| self.points_for(id)).sum()
        } else {
            0.0
        };

        starters + captain_bonus + bench
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

fn by_points_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Pick the starting lineup and captaincy for `players`.
///
/// Algorithm:
/// 1. Score every player for the gameweek and method (missing = 0).
/// 2. Start from the default formation, taking the best players at each
///    position (ties: squad order).
/// 3. Repeatedly bench the lowest-scoring starter in favour of the
///    highest-scoring bench player whose swap strictly raises the total and
///    keeps every position inside its band. Ties never swap, so the default
///    shape survives when nothing is gained.
/// 4. Captain is the top-scoring starter, vice-captain the next; ties go to
///    the lowest player id.
pub fn select_lineup(
    players: &[Player],
    rules: &SquadRules,
    gameweek: u32,
    method: &str,
) -> Result<Lineup, SquadError> {
    let points: Vec<f64> = players
        .iter()
        .map(|p| {
            if !p.has_prediction(gameweek, method) {
                debug!("no prediction for player {} gw={} method={}", p.id, gameweek, method);
            }
            p.expected_points(gameweek, method)
        })
        .collect();

    let mut starting = vec![false; players.len()];

    // Default formation: best N per position.
    for position in Position::ALL {
        let mut at_position: Vec<usize> = (0..players.len())
            .filter(|&i| players[i].position == position)
            .collect();
        at_position.sort_by(|&a, &b| by_points_desc(points[a], points[b]).then(a.cmp(&b)));
        for &i in at_position
            .iter()
            .take(rules.default_formation.get(position))
        {
            starting[i] = true;
        }
    }

    let mut counts = PositionCounts::from_positions(
        (0..players.len())
            .filter(|&i| starting[i])
            .map(|i| players[i].position),
    );
    let verdict = check_starting(&counts, rules);
    if !verdict.is_legal() {
        return Err(SquadError::Formation { verdict });
    }

    // Greedy bench optimisation.
    while let Some((out, into)) = improving_swap(players, &points, &starting, &counts, rules) {
        debug!(
            "lineup swap: bench {} ({:.2}) for {} ({:.2})",
            players[out].id, points[out], players[into].id, points[into]
        );
        starting[out] = false;
        starting[into] = true;
        counts = counts.swapped(players[out].position, players[into].position);
    }

    let starter_idx: Vec<usize> = (0..players.len()).filter(|&i| starting[i]).collect();

    let (captain, vice_captain) = pick_captains(players, &points, &starter_idx).ok_or(
        SquadError::Formation {
            verdict: FormationVerdict::WrongSize {
                expected: rules.starting_size,
                actual: starter_idx.len(),
            },
        },
    )?;

    let mut bench_idx: Vec<usize> = (0..players.len()).filter(|&i| !starting[i]).collect();
    bench_idx.sort_by(|&a, &b| {
        players[a]
            .position
            .is_outfield()
            .cmp(&players[b].position.is_outfield())
            .then(by_points_desc(points[a], points[b]))
            .then(a.cmp(&b))
    });

    Ok(Lineup {
        gameweek,
        method: method.to_string(),
        starters: starter_idx.iter().map(|&i| players[i].id).collect(),
        bench: bench_idx.iter().map(|&i| players[i].id).collect(),
        captain,
        vice_captain,
        formation: counts,
        points: players
            .iter()
            .zip(&points)
            .map(|(p, &pts)| (p.id, pts))
            .collect(),
    })
}

/// Find the first improving, formation-legal (starter, bench) swap, scanning
/// starters from lowest points and bench players from highest.
fn improving_swap(
    players: &[Player],
    points: &[f64],
    starting: &[bool],
    counts: &PositionCounts,
    rules: &SquadRules,
) -> Option<(usize, usize)> {
    let mut starters: Vec<usize> = (0..players.len()).filter(|&i| starting[i]).collect();
    starters.sort_by(|&a, &b| by_points_desc(points[b], points[a]).then(b.cmp(&a)));

    let mut bench: Vec<usize> = (0..players.len()).filter(|&i| !starting[i]).collect();
    bench.sort_by(|&a, &b| by_points_desc(points[a], points[b]).then(a.cmp(&b)));

    for &out in &starters {
        for &into in &bench {
            if points[into] <= points[out] + POINTS_EPSILON {
                // Bench is sorted: nothing further improves on this starter.
                break;
            }
            let next = counts.swapped(players[out].position, players[into].position);
            if check_starting(&next, rules).is_legal() {
                return Some((out, into));
            }
        }
    }
    None
}

/// Captain and vice-captain among the starters: highest points first,
/// lowest player id on ties.
fn pick_captains(
    players: &[Player],
    points: &[f64],
    starter_idx: &[usize],
) -> Option<(PlayerId, PlayerId)> {
    let mut ranked: Vec<usize> = starter_idx.to_vec();
    ranked.sort_by(|&a, &b| {
        by_points_desc(points[a], points[b]).then(players[a].id.cmp(&players[b].id))
    });
    match ranked.as_slice() {
        [first, second, ..] => Some((players[*first].id, players[*second].id)),
        _ => None,
    }
}
