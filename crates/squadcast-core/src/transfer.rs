// Transfer search: single and double player swaps that maximise the gain in
// expected points.
//
// Candidates come from the points predictor, one call per position, and are
// resolved through the player pool. Every swap is simulated on a copy of the
// squad and scored with the same lineup selection the squad itself uses, so
// bench and captaincy effects are part of the gain.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SquadError;
use crate::lineup::{CAPTAIN_MULTIPLIER, POINTS_EPSILON};
use crate::player::{Player, PlayerId, PlayerPool, Position};
use crate::prediction::{ranked_by_position, sort_ranked, PointsPredictor};
use crate::squad::{price_sum, Squad};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// How many players to swap at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDepth {
    Single,
    Double,
}

impl TransferDepth {
    pub fn count(&self) -> usize {
        match self {
            TransferDepth::Single => 1,
            TransferDepth::Double => 2,
        }
    }
}

/// One player out, one player in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub out_id: PlayerId,
    pub in_id: PlayerId,
}

/// The best set of transfers found and what it is worth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPlan {
    pub transfers: Vec<Transfer>,
    /// Expected points of the squad before any transfer.
    pub baseline_points: f64,
    /// Expected points of the squad after the transfers.
    pub expected_points: f64,
    /// Points deducted for transfers beyond the free allowance.
    pub points_hit: f64,
    /// Net gain: `expected_points - baseline_points - points_hit`.
    pub delta: f64,
    /// Combined price of the incoming players.
    pub incoming_cost: u64,
}

impl TransferPlan {
    fn sorted_in_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.transfers.iter().map(|t| t.in_id).collect();
        ids.sort_unstable();
        ids
    }

    fn sorted_out_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.transfers.iter().map(|t| t.out_id).collect();
        ids.sort_unstable();
        ids
    }

    /// Whether `self` beats `other`: larger delta, then cheaper incoming
    /// players, then lower incoming ids, then lower outgoing ids.
    fn beats(&self, other: &TransferPlan) -> bool {
        if self.delta > other.delta + POINTS_EPSILON {
            return true;
        }
        if self.delta < other.delta - POINTS_EPSILON {
            return false;
        }
        self.incoming_cost
            .cmp(&other.incoming_cost)
            .then_with(|| self.sorted_in_ids().cmp(&other.sorted_in_ids()))
            .then_with(|| self.sorted_out_ids().cmp(&other.sorted_out_ids()))
            == Ordering::Less
    }
}

/// Result of a transfer search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    Improved(TransferPlan),
    NoImprovement,
}

impl TransferOutcome {
    pub fn plan(&self) -> Option<&TransferPlan> {
        match self {
            TransferOutcome::Improved(plan) => Some(plan),
            TransferOutcome::NoImprovement => None,
        }
    }

    pub fn is_improvement(&self) -> bool {
        matches!(self, TransferOutcome::Improved(_))
    }
}

/// Knobs for the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Only consider the top N predicted players per position (after
    /// removing current squad members). Affordability is checked later, per
    /// simulated squad, so the N may include players the budget rules out.
    /// `None` considers all of them.
    pub max_candidates_per_position: Option<usize>,
    /// Transfers that cost no points.
    pub free_transfers: usize,
    /// Points deducted per transfer beyond `free_transfers`.
    pub points_hit: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            max_candidates_per_position: None,
            free_transfers: 1,
            points_hit: 0.0,
        }
    }
}

impl SearchOptions {
    /// Points deducted for making `transfers` transfers.
    pub fn hit_for(&self, transfers: usize) -> f64 {
        transfers.saturating_sub(self.free_transfers) as f64 * self.points_hit
    }
}

// ---------------------------------------------------------------------------
// Search space
// ---------------------------------------------------------------------------

/// A replacement player with its prediction attached.
#[derive(Debug, Clone)]
struct Candidate {
    player: Player,
    points: f64,
}

/// A current squad member that could be sold.
#[derive(Debug, Clone, Copy)]
struct Outgoing {
    id: PlayerId,
    position: Position,
    points: f64,
}

/// Everything a search needs, fetched once per evaluation.
struct SearchSpace {
    squad: Squad,
    baseline: f64,
    outgoing: Vec<Outgoing>,
    candidates: BTreeMap<Position, Vec<Candidate>>,
}

impl SearchSpace {
    fn candidates_for(&self, position: Position) -> &[Candidate] {
        self.candidates
            .get(&position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Positive point difference between `candidate` and `out`. Scaled by the
/// captain multiplier it bounds the gain of the swap, since the newcomer may
/// also take the armband.
fn swap_gain(candidate: &Candidate, out: &Outgoing) -> f64 {
    (candidate.points - out.points).max(0.0)
}

/// Whether a search branch whose gain is at most `bound` can be skipped.
fn cannot_improve(bound: f64, best: Option<&TransferPlan>) -> bool {
    match best {
        None => bound <= POINTS_EPSILON,
        Some(plan) => bound < plan.delta - POINTS_EPSILON,
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Searches for the transfers that most improve a squad's expected points.
pub struct TransferEvaluator<'a, P: ?Sized> {
    predictor: &'a P,
    pool: &'a PlayerPool,
    options: SearchOptions,
}

impl<'a, P> TransferEvaluator<'a, P>
where
    P: PointsPredictor + ?Sized,
{
    pub fn new(predictor: &'a P, pool: &'a PlayerPool) -> Self {
        TransferEvaluator {
            predictor,
            pool,
            options: SearchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Run the search at the given depth.
    pub fn evaluate(
        &self,
        squad: &Squad,
        gameweek: u32,
        method: &str,
        depth: TransferDepth,
    ) -> Result<TransferOutcome, SquadError> {
        match depth {
            TransferDepth::Single => self.evaluate_single_transfer(squad, gameweek, method),
            TransferDepth::Double => self.evaluate_double_transfer(squad, gameweek, method),
        }
    }

    /// Best single swap with a strictly positive net gain.
    pub fn evaluate_single_transfer(
        &self,
        squad: &Squad,
        gameweek: u32,
        method: &str,
    ) -> Result<TransferOutcome, SquadError> {
        let space = self.prepare(squad, gameweek, method)?;
        let hit = self.options.hit_for(1);
        let mut best: Option<TransferPlan> = None;
        let mut evaluated = 0usize;

        for out in &space.outgoing {
            for candidate in space.candidates_for(out.position) {
                let bound = CAPTAIN_MULTIPLIER * swap_gain(candidate, out) - hit;
                if cannot_improve(bound, best.as_ref()) {
                    // Candidates are ranked: the rest can only do worse.
                    break;
                }

                evaluated += 1;
                let swaps = [(out.id, candidate.player.clone())];
                if let Some(plan) = self.score(&space, &swaps, hit, gameweek, method)? {
                    if best.as_ref().map_or(true, |b| plan.beats(b)) {
                        best = Some(plan);
                    }
                }
            }
        }

        Ok(self.finish("single", best, evaluated))
    }

    /// Best simultaneous pair of swaps with a strictly positive net gain.
    ///
    /// The two outgoing players are distinct squad members and the two
    /// incoming players are distinct non-members. Budget, club and quota
    /// rules are checked on the squad after both swaps.
    pub fn evaluate_double_transfer(
        &self,
        squad: &Squad,
        gameweek: u32,
        method: &str,
    ) -> Result<TransferOutcome, SquadError> {
        let space = self.prepare(squad, gameweek, method)?;
        let hit = self.options.hit_for(2);
        let mut best: Option<TransferPlan> = None;
        let mut evaluated = 0usize;

        for (i, first_out) in space.outgoing.iter().enumerate() {
            for second_out in &space.outgoing[i + 1..] {
                let first_pool = space.candidates_for(first_out.position);
                let second_pool = space.candidates_for(second_out.position);
                let Some(top_second) = second_pool.first() else {
                    continue;
                };
                let top_second_gain = swap_gain(top_second, second_out);

                for first in first_pool {
                    let first_gain = swap_gain(first, first_out);
                    let bound = CAPTAIN_MULTIPLIER * (first_gain + top_second_gain) - hit;
                    if cannot_improve(bound, best.as_ref()) {
                        break;
                    }

                    for second in second_pool {
                        if second.player.id == first.player.id {
                            continue;
                        }
                        let bound =
                            CAPTAIN_MULTIPLIER * (first_gain + swap_gain(second, second_out)) - hit;
                        if cannot_improve(bound, best.as_ref()) {
                            break;
                        }

                        evaluated += 1;
                        let swaps = [
                            (first_out.id, first.player.clone()),
                            (second_out.id, second.player.clone()),
                        ];
                        if let Some(plan) = self.score(&space, &swaps, hit, gameweek, method)? {
                            if best.as_ref().map_or(true, |b| plan.beats(b)) {
                                best = Some(plan);
                            }
                        }
                    }
                }
            }
        }

        Ok(self.finish("double", best, evaluated))
    }

    /// Apply a plan's transfers to `squad`, resolving incoming players
    /// through the pool.
    pub fn apply(&self, squad: &Squad, plan: &TransferPlan) -> Result<Squad, SquadError> {
        let swaps = plan
            .transfers
            .iter()
            .map(|t| {
                self.pool
                    .get(t.in_id)
                    .cloned()
                    .map(|p| (t.out_id, p))
                    .ok_or(SquadError::UnknownPlayer { id: t.in_id })
            })
            .collect::<Result<Vec<_>, _>>()?;
        squad.replace_players(&swaps)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Fetch predictions, score the current squad and build the ranked
    /// candidate lists.
    fn prepare(
        &self,
        squad: &Squad,
        gameweek: u32,
        method: &str,
    ) -> Result<SearchSpace, SquadError> {
        let positions: Vec<Position> = Position::ALL
            .into_iter()
            .filter(|pos| squad.players().iter().any(|p| p.position == *pos))
            .collect();
        let ranked = ranked_by_position(self.predictor, gameweek, method, positions);

        let mut priced = squad.clone();
        priced.apply_predictions(gameweek, method, &ranked);
        let baseline = priced.get_expected_points(gameweek, method)?;

        let outgoing = priced
            .players()
            .iter()
            .map(|p| Outgoing {
                id: p.id,
                position: p.position,
                points: p.expected_points(gameweek, method),
            })
            .collect();

        let mut candidates = BTreeMap::new();
        for (&position, entries) in &ranked {
            let mut entries = entries.clone();
            sort_ranked(&mut entries);

            let limit = self
                .options
                .max_candidates_per_position
                .unwrap_or(usize::MAX);
            let list: Vec<Candidate> = entries
                .into_iter()
                .filter(|(id, _)| !priced.contains(*id))
                .filter_map(|(id, points)| match self.pool.get(id) {
                    Some(player) if player.position == position => Some(Candidate {
                        player: player.clone().with_points(method, gameweek, points),
                        points,
                    }),
                    Some(player) => {
                        debug!(
                            "skipping candidate {}: listed as {} but plays {}",
                            id, position, player.position
                        );
                        None
                    }
                    None => {
                        debug!("skipping candidate {}: not in player pool", id);
                        None
                    }
                })
                .take(limit)
                .collect();

            debug!("{} candidates at {}", list.len(), position);
            candidates.insert(position, list);
        }

        Ok(SearchSpace {
            squad: priced,
            baseline,
            outgoing,
            candidates,
        })
    }

    /// Simulate `swaps` and return the resulting plan if it is legal and
    /// strictly improving.
    fn score(
        &self,
        space: &SearchSpace,
        swaps: &[(PlayerId, Player)],
        hit: f64,
        gameweek: u32,
        method: &str,
    ) -> Result<Option<TransferPlan>, SquadError> {
        let next = match space.squad.replace_players(swaps) {
            Ok(next) => next,
            Err(e) => {
                debug!("rejected swap {:?}: {}", swap_ids(swaps), e);
                return Ok(None);
            }
        };

        let expected_points = next.get_expected_points(gameweek, method)?;
        let delta = expected_points - space.baseline - hit;
        if delta <= POINTS_EPSILON {
            return Ok(None);
        }

        Ok(Some(TransferPlan {
            transfers: swaps
                .iter()
                .map(|(out_id, incoming)| Transfer {
                    out_id: *out_id,
                    in_id: incoming.id,
                })
                .collect(),
            baseline_points: space.baseline,
            expected_points,
            points_hit: hit,
            delta,
            incoming_cost: price_sum(swaps.iter().map(|(_, p)| p)),
        }))
    }

    fn finish(&self, label: &str, best: Option<TransferPlan>, evaluated: usize) -> TransferOutcome {
        match best {
            Some(plan) => {
                info!(
                    "{} transfer search: {} swaps evaluated, best {:?} gains {:.2}",
                    label,
                    evaluated,
                    plan.transfers
                        .iter()
                        .map(|t| (t.out_id, t.in_id))
                        .collect::<Vec<_>>(),
                    plan.delta
                );
                TransferOutcome::Improved(plan)
            }
            None => {
                info!(
                    "{} transfer search: {} swaps evaluated, no improvement",
                    label, evaluated
                );
                TransferOutcome::NoImprovement
            }
        }
    }
}

fn swap_ids(swaps: &[(PlayerId, Player)]) -> Vec<(PlayerId, PlayerId)> {
    swaps.iter().map(|(out, p)| (*out, p.id)).collect()
}
