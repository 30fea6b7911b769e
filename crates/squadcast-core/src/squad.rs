// Squad composition: quotas, club limits, budget and lineup scoring.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::SquadError;
use crate::formation::{check_squad, FormationVerdict, PositionCounts, SquadRules};
use crate::lineup::{select_lineup, Chips, Lineup};
use crate::player::{Player, PlayerId, Position};
use crate::prediction::{ranked_by_position, PointsPredictor};

/// An ordered collection of up to `rules.squad_size()` players.
///
/// Composition invariants (position quota, club limit, budget, unique ids)
/// are enforced whenever players enter the squad; reads never re-check them.
#[derive(Debug, Clone, PartialEq)]
pub struct Squad {
    rules: SquadRules,
    players: Vec<Player>,
}

impl Default for Squad {
    fn default() -> Self {
        Squad::new(SquadRules::default())
    }
}

impl Squad {
    /// Create an empty squad governed by `rules`.
    pub fn new(rules: SquadRules) -> Self {
        Squad {
            rules,
            players: Vec::new(),
        }
    }

    /// Build a squad by adding `players` in order.
    pub fn from_players<I>(rules: SquadRules, players: I) -> Result<Self, SquadError>
    where
        I: IntoIterator<Item = Player>,
    {
        let mut squad = Squad::new(rules);
        for player in players {
            squad.add_player(player)?;
        }
        Ok(squad)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn rules(&self) -> &SquadRules {
        &self.rules
    }

    /// Players in insertion order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Whether the squad holds its full complement of players.
    pub fn is_complete(&self) -> bool {
        self.players.len() == self.rules.squad_size()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Combined price of the squad. Never above the budget, so it fits in
    /// a `u32`.
    pub fn total_price(&self) -> u32 {
        u32::try_from(price_sum(&self.players)).unwrap_or(u32::MAX)
    }

    /// Budget left before the price ceiling is reached.
    pub fn remaining_budget(&self) -> u32 {
        self.rules.budget.saturating_sub(self.total_price())
    }

    /// Number of squad players from `team`.
    pub fn club_count(&self, team: &str) -> usize {
        self.players.iter().filter(|p| p.team == team).count()
    }

    pub fn position_counts(&self) -> PositionCounts {
        PositionCounts::from_positions(self.players.iter().map(|p| p.position))
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Append a player.
    ///
    /// Checks, in order: capacity, duplicate id, position quota, club limit,
    /// budget. The squad is unchanged when any check fails.
    pub fn add_player(&mut self, player: Player) -> Result<(), SquadError> {
        let capacity = self.rules.squad_size();
        if self.players.len() >= capacity {
            return Err(SquadError::Capacity { capacity });
        }
        if self.contains(player.id) {
            return Err(SquadError::DuplicatePlayer { id: player.id });
        }

        let mut counts = self.position_counts();
        counts.add(player.position, 1);
        if let FormationVerdict::TooMany {
            position,
            count,
            max,
        } = check_squad(&counts, &self.rules, false)
        {
            return Err(SquadError::Position {
                position,
                count,
                max,
            });
        }

        let club = self.club_count(&player.team) + 1;
        if club > self.rules.max_per_club {
            return Err(SquadError::ClubLimit {
                team: player.team.clone(),
                count: club,
                max: self.rules.max_per_club,
            });
        }

        let total = price_sum(&self.players) + u64::from(player.price);
        if total > u64::from(self.rules.budget) {
            return Err(SquadError::Budget {
                total,
                budget: self.rules.budget,
            });
        }

        debug!("added player {} ({}, {})", player.id, player.position, player.team);
        self.players.push(player);
        Ok(())
    }

    /// Remove a player, returning it.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Player, SquadError> {
        let idx = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or(SquadError::UnknownPlayer { id })?;
        Ok(self.players.remove(idx))
    }

    /// A new squad with each `(outgoing id, incoming player)` swap applied in
    /// place, validated as a whole.
    ///
    /// Constraints are checked on the final composition only, so a pair of
    /// swaps that is legal together is accepted even if one of them alone
    /// would break the budget or a club limit.
    pub fn replace_players(&self, swaps: &[(PlayerId, Player)]) -> Result<Squad, SquadError> {
        let mut players = self.players.clone();
        let mut replaced: BTreeSet<usize> = BTreeSet::new();

        for (out_id, incoming) in swaps {
            let idx = self
                .players
                .iter()
                .position(|p| p.id == *out_id)
                .filter(|idx| !replaced.contains(idx))
                .ok_or(SquadError::UnknownPlayer { id: *out_id })?;
            replaced.insert(idx);
            players[idx] = incoming.clone();
        }

        validate_composition(&players, &self.rules)?;
        Ok(Squad {
            rules: self.rules.clone(),
            players,
        })
    }

    /// Re-check every composition invariant.
    pub fn validate(&self) -> Result<(), SquadError> {
        validate_composition(&self.players, &self.rules)
    }

    // -----------------------------------------------------------------------
    // Predictions
    // -----------------------------------------------------------------------

    /// Fetch predictions for every position in the squad (one predictor call
    /// per position) and cache them on the players.
    pub fn populate_predictions<P>(&mut self, predictor: &P, gameweek: u32, method: &str)
    where
        P: PointsPredictor + ?Sized,
    {
        let positions: Vec<Position> = self.players.iter().map(|p| p.position).collect();
        let ranked = ranked_by_position(predictor, gameweek, method, positions);
        self.apply_predictions(gameweek, method, &ranked);
    }

    /// Cache already-fetched ranked predictions on the matching players.
    ///
    /// Players absent from their position's list keep whatever they had
    /// (nothing, usually), which scores as 0.
    pub fn apply_predictions(
        &mut self,
        gameweek: u32,
        method: &str,
        ranked: &BTreeMap<Position, Vec<(PlayerId, f64)>>,
    ) {
        for player in &mut self.players {
            let found = ranked
                .get(&player.position)
                .and_then(|entries| entries.iter().find(|(id, _)| *id == player.id));
            match found {
                Some(&(_, points)) => player.set_predicted_points(method, gameweek, points),
                None => debug!(
                    "player {} missing from {} predictions gw={}",
                    player.id, player.position, gameweek
                ),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Scoring
    // -----------------------------------------------------------------------

    /// Best starting lineup and captaincy for a gameweek.
    pub fn select_starting_lineup(
        &self,
        gameweek: u32,
        method: &str,
    ) -> Result<Lineup, SquadError> {
        select_lineup(&self.players, &self.rules, gameweek, method)
    }

    /// Expected points of the best lineup, captain doubled.
    pub fn get_expected_points(&self, gameweek: u32, method: &str) -> Result<f64, SquadError> {
        Ok(self.select_starting_lineup(gameweek, method)?.expected_points())
    }

    pub fn expected_points_with_chips(
        &self,
        gameweek: u32,
        method: &str,
        chips: Chips,
    ) -> Result<f64, SquadError> {
        Ok(self
            .select_starting_lineup(gameweek, method)?
            .expected_points_with_chips(chips))
    }
}

/// Sum of prices, widened so a single oversized price cannot wrap.
pub fn price_sum<'a, I>(players: I) -> u64
where
    I: IntoIterator<Item = &'a Player>,
{
    players.into_iter().map(|p| u64::from(p.price)).sum()
}

/// Check unique ids, position quota, club limits and budget for a set of
/// players. A full-size set must match the quota exactly.
pub fn validate_composition(players: &[Player], rules: &SquadRules) -> Result<(), SquadError> {
    let capacity = rules.squad_size();
    if players.len() > capacity {
        return Err(SquadError::Capacity { capacity });
    }

    let mut seen = BTreeSet::new();
    for p in players {
        if !seen.insert(p.id) {
            return Err(SquadError::DuplicatePlayer { id: p.id });
        }
    }

    let counts = PositionCounts::from_positions(players.iter().map(|p| p.position));
    match check_squad(&counts, rules, players.len() == capacity) {
        FormationVerdict::Legal => {}
        FormationVerdict::TooMany {
            position,
            count,
            max,
        } => {
            return Err(SquadError::Position {
                position,
                count,
                max,
            })
        }
        // A full squad short at one position is over quota at another;
        // report the shortfall against the quota itself.
        FormationVerdict::TooFew {
            position, count, ..
        } => {
            return Err(SquadError::Position {
                position,
                count,
                max: rules.squad_quota.get(position),
            })
        }
        verdict @ FormationVerdict::WrongSize { .. } => {
            return Err(SquadError::Formation { verdict });
        }
    }

    let mut clubs: BTreeMap<&str, usize> = BTreeMap::new();
    for p in players {
        *clubs.entry(p.team.as_str()).or_default() += 1;
    }
    if let Some((team, &count)) = clubs.iter().find(|(_, &n)| n > rules.max_per_club) {
        return Err(SquadError::ClubLimit {
            team: team.to_string(),
            count,
            max: rules.max_per_club,
        });
    }

    let total = price_sum(players);
    if total > u64::from(rules.budget) {
        return Err(SquadError::Budget {
            total,
            budget: rules.budget,
        });
    }

    Ok(())
}
