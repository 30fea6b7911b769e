// The points-prediction capability consumed by lineup selection and
// transfer search.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::player::{PlayerId, Position};

/// Source of per-player predicted points.
///
/// For a gameweek, scoring method and position (optionally restricted to one
/// club) it returns `(player_id, points)` pairs sorted by points descending.
/// Implementations must be deterministic: the same query returns the same
/// sequence in the same order.
pub trait PointsPredictor {
    fn predicted_points(
        &self,
        gameweek: u32,
        method: &str,
        position: Position,
        team: Option<&str>,
    ) -> Vec<(PlayerId, f64)>;
}

impl<F> PointsPredictor for F
where
    F: Fn(u32, &str, Position, Option<&str>) -> Vec<(PlayerId, f64)>,
{
    fn predicted_points(
        &self,
        gameweek: u32,
        method: &str,
        position: Position,
        team: Option<&str>,
    ) -> Vec<(PlayerId, f64)> {
        self(gameweek, method, position, team)
    }
}

/// Sort `(id, points)` pairs by points descending, then id ascending.
///
/// NaN compares equal to everything, so it never reorders its neighbours
/// beyond the id tie-break.
pub fn sort_ranked(entries: &mut [(PlayerId, f64)]) {
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
}

/// Query the predictor once for each of `positions` (all clubs).
pub fn ranked_by_position<P, I>(
    predictor: &P,
    gameweek: u32,
    method: &str,
    positions: I,
) -> BTreeMap<Position, Vec<(PlayerId, f64)>>
where
    P: PointsPredictor + ?Sized,
    I: IntoIterator<Item = Position>,
{
    let mut ranked = BTreeMap::new();
    for position in positions {
        if ranked.contains_key(&position) {
            continue;
        }
        let entries = predictor.predicted_points(gameweek, method, position, None);
        debug!(
            "predictions gw={} method={} {}: {} players",
            gameweek,
            method,
            position,
            entries.len()
        );
        ranked.insert(position, entries);
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn closures_are_predictors() {
        let predictor = |gw: u32, method: &str, pos: Position, _team: Option<&str>| {
            if gw == 1 && method == "m" && pos == Position::Forward {
                vec![(9, 7.0), (3, 2.0)]
            } else {
                Vec::new()
            }
        };
        assert_eq!(
            predictor.predicted_points(1, "m", Position::Forward, None),
            vec![(9, 7.0), (3, 2.0)]
        );
        assert!(predictor
            .predicted_points(2, "m", Position::Forward, None)
            .is_empty());
    }

    #[test]
    fn sort_ranked_orders_by_points_then_id() {
        let mut entries = vec![(5, 2.0), (1, 3.0), (4, 2.0), (2, 6.5)];
        sort_ranked(&mut entries);
        assert_eq!(entries, vec![(2, 6.5), (1, 3.0), (4, 2.0), (5, 2.0)]);
    }

    #[test]
    fn ranked_by_position_queries_each_position_once() {
        let calls = Cell::new(0);
        let predictor = |_gw: u32, _m: &str, pos: Position, _t: Option<&str>| {
            calls.set(calls.get() + 1);
            vec![(pos as u32, 1.0)]
        };
        let ranked = ranked_by_position(
            &predictor,
            1,
            "m",
            [Position::Defender, Position::Defender, Position::Forward],
        );
        assert_eq!(calls.get(), 2);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.contains_key(&Position::Defender));
        assert!(ranked.contains_key(&Position::Forward));
    }
}
