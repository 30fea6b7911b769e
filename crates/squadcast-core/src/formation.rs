// Position quotas, formation bands and the shared legality check.
//
// Every place that needs to know whether a set of players is legal (squad
// construction, transfer simulation, each lineup swap) goes through
// `check_counts`, so the rules live in one spot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::player::Position;

// ---------------------------------------------------------------------------
// Per-position containers
// ---------------------------------------------------------------------------

/// A count per position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionCounts {
    #[serde(rename = "GK")]
    pub gk: usize,
    #[serde(rename = "DEF")]
    pub def: usize,
    #[serde(rename = "MID")]
    pub mid: usize,
    #[serde(rename = "FWD")]
    pub fwd: usize,
}

impl PositionCounts {
    pub const fn new(gk: usize, def: usize, mid: usize, fwd: usize) -> Self {
        PositionCounts { gk, def, mid, fwd }
    }

    /// Tally the given positions.
    pub fn from_positions<I: IntoIterator<Item = Position>>(positions: I) -> Self {
        let mut counts = PositionCounts::default();
        for pos in positions {
            counts.add(pos, 1);
        }
        counts
    }

    pub fn get(&self, pos: Position) -> usize {
        match pos {
            Position::Goalkeeper => self.gk,
            Position::Defender => self.def,
            Position::Midfielder => self.mid,
            Position::Forward => self.fwd,
        }
    }

    fn slot_mut(&mut self, pos: Position) -> &mut usize {
        match pos {
            Position::Goalkeeper => &mut self.gk,
            Position::Defender => &mut self.def,
            Position::Midfielder => &mut self.mid,
            Position::Forward => &mut self.fwd,
        }
    }

    pub fn add(&mut self, pos: Position, n: usize) {
        *self.slot_mut(pos) += n;
    }

    pub fn remove(&mut self, pos: Position, n: usize) {
        let slot = self.slot_mut(pos);
        *slot = slot.saturating_sub(n);
    }

    /// Counts after moving one player out of `from` and one into `to`.
    pub fn swapped(&self, from: Position, to: Position) -> Self {
        let mut next = *self;
        next.remove(from, 1);
        next.add(to, 1);
        next
    }

    pub fn total(&self) -> usize {
        self.gk + self.def + self.mid + self.fwd
    }
}

impl fmt::Display for PositionCounts {
    /// Outfield shape, e.g. "4-4-2".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.def, self.mid, self.fwd)
    }
}

/// Inclusive min/max count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub min: usize,
    pub max: usize,
}

impl Band {
    pub const fn new(min: usize, max: usize) -> Self {
        Band { min, max }
    }

    pub fn contains(&self, n: usize) -> bool {
        (self.min..=self.max).contains(&n)
    }
}

/// A band per position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionBands {
    #[serde(rename = "GK")]
    pub gk: Band,
    #[serde(rename = "DEF")]
    pub def: Band,
    #[serde(rename = "MID")]
    pub mid: Band,
    #[serde(rename = "FWD")]
    pub fwd: Band,
}

impl PositionBands {
    pub fn get(&self, pos: Position) -> Band {
        match pos {
            Position::Goalkeeper => self.gk,
            Position::Defender => self.def,
            Position::Midfielder => self.mid,
            Position::Forward => self.fwd,
        }
    }

    /// Bands that only cap each position at `maxima`.
    pub fn up_to(maxima: &PositionCounts) -> Self {
        PositionBands {
            gk: Band::new(0, maxima.gk),
            def: Band::new(0, maxima.def),
            mid: Band::new(0, maxima.mid),
            fwd: Band::new(0, maxima.fwd),
        }
    }

    /// Bands that require exactly `counts` per position.
    pub fn exactly(counts: &PositionCounts) -> Self {
        PositionBands {
            gk: Band::new(counts.gk, counts.gk),
            def: Band::new(counts.def, counts.def),
            mid: Band::new(counts.mid, counts.mid),
            fwd: Band::new(counts.fwd, counts.fwd),
        }
    }
}

// ---------------------------------------------------------------------------
// Squad rules
// ---------------------------------------------------------------------------

/// Game rules a squad is built and scored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquadRules {
    /// Price ceiling for the whole squad, in tenths.
    pub budget: u32,
    /// Maximum players from a single club.
    pub max_per_club: usize,
    /// Number of starters.
    pub starting_size: usize,
    /// Players per position in a complete squad.
    pub squad_quota: PositionCounts,
    /// Legal starter counts per position.
    pub starting_bands: PositionBands,
    /// Shape the lineup search starts from.
    pub default_formation: PositionCounts,
}

impl Default for SquadRules {
    fn default() -> Self {
        SquadRules {
            budget: 1000,
            max_per_club: 3,
            starting_size: 11,
            squad_quota: PositionCounts::new(2, 5, 5, 3),
            starting_bands: PositionBands {
                gk: Band::new(1, 1),
                def: Band::new(3, 5),
                mid: Band::new(2, 5),
                fwd: Band::new(1, 3),
            },
            default_formation: PositionCounts::new(1, 4, 4, 2),
        }
    }
}

impl SquadRules {
    /// Players in a complete squad.
    pub fn squad_size(&self) -> usize {
        self.squad_quota.total()
    }
}

// ---------------------------------------------------------------------------
// Legality check
// ---------------------------------------------------------------------------

/// Outcome of checking a set of position counts against bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormationVerdict {
    Legal,
    TooFew {
        position: Position,
        count: usize,
        min: usize,
    },
    TooMany {
        position: Position,
        count: usize,
        max: usize,
    },
    WrongSize {
        expected: usize,
        actual: usize,
    },
}

impl FormationVerdict {
    pub fn is_legal(&self) -> bool {
        matches!(self, FormationVerdict::Legal)
    }
}

impl fmt::Display for FormationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormationVerdict::Legal => write!(f, "legal"),
            FormationVerdict::TooFew {
                position,
                count,
                min,
            } => write!(f, "{count} {position} below minimum {min}"),
            FormationVerdict::TooMany {
                position,
                count,
                max,
            } => write!(f, "{count} {position} above maximum {max}"),
            FormationVerdict::WrongSize { expected, actual } => {
                write!(f, "{actual} players, expected {expected}")
            }
        }
    }
}

/// Check position counts against bands and, optionally, an exact total.
///
/// Positions are checked in display order (GK, DEF, MID, FWD), maxima before
/// minima, then the total. The first violation found is returned.
pub fn check_counts(
    counts: &PositionCounts,
    bands: &PositionBands,
    size: Option<usize>,
) -> FormationVerdict {
    for position in Position::ALL {
        let count = counts.get(position);
        let band = bands.get(position);
        if count > band.max {
            return FormationVerdict::TooMany {
                position,
                count,
                max: band.max,
            };
        }
        if count < band.min {
            return FormationVerdict::TooFew {
                position,
                count,
                min: band.min,
            };
        }
    }

    if let Some(expected) = size {
        let actual = counts.total();
        if actual != expected {
            return FormationVerdict::WrongSize { expected, actual };
        }
    }

    FormationVerdict::Legal
}

/// Check a starting lineup's counts against the rules.
pub fn check_starting(counts: &PositionCounts, rules: &SquadRules) -> FormationVerdict {
    check_counts(counts, &rules.starting_bands, Some(rules.starting_size))
}

/// Check squad counts against the quota; a partial squad only has to stay
/// under it.
pub fn check_squad(
    counts: &PositionCounts,
    rules: &SquadRules,
    complete: bool,
) -> FormationVerdict {
    if complete {
        check_counts(
            counts,
            &PositionBands::exactly(&rules.squad_quota),
            Some(rules.squad_size()),
        )
    } else {
        check_counts(counts, &PositionBands::up_to(&rules.squad_quota), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_describe_fifteen_man_squad() {
        let rules = SquadRules::default();
        assert_eq!(rules.squad_size(), 15);
        assert_eq!(rules.starting_size, 11);
        assert_eq!(rules.default_formation.total(), 11);
        assert!(check_starting(&rules.default_formation, &rules).is_legal());
    }

    #[test]
    fn legal_formations_pass() {
        let rules = SquadRules::default();
        for (def, mid, fwd) in [(4, 4, 2), (3, 5, 2), (5, 4, 1), (3, 4, 3), (5, 2, 3), (4, 5, 1)] {
            let counts = PositionCounts::new(1, def, mid, fwd);
            assert_eq!(check_starting(&counts, &rules), FormationVerdict::Legal, "{counts}");
        }
    }

    #[test]
    fn too_few_defenders_rejected() {
        let rules = SquadRules::default();
        let counts = PositionCounts::new(1, 2, 5, 3);
        assert_eq!(
            check_starting(&counts, &rules),
            FormationVerdict::TooFew {
                position: Position::Defender,
                count: 2,
                min: 3
            }
        );
    }

    #[test]
    fn two_goalkeepers_rejected() {
        let rules = SquadRules::default();
        let counts = PositionCounts::new(2, 4, 3, 2);
        assert_eq!(
            check_starting(&counts, &rules),
            FormationVerdict::TooMany {
                position: Position::Goalkeeper,
                count: 2,
                max: 1
            }
        );
    }

    #[test]
    fn wrong_total_rejected_after_bands() {
        let rules = SquadRules::default();
        let counts = PositionCounts::new(1, 4, 4, 1);
        assert_eq!(
            check_starting(&counts, &rules),
            FormationVerdict::WrongSize {
                expected: 11,
                actual: 10
            }
        );
    }

    #[test]
    fn partial_squad_only_checks_maxima() {
        let rules = SquadRules::default();
        let partial = PositionCounts::new(1, 0, 5, 0);
        assert!(check_squad(&partial, &rules, false).is_legal());
        assert!(!check_squad(&partial, &rules, true).is_legal());

        let over = PositionCounts::new(3, 0, 0, 0);
        assert_eq!(
            check_squad(&over, &rules, false),
            FormationVerdict::TooMany {
                position: Position::Goalkeeper,
                count: 3,
                max: 2
            }
        );
    }

    #[test]
    fn complete_squad_must_match_quota() {
        let rules = SquadRules::default();
        assert!(check_squad(&PositionCounts::new(2, 5, 5, 3), &rules, true).is_legal());
        assert_eq!(
            check_squad(&PositionCounts::new(2, 4, 6, 3), &rules, true),
            FormationVerdict::TooFew {
                position: Position::Defender,
                count: 4,
                min: 5
            }
        );
    }

    #[test]
    fn counts_tally_and_swap() {
        let counts = PositionCounts::from_positions([
            Position::Goalkeeper,
            Position::Defender,
            Position::Defender,
            Position::Forward,
        ]);
        assert_eq!(counts, PositionCounts::new(1, 2, 0, 1));
        let swapped = counts.swapped(Position::Defender, Position::Midfielder);
        assert_eq!(swapped, PositionCounts::new(1, 1, 1, 1));
        assert_eq!(swapped.total(), counts.total());
        assert_eq!(PositionCounts::new(1, 4, 4, 2).to_string(), "4-4-2");
    }
}
