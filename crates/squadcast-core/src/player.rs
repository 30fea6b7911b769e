// Player identity, position and cached points predictions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a player across data sources.
pub type PlayerId = u32;

/// Squad positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GK")]
    Goalkeeper,
    #[serde(rename = "DEF")]
    Defender,
    #[serde(rename = "MID")]
    Midfielder,
    #[serde(rename = "FWD")]
    Forward,
}

impl Position {
    /// All positions in display order.
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    /// Parse a position string into a Position enum.
    ///
    /// Accepts the short codes ("GK", "DEF", "MID", "FWD") plus the common
    /// long forms and "GKP" used by some data feeds. Case-insensitive.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GK" | "GKP" | "GOALKEEPER" => Some(Position::Goalkeeper),
            "DEF" | "DEFENDER" => Some(Position::Defender),
            "MID" | "MIDFIELDER" => Some(Position::Midfielder),
            "FWD" | "FW" | "FORWARD" => Some(Position::Forward),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    /// Whether this is an outfield position.
    pub fn is_outfield(&self) -> bool {
        !matches!(self, Position::Goalkeeper)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// A player that can be selected into a squad.
///
/// Identity, position, club and price are fixed for a run. Predictions are
/// cached per scoring method and gameweek; selection state lives on
/// [`crate::Lineup`], not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    /// Club identifier.
    pub team: String,
    /// Price in tenths of a currency unit (55 = 5.5m).
    pub price: u32,
    /// method -> gameweek -> predicted points.
    #[serde(default)]
    pub predicted_points: BTreeMap<String, BTreeMap<u32, f64>>,
}

impl Player {
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        position: Position,
        team: impl Into<String>,
        price: u32,
    ) -> Self {
        Player {
            id,
            name: name.into(),
            position,
            team: team.into(),
            price,
            predicted_points: BTreeMap::new(),
        }
    }

    /// Predicted points for a gameweek under a scoring method.
    ///
    /// A missing prediction is a blank gameweek and scores 0.
    pub fn expected_points(&self, gameweek: u32, method: &str) -> f64 {
        self.predicted_points
            .get(method)
            .and_then(|by_gw| by_gw.get(&gameweek))
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether a prediction is cached for this gameweek and method.
    pub fn has_prediction(&self, gameweek: u32, method: &str) -> bool {
        self.predicted_points
            .get(method)
            .is_some_and(|by_gw| by_gw.contains_key(&gameweek))
    }

    /// Record (or overwrite) a prediction.
    pub fn set_predicted_points(&mut self, method: &str, gameweek: u32, points: f64) {
        self.predicted_points
            .entry(method.to_string())
            .or_default()
            .insert(gameweek, points);
    }

    /// Builder-style variant of [`Player::set_predicted_points`].
    pub fn with_points(mut self, method: &str, gameweek: u32, points: f64) -> Self {
        self.set_predicted_points(method, gameweek, points);
        self
    }
}

// ---------------------------------------------------------------------------
// Player pool
// ---------------------------------------------------------------------------

/// Every player known to the data source, keyed by id.
///
/// The transfer search resolves prediction ids through the pool to learn a
/// candidate's position, club and price.
#[derive(Debug, Clone, Default)]
pub struct PlayerPool {
    players: BTreeMap<PlayerId, Player>,
}

impl PlayerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a player, replacing any previous record with the same id.
    pub fn insert(&mut self, player: Player) -> Option<Player> {
        self.players.insert(player.id, player)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Players in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }
}

impl FromIterator<Player> for PlayerPool {
    fn from_iter<I: IntoIterator<Item = Player>>(iter: I) -> Self {
        let mut pool = PlayerPool::new();
        for player in iter {
            pool.insert(player);
        }
        pool
    }
}
