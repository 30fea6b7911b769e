// Player and prediction data loading.
//
// Two CSV files feed a run:
//   players.csv      id,name,position,team,price   (price in tenths)
//   predictions.csv  player_id,method,gameweek,points
//
// Bad rows are skipped with a warning rather than failing the load.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use squadcast_core::prediction::sort_ranked;
use squadcast_core::{
    Player, PlayerId, PlayerPool, PointsPredictor, Position, Squad, SquadError, SquadRules,
};

use crate::config::Config;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPlayer {
    id: PlayerId,
    name: String,
    position: String,
    #[serde(default)]
    team: String,
    price: u32,
    /// Absorb any extra columns the export includes.
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawPrediction {
    player_id: PlayerId,
    method: String,
    gameweek: u32,
    points: f64,
}

/// One predicted score.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    pub player_id: PlayerId,
    pub method: String,
    pub gameweek: u32,
    pub points: f64,
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<Player>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut players: Vec<Player> = Vec::new();
    for result in reader.deserialize::<RawPlayer>() {
        match result {
            Ok(raw) => {
                let name = raw.name.trim();
                let Some(position) = Position::from_str_pos(&raw.position) else {
                    warn!(
                        "skipping player {} '{}': unknown position '{}'",
                        raw.id, name, raw.position
                    );
                    continue;
                };
                if players.iter().any(|p| p.id == raw.id) {
                    warn!("skipping duplicate player id {} '{}'", raw.id, name);
                    continue;
                }
                players.push(Player::new(raw.id, name, position, raw.team.trim(), raw.price));
            }
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(players)
}

fn load_predictions_from_reader<R: Read>(rdr: R) -> Result<Vec<PredictionRow>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawPrediction>() {
        match result {
            Ok(raw) => {
                if !raw.points.is_finite() {
                    warn!(
                        "skipping prediction for player {} gw={} method={}: non-finite points",
                        raw.player_id, raw.gameweek, raw.method
                    );
                    continue;
                }
                rows.push(PredictionRow {
                    player_id: raw.player_id,
                    method: raw.method.trim().to_string(),
                    gameweek: raw.gameweek,
                    points: raw.points,
                });
            }
            Err(e) => {
                warn!("skipping malformed prediction row: {}", e);
            }
        }
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, DataError> {
    std::fs::File::open(path).map_err(|e| DataError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load the player universe from a CSV file.
pub fn load_players(path: &Path) -> Result<Vec<Player>, DataError> {
    load_players_from_reader(open(path)?).map_err(|e| DataError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load predicted points from a CSV file.
pub fn load_predictions(path: &Path) -> Result<Vec<PredictionRow>, DataError> {
    load_predictions_from_reader(open(path)?).map_err(|e| DataError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Prediction table
// ---------------------------------------------------------------------------

/// In-memory predictions answering ranked queries for the optimiser.
#[derive(Debug, Clone, Default)]
pub struct PredictionTable {
    /// (gameweek, method) -> player -> points
    scores: BTreeMap<(u32, String), BTreeMap<PlayerId, f64>>,
    /// Position and club of every player with at least one prediction.
    players: BTreeMap<PlayerId, (Position, String)>,
}

impl PredictionTable {
    /// Index `rows` against the pool. Predictions for players missing from
    /// the pool are dropped; a repeated (player, method, gameweek) keeps the
    /// latest value.
    pub fn new(pool: &PlayerPool, rows: impl IntoIterator<Item = PredictionRow>) -> Self {
        let mut table = PredictionTable::default();
        for row in rows {
            let Some(player) = pool.get(row.player_id) else {
                warn!("dropping prediction for unknown player {}", row.player_id);
                continue;
            };
            table
                .players
                .entry(player.id)
                .or_insert_with(|| (player.position, player.team.clone()));
            let previous = table
                .scores
                .entry((row.gameweek, row.method.clone()))
                .or_default()
                .insert(row.player_id, row.points);
            if previous.is_some() {
                warn!(
                    "duplicate prediction for player {} gw={} method={}, using latest value",
                    row.player_id, row.gameweek, row.method
                );
            }
        }
        table
    }

    /// Number of (player, gameweek, method) predictions held.
    pub fn len(&self) -> usize {
        self.scores.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scoring methods with predictions for `gameweek`.
    pub fn methods(&self, gameweek: u32) -> Vec<&str> {
        self.scores
            .keys()
            .filter(|(gw, _)| *gw == gameweek)
            .map(|(_, method)| method.as_str())
            .collect()
    }
}

impl PointsPredictor for PredictionTable {
    fn predicted_points(
        &self,
        gameweek: u32,
        method: &str,
        position: Position,
        team: Option<&str>,
    ) -> Vec<(PlayerId, f64)> {
        let Some(scores) = self.scores.get(&(gameweek, method.to_string())) else {
            return Vec::new();
        };
        let mut ranked: Vec<(PlayerId, f64)> = scores
            .iter()
            .filter(|(id, _)| {
                self.players.get(*id).is_some_and(|(pos, club)| {
                    *pos == position && team.map_or(true, |t| t == club.as_str())
                })
            })
            .map(|(&id, &points)| (id, points))
            .collect();
        sort_ranked(&mut ranked);
        ranked
    }
}

// ---------------------------------------------------------------------------
// Data set
// ---------------------------------------------------------------------------

/// Everything loaded for a run.
#[derive(Debug, Clone)]
pub struct DataSet {
    pub pool: PlayerPool,
    pub predictions: PredictionTable,
}

impl DataSet {
    /// Build the squad named by `ids` (in that order) from the pool.
    pub fn squad_from_ids(
        &self,
        rules: &SquadRules,
        ids: &[PlayerId],
    ) -> Result<Squad, SquadError> {
        let players = ids
            .iter()
            .map(|&id| {
                self.pool
                    .get(id)
                    .cloned()
                    .ok_or(SquadError::UnknownPlayer { id })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Squad::from_players(rules.clone(), players)
    }
}

/// Load players and predictions using paths from the config.
pub fn load_all(config: &Config) -> Result<DataSet, DataError> {
    load_all_from_paths(&config.players_path(), &config.predictions_path())
}

/// Load players and predictions from explicit paths.
pub fn load_all_from_paths(
    players_path: &Path,
    predictions_path: &Path,
) -> Result<DataSet, DataError> {
    let players = load_players(players_path)?;
    if players.is_empty() {
        return Err(DataError::Validation(
            "player CSV produced zero valid rows".into(),
        ));
    }
    let pool: PlayerPool = players.into_iter().collect();

    let rows = load_predictions(predictions_path)?;
    let predictions = PredictionTable::new(&pool, rows);
    info!(
        "loaded {} players and {} predictions",
        pool.len(),
        predictions.len()
    );

    Ok(DataSet { pool, predictions })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pool() -> PlayerPool {
        let csv_data = "\
id,name,position,team,price
1,Raya,GK,ARS,45
2,Saliba,DEF,ARS,50
3,Gabriel,DEF,ARS,55
4,Van Dijk,DEF,LIV,60";
        load_players_from_reader(csv_data.as_bytes())
            .unwrap()
            .into_iter()
            .collect()
    }

    fn row(player_id: PlayerId, method: &str, gameweek: u32, points: f64) -> PredictionRow {
        PredictionRow {
            player_id,
            method: method.into(),
            gameweek,
            points,
        }
    }

    // -- Players CSV --

    #[test]
    fn player_csv_roundtrip() {
        let csv_data = "\
id,name,position,team,price
1,Raya,GK,ARS,45
8,Salah,MID,LIV,130";

        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].id, 1);
        assert_eq!(players[0].name, "Raya");
        assert_eq!(players[0].position, Position::Goalkeeper);
        assert_eq!(players[0].team, "ARS");
        assert_eq!(players[0].price, 45);
        assert_eq!(players[1].position, Position::Midfielder);
        assert_eq!(players[1].price, 130);
    }

    #[test]
    fn player_csv_accepts_long_positions_and_extra_columns() {
        let csv_data = "\
id,name,position,team,price,status
1, Raya ,Goalkeeper, ARS ,45,a
2,Isak,forward,NEW,90,i";

        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "Raya");
        assert_eq!(players[0].team, "ARS");
        assert_eq!(players[1].position, Position::Forward);
    }

    #[test]
    fn player_csv_skips_bad_rows() {
        let csv_data = "\
id,name,position,team,price
1,Raya,GK,ARS,45
2,Arteta,MANAGER,ARS,50
3,Saka,MID,ARS,lots
1,Raya Again,GK,ARS,45
4,Rice,MID,ARS,65";

        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        let ids: Vec<PlayerId> = players.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 4]);
        assert_eq!(players[0].name, "Raya");
    }

    // -- Predictions CSV --

    #[test]
    fn prediction_csv_skips_non_finite_and_malformed() {
        let csv_data = "\
player_id,method,gameweek,points
1,xp,1,4.5
2,xp,1,NaN
3,xp,1,inf
4,xp,one,2.0
5, xp ,2,3.25";

        let rows = load_predictions_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows, vec![row(1, "xp", 1, 4.5), row(5, "xp", 2, 3.25)]);
    }

    // -- Prediction table --

    #[test]
    fn table_ranks_by_points_then_id() {
        let pool = sample_pool();
        let table = PredictionTable::new(
            &pool,
            vec![
                row(2, "xp", 1, 3.0),
                row(3, "xp", 1, 5.0),
                row(4, "xp", 1, 3.0),
                row(1, "xp", 1, 6.0),
            ],
        );

        assert_eq!(
            table.predicted_points(1, "xp", Position::Defender, None),
            vec![(3, 5.0), (2, 3.0), (4, 3.0)]
        );
        assert_eq!(
            table.predicted_points(1, "xp", Position::Goalkeeper, None),
            vec![(1, 6.0)]
        );
    }

    #[test]
    fn table_filters_by_team_gameweek_and_method() {
        let pool = sample_pool();
        let table = PredictionTable::new(
            &pool,
            vec![
                row(2, "xp", 1, 3.0),
                row(4, "xp", 1, 4.0),
                row(4, "xp", 2, 9.0),
                row(4, "form", 1, 1.0),
            ],
        );

        assert_eq!(
            table.predicted_points(1, "xp", Position::Defender, Some("ARS")),
            vec![(2, 3.0)]
        );
        assert_eq!(
            table.predicted_points(2, "xp", Position::Defender, None),
            vec![(4, 9.0)]
        );
        assert_eq!(
            table.predicted_points(1, "form", Position::Defender, None),
            vec![(4, 1.0)]
        );
        assert!(table
            .predicted_points(3, "xp", Position::Defender, None)
            .is_empty());
        assert_eq!(table.methods(1), vec!["form", "xp"]);
    }

    #[test]
    fn table_drops_unknown_players_and_keeps_latest_duplicate() {
        let pool = sample_pool();
        let table = PredictionTable::new(
            &pool,
            vec![row(99, "xp", 1, 20.0), row(2, "xp", 1, 3.0), row(2, "xp", 1, 4.0)],
        );
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.predicted_points(1, "xp", Position::Defender, None),
            vec![(2, 4.0)]
        );
    }

    #[test]
    fn squad_from_ids_reports_unknown_player() {
        let data = DataSet {
            pool: sample_pool(),
            predictions: PredictionTable::default(),
        };
        let err = data
            .squad_from_ids(&SquadRules::default(), &[1, 2, 42])
            .unwrap_err();
        assert_eq!(err, SquadError::UnknownPlayer { id: 42 });
    }

    #[test]
    fn empty_player_file_is_validation_error() {
        let dir = std::env::temp_dir().join("squadcast_data_empty_players");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let players = dir.join("players.csv");
        let predictions = dir.join("predictions.csv");
        std::fs::write(&players, "id,name,position,team,price\n").unwrap();
        std::fs::write(&predictions, "player_id,method,gameweek,points\n").unwrap();

        assert!(matches!(
            load_all_from_paths(&players, &predictions).unwrap_err(),
            DataError::Validation(_)
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_io_error() {
        let missing = Path::new("/nonexistent/squadcast/players.csv");
        assert!(matches!(load_players(missing).unwrap_err(), DataError::Io { .. }));
    }
}
