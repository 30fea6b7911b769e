// Library root: squad evaluation and transfer search over injected
// points predictions.

pub mod error;
pub mod formation;
pub mod lineup;
pub mod player;
pub mod prediction;
pub mod squad;
pub mod transfer;

pub use error::SquadError;
pub use formation::{Band, FormationVerdict, PositionBands, PositionCounts, SquadRules};
pub use lineup::{Chips, Lineup};
pub use player::{Player, PlayerId, PlayerPool, Position};
pub use prediction::PointsPredictor;
pub use squad::Squad;
pub use transfer::{
    SearchOptions, Transfer, TransferDepth, TransferEvaluator, TransferOutcome, TransferPlan,
};
