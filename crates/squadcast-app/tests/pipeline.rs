// Integration tests for the squadcast application.
//
// These load the CSV fixtures through the public data API, evaluate the
// configured squad and check the report end to end.

use std::fs;
use std::path::{Path, PathBuf};

use squadcast_app::config::{self, Config};
use squadcast_app::data::{self, DataSet};
use squadcast_app::report::{self, Role};
use squadcast_core::{PointsPredictor, Position, PositionCounts, Transfer, TransferOutcome};

// ===========================================================================
// Test helpers
// ===========================================================================

fn crate_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn fixtures() -> PathBuf {
    crate_root().join("tests").join("fixtures")
}

fn load_fixtures() -> DataSet {
    data::load_all_from_paths(
        &fixtures().join("players.csv"),
        &fixtures().join("predictions.csv"),
    )
    .expect("fixtures should load")
}

/// Write a config under a fresh temp dir whose data paths point at the
/// fixtures, with the given `[search]` body.
fn fixture_config(name: &str, search: &str) -> (Config, PathBuf) {
    let tmp = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&tmp);
    fs::create_dir_all(tmp.join("config")).unwrap();

    let text = format!(
        r#"
[search]
{search}

[run]
gameweek = 1
method = "xp"
squad = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]

[data_paths]
players = "{players}"
predictions = "{predictions}"
"#,
        players = path_str(&fixtures().join("players.csv")),
        predictions = path_str(&fixtures().join("predictions.csv")),
    );
    fs::write(tmp.join("config").join(config::CONFIG_FILE), text).unwrap();

    let config = config::load_config_from(&tmp).expect("fixture config should load");
    (config, tmp)
}

/// TOML-safe path string.
fn path_str(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

// ===========================================================================
// Data loading
// ===========================================================================

#[test]
fn fixtures_skip_bad_rows() {
    let data = load_fixtures();

    // Rows 23 (unknown position) and 24 (bad price) are dropped.
    assert_eq!(data.pool.len(), 22);
    assert!(data.pool.get(23).is_none());
    assert!(data.pool.get(24).is_none());

    // Unknown player 99 and the NaN / unparsable rows are dropped; 22 gw1 xp
    // rows, one gw2 row and one "form" row remain.
    assert_eq!(data.predictions.len(), 24);
    assert_eq!(data.predictions.methods(1), vec!["form", "xp"]);

    let forwards = data.predictions.predicted_points(1, "xp", Position::Forward, None);
    assert_eq!(
        forwards,
        vec![(20, 9.5), (13, 6.5), (21, 5.5), (14, 4.0), (15, 3.0)]
    );
    let mids_from_liverpool =
        data.predictions
            .predicted_points(1, "xp", Position::Midfielder, Some("LIV"));
    assert_eq!(mids_from_liverpool, vec![(8, 8.0), (19, 7.5)]);
}

// ===========================================================================
// Report
// ===========================================================================

#[test]
fn report_selects_lineup_and_transfers() {
    let (config, tmp) = fixture_config("squadcast_pipeline_report", "points_hit = 0.0");
    let data = data::load_all(&config).unwrap();
    let report = report::build_report(&config, &data).unwrap();

    assert_eq!(report.total_price, 980);
    assert_eq!(report.remaining_budget, 20);

    // 4-4-2 with the weakest player at each position on the bench.
    assert_eq!(report.lineup.formation, PositionCounts::new(1, 4, 4, 2));
    assert_eq!(report.lineup.bench, vec![2, 15, 12, 7]);
    assert_eq!(report.lineup.captain, 8);
    assert_eq!(report.lineup.vice_captain, 13);
    assert!((report.expected_points - 61.5).abs() < 1e-9);
    assert!((report.expected_points_with_chips - 61.5).abs() < 1e-9);

    let captain = report.players.iter().find(|p| p.id == 8).unwrap();
    assert_eq!(captain.role, Role::Captain);
    assert_eq!(report.players.len(), 15);
    assert_eq!(report.players.last().unwrap().role, Role::Bench);

    // Single: Saka for Foden. Haaland does not fit the budget on his own.
    let single = report.single_transfer.plan().unwrap();
    assert_eq!(single.transfers, vec![Transfer { out_id: 9, in_id: 18 }]);
    assert!((single.expected_points - 65.5).abs() < 1e-9);
    assert!((single.delta - 4.0).abs() < 1e-9);

    // Double: a cheaper defender upgrade pays for Haaland.
    let double = report.double_transfer.plan().unwrap();
    assert_eq!(
        double.transfers,
        vec![
            Transfer { out_id: 6, in_id: 17 },
            Transfer { out_id: 13, in_id: 20 },
        ]
    );
    assert!((double.expected_points - 69.0).abs() < 1e-9);
    assert!((double.delta - 7.5).abs() < 1e-9);
    assert_eq!(double.incoming_cost, 160);

    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn points_hit_applies_to_second_transfer_only() {
    let (config, tmp) = fixture_config(
        "squadcast_pipeline_hit",
        "free_transfers = 1\npoints_hit = 4.0",
    );
    let data = data::load_all(&config).unwrap();
    let report = report::build_report(&config, &data).unwrap();

    assert!((report.single_transfer.plan().unwrap().delta - 4.0).abs() < 1e-9);
    let double = report.double_transfer.plan().unwrap();
    assert!((double.points_hit - 4.0).abs() < 1e-9);
    assert!((double.delta - 3.5).abs() < 1e-9);

    let (config, tmp2) = fixture_config(
        "squadcast_pipeline_big_hit",
        "free_transfers = 1\npoints_hit = 10.0",
    );
    let report = report::build_report(&config, &data).unwrap();
    assert_eq!(report.double_transfer, TransferOutcome::NoImprovement);

    let _ = fs::remove_dir_all(&tmp);
    let _ = fs::remove_dir_all(&tmp2);
}

#[test]
fn report_renders_text_and_json() {
    let (config, tmp) = fixture_config("squadcast_pipeline_render", "points_hit = 0.0");
    let data = data::load_all(&config).unwrap();
    let report = report::build_report(&config, &data).unwrap();

    let text = report::render_text(&report, &data.pool);
    assert!(text.contains("formation 4-4-2"));
    assert!(text.contains("in the bank 2.0"));
    assert!(text.contains("-- bench --"));
    assert!(text.contains("Expected points: 61.50"));
    assert!(text.contains("out Foden (MID MCI, 10.0)  ->  in Saka (MID ARS, 12.0)"));

    let json: serde_json::Value =
        serde_json::from_str(&report::render_json(&report).unwrap()).unwrap();
    assert_eq!(json["gameweek"], 1);
    assert_eq!(json["lineup"]["captain"], 8);
    assert_eq!(json["lineup"]["formation"]["DEF"], 4);
    assert_eq!(json["single_transfer"]["outcome"], "improved");
    assert_eq!(json["single_transfer"]["transfers"][0]["in_id"], 18);
    assert_eq!(json["players"][0]["role"], "starter");

    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn unknown_squad_player_is_an_error() {
    let (mut config, tmp) = fixture_config("squadcast_pipeline_unknown", "");
    config.run.squad[14] = 404;
    let data = data::load_all(&config).unwrap();
    assert!(report::build_report(&config, &data).is_err());
    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn shipped_defaults_run_against_sample_data() {
    let config = config::load_config_from(&crate_root()).unwrap();
    let data = data::load_all(&config).unwrap();
    let report = report::build_report(&config, &data).unwrap();
    assert_eq!(report.players.len(), 15);
    assert!(report.single_transfer.is_improvement());
}
