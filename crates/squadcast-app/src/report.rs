// Run report: lineup, expected points and recommended transfers for the
// configured squad, rendered as text or JSON.

use std::fmt::Write as _;

use serde::Serialize;
use tracing::info;

use squadcast_core::{
    Chips, Lineup, PlayerId, PlayerPool, Position, SquadError, TransferDepth, TransferEvaluator,
    TransferOutcome,
};

use crate::config::Config;
use crate::data::DataSet;

/// Role of a squad member in the selected lineup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Captain,
    ViceCaptain,
    Starter,
    Bench,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPlayer {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub team: String,
    pub price: u32,
    pub points: f64,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub gameweek: u32,
    pub method: String,
    pub total_price: u32,
    pub remaining_budget: u32,
    /// Starters first in squad order, then the bench in substitution order.
    pub players: Vec<ReportPlayer>,
    pub lineup: Lineup,
    pub expected_points: f64,
    pub chips: Chips,
    pub expected_points_with_chips: f64,
    pub single_transfer: TransferOutcome,
    pub double_transfer: TransferOutcome,
}

/// Evaluate the configured squad: pick the lineup and search for single and
/// double transfers.
pub fn build_report(config: &Config, data: &DataSet) -> Result<Report, SquadError> {
    let run = &config.run;
    let mut squad = data.squad_from_ids(&config.rules, &run.squad)?;
    squad.populate_predictions(&data.predictions, run.gameweek, &run.method);

    let lineup = squad.select_starting_lineup(run.gameweek, &run.method)?;
    let expected_points = lineup.expected_points();
    let expected_points_with_chips = lineup.expected_points_with_chips(run.chips);
    info!(
        "gw {} ({}): {} formation, captain {}, {:.2} expected points",
        run.gameweek, run.method, lineup.formation, lineup.captain, expected_points
    );

    let evaluator = TransferEvaluator::new(&data.predictions, &data.pool)
        .with_options(config.search.clone());
    let single_transfer =
        evaluator.evaluate(&squad, run.gameweek, &run.method, TransferDepth::Single)?;
    let double_transfer =
        evaluator.evaluate(&squad, run.gameweek, &run.method, TransferDepth::Double)?;

    let role = |id: PlayerId| {
        if lineup.is_captain(id) {
            Role::Captain
        } else if lineup.is_vice_captain(id) {
            Role::ViceCaptain
        } else if lineup.is_starting(id) {
            Role::Starter
        } else {
            Role::Bench
        }
    };
    let players = lineup
        .starters
        .iter()
        .chain(&lineup.bench)
        .filter_map(|&id| squad.get(id))
        .map(|p| ReportPlayer {
            id: p.id,
            name: p.name.clone(),
            position: p.position,
            team: p.team.clone(),
            price: p.price,
            points: lineup.points_for(p.id),
            role: role(p.id),
        })
        .collect();

    Ok(Report {
        gameweek: run.gameweek,
        method: run.method.clone(),
        total_price: squad.total_price(),
        remaining_budget: squad.remaining_budget(),
        players,
        lineup,
        expected_points,
        chips: run.chips,
        expected_points_with_chips,
        single_transfer,
        double_transfer,
    })
}

/// Price in tenths as "12.5".
fn format_price(price: u32) -> String {
    format!("{}.{}", price / 10, price % 10)
}

fn player_label(pool: &PlayerPool, id: PlayerId) -> String {
    match pool.get(id) {
        Some(p) => format!("{} ({} {}, {})", p.name, p.position, p.team, format_price(p.price)),
        None => format!("#{id}"),
    }
}

fn write_transfer(out: &mut String, title: &str, outcome: &TransferOutcome, pool: &PlayerPool) {
    let _ = writeln!(out, "{title}:");
    match outcome {
        TransferOutcome::Improved(plan) => {
            for t in &plan.transfers {
                let _ = writeln!(
                    out,
                    "  out {}  ->  in {}",
                    player_label(pool, t.out_id),
                    player_label(pool, t.in_id)
                );
            }
            let _ = writeln!(
                out,
                "  {:.2} -> {:.2} points (hit {:.1}, net {:+.2})",
                plan.baseline_points, plan.expected_points, plan.points_hit, plan.delta
            );
        }
        TransferOutcome::NoImprovement => {
            let _ = writeln!(out, "  no improving transfer");
        }
    }
}

/// Human-readable summary.
pub fn render_text(report: &Report, pool: &PlayerPool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Gameweek {} ({})  formation {}  squad value {}  in the bank {}",
        report.gameweek,
        report.method,
        report.lineup.formation,
        format_price(report.total_price),
        format_price(report.remaining_budget)
    );
    let _ = writeln!(out);

    let mut bench_started = false;
    for p in &report.players {
        if p.role == Role::Bench && !bench_started {
            let _ = writeln!(out, "  -- bench --");
            bench_started = true;
        }
        let marker = match p.role {
            Role::Captain => "(C)",
            Role::ViceCaptain => "(V)",
            Role::Starter | Role::Bench => "",
        };
        let _ = writeln!(
            out,
            "  {:<3} {:<24} {:<4} {:>5} {:>6.2} {}",
            p.position.display_str(),
            p.name,
            p.team,
            format_price(p.price),
            p.points,
            marker
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Expected points: {:.2}", report.expected_points);
    if report.chips != Chips::default() {
        let _ = writeln!(
            out,
            "With chips (bench boost: {}, triple captain: {}): {:.2}",
            report.chips.bench_boost, report.chips.triple_captain, report.expected_points_with_chips
        );
    }
    let _ = writeln!(out);

    write_transfer(&mut out, "Best single transfer", &report.single_transfer, pool);
    write_transfer(&mut out, "Best double transfer", &report.double_transfer, pool);
    out
}

/// Machine-readable summary.
pub fn render_json(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
