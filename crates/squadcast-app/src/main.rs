// Squadcast entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr, so stdout carries the report)
// 2. Load config (optional path argument, else config/ then defaults/)
// 3. Load players and predictions
// 4. Evaluate the squad and print the report (text, or JSON with --json)

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use squadcast_app::{config, data, report};

fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let mut json = false;
    let mut config_path: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            other if config_path.is_none() => config_path = Some(PathBuf::from(other)),
            other => anyhow::bail!("unexpected argument: {other}"),
        }
    }

    let config = match &config_path {
        Some(path) => {
            let cwd = std::env::current_dir().context("failed to read working directory")?;
            config::load_config_file(path, &cwd)
        }
        None => config::load_config(),
    }
    .context("failed to load configuration")?;
    info!(
        "Config loaded: gw {}, method {}, budget {}",
        config.run.gameweek, config.run.method, config.rules.budget
    );

    let data = data::load_all(&config).context("failed to load player data")?;

    let report = report::build_report(&config, &data).context("failed to evaluate squad")?;
    if json {
        println!(
            "{}",
            report::render_json(&report).context("failed to serialize report")?
        );
    } else {
        print!("{}", report::render_text(&report, &data.pool));
    }

    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("squadcast=info,squadcast_core=info,squadcast_app=info,warn")
            }),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
