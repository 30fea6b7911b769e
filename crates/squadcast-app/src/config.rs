// Configuration loading and validation (squadcast.toml).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use squadcast_core::formation::check_starting;
use squadcast_core::{Chips, PlayerId, Position, SearchOptions, SquadRules};

pub const CONFIG_FILE: &str = "squadcast.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub rules: SquadRules,
    pub search: SearchOptions,
    pub run: RunConfig,
    pub data_paths: DataPaths,
    /// Directory relative data paths are resolved against.
    pub base_dir: PathBuf,
}

/// Raw deserialization target for squadcast.toml.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    rules: SquadRules,
    #[serde(default)]
    search: SearchOptions,
    run: RunConfig,
    data_paths: DataPaths,
}

/// What to evaluate: the gameweek, scoring method and current squad.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub gameweek: u32,
    pub method: String,
    /// Player ids in squad order.
    pub squad: Vec<PlayerId>,
    #[serde(default)]
    pub chips: Chips,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub players: String,
    pub predictions: String,
}

impl Config {
    pub fn players_path(&self) -> PathBuf {
        self.base_dir.join(&self.data_paths.players)
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.base_dir.join(&self.data_paths.predictions)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load `config/squadcast.toml` under `base_dir`, falling back to
/// `defaults/squadcast.toml` when the user config does not exist.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let user_path = base_dir.join("config").join(CONFIG_FILE);
    let path = if user_path.exists() {
        user_path
    } else {
        let defaults_path = base_dir.join("defaults").join(CONFIG_FILE);
        if !defaults_path.exists() {
            return Err(ConfigError::FileNotFound { path: user_path });
        }
        defaults_path
    };
    load_config_file(&path, base_dir)
}

/// Load and validate a single config file. Data paths are resolved against
/// `base_dir`.
pub fn load_config_file(path: &Path, base_dir: &Path) -> Result<Config, ConfigError> {
    let text = read_file(path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = Config {
        rules: file.rules,
        search: file.search,
        run: file.run,
        data_paths: file.data_paths,
        base_dir: base_dir.to_path_buf(),
    };

    validate(&config)?;

    Ok(config)
}

/// Convenience wrapper: loads config relative to the current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_rules(&config.rules)?;

    // Search validations
    let search = &config.search;
    if search.max_candidates_per_position == Some(0) {
        return Err(invalid(
            "search.max_candidates_per_position",
            "must be > 0 when set",
        ));
    }
    if !search.points_hit.is_finite() || search.points_hit < 0.0 {
        return Err(invalid(
            "search.points_hit",
            format!("must be a finite number >= 0, got {}", search.points_hit),
        ));
    }

    // Run validations
    let run = &config.run;
    if run.gameweek == 0 {
        return Err(invalid("run.gameweek", "must be greater than 0"));
    }
    if run.method.trim().is_empty() {
        return Err(invalid("run.method", "must not be empty"));
    }
    let squad_size = config.rules.squad_size();
    if run.squad.len() != squad_size {
        return Err(invalid(
            "run.squad",
            format!("must list {} player ids, got {}", squad_size, run.squad.len()),
        ));
    }
    let mut seen = BTreeSet::new();
    for id in &run.squad {
        if !seen.insert(*id) {
            return Err(invalid("run.squad", format!("player {id} listed twice")));
        }
    }

    Ok(())
}

fn validate_rules(rules: &SquadRules) -> Result<(), ConfigError> {
    if rules.budget == 0 {
        return Err(invalid("rules.budget", "must be greater than 0"));
    }
    if rules.max_per_club == 0 {
        return Err(invalid("rules.max_per_club", "must be greater than 0"));
    }
    if rules.squad_size() != 15 {
        return Err(invalid(
            "rules.squad_quota",
            format!("must sum to 15 players, got {}", rules.squad_size()),
        ));
    }
    if rules.starting_size < 2 || rules.starting_size > rules.squad_size() {
        return Err(invalid(
            "rules.starting_size",
            format!(
                "must be between 2 and {}, got {}",
                rules.squad_size(),
                rules.starting_size
            ),
        ));
    }

    for position in Position::ALL {
        let band = rules.starting_bands.get(position);
        if band.min > band.max {
            return Err(invalid(
                &format!("rules.starting_bands.{position}"),
                format!("min {} exceeds max {}", band.min, band.max),
            ));
        }
        if band.max > rules.squad_quota.get(position) {
            return Err(invalid(
                &format!("rules.starting_bands.{position}"),
                format!(
                    "max {} exceeds squad quota {}",
                    band.max,
                    rules.squad_quota.get(position)
                ),
            ));
        }
    }

    let gk = rules.starting_bands.get(Position::Goalkeeper);
    if gk.min != 1 || gk.max != 1 {
        return Err(invalid(
            "rules.starting_bands.GK",
            "exactly one goalkeeper must start",
        ));
    }

    let verdict = check_starting(&rules.default_formation, rules);
    if !verdict.is_legal() {
        return Err(invalid(
            "rules.default_formation",
            format!("not a legal starting formation: {verdict}"),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
