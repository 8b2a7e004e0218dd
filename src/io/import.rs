//! Loads a game from a directory of flat CSV files.
//!
//! Expected files:
//!
//! * `portfolios.csv`: one row per unit, carrying its portfolio
//! * `players.csv` (optional): portfolios taking part and their starting money
//! * `schedule.csv`: one row per `(round, hour)`
//! * `game_settings.csv` (optional): `setting,value` pairs

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::GameConfig;
use crate::market::types::{AdjustmentMode, GameSettings, Portfolio, PortfolioId, ScheduleEntry, Unit, Zone};

/// Failure while reading a CSV config directory.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("cannot read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
    #[error("game setting \"{setting}\" has unusable value \"{value}\"")]
    Setting { setting: String, value: String },
}

#[derive(Debug, Deserialize)]
struct UnitRow {
    portfolio_id: PortfolioId,
    portfolio_name: String,
    unit_id: u32,
    #[serde(default)]
    unit_name: String,
    unit_location: Zone,
    unit_capacity: Decimal,
    cost_per_mwh: Decimal,
    #[serde(default)]
    cost_daily_om: Decimal,
    #[serde(default)]
    carbon_per_mwh: Decimal,
}

#[derive(Debug, Deserialize)]
struct PlayerRow {
    portfolio_id: PortfolioId,
    #[serde(default)]
    portfolio: Option<String>,
    #[serde(default)]
    starting_money: Decimal,
}

#[derive(Debug, Deserialize)]
struct SettingRow {
    setting: String,
    value: String,
}

/// Reads a [`GameConfig`] from `dir`. The result is not validated.
///
/// # Errors
///
/// Returns an [`ImportError`] naming the offending file.
pub fn load_config_dir(dir: &Path) -> Result<GameConfig, ImportError> {
    let unit_rows: Vec<UnitRow> = read_rows(dir, "portfolios.csv")?;
    let schedule: Vec<ScheduleEntry> = read_rows(dir, "schedule.csv")?;
    let players: Option<Vec<PlayerRow>> = read_optional_rows(dir, "players.csv")?;
    let settings = match read_optional_rows::<SettingRow>(dir, "game_settings.csv")? {
        Some(rows) => parse_settings(&rows)?,
        None => GameSettings::default(),
    };

    let mut names: BTreeMap<PortfolioId, String> = BTreeMap::new();
    for row in &unit_rows {
        names
            .entry(row.portfolio_id)
            .or_insert_with(|| row.portfolio_name.clone());
    }

    // players.csv restricts the game to the portfolios that have a player.
    let portfolios: Vec<Portfolio> = match players {
        Some(players) => players
            .into_iter()
            .map(|p| Portfolio {
                portfolio_id: p.portfolio_id,
                name: p
                    .portfolio
                    .or_else(|| names.get(&p.portfolio_id).cloned())
                    .unwrap_or_default(),
                starting_money: p.starting_money,
            })
            .collect(),
        None => names
            .into_iter()
            .map(|(portfolio_id, name)| Portfolio {
                portfolio_id,
                name,
                starting_money: Decimal::ZERO,
            })
            .collect(),
    };

    let units = unit_rows
        .into_iter()
        .filter(|u| portfolios.iter().any(|p| p.portfolio_id == u.portfolio_id))
        .map(|u| Unit {
            unit_id: u.unit_id,
            unit_name: u.unit_name,
            portfolio_id: u.portfolio_id,
            zone: u.unit_location,
            capacity: u.unit_capacity,
            variable_cost_per_mwh: u.cost_per_mwh,
            daily_fixed_cost: u.cost_daily_om,
            carbon_per_mwh: u.carbon_per_mwh,
        })
        .collect::<Vec<_>>();

    debug!(
        dir = %dir.display(),
        units = units.len(),
        portfolios = portfolios.len(),
        hours = schedule.len(),
        "loaded csv config"
    );

    Ok(GameConfig {
        settings,
        portfolios,
        units,
        schedule,
    })
}

/// Parses `setting,value` rows. Unknown settings are ignored.
fn parse_settings(rows: &[SettingRow]) -> Result<GameSettings, ImportError> {
    let mut settings = GameSettings::default();
    for row in rows {
        let value = row.value.trim();
        let bad = || ImportError::Setting {
            setting: row.setting.clone(),
            value: row.value.clone(),
        };
        let number = || value.parse::<Decimal>().map_err(|_| bad());
        match row.setting.trim().to_ascii_lowercase().as_str() {
            "min bid" => settings.min_bid = number()?,
            "max bid" => settings.max_bid = number()?,
            "carbon tax rate" => settings.carbon_tax_rate = number()?,
            "interest rate" => settings.interest_rate = number()?,
            "carbon" => settings.carbon_enabled = value.eq_ignore_ascii_case("enabled"),
            "adjustment" => {
                settings.adjustment_mode = match value.to_ascii_lowercase().as_str() {
                    "disabled" => AdjustmentMode::Disabled,
                    "per portfolio" | "per-portfolio" => AdjustmentMode::PerPortfolio,
                    "per unit" | "per-unit" => AdjustmentMode::PerUnit,
                    _ => return Err(bad()),
                };
            }
            other => debug!(setting = other, "ignoring unknown game setting"),
        }
    }
    Ok(settings)
}

fn read_rows<T: for<'de> Deserialize<'de>>(dir: &Path, file: &str) -> Result<Vec<T>, ImportError> {
    let reader = File::open(dir.join(file)).map_err(|source| ImportError::Io {
        file: file.to_string(),
        source,
    })?;
    parse_rows(reader, file)
}

fn read_optional_rows<T: for<'de> Deserialize<'de>>(
    dir: &Path,
    file: &str,
) -> Result<Option<Vec<T>>, ImportError> {
    if dir.join(file).exists() {
        read_rows(dir, file).map(Some)
    } else {
        Ok(None)
    }
}

fn parse_rows<T: for<'de> Deserialize<'de>>(reader: impl Read, file: &str) -> Result<Vec<T>, ImportError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| ImportError::Csv {
            file: file.to_string(),
            source,
        })
}
