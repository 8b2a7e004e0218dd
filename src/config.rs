//! TOML-based game configuration and preset definitions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::market::types::{
    AdjustmentMode, AuctionType, GameSettings, Portfolio, ScheduleEntry, Unit, Zone,
};

/// Top-level game configuration parsed from TOML.
///
/// Load from TOML with [`GameConfig::from_toml_file`] or use one of the
/// built-in presets such as [`GameConfig::classroom`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameConfig {
    /// Bid bounds, adjustment mode, carbon and interest settings.
    #[serde(default)]
    pub settings: GameSettings,
    /// Participating portfolios with their starting money.
    #[serde(default)]
    pub portfolios: Vec<Portfolio>,
    /// Unit roster.
    #[serde(default)]
    pub units: Vec<Unit>,
    /// Demand and transmission schedule, one entry per `(round, hour)`.
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"units[2].capacity"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Hourly net demand profile shared by the presets (MWh).
const PRESET_NET_DEMAND: [i64; 4] = [500, 700, 850, 600];

impl GameConfig {
    /// Available preset names.
    pub const PRESETS: &[&str] = &["classroom", "congested"];

    /// Three portfolios, six units, two rounds of four hours, loose transmission.
    pub fn classroom() -> Self {
        Self {
            settings: GameSettings {
                min_bid: Decimal::from(-100),
                max_bid: Decimal::from(500),
                adjustment_mode: AdjustmentMode::PerUnit,
                carbon_enabled: false,
                carbon_tax_rate: Decimal::ZERO,
                interest_rate: Decimal::new(5, 2),
            },
            portfolios: preset_portfolios(),
            units: preset_units(),
            schedule: preset_schedule(Decimal::from(200), Decimal::from(200)),
        }
    }

    /// Same roster as `classroom` with a tight link and a carbon tax.
    pub fn congested() -> Self {
        Self {
            settings: GameSettings {
                carbon_enabled: true,
                carbon_tax_rate: Decimal::from(10),
                ..Self::classroom().settings
            },
            schedule: preset_schedule(Decimal::from(25), Decimal::from(25)),
            ..Self::classroom()
        }
    }

    /// Loads a game from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "classroom" => Ok(Self::classroom()),
            "congested" => Ok(Self::congested()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a game from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("game", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a game from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        self.validate_settings(&mut errors);

        let mut portfolio_ids = BTreeSet::new();
        if self.portfolios.is_empty() {
            errors.push(ConfigError::new("portfolios", "at least one portfolio is required"));
        }
        for (i, p) in self.portfolios.iter().enumerate() {
            if !portfolio_ids.insert(p.portfolio_id) {
                errors.push(ConfigError::new(
                    format!("portfolios[{i}].portfolio_id"),
                    format!("duplicate portfolio id {}", p.portfolio_id),
                ));
            }
        }

        self.validate_units(&portfolio_ids, &mut errors);
        self.validate_schedule(&mut errors);
        errors
    }

    fn validate_settings(&self, errors: &mut Vec<ConfigError>) {
        let s = &self.settings;
        if s.min_bid >= s.max_bid {
            errors.push(ConfigError::new("settings.min_bid", "must be < settings.max_bid"));
        }
        if s.carbon_tax_rate < Decimal::ZERO {
            errors.push(ConfigError::new("settings.carbon_tax_rate", "must be >= 0"));
        }
        if s.interest_rate <= Decimal::NEGATIVE_ONE {
            errors.push(ConfigError::new("settings.interest_rate", "must be > -1"));
        }
    }

    fn validate_units(&self, portfolio_ids: &BTreeSet<u32>, errors: &mut Vec<ConfigError>) {
        if self.units.is_empty() {
            errors.push(ConfigError::new("units", "at least one unit is required"));
        }
        let mut unit_ids = BTreeSet::new();
        for (i, u) in self.units.iter().enumerate() {
            if !unit_ids.insert(u.unit_id) {
                errors.push(ConfigError::new(
                    format!("units[{i}].unit_id"),
                    format!("duplicate unit id {}", u.unit_id),
                ));
            }
            if !portfolio_ids.contains(&u.portfolio_id) {
                errors.push(ConfigError::new(
                    format!("units[{i}].portfolio_id"),
                    format!("portfolio {} is not configured", u.portfolio_id),
                ));
            }
            let non_negative = [
                ("capacity", u.capacity),
                ("variable_cost_per_mwh", u.variable_cost_per_mwh),
                ("daily_fixed_cost", u.daily_fixed_cost),
                ("carbon_per_mwh", u.carbon_per_mwh),
            ];
            for (name, value) in non_negative {
                if value < Decimal::ZERO {
                    errors.push(ConfigError::new(format!("units[{i}].{name}"), "must be >= 0"));
                }
            }
        }
    }

    fn validate_schedule(&self, errors: &mut Vec<ConfigError>) {
        if self.schedule.is_empty() {
            errors.push(ConfigError::new("schedule", "at least one hour is required"));
            return;
        }

        let mut rounds: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for (i, e) in self.schedule.iter().enumerate() {
            let hours = rounds.entry(e.round).or_default();
            if hours.contains(&e.hour) {
                errors.push(ConfigError::new(
                    format!("schedule[{i}]"),
                    format!("duplicate entry for round {} hour {}", e.round, e.hour),
                ));
            } else {
                hours.push(e.hour);
            }

            if e.slope > Decimal::ZERO {
                errors.push(ConfigError::new(
                    format!("schedule[{i}].slope"),
                    "must be <= 0 (demand curve slopes downward)",
                ));
            }
            let non_negative = [
                ("north", e.north),
                ("south", e.south),
                ("net", e.net),
                ("n_to_s_capacity", e.n_to_s_capacity),
                ("s_to_n_capacity", e.s_to_n_capacity),
            ];
            for (name, value) in non_negative {
                if value < Decimal::ZERO {
                    errors.push(ConfigError::new(format!("schedule[{i}].{name}"), "must be >= 0"));
                }
            }
        }

        for (expected, (&round, hours)) in (1u32..).zip(rounds.iter_mut()) {
            if round != expected {
                errors.push(ConfigError::new(
                    "schedule.round",
                    format!("rounds must be numbered 1.. without gaps, found {round} where {expected} was expected"),
                ));
                break;
            }
            hours.sort_unstable();
            let gapless = hours.iter().zip(1u32..).all(|(&h, want)| h == want);
            if !gapless {
                errors.push(ConfigError::new(
                    "schedule.hour",
                    format!("hours of round {round} must be numbered 1.. without gaps"),
                ));
            }
        }
    }
}

fn preset_portfolios() -> Vec<Portfolio> {
    [(1, "Coal Corp"), (2, "Green Gen"), (3, "Peakers Inc")]
        .into_iter()
        .map(|(portfolio_id, name)| Portfolio {
            portfolio_id,
            name: name.to_string(),
            starting_money: Decimal::from(10_000),
        })
        .collect()
}

fn preset_units() -> Vec<Unit> {
    // (id, name, portfolio, zone, capacity, variable cost, daily O&M, carbon t/MWh x10)
    let rows = [
        (1, "Big Coal", 1, Zone::North, 300, 18, 1500, 10),
        (2, "Old Coal", 1, Zone::South, 200, 24, 1000, 11),
        (3, "Wind Farm", 2, Zone::North, 150, 0, 800, 0),
        (4, "Gas CC", 2, Zone::South, 250, 35, 1200, 4),
        (5, "Gas Peaker", 3, Zone::South, 100, 70, 400, 6),
        (6, "Hydro", 3, Zone::North, 120, 5, 600, 0),
    ];
    rows.into_iter()
        .map(|(unit_id, name, portfolio_id, zone, cap, var, om, carbon)| Unit {
            unit_id,
            unit_name: name.to_string(),
            portfolio_id,
            zone,
            capacity: Decimal::from(cap),
            variable_cost_per_mwh: Decimal::from(var),
            daily_fixed_cost: Decimal::from(om),
            carbon_per_mwh: Decimal::new(carbon, 1),
        })
        .collect()
}

fn preset_schedule(n_to_s_capacity: Decimal, s_to_n_capacity: Decimal) -> Vec<ScheduleEntry> {
    let mut schedule = Vec::new();
    for round in 1..=2u32 {
        for (hour, &base) in (1u32..).zip(PRESET_NET_DEMAND.iter()) {
            let net = Decimal::from(base + 50 * i64::from(round - 1));
            // North carries 40% of load; the remainder sits in the South.
            let north = (net * Decimal::new(4, 1)).round();
            let (slope, auction_type) = match (round, hour) {
                (_, 4) => (Decimal::from(-2), AuctionType::Uniform),
                (2, 3) => (Decimal::ZERO, AuctionType::Discrete),
                _ => (Decimal::ZERO, AuctionType::Uniform),
            };
            schedule.push(ScheduleEntry {
                round,
                hour,
                north,
                south: net - north,
                net,
                n_to_s_capacity,
                s_to_n_capacity,
                slope,
                auction_type,
            });
        }
    }
    schedule
}
