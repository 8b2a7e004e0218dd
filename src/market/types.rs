//! Core market types: roster, schedule, settings, and bid values.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Identifier of a generating unit. Unique for the whole game.
pub type UnitId = u32;

/// Identifier of a portfolio (one participant owns one portfolio).
pub type PortfolioId = u32;

/// Chronological key of one market hour.
///
/// Ordering is `(round, hour)`, so sorting keys yields the play order.
///
/// # Examples
///
/// ```
/// use grid_market::market::types::HourKey;
///
/// let a = HourKey::new(1, 4);
/// let b = HourKey::new(2, 1);
/// assert!(a < b);
/// assert_eq!(b.to_string(), "2/1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HourKey {
    /// Round (game day), starting at 1.
    pub round: u32,
    /// Hour within the round, starting at 1.
    pub hour: u32,
}

impl HourKey {
    pub fn new(round: u32, hour: u32) -> Self {
        Self { round, hour }
    }
}

impl fmt::Display for HourKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.round, self.hour)
    }
}

/// Market zone. The two zones are joined by one capacity-limited link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    North,
    South,
}

impl Zone {
    /// The zone on the other side of the transmission link.
    pub fn other(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::North => f.write_str("North"),
            Self::South => f.write_str("South"),
        }
    }
}

/// Pricing rule applied to the base clearing of an hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionType {
    /// Every cleared unit is paid the marginal bid.
    #[default]
    Uniform,
    /// Every cleared unit is paid its own bid (pay-as-bid).
    Discrete,
}

/// How participants may express ramp-up/ramp-down offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdjustmentMode {
    /// No adjustment bids; congestion resolution is skipped.
    Disabled,
    /// One up/down pair per portfolio, applied to all its units.
    PerPortfolio,
    /// Independent up/down pair per unit.
    #[default]
    PerUnit,
}

impl AdjustmentMode {
    pub fn is_enabled(self) -> bool {
        self != Self::Disabled
    }
}

/// A generating unit. Immutable for the duration of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Unit {
    pub unit_id: UnitId,
    #[serde(default)]
    pub unit_name: String,
    pub portfolio_id: PortfolioId,
    pub zone: Zone,
    /// Maximum output for one hour (MWh, >= 0).
    pub capacity: Decimal,
    pub variable_cost_per_mwh: Decimal,
    /// Operations & maintenance cost charged once per round.
    #[serde(default)]
    pub daily_fixed_cost: Decimal,
    /// Emissions per MWh produced.
    #[serde(default)]
    pub carbon_per_mwh: Decimal,
}

/// A participant's portfolio of units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Portfolio {
    pub portfolio_id: PortfolioId,
    pub name: String,
    /// Balance before the first hour is settled.
    #[serde(default)]
    pub starting_money: Decimal,
}

/// Demand and network conditions for one `(round, hour)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleEntry {
    pub round: u32,
    pub hour: u32,
    /// Demand located in the North zone (MWh).
    pub north: Decimal,
    /// Demand located in the South zone (MWh).
    pub south: Decimal,
    /// System-wide demand used for clearing (MWh).
    pub net: Decimal,
    /// Maximum North → South flow (MWh).
    pub n_to_s_capacity: Decimal,
    /// Maximum South → North flow (MWh).
    pub s_to_n_capacity: Decimal,
    /// Demand-curve slope; zero means perfectly inelastic demand at `net`.
    #[serde(default)]
    pub slope: Decimal,
    #[serde(default)]
    pub auction_type: AuctionType,
}

impl ScheduleEntry {
    pub fn key(&self) -> HourKey {
        HourKey::new(self.round, self.hour)
    }

    /// Demand located in `zone`.
    pub fn zone_demand(&self, zone: Zone) -> Decimal {
        match zone {
            Zone::North => self.north,
            Zone::South => self.south,
        }
    }

    /// Maximum export capacity out of `zone`.
    pub fn export_capacity(&self, zone: Zone) -> Decimal {
        match zone {
            Zone::North => self.n_to_s_capacity,
            Zone::South => self.s_to_n_capacity,
        }
    }
}

/// Process-wide, read-only game settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameSettings {
    pub min_bid: Decimal,
    pub max_bid: Decimal,
    #[serde(rename = "adjustment")]
    pub adjustment_mode: AdjustmentMode,
    #[serde(rename = "carbon")]
    pub carbon_enabled: bool,
    pub carbon_tax_rate: Decimal,
    /// Interest credited on the balance at the start of every round.
    pub interest_rate: Decimal,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            min_bid: Decimal::from(-500),
            max_bid: Decimal::from(500),
            adjustment_mode: AdjustmentMode::default(),
            carbon_enabled: false,
            carbon_tax_rate: Decimal::ZERO,
            interest_rate: Decimal::ZERO,
        }
    }
}

impl GameSettings {
    /// Clamps a price into `[min_bid, max_bid]`.
    pub fn clamp_bid(&self, value: Decimal) -> Decimal {
        value.max(self.min_bid).min(self.max_bid)
    }
}

/// A committed bid for one unit and hour. All three prices are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    /// Offer price for base production.
    pub bid_base: Decimal,
    /// Premium the unit charges for being ramped up.
    pub bid_up: Decimal,
    /// Price the unit asks to be compensated at when ramped down.
    pub bid_down: Decimal,
}

impl Bid {
    /// A bid at `price` for all three components.
    pub fn flat(price: Decimal) -> Self {
        Self {
            bid_base: price,
            bid_up: price,
            bid_down: price,
        }
    }
}

/// Rounds money to cents, half away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
