//! Error taxonomy for bid handling and hour runs.

use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{HourKey, PortfolioId, UnitId, Zone};

/// Errors raised by the bid ledger and the hour-run pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    /// A bid value could not be used as given. Always recovered locally.
    #[error("invalid bid for unit {unit_id} at {hour}: {reason}")]
    InvalidBid {
        unit_id: UnitId,
        hour: HourKey,
        reason: String,
    },

    #[error("unknown unit or portfolio: {detail}")]
    UnknownUnitOrPortfolio { detail: String },

    #[error("no schedule entry for round {} hour {}", hour.round, hour.hour)]
    ScheduleNotFound { hour: HourKey },

    #[error("summary row order is inconsistent at {hour}: {reason}")]
    InconsistentRowOrder { hour: HourKey, reason: String },

    #[error("congestion in {zone} left {remaining_mwh} MWh unresolved at {hour}")]
    CongestionUnresolvable {
        hour: HourKey,
        zone: Zone,
        remaining_mwh: Decimal,
    },

    #[error("hour {hour} has already been run; use an explicit overwrite to re-run it")]
    HourAlreadyRun { hour: HourKey },

    #[error("bidding for hour {hour} is closed")]
    BidWindowClosed { hour: HourKey },

    #[error("adjustment bids are disabled for this game")]
    AdjustmentDisabled,
}

impl MarketError {
    pub(crate) fn unknown_portfolio(portfolio_id: PortfolioId) -> Self {
        Self::UnknownUnitOrPortfolio {
            detail: format!("portfolio {portfolio_id} does not exist"),
        }
    }

    pub(crate) fn unknown_unit(unit_id: UnitId) -> Self {
        Self::UnknownUnitOrPortfolio {
            detail: format!("unit {unit_id} does not exist"),
        }
    }

    pub(crate) fn foreign_unit(unit_id: UnitId, portfolio_id: PortfolioId) -> Self {
        Self::UnknownUnitOrPortfolio {
            detail: format!("unit {unit_id} is not owned by portfolio {portfolio_id}"),
        }
    }

    /// Whether the error stops the operation it was raised from.
    ///
    /// `InvalidBid` and `CongestionUnresolvable` are reported alongside a
    /// completed operation rather than aborting it.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::InvalidBid { .. } | Self::CongestionUnresolvable { .. }
        )
    }
}
