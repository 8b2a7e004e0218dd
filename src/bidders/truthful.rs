use crate::market::types::{Bid, GameSettings, HourKey, Unit};

use super::types::{BidStrategy, marginal_cost};

/// Offers every unit at its marginal cost with no adjustment premium.
#[derive(Debug, Default, Clone, Copy)]
pub struct TruthfulBidder;

impl BidStrategy for TruthfulBidder {
    fn bid(&mut self, unit: &Unit, settings: &GameSettings, _hour: HourKey) -> Bid {
        Bid {
            bid_base: marginal_cost(unit, settings),
            bid_up: rust_decimal::Decimal::ZERO,
            bid_down: rust_decimal::Decimal::ZERO,
        }
    }

    fn name(&self) -> &'static str {
        "truthful"
    }
}
