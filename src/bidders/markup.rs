use rand::{SeedableRng, rngs::StdRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::market::types::{Bid, GameSettings, HourKey, Unit, round_cents};

use super::types::{BidStrategy, gaussian_noise, marginal_cost};

/// Marks cost up by a noisy percentage and asks for adjustment premiums
/// proportional to the base bid.
///
/// # Examples
///
/// ```
/// use grid_market::bidders::{BidStrategy, MarkupBidder};
/// use grid_market::config::GameConfig;
/// use grid_market::market::types::HourKey;
///
/// let cfg = GameConfig::classroom();
/// let mut bidder = MarkupBidder::new(0.15, 0.05, 42);
/// let bid = bidder.bid(&cfg.units[0], &cfg.settings, HourKey::new(1, 1));
/// assert!(bid.bid_base >= cfg.units[0].variable_cost_per_mwh);
/// ```
#[derive(Debug, Clone)]
pub struct MarkupBidder {
    /// Mean markup over marginal cost (0.15 = 15%)
    pub mean_markup: f32,
    /// Standard deviation of the markup
    pub markup_std: f32,
    rng: StdRng,
}

impl MarkupBidder {
    /// Share of the base bid asked as ramp-up premium.
    const UP_SHARE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);
    /// Share of the base bid asked as curtailment compensation.
    const DOWN_SHARE: Decimal = Decimal::from_parts(25, 0, 0, false, 2);

    pub fn new(mean_markup: f32, markup_std: f32, seed: u64) -> Self {
        Self {
            mean_markup,
            markup_std: markup_std.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl BidStrategy for MarkupBidder {
    fn bid(&mut self, unit: &Unit, settings: &GameSettings, _hour: HourKey) -> Bid {
        // Never bid below cost.
        let markup = (self.mean_markup + gaussian_noise(&mut self.rng, self.markup_std)).max(0.0);
        let factor = Decimal::ONE + Decimal::from_f32(markup).unwrap_or_default();
        let base = round_cents(marginal_cost(unit, settings) * factor);
        Bid {
            bid_base: base,
            bid_up: round_cents(base.abs() * Self::UP_SHARE),
            bid_down: round_cents(base.abs() * Self::DOWN_SHARE),
        }
    }

    fn name(&self) -> &'static str {
        "markup"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn same_seed_same_bids() {
        let cfg = GameConfig::classroom();
        let hour = HourKey::new(1, 1);
        let mut a = MarkupBidder::new(0.2, 0.1, 7);
        let mut b = MarkupBidder::new(0.2, 0.1, 7);
        for unit in &cfg.units {
            assert_eq!(a.bid(unit, &cfg.settings, hour), b.bid(unit, &cfg.settings, hour));
        }
    }

    #[test]
    fn no_noise_applies_exact_markup() {
        let cfg = GameConfig::classroom();
        let mut bidder = MarkupBidder::new(0.5, 0.0, 1);
        // Gas CC: variable cost 35
        let bid = bidder.bid(&cfg.units[3], &cfg.settings, HourKey::new(1, 1));
        assert_eq!(bid.bid_base, Decimal::new(5250, 2));
        assert_eq!(bid.bid_up, Decimal::new(525, 2));
        assert_eq!(bid.bid_down, Decimal::new(1313, 2));
    }
}
