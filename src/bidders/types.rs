//! Common types and traits for automated bidders.

use rand::{Rng, rngs::StdRng};
use rust_decimal::Decimal;

use crate::market::types::{Bid, GameSettings, HourKey, Unit};

/// Trait for an automated participant that prices a unit for one hour.
///
/// Strategies return raw prices; the ledger clamps them into the game's bid
/// range on submission.
pub trait BidStrategy {
    /// Returns the bid for `unit` in `hour`.
    ///
    /// # Arguments
    ///
    /// * `unit` - The unit being offered
    /// * `settings` - Game settings (carbon tax, bid bounds)
    /// * `hour` - The hour being bid for
    fn bid(&mut self, unit: &Unit, settings: &GameSettings, hour: HourKey) -> Bid;

    /// Returns a human-readable strategy name.
    fn name(&self) -> &'static str;
}

/// Marginal cost of one MWh from `unit`, including carbon tax when enabled.
pub fn marginal_cost(unit: &Unit, settings: &GameSettings) -> Decimal {
    if settings.carbon_enabled {
        unit.variable_cost_per_mwh + unit.carbon_per_mwh * settings.carbon_tax_rate
    } else {
        unit.variable_cost_per_mwh
    }
}

/// Gaussian sample with mean 0 via Box-Muller.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f32) -> f32 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f32 = rng.random::<f32>().clamp(1e-6, 1.0);
    let u2: f32 = rng.random::<f32>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
    z0 * std_dev
}
