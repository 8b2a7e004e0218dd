//! Base (uncongested) market clearing: merit order against a linear demand curve.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use tracing::debug;

use super::ledger::BidSheet;
use super::types::{AuctionType, ScheduleEntry, Unit, UnitId};

/// Willingness to pay at a given quantity.
///
/// Vertical demand is modelled with the two infinities, so every comparison
/// against a finite bid stays total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DemandPrice {
    MinusInfinity,
    Finite(Decimal),
    PlusInfinity,
}

/// Linear demand curve through `(net, 0)`, or vertical at `net` when `slope` is zero.
#[derive(Debug, Clone, Copy)]
struct DemandCurve {
    net: Decimal,
    slope: Decimal,
}

impl DemandCurve {
    fn from_entry(entry: &ScheduleEntry) -> Self {
        Self {
            net: entry.net,
            slope: entry.slope,
        }
    }

    fn price_at(&self, quantity: Decimal) -> DemandPrice {
        if self.slope.is_zero() {
            if quantity < self.net {
                DemandPrice::PlusInfinity
            } else {
                DemandPrice::MinusInfinity
            }
        } else {
            DemandPrice::Finite(self.slope * (quantity - self.net))
        }
    }

    /// Quantity at which the curve meets `price`.
    fn quantity_at(&self, price: Decimal) -> Decimal {
        if self.slope.is_zero() {
            self.net
        } else {
            price / self.slope + self.net
        }
    }
}

/// Base clearing outcome for one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseDispatch {
    pub unit_id: UnitId,
    pub activated: bool,
    /// Production before congestion adjustment, rounded to 2 dp.
    pub mwh_produced_initial: Decimal,
    /// Price paid per base MWh: the hour's clearing price, or the unit's own
    /// bid in a discrete auction.
    pub base_price: Decimal,
}

/// Base clearing for one hour.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearingResult {
    /// One entry per unit, in merit order.
    pub dispatch: Vec<BaseDispatch>,
    /// Bid of the last activated unit (marginal bid).
    pub clearing_price: Decimal,
}

impl ClearingResult {
    pub fn total_production(&self) -> Decimal {
        self.dispatch.iter().map(|d| d.mwh_produced_initial).sum()
    }

    pub fn get(&self, unit_id: UnitId) -> Option<&BaseDispatch> {
        self.dispatch.iter().find(|d| d.unit_id == unit_id)
    }
}

/// Clears the hour described by `entry`.
///
/// Units are walked in merit order `(bid_base, unit_id)`. A unit is activated
/// while demand still pays at least its bid at the current running
/// production; it produces its full capacity unless the demand curve crosses
/// its step, in which case it produces up to the intersection.
///
/// When nothing activates the clearing price falls back to the first
/// merit-order bid (zero for an empty roster).
pub fn clear_market<'a>(
    entry: &ScheduleEntry,
    units: impl IntoIterator<Item = &'a Unit>,
    bids: &BidSheet,
) -> ClearingResult {
    let curve = DemandCurve::from_entry(entry);

    let mut merit_order: Vec<(&Unit, Decimal)> = units
        .into_iter()
        .map(|u| (u, bids.bid(u.unit_id).bid_base))
        .collect();
    merit_order.sort_by(|(ua, ba), (ub, bb)| match ba.cmp(bb) {
        Ordering::Equal => ua.unit_id.cmp(&ub.unit_id),
        other => other,
    });

    let mut running = Decimal::ZERO;
    let mut marginal_bid = None;
    let mut steps = Vec::with_capacity(merit_order.len());

    for &(unit, bid) in &merit_order {
        let offer = DemandPrice::Finite(bid);
        let production = if curve.price_at(running) < offer {
            None
        } else if curve.price_at(running + unit.capacity) > offer {
            running += unit.capacity;
            Some(unit.capacity)
        } else {
            let intersection = curve.quantity_at(bid);
            let produced = intersection - running;
            running = intersection;
            Some(produced)
        };

        debug!(
            unit_id = unit.unit_id,
            bid = %bid,
            produced = %production.unwrap_or_default(),
            running = %running,
            "merit order step"
        );

        if production.is_some() {
            marginal_bid = Some(bid);
        }
        steps.push((unit.unit_id, bid, production));
    }

    let clearing_price = marginal_bid
        .or_else(|| merit_order.first().map(|&(_, bid)| bid))
        .unwrap_or_default();

    let dispatch = steps
        .into_iter()
        .map(|(unit_id, bid, production)| BaseDispatch {
            unit_id,
            activated: production.is_some(),
            mwh_produced_initial: production.unwrap_or_default().round_dp(2),
            base_price: match entry.auction_type {
                AuctionType::Uniform => clearing_price,
                AuctionType::Discrete => bid,
            },
        })
        .collect();

    ClearingResult {
        dispatch,
        clearing_price,
    }
}
