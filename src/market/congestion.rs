//! Two-zone congestion relief by greedy redispatch.
//!
//! After base clearing, the surplus zone is ramped down in `bid_down` order and
//! the opposite zone is ramped up in `bid_up` order until the flow over the
//! link matches its capacity.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use super::clearing::ClearingResult;
use super::context::GameContext;
use super::error::MarketError;
use super::ledger::BidSheet;
use super::types::{Bid, ScheduleEntry, UnitId, Zone};

/// Production schedule of one unit after congestion relief.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalDispatch {
    pub unit_id: UnitId,
    pub zone: Zone,
    pub activated: bool,
    pub mwh_produced_initial: Decimal,
    /// Initial production less any ramp-down.
    pub mwh_produced_base: Decimal,
    pub mwh_adjusted_down: Decimal,
    pub mwh_adjusted_up: Decimal,
    pub base_price: Decimal,
}

impl FinalDispatch {
    pub fn mwh_produced(&self) -> Decimal {
        self.mwh_produced_initial - self.mwh_adjusted_down + self.mwh_adjusted_up
    }
}

/// Which branch of the congestion check applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CongestionStatus {
    /// Adjustment bids are disabled for the game.
    Disabled,
    /// Both zonal imbalances fit on the link.
    WithinLimits,
    /// `zone` produced more than the link could export.
    Surplus { zone: Zone, excess: Decimal },
}

/// Redispatched hour plus anything that could not be resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CongestionOutcome {
    /// Same order as the clearing input.
    pub dispatch: Vec<FinalDispatch>,
    pub status: CongestionStatus,
    /// `CongestionUnresolvable` entries; settlement still goes ahead.
    pub warnings: Vec<MarketError>,
}

struct Candidate {
    index: usize,
    unit_id: UnitId,
    bid: Bid,
}

/// Adjusts the base dispatch so zonal surpluses respect the link limits.
///
/// Units missing from the roster are treated as zero-capacity North units,
/// which cannot happen for a clearing built from the same context.
pub fn resolve_congestion(
    ctx: &GameContext,
    entry: &ScheduleEntry,
    clearing: &ClearingResult,
    bids: &BidSheet,
) -> CongestionOutcome {
    let mut dispatch: Vec<FinalDispatch> = clearing
        .dispatch
        .iter()
        .map(|d| FinalDispatch {
            unit_id: d.unit_id,
            zone: ctx.unit(d.unit_id).map_or(Zone::North, |u| u.zone),
            activated: d.activated,
            mwh_produced_initial: d.mwh_produced_initial,
            mwh_produced_base: d.mwh_produced_initial,
            mwh_adjusted_down: Decimal::ZERO,
            mwh_adjusted_up: Decimal::ZERO,
            base_price: d.base_price,
        })
        .collect();

    if !ctx.settings().adjustment_mode.is_enabled() {
        debug!(hour = %entry.key(), "adjustment disabled, congestion check skipped");
        return CongestionOutcome {
            dispatch,
            status: CongestionStatus::Disabled,
            warnings: Vec::new(),
        };
    }

    let zone_production = |zone: Zone| -> Decimal {
        dispatch
            .iter()
            .filter(|d| d.zone == zone)
            .map(|d| d.mwh_produced_initial)
            .sum()
    };
    let north_surplus = zone_production(Zone::North) - entry.north;
    let south_surplus = zone_production(Zone::South) - entry.south;
    debug!(
        hour = %entry.key(),
        north_surplus = %north_surplus,
        south_surplus = %south_surplus,
        "zonal balance"
    );

    let surplus_zone = if north_surplus <= entry.n_to_s_capacity
        && south_surplus <= entry.s_to_n_capacity
    {
        None
    } else if north_surplus >= entry.n_to_s_capacity {
        Some(Zone::North)
    } else if south_surplus >= entry.s_to_n_capacity {
        Some(Zone::South)
    } else {
        None
    };

    let Some(surplus_zone) = surplus_zone else {
        return CongestionOutcome {
            dispatch,
            status: CongestionStatus::WithinLimits,
            warnings: Vec::new(),
        };
    };

    let deficit_zone = surplus_zone.other();
    let link = entry.export_capacity(surplus_zone);
    let surplus = match surplus_zone {
        Zone::North => north_surplus,
        Zone::South => south_surplus,
    };
    let excess = surplus - link;
    let deficit = entry.zone_demand(deficit_zone) - zone_production(deficit_zone) - link;

    let mut warnings = Vec::new();
    let leftover = ramp_down(&mut dispatch, bids, surplus_zone, excess);
    if leftover > Decimal::ZERO {
        warn!(hour = %entry.key(), zone = %surplus_zone, remaining = %leftover, "excess could not be curtailed");
        warnings.push(MarketError::CongestionUnresolvable {
            hour: entry.key(),
            zone: surplus_zone,
            remaining_mwh: leftover,
        });
    }
    let capacity = |unit_id: UnitId| ctx.unit(unit_id).map_or(Decimal::ZERO, |u| u.capacity);
    let leftover = ramp_up(&mut dispatch, bids, &capacity, deficit_zone, deficit);
    if leftover > Decimal::ZERO {
        warn!(hour = %entry.key(), zone = %deficit_zone, remaining = %leftover, "deficit could not be covered");
        warnings.push(MarketError::CongestionUnresolvable {
            hour: entry.key(),
            zone: deficit_zone,
            remaining_mwh: leftover,
        });
    }

    CongestionOutcome {
        dispatch,
        status: CongestionStatus::Surplus {
            zone: surplus_zone,
            excess,
        },
        warnings,
    }
}

/// Curtails active units in `zone`, cheapest `bid_down` first. Returns the
/// excess left over.
fn ramp_down(dispatch: &mut [FinalDispatch], bids: &BidSheet, zone: Zone, mut excess: Decimal) -> Decimal {
    let mut order: Vec<Candidate> = dispatch
        .iter()
        .enumerate()
        .filter(|(_, d)| d.zone == zone && d.activated)
        .map(|(index, d)| Candidate {
            index,
            unit_id: d.unit_id,
            bid: bids.bid(d.unit_id),
        })
        .collect();
    // bid_down asc, then bid_base desc, then unit_id desc
    order.sort_by(|a, b| {
        a.bid
            .bid_down
            .cmp(&b.bid.bid_down)
            .then_with(|| b.bid.bid_base.cmp(&a.bid.bid_base))
            .then_with(|| b.unit_id.cmp(&a.unit_id))
    });

    for candidate in order {
        if excess <= Decimal::ZERO {
            break;
        }
        let unit = &mut dispatch[candidate.index];
        let reduced = unit.mwh_produced_initial.min(excess);
        unit.mwh_adjusted_down = reduced;
        unit.mwh_produced_base -= reduced;
        if reduced == unit.mwh_produced_initial {
            unit.activated = false;
        }
        excess -= reduced;
        debug!(
            unit_id = unit.unit_id,
            bid_down = %candidate.bid.bid_down,
            reduced = %reduced,
            remaining = %excess,
            "ramped down"
        );
    }
    excess
}

/// Ramps up units in `zone` with spare capacity, highest `bid_up` first.
/// Returns the deficit left over.
fn ramp_up(
    dispatch: &mut [FinalDispatch],
    bids: &BidSheet,
    capacity: &dyn Fn(UnitId) -> Decimal,
    zone: Zone,
    mut deficit: Decimal,
) -> Decimal {
    let mut order: Vec<Candidate> = dispatch
        .iter()
        .enumerate()
        .filter(|(_, d)| d.zone == zone && d.mwh_produced_initial < capacity(d.unit_id))
        .map(|(index, d)| Candidate {
            index,
            unit_id: d.unit_id,
            bid: bids.bid(d.unit_id),
        })
        .collect();
    order.sort_by(|a, b| match b.bid.bid_up.cmp(&a.bid.bid_up) {
        Ordering::Equal => a
            .bid
            .bid_base
            .cmp(&b.bid.bid_base)
            .then_with(|| a.unit_id.cmp(&b.unit_id)),
        other => other,
    });

    for candidate in order {
        if deficit <= Decimal::ZERO {
            break;
        }
        let unit = &mut dispatch[candidate.index];
        let spare = capacity(unit.unit_id) - unit.mwh_produced_initial;
        let increased = spare.min(deficit);
        unit.mwh_adjusted_up = increased;
        if increased > Decimal::ZERO {
            unit.activated = true;
        }
        deficit -= increased;
        debug!(
            unit_id = unit.unit_id,
            bid_up = %candidate.bid.bid_up,
            increased = %increased,
            remaining = %deficit,
            "ramped up"
        );
    }
    deficit
}
