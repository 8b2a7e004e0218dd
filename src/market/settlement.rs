//! Turns final dispatch into money: per-unit records, then per-portfolio totals.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::congestion::FinalDispatch;
use super::context::GameContext;
use super::ledger::BidSheet;
use super::records::HourlyRecord;
use super::types::{Bid, GameSettings, HourKey, PortfolioId, Unit, round_cents};

/// Settles one unit.
///
/// Every monetary component is rounded to cents first; `revenue` and `profit`
/// are then sums of the rounded components, so both identities hold exactly.
pub fn settle_unit(
    hour: HourKey,
    unit: &Unit,
    dispatch: &FinalDispatch,
    bid: Bid,
    settings: &GameSettings,
    last_hour_of_round: bool,
) -> HourlyRecord {
    let mwh_produced = dispatch.mwh_produced();
    let carbon_produced = (mwh_produced * unit.carbon_per_mwh).round_dp(2);

    let base_revenue = round_cents(dispatch.mwh_produced_base * dispatch.base_price);
    // Curtailed energy is paid its down bid; ramped-up energy earns base bid less the up premium.
    let adjust_down_revenue = round_cents(dispatch.mwh_adjusted_down * bid.bid_down);
    let adjust_up_revenue = round_cents(dispatch.mwh_adjusted_up * (bid.bid_base - bid.bid_up));
    let revenue = base_revenue + adjust_down_revenue + adjust_up_revenue;

    let cost_var = round_cents(mwh_produced * unit.variable_cost_per_mwh);
    let cost_om = if last_hour_of_round {
        round_cents(unit.daily_fixed_cost)
    } else {
        Decimal::ZERO
    };
    let cost_carbon = if settings.carbon_enabled {
        round_cents(mwh_produced * unit.carbon_per_mwh * settings.carbon_tax_rate)
    } else {
        Decimal::ZERO
    };
    let profit = revenue - cost_var - cost_om - cost_carbon;

    HourlyRecord {
        round: hour.round,
        hour: hour.hour,
        unit_id: unit.unit_id,
        unit_name: unit.unit_name.clone(),
        portfolio_id: unit.portfolio_id,
        zone: unit.zone,
        capacity: unit.capacity,
        bid_base: bid.bid_base,
        bid_up: bid.bid_up,
        bid_down: bid.bid_down,
        base_price: dispatch.base_price,
        activated: dispatch.activated,
        mwh_produced_initial: dispatch.mwh_produced_initial,
        mwh_produced_base: dispatch.mwh_produced_base,
        mwh_adjusted_down: dispatch.mwh_adjusted_down,
        mwh_adjusted_up: dispatch.mwh_adjusted_up,
        mwh_produced,
        carbon_produced,
        base_revenue,
        adjust_down_revenue,
        adjust_up_revenue,
        revenue,
        cost_var,
        cost_om,
        cost_carbon,
        profit,
    }
}

/// Settles every dispatched unit of the hour, in ascending unit id order.
pub fn settle_hour(
    ctx: &GameContext,
    hour: HourKey,
    dispatch: &[FinalDispatch],
    bids: &BidSheet,
) -> Vec<HourlyRecord> {
    let last_hour = ctx.is_last_hour_of_round(hour);
    let mut records: Vec<HourlyRecord> = dispatch
        .iter()
        .filter_map(|d| {
            let unit = ctx.unit(d.unit_id)?;
            Some(settle_unit(
                hour,
                unit,
                d,
                bids.bid(d.unit_id),
                ctx.settings(),
                last_hour,
            ))
        })
        .collect();
    records.sort_by_key(|r| r.unit_id);
    records
}

/// One portfolio's revenue, cost and profit for one hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PortfolioTotals {
    pub revenue: Decimal,
    /// Variable plus O&M cost. Carbon cost is only reflected in `profit`.
    pub cost: Decimal,
    pub profit: Decimal,
}

/// Sums unit records per portfolio. Every configured portfolio gets an
/// entry, including those that produced nothing.
pub fn aggregate_portfolios(
    ctx: &GameContext,
    records: &[HourlyRecord],
) -> BTreeMap<PortfolioId, PortfolioTotals> {
    let mut totals: BTreeMap<PortfolioId, PortfolioTotals> = ctx
        .portfolios()
        .map(|p| (p.portfolio_id, PortfolioTotals::default()))
        .collect();
    for r in records {
        let entry = totals.entry(r.portfolio_id).or_default();
        entry.revenue += r.revenue;
        entry.cost += r.cost_var + r.cost_om;
        entry.profit += r.profit;
    }
    totals
}
