//! Automated participants used by the CLI demo and tests.

pub mod markup;
pub mod truthful;
pub mod types;

pub use markup::MarkupBidder;
pub use truthful::TruthfulBidder;
pub use types::BidStrategy;

use rust_decimal::Decimal;

use crate::market::ledger::{BidSubmission, SubmitReport};
use crate::market::types::{AdjustmentMode, Bid, PortfolioId, round_cents};
use crate::market::{Game, HourKey, MarketError};

/// Submits `strategy`'s bids for every unit of every portfolio for `hour`.
///
/// Each portfolio submits its own batch, so ownership rules apply as they
/// would for a human participant. Adjustment prices follow the game's mode:
/// per unit they ride along with the base bids, per portfolio the units'
/// up/down prices are averaged into one pair for the whole portfolio, and
/// with adjustment disabled only base bids are sent.
///
/// # Errors
///
/// The first rejected batch, e.g. `BidWindowClosed` for a committed hour.
pub fn submit_for_hour(
    game: &mut Game,
    strategy: &mut dyn BidStrategy,
    hour: HourKey,
) -> Result<SubmitReport, MarketError> {
    let mode = game.context().settings().adjustment_mode;
    let mut batches: Vec<(PortfolioId, Vec<Bid>, Vec<BidSubmission>)> = Vec::new();
    for portfolio in game.context().portfolios() {
        let mut bids = Vec::new();
        let mut batch = Vec::new();
        for unit in game.context().units_of(portfolio.portfolio_id) {
            let bid = strategy.bid(unit, game.context().settings(), hour);
            batch.push(match mode {
                AdjustmentMode::PerUnit => {
                    BidSubmission::full(unit.unit_id, hour, bid.bid_base, bid.bid_up, bid.bid_down)
                }
                AdjustmentMode::PerPortfolio | AdjustmentMode::Disabled => {
                    BidSubmission::base(unit.unit_id, hour, bid.bid_base)
                }
            });
            bids.push(bid);
        }
        batches.push((portfolio.portfolio_id, bids, batch));
    }

    let mut total = SubmitReport::default();
    for (portfolio_id, bids, batch) in batches {
        let mut reports = vec![game.submit_bids(portfolio_id, &batch)?];
        if mode == AdjustmentMode::PerPortfolio && !bids.is_empty() {
            let (up, down) = portfolio_adjustment(&bids);
            reports.push(game.submit_portfolio_adjustment(
                portfolio_id,
                hour,
                Some(up.into()),
                Some(down.into()),
            )?);
        }
        for report in reports {
            total.accepted += report.accepted;
            total.ignored += report.ignored;
            total.corrections.extend(report.corrections);
        }
    }
    Ok(total)
}

/// Mean up/down price of a portfolio's unit bids, rounded to cents.
fn portfolio_adjustment(bids: &[Bid]) -> (Decimal, Decimal) {
    let n = Decimal::from(bids.len());
    let up: Decimal = bids.iter().map(|b| b.bid_up).sum();
    let down: Decimal = bids.iter().map(|b| b.bid_down).sum();
    (round_cents(up / n), round_cents(down / n))
}
