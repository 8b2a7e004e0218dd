//! Cumulative per-portfolio summary with the round-boundary interest rule.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::context::GameContext;
use super::error::MarketError;
use super::settlement::PortfolioTotals;
use super::types::{AuctionType, HourKey, PortfolioId, round_cents};

/// One portfolio's figures in a summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
    pub balance: Decimal,
}

/// One scheduled hour. `lines` stays `None` until the hour has been run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub round: u32,
    pub hour: u32,
    pub north: Decimal,
    pub south: Decimal,
    pub net: Decimal,
    pub n_to_s_capacity: Decimal,
    pub s_to_n_capacity: Decimal,
    pub slope: Decimal,
    pub auction_type: AuctionType,
    pub lines: Option<BTreeMap<PortfolioId, SummaryLine>>,
}

impl SummaryRow {
    pub fn key(&self) -> HourKey {
        HourKey::new(self.round, self.hour)
    }

    pub fn is_filled(&self) -> bool {
        self.lines.is_some()
    }

    pub fn line(&self, portfolio_id: PortfolioId) -> Option<&SummaryLine> {
        self.lines.as_ref()?.get(&portfolio_id)
    }
}

/// Chronological summary table, one row per scheduled hour.
///
/// A row's balance depends only on the row directly above it, so rows are
/// filled strictly in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    rows: Vec<SummaryRow>,
}

impl Summary {
    /// Empty skeleton covering every scheduled hour.
    pub fn skeleton(ctx: &GameContext) -> Self {
        let rows = ctx
            .hours()
            .filter_map(|hour| ctx.schedule_entry(hour).ok())
            .map(|e| SummaryRow {
                round: e.round,
                hour: e.hour,
                north: e.north,
                south: e.south,
                net: e.net,
                n_to_s_capacity: e.n_to_s_capacity,
                s_to_n_capacity: e.s_to_n_capacity,
                slope: e.slope,
                auction_type: e.auction_type,
                lines: None,
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn row(&self, hour: HourKey) -> Option<&SummaryRow> {
        self.position(hour).map(|i| &self.rows[i])
    }

    /// First hour that has not been run yet.
    pub fn next_pending(&self) -> Option<HourKey> {
        self.rows.iter().find(|r| !r.is_filled()).map(SummaryRow::key)
    }

    /// Most recent filled row.
    pub fn latest_filled(&self) -> Option<&SummaryRow> {
        self.rows.iter().rev().find(|r| r.is_filled())
    }

    /// Computes the row for `hour` from the hour's totals without writing it.
    ///
    /// # Errors
    ///
    /// `ScheduleNotFound` if `hour` has no row; `InconsistentRowOrder` if the
    /// preceding row is not filled or lacks a portfolio.
    pub fn compute_lines(
        &self,
        ctx: &GameContext,
        hour: HourKey,
        totals: &BTreeMap<PortfolioId, PortfolioTotals>,
    ) -> Result<BTreeMap<PortfolioId, SummaryLine>, MarketError> {
        let index = self
            .position(hour)
            .ok_or(MarketError::ScheduleNotFound { hour })?;
        let previous = match index.checked_sub(1) {
            None => None,
            Some(prev) => {
                let row = &self.rows[prev];
                let lines = row.lines.as_ref().ok_or_else(|| MarketError::InconsistentRowOrder {
                    hour,
                    reason: format!("previous hour {} has not been run", row.key()),
                })?;
                Some(lines)
            }
        };

        let growth = Decimal::ONE + ctx.settings().interest_rate;
        let mut lines = BTreeMap::new();
        for portfolio in ctx.portfolios() {
            let pid = portfolio.portfolio_id;
            let t = totals.get(&pid).copied().unwrap_or_default();
            let balance = match previous {
                None => portfolio.starting_money * growth + t.profit,
                Some(prev_lines) => {
                    let prev = prev_lines.get(&pid).ok_or_else(|| MarketError::InconsistentRowOrder {
                        hour,
                        reason: format!("previous row has no entry for portfolio {pid}"),
                    })?;
                    if hour.hour == 1 {
                        prev.balance * growth + t.profit
                    } else {
                        prev.balance + t.profit
                    }
                }
            };
            lines.insert(
                pid,
                SummaryLine {
                    revenue: round_cents(t.revenue),
                    cost: round_cents(t.cost),
                    profit: round_cents(t.profit),
                    balance: round_cents(balance),
                },
            );
        }
        Ok(lines)
    }

    /// Writes precomputed lines into the row for `hour`.
    pub(crate) fn fill(&mut self, hour: HourKey, lines: BTreeMap<PortfolioId, SummaryLine>) {
        if let Some(i) = self.position(hour) {
            self.rows[i].lines = Some(lines);
        }
    }

    /// Re-derives the balances of every filled row after `hour`, keeping
    /// their revenue, cost and profit. Stops at the first unfilled row.
    pub(crate) fn recompute_after(&mut self, ctx: &GameContext, hour: HourKey) {
        let Some(start) = self.position(hour) else {
            return;
        };
        let growth = Decimal::ONE + ctx.settings().interest_rate;
        for i in start + 1..self.rows.len() {
            let (before, after) = self.rows.split_at_mut(i);
            let prev = &before[i - 1];
            let row = &mut after[0];
            let (Some(prev_lines), Some(lines)) = (prev.lines.as_ref(), row.lines.as_mut()) else {
                break;
            };
            for (pid, line) in lines.iter_mut() {
                let Some(prev_line) = prev_lines.get(pid) else {
                    continue;
                };
                let carried = if row.hour == 1 {
                    prev_line.balance * growth
                } else {
                    prev_line.balance
                };
                line.balance = round_cents(carried + line.profit);
            }
        }
    }

    fn position(&self, hour: HourKey) -> Option<usize> {
        self.rows.binary_search_by_key(&hour, SummaryRow::key).ok()
    }
}
