//! Post-hoc scoreboard computed from the summary.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use super::context::GameContext;
use super::summary::Summary;
use super::types::PortfolioId;

/// Cumulative figures for one portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    /// 1-based rank by balance (ties share the better rank).
    pub rank: usize,
    pub portfolio_id: PortfolioId,
    pub name: String,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
    /// Latest booked balance, or starting money before any hour is run.
    pub balance: Decimal,
}

/// Scoreboard across all run hours, best balance first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standings {
    pub hours_run: usize,
    pub entries: Vec<Standing>,
}

impl Standings {
    pub fn from_summary(ctx: &GameContext, summary: &Summary) -> Self {
        let filled: Vec<_> = summary.rows().iter().filter(|r| r.is_filled()).collect();
        let latest = summary.latest_filled();

        let mut entries: Vec<Standing> = ctx
            .portfolios()
            .map(|p| {
                let pid = p.portfolio_id;
                let mut revenue = Decimal::ZERO;
                let mut cost = Decimal::ZERO;
                let mut profit = Decimal::ZERO;
                for line in filled.iter().filter_map(|r| r.line(pid)) {
                    revenue += line.revenue;
                    cost += line.cost;
                    profit += line.profit;
                }
                let balance = latest
                    .and_then(|r| r.line(pid))
                    .map_or(p.starting_money, |l| l.balance);
                Standing {
                    rank: 0,
                    portfolio_id: pid,
                    name: p.name.clone(),
                    revenue,
                    cost,
                    profit,
                    balance,
                }
            })
            .collect();

        entries.sort_by(|a, b| b.balance.cmp(&a.balance).then(a.portfolio_id.cmp(&b.portfolio_id)));
        let mut previous: Option<(Decimal, usize)> = None;
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = match previous {
                Some((balance, rank)) if balance == entry.balance => rank,
                _ => i + 1,
            };
            previous = Some((entry.balance, entry.rank));
        }

        Self {
            hours_run: filled.len(),
            entries,
        }
    }

    pub fn leader(&self) -> Option<&Standing> {
        self.entries.first()
    }
}

impl fmt::Display for Standings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Standings after {} hour(s) ---", self.hours_run)?;
        writeln!(
            f,
            "{:<4} {:<20} {:>12} {:>12} {:>12} {:>12}",
            "rank", "portfolio", "revenue", "cost", "profit", "balance"
        )?;
        for (i, s) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{:<4} {:<20} {:>12} {:>12} {:>12} {:>12}",
                s.rank,
                s.name,
                s.revenue.to_string(),
                s.cost.to_string(),
                s.profit.to_string(),
                s.balance.to_string()
            )?;
        }
        Ok(())
    }
}
