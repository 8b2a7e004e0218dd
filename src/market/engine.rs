//! Hour-run orchestration: snapshot, clear, relieve congestion, settle, book.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use tracing::{info, warn};

use super::clearing::clear_market;
use super::congestion::{CongestionStatus, resolve_congestion};
use super::context::GameContext;
use super::error::MarketError;
use super::ledger::{BidInput, BidLedger, BidSubmission, SubmitReport};
use super::records::{HourlyRecord, RecordStore};
use super::settlement::{aggregate_portfolios, settle_hour};
use super::summary::{Summary, SummaryLine, SummaryRow};
use super::types::{HourKey, PortfolioId};

/// How `commit_and_run_hour` treats an hour that has already been run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Reject with `HourAlreadyRun`.
    #[default]
    Normal,
    /// Replace the hour's records and re-derive later balances.
    Overwrite,
}

/// Everything produced by one hour run.
#[derive(Debug, Clone, PartialEq)]
pub struct HourOutcome {
    pub hour: HourKey,
    pub clearing_price: Decimal,
    pub congestion: CongestionStatus,
    pub records: Vec<HourlyRecord>,
    pub lines: BTreeMap<PortfolioId, SummaryLine>,
    /// Non-fatal problems, e.g. congestion that could not be fully resolved.
    pub warnings: Vec<MarketError>,
}

impl fmt::Display for HourOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let produced: Decimal = self.records.iter().map(|r| r.mwh_produced).sum();
        write!(
            f,
            "round {} hour {} | price {:>8} | produced {:>9} MWh | ",
            self.hour.round, self.hour.hour, self.clearing_price, produced
        )?;
        match self.congestion {
            CongestionStatus::Disabled => write!(f, "adjustment off")?,
            CongestionStatus::WithinLimits => write!(f, "no congestion")?,
            CongestionStatus::Surplus { zone, excess } => {
                write!(f, "{zone} surplus {excess} MWh redispatched")?;
            }
        }
        for (pid, line) in &self.lines {
            write!(f, "\n  portfolio {pid}: profit {:>10} balance {:>12}", line.profit, line.balance)?;
        }
        for w in &self.warnings {
            write!(f, "\n  warning: {w}")?;
        }
        Ok(())
    }
}

/// One game: context plus the mutable ledger, record store and summary.
#[derive(Debug, Clone)]
pub struct Game {
    ctx: GameContext,
    ledger: BidLedger,
    records: RecordStore,
    summary: Summary,
}

impl Game {
    /// Creates an empty ledger and the summary skeleton for `ctx`.
    pub fn initialize(ctx: GameContext) -> Self {
        let summary = Summary::skeleton(&ctx);
        info!(
            units = ctx.units().count(),
            portfolios = ctx.portfolios().count(),
            hours = summary.rows().len(),
            "game initialized"
        );
        Self {
            ctx,
            ledger: BidLedger::new(),
            records: RecordStore::new(),
            summary,
        }
    }

    pub fn context(&self) -> &GameContext {
        &self.ctx
    }

    pub fn ledger(&self) -> &BidLedger {
        &self.ledger
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Participant bid submission; see [`BidLedger::submit_bids`].
    pub fn submit_bids(
        &mut self,
        portfolio_id: PortfolioId,
        submissions: &[BidSubmission],
    ) -> Result<SubmitReport, MarketError> {
        self.ledger.submit_bids(&self.ctx, portfolio_id, submissions)
    }

    /// Portfolio-wide adjustment bids; see [`BidLedger::submit_portfolio_adjustment`].
    pub fn submit_portfolio_adjustment(
        &mut self,
        portfolio_id: PortfolioId,
        hour: HourKey,
        bid_up: Option<BidInput>,
        bid_down: Option<BidInput>,
    ) -> Result<SubmitReport, MarketError> {
        self.ledger
            .submit_portfolio_adjustment(&self.ctx, portfolio_id, hour, bid_up, bid_down)
    }

    /// Operator bid edit; see [`BidLedger::override_bids`].
    pub fn override_bids(&mut self, submissions: &[BidSubmission]) -> Result<SubmitReport, MarketError> {
        self.ledger.override_bids(&self.ctx, submissions)
    }

    /// First hour not yet run, or `None` once the schedule is exhausted.
    pub fn next_pending_hour(&self) -> Option<HourKey> {
        self.summary.next_pending()
    }

    /// Runs one hour end to end.
    ///
    /// All computation happens on an in-memory copy; records and summary are
    /// only written once every step has succeeded, and the hour is then
    /// closed to participant bids.
    ///
    /// # Errors
    ///
    /// `ScheduleNotFound`, `HourAlreadyRun` (in [`RunMode::Normal`]) or
    /// `InconsistentRowOrder`. On error nothing is written.
    pub fn commit_and_run_hour(&mut self, hour: HourKey, mode: RunMode) -> Result<HourOutcome, MarketError> {
        let entry = self.ctx.schedule_entry(hour)?;
        let overwrite = mode == RunMode::Overwrite;
        if self.records.contains(hour) && !overwrite {
            return Err(MarketError::HourAlreadyRun { hour });
        }

        let bids = self.ledger.snapshot(&self.ctx, hour);
        let clearing = clear_market(entry, self.ctx.units(), &bids);
        let congestion = resolve_congestion(&self.ctx, entry, &clearing, &bids);
        let records = settle_hour(&self.ctx, hour, &congestion.dispatch, &bids);
        let totals = aggregate_portfolios(&self.ctx, &records);
        let lines = self.summary.compute_lines(&self.ctx, hour, &totals)?;

        self.records.write(hour, records.clone(), overwrite)?;
        self.summary.fill(hour, lines.clone());
        if overwrite {
            self.summary.recompute_after(&self.ctx, hour);
        }
        self.ledger.mark_committed(hour);

        info!(
            %hour,
            clearing_price = %clearing.clearing_price,
            produced = %clearing.total_production(),
            overwrite,
            "hour settled"
        );
        for w in &congestion.warnings {
            warn!(%hour, "{w}");
        }

        Ok(HourOutcome {
            hour,
            clearing_price: clearing.clearing_price,
            congestion: congestion.status,
            records,
            lines,
            warnings: congestion.warnings,
        })
    }

    /// Runs every pending hour in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// The first error raised by [`Game::commit_and_run_hour`]; hours run
    /// before it stay booked.
    pub fn run_remaining(&mut self) -> Result<Vec<HourOutcome>, MarketError> {
        let mut outcomes = Vec::new();
        while let Some(hour) = self.next_pending_hour() {
            outcomes.push(self.commit_and_run_hour(hour, RunMode::Normal)?);
        }
        Ok(outcomes)
    }

    /// Summary row for `hour`, if scheduled.
    pub fn summary_row(&self, hour: HourKey) -> Option<&SummaryRow> {
        self.summary.row(hour)
    }
}
