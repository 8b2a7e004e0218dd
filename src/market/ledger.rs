//! Live bid ledger and the frozen per-hour bid snapshot.
//!
//! Participants keep editing the ledger until an hour is committed. Running
//! an hour first copies the ledger into a [`BidSheet`]; clearing and
//! settlement only ever read that copy.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::context::GameContext;
use super::error::MarketError;
use super::types::{AdjustmentMode, Bid, GameSettings, HourKey, PortfolioId, UnitId, round_cents};

/// A bid value as submitted: either a number or the raw text of a form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BidInput {
    Price(Decimal),
    Text(String),
}

impl BidInput {
    /// Interprets the input as a price.
    fn parse(&self) -> Result<Decimal, String> {
        match self {
            Self::Price(value) => Ok(*value),
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err("empty value".to_string());
                }
                trimmed
                    .parse::<Decimal>()
                    .map_err(|_| format!("\"{trimmed}\" is not a number"))
            }
        }
    }
}

impl From<Decimal> for BidInput {
    fn from(value: Decimal) -> Self {
        Self::Price(value)
    }
}

/// One unit's bid update for one hour. Absent fields leave the stored value untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidSubmission {
    pub unit_id: UnitId,
    pub round: u32,
    pub hour: u32,
    #[serde(default)]
    pub bid_base: Option<BidInput>,
    #[serde(default)]
    pub bid_up: Option<BidInput>,
    #[serde(default)]
    pub bid_down: Option<BidInput>,
}

impl BidSubmission {
    /// A base-only submission.
    pub fn base(unit_id: UnitId, hour: HourKey, bid_base: Decimal) -> Self {
        Self {
            unit_id,
            round: hour.round,
            hour: hour.hour,
            bid_base: Some(bid_base.into()),
            bid_up: None,
            bid_down: None,
        }
    }

    /// A submission setting all three prices.
    pub fn full(unit_id: UnitId, hour: HourKey, bid_base: Decimal, bid_up: Decimal, bid_down: Decimal) -> Self {
        Self {
            bid_up: Some(bid_up.into()),
            bid_down: Some(bid_down.into()),
            ..Self::base(unit_id, hour, bid_base)
        }
    }

    pub fn key(&self) -> HourKey {
        HourKey::new(self.round, self.hour)
    }
}

/// Bid values currently stored for one unit and hour; `None` means "never bid".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingBid {
    pub bid_base: Option<Decimal>,
    pub bid_up: Option<Decimal>,
    pub bid_down: Option<Decimal>,
}

/// Outcome of a bid submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitReport {
    /// Number of individual prices stored.
    pub accepted: usize,
    /// Adjustment prices dropped because the adjustment mode does not allow them.
    pub ignored: usize,
    /// Values that were clamped or could not be parsed.
    pub corrections: Vec<MarketError>,
}

/// Which bid component a value belongs to.
#[derive(Debug, Clone, Copy)]
enum Component {
    Base,
    Up,
    Down,
}

impl Component {
    fn name(self) -> &'static str {
        match self {
            Self::Base => "bid_base",
            Self::Up => "bid_up",
            Self::Down => "bid_down",
        }
    }

    fn slot(self, pending: &mut PendingBid) -> &mut Option<Decimal> {
        match self {
            Self::Base => &mut pending.bid_base,
            Self::Up => &mut pending.bid_up,
            Self::Down => &mut pending.bid_down,
        }
    }
}

/// Mutable table of bids keyed by `(unit, hour)`.
#[derive(Debug, Clone, Default)]
pub struct BidLedger {
    bids: BTreeMap<(UnitId, HourKey), PendingBid>,
    committed: BTreeSet<HourKey>,
}

impl BidLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a participant's bids.
    ///
    /// The whole batch is checked before anything is written: every unit
    /// must belong to `portfolio_id`, every hour must be scheduled and still
    /// open. Individual bad values are corrected and reported instead.
    ///
    /// # Errors
    ///
    /// `UnknownUnitOrPortfolio`, `ScheduleNotFound` or `BidWindowClosed`,
    /// in which case the ledger is unchanged.
    pub fn submit_bids(
        &mut self,
        ctx: &GameContext,
        portfolio_id: PortfolioId,
        submissions: &[BidSubmission],
    ) -> Result<SubmitReport, MarketError> {
        if ctx.portfolio(portfolio_id).is_none() {
            return Err(MarketError::unknown_portfolio(portfolio_id));
        }
        for sub in submissions {
            match ctx.unit(sub.unit_id) {
                None => return Err(MarketError::unknown_unit(sub.unit_id)),
                Some(unit) if unit.portfolio_id != portfolio_id => {
                    return Err(MarketError::foreign_unit(sub.unit_id, portfolio_id));
                }
                Some(_) => {}
            }
            self.check_open(ctx, sub.key())?;
        }

        let take_adjustments = ctx.settings().adjustment_mode == AdjustmentMode::PerUnit;
        let mut report = SubmitReport::default();
        for sub in submissions {
            self.apply(ctx.settings(), sub, take_adjustments, &mut report);
        }
        debug!(
            portfolio_id,
            accepted = report.accepted,
            corrections = report.corrections.len(),
            "bids submitted"
        );
        Ok(report)
    }

    /// Applies one up/down pair to every unit of a portfolio for `hour`.
    ///
    /// # Errors
    ///
    /// `AdjustmentDisabled` when the game has no adjustment bids, plus the
    /// lookup errors of [`BidLedger::submit_bids`].
    pub fn submit_portfolio_adjustment(
        &mut self,
        ctx: &GameContext,
        portfolio_id: PortfolioId,
        hour: HourKey,
        bid_up: Option<BidInput>,
        bid_down: Option<BidInput>,
    ) -> Result<SubmitReport, MarketError> {
        if !ctx.settings().adjustment_mode.is_enabled() {
            return Err(MarketError::AdjustmentDisabled);
        }
        if ctx.portfolio(portfolio_id).is_none() {
            return Err(MarketError::unknown_portfolio(portfolio_id));
        }
        self.check_open(ctx, hour)?;

        let mut report = SubmitReport::default();
        for unit in ctx.units_of(portfolio_id) {
            let sub = BidSubmission {
                unit_id: unit.unit_id,
                round: hour.round,
                hour: hour.hour,
                bid_base: None,
                bid_up: bid_up.clone(),
                bid_down: bid_down.clone(),
            };
            self.apply(ctx.settings(), &sub, true, &mut report);
        }
        Ok(report)
    }

    /// Operator edit: same parsing and clamping, but no ownership or
    /// committed-hour checks.
    ///
    /// # Errors
    ///
    /// `UnknownUnitOrPortfolio` or `ScheduleNotFound`; the ledger is unchanged.
    pub fn override_bids(
        &mut self,
        ctx: &GameContext,
        submissions: &[BidSubmission],
    ) -> Result<SubmitReport, MarketError> {
        for sub in submissions {
            if ctx.unit(sub.unit_id).is_none() {
                return Err(MarketError::unknown_unit(sub.unit_id));
            }
            ctx.schedule_entry(sub.key())?;
        }
        let mut report = SubmitReport::default();
        for sub in submissions {
            self.apply(ctx.settings(), sub, true, &mut report);
        }
        Ok(report)
    }

    /// Currently stored values for one unit and hour.
    pub fn pending(&self, unit_id: UnitId, hour: HourKey) -> PendingBid {
        self.bids.get(&(unit_id, hour)).copied().unwrap_or_default()
    }

    /// Freezes the bids for `hour` into an immutable sheet.
    ///
    /// Every roster unit gets an entry; values never bid default to `max_bid`,
    /// which prices the unit out of the market.
    pub fn snapshot(&self, ctx: &GameContext, hour: HourKey) -> BidSheet {
        let max_bid = ctx.settings().max_bid;
        let bids = ctx
            .units()
            .map(|unit| {
                let pending = self.pending(unit.unit_id, hour);
                let bid = Bid {
                    bid_base: pending.bid_base.unwrap_or(max_bid),
                    bid_up: pending.bid_up.unwrap_or(max_bid),
                    bid_down: pending.bid_down.unwrap_or(max_bid),
                };
                (unit.unit_id, bid)
            })
            .collect();
        BidSheet::new(hour, bids, Bid::flat(max_bid))
    }

    /// Closes `hour` to participant edits.
    pub fn mark_committed(&mut self, hour: HourKey) {
        self.committed.insert(hour);
    }

    pub fn is_committed(&self, hour: HourKey) -> bool {
        self.committed.contains(&hour)
    }

    fn check_open(&self, ctx: &GameContext, hour: HourKey) -> Result<(), MarketError> {
        ctx.schedule_entry(hour)?;
        if self.is_committed(hour) {
            return Err(MarketError::BidWindowClosed { hour });
        }
        Ok(())
    }

    fn apply(
        &mut self,
        settings: &GameSettings,
        sub: &BidSubmission,
        take_adjustments: bool,
        report: &mut SubmitReport,
    ) {
        let hour = sub.key();
        let fields = [
            (Component::Base, &sub.bid_base),
            (Component::Up, &sub.bid_up),
            (Component::Down, &sub.bid_down),
        ];
        for (component, input) in fields {
            let Some(input) = input else { continue };
            if !take_adjustments && !matches!(component, Component::Base) {
                debug!(unit_id = sub.unit_id, %hour, field = component.name(), "adjustment bid ignored");
                report.ignored += 1;
                continue;
            }

            let value = match input.parse() {
                Ok(value) => value,
                Err(reason) => {
                    warn!(unit_id = sub.unit_id, %hour, field = component.name(), %reason, "bid rejected");
                    report.corrections.push(MarketError::InvalidBid {
                        unit_id: sub.unit_id,
                        hour,
                        reason: format!("{}: {reason}", component.name()),
                    });
                    continue;
                }
            };

            let rounded = round_cents(value);
            let clamped = settings.clamp_bid(rounded);
            if clamped != rounded {
                warn!(unit_id = sub.unit_id, %hour, field = component.name(), %value, %clamped, "bid clamped");
                report.corrections.push(MarketError::InvalidBid {
                    unit_id: sub.unit_id,
                    hour,
                    reason: format!(
                        "{} {value} outside [{}, {}], clamped to {clamped}",
                        component.name(),
                        settings.min_bid,
                        settings.max_bid
                    ),
                });
            }

            let pending = self.bids.entry((sub.unit_id, hour)).or_default();
            *component.slot(pending) = Some(clamped);
            report.accepted += 1;
        }
    }
}

/// Immutable bids for one hour, frozen at commit time.
#[derive(Debug, Clone, PartialEq)]
pub struct BidSheet {
    hour: HourKey,
    bids: BTreeMap<UnitId, Bid>,
    fallback: Bid,
}

impl BidSheet {
    /// Builds a sheet; units missing from `bids` resolve to `fallback`.
    pub fn new(hour: HourKey, bids: BTreeMap<UnitId, Bid>, fallback: Bid) -> Self {
        Self {
            hour,
            bids,
            fallback,
        }
    }

    pub fn hour(&self) -> HourKey {
        self.hour
    }

    /// The committed bid of `unit_id`.
    pub fn bid(&self, unit_id: UnitId) -> Bid {
        self.bids.get(&unit_id).copied().unwrap_or(self.fallback)
    }
}
