//! Per-unit hourly records and the write-once store that holds them.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::error::MarketError;
use super::types::{HourKey, PortfolioId, UnitId, Zone};

/// Settled outcome of one unit for one hour.
///
/// Field order is the column order of the exported hourly sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyRecord {
    pub round: u32,
    pub hour: u32,
    pub unit_id: UnitId,
    pub unit_name: String,
    pub portfolio_id: PortfolioId,
    pub zone: Zone,
    pub capacity: Decimal,
    pub bid_base: Decimal,
    pub bid_up: Decimal,
    pub bid_down: Decimal,
    pub base_price: Decimal,
    pub activated: bool,
    pub mwh_produced_initial: Decimal,
    pub mwh_produced_base: Decimal,
    pub mwh_adjusted_down: Decimal,
    pub mwh_adjusted_up: Decimal,
    pub mwh_produced: Decimal,
    pub carbon_produced: Decimal,
    pub base_revenue: Decimal,
    pub adjust_down_revenue: Decimal,
    pub adjust_up_revenue: Decimal,
    pub revenue: Decimal,
    pub cost_var: Decimal,
    pub cost_om: Decimal,
    pub cost_carbon: Decimal,
    pub profit: Decimal,
}

impl HourlyRecord {
    pub fn key(&self) -> HourKey {
        HourKey::new(self.round, self.hour)
    }
}

/// Frozen records of every hour that has been run.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    sheets: BTreeMap<HourKey, Vec<HourlyRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, hour: HourKey) -> bool {
        self.sheets.contains_key(&hour)
    }

    /// Stores the sheet for `hour`.
    ///
    /// # Errors
    ///
    /// `HourAlreadyRun` if a sheet exists and `overwrite` is false.
    pub fn write(
        &mut self,
        hour: HourKey,
        records: Vec<HourlyRecord>,
        overwrite: bool,
    ) -> Result<(), MarketError> {
        if !overwrite && self.contains(hour) {
            return Err(MarketError::HourAlreadyRun { hour });
        }
        self.sheets.insert(hour, records);
        Ok(())
    }

    pub fn get(&self, hour: HourKey) -> Option<&[HourlyRecord]> {
        self.sheets.get(&hour).map(Vec::as_slice)
    }

    /// All sheets in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (HourKey, &[HourlyRecord])> {
        self.sheets.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}
