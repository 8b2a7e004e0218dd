//! Read-only game context passed into every engine call.

use std::collections::BTreeMap;

use crate::config::{ConfigError, GameConfig};

use super::error::MarketError;
use super::types::{GameSettings, HourKey, Portfolio, PortfolioId, ScheduleEntry, Unit, UnitId};

/// Roster, portfolios, schedule, and settings for one game.
///
/// Built once from a validated [`GameConfig`] and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct GameContext {
    units: BTreeMap<UnitId, Unit>,
    portfolios: BTreeMap<PortfolioId, Portfolio>,
    schedule: BTreeMap<HourKey, ScheduleEntry>,
    settings: GameSettings,
}

impl GameContext {
    /// Validates `config` and indexes it.
    ///
    /// # Errors
    ///
    /// Returns every validation error found in `config`.
    pub fn from_config(config: &GameConfig) -> Result<Self, Vec<ConfigError>> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            units: config.units.iter().map(|u| (u.unit_id, u.clone())).collect(),
            portfolios: config
                .portfolios
                .iter()
                .map(|p| (p.portfolio_id, p.clone()))
                .collect(),
            schedule: config.schedule.iter().map(|e| (e.key(), e.clone())).collect(),
            settings: config.settings.clone(),
        })
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn unit(&self, unit_id: UnitId) -> Option<&Unit> {
        self.units.get(&unit_id)
    }

    /// All units in ascending id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn portfolio(&self, portfolio_id: PortfolioId) -> Option<&Portfolio> {
        self.portfolios.get(&portfolio_id)
    }

    /// All portfolios in ascending id order.
    pub fn portfolios(&self) -> impl Iterator<Item = &Portfolio> {
        self.portfolios.values()
    }

    /// Units owned by `portfolio_id`, ascending by id.
    pub fn units_of(&self, portfolio_id: PortfolioId) -> impl Iterator<Item = &Unit> {
        self.units
            .values()
            .filter(move |u| u.portfolio_id == portfolio_id)
    }

    /// Looks up the schedule entry for `hour`.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleNotFound` when the hour is not scheduled, which is
    /// also how the end of the game is signalled.
    pub fn schedule_entry(&self, hour: HourKey) -> Result<&ScheduleEntry, MarketError> {
        self.schedule
            .get(&hour)
            .ok_or(MarketError::ScheduleNotFound { hour })
    }

    /// Scheduled hours in chronological order.
    pub fn hours(&self) -> impl Iterator<Item = HourKey> + '_ {
        self.schedule.keys().copied()
    }

    /// Whether `hour` is the highest hour scheduled for its round.
    ///
    /// Fixed O&M costs are charged on this hour.
    pub fn is_last_hour_of_round(&self, hour: HourKey) -> bool {
        self.schedule
            .range(hour..)
            .nth(1)
            .is_none_or(|(next, _)| next.round != hour.round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classroom_context_indexes_everything() {
        let ctx = GameContext::from_config(&GameConfig::classroom())
            .expect("classroom config is valid");
        assert_eq!(ctx.units().count(), 6);
        assert_eq!(ctx.portfolios().count(), 3);
        assert_eq!(ctx.hours().count(), 8);
        assert_eq!(ctx.units_of(1).map(|u| u.unit_id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = GameConfig::classroom();
        cfg.units.clear();
        let errors = GameContext::from_config(&cfg).err().unwrap_or_default();
        assert!(errors.iter().any(|e| e.field == "units"));
    }

    #[test]
    fn last_hour_is_highest_hour_of_the_round() {
        let ctx = GameContext::from_config(&GameConfig::classroom())
            .expect("classroom config is valid");
        assert!(!ctx.is_last_hour_of_round(HourKey::new(1, 3)));
        assert!(ctx.is_last_hour_of_round(HourKey::new(1, 4)));
        assert!(ctx.is_last_hour_of_round(HourKey::new(2, 4)));
    }

    #[test]
    fn missing_hour_is_schedule_not_found() {
        let ctx = GameContext::from_config(&GameConfig::classroom())
            .expect("classroom config is valid");
        let hour = HourKey::new(3, 1);
        assert_eq!(
            ctx.schedule_entry(hour).err(),
            Some(MarketError::ScheduleNotFound { hour })
        );
    }
}
