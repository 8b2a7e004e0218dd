//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use grid_market::config::GameConfig;
use grid_market::market::types::{
    AuctionType, GameSettings, Portfolio, ScheduleEntry, Unit, Zone,
};
use grid_market::market::{Game, GameContext};
use rust_decimal::Decimal;

/// Unit A: North, 100 MWh, variable cost 10, owned by portfolio 1.
pub const UNIT_A: u32 = 1;
/// Unit B: South, 100 MWh, variable cost 15, owned by portfolio 2.
pub const UNIT_B: u32 = 2;

/// One hour of inelastic uniform-auction demand.
pub fn hour_entry(round: u32, hour: u32, north: i64, south: i64, link: i64) -> ScheduleEntry {
    ScheduleEntry {
        round,
        hour,
        north: Decimal::from(north),
        south: Decimal::from(south),
        net: Decimal::from(north + south),
        n_to_s_capacity: Decimal::from(link),
        s_to_n_capacity: Decimal::from(link),
        slope: Decimal::ZERO,
        auction_type: AuctionType::Uniform,
    }
}

/// Two portfolios of one unit each, A in the North and B in the South.
pub fn two_unit_config(schedule: Vec<ScheduleEntry>) -> GameConfig {
    let unit = |unit_id, portfolio_id, zone, cost| Unit {
        unit_id,
        unit_name: format!("unit {unit_id}"),
        portfolio_id,
        zone,
        capacity: Decimal::from(100),
        variable_cost_per_mwh: Decimal::from(cost),
        daily_fixed_cost: Decimal::from(50),
        carbon_per_mwh: Decimal::ZERO,
    };
    GameConfig {
        settings: GameSettings::default(),
        portfolios: vec![
            Portfolio {
                portfolio_id: 1,
                name: "Alpha".to_string(),
                starting_money: Decimal::from(1000),
            },
            Portfolio {
                portfolio_id: 2,
                name: "Beta".to_string(),
                starting_money: Decimal::from(1000),
            },
        ],
        units: vec![unit(UNIT_A, 1, Zone::North, 10), unit(UNIT_B, 2, Zone::South, 15)],
        schedule,
    }
}

/// Fresh game for a validated config.
pub fn game_from(config: &GameConfig) -> Game {
    let ctx = GameContext::from_config(config)
        .unwrap_or_else(|errors| panic!("fixture config should be valid: {errors:?}"));
    Game::initialize(ctx)
}

/// Classroom preset game.
pub fn classroom_game() -> Game {
    game_from(&GameConfig::classroom())
}
