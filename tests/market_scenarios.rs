//! End-to-end hour runs on small hand-built games.

mod common;

use common::{UNIT_A, UNIT_B, game_from, hour_entry, two_unit_config};
use grid_market::bidders::{TruthfulBidder, submit_for_hour};
use grid_market::market::congestion::CongestionStatus;
use grid_market::market::types::AdjustmentMode;
use grid_market::market::{BidSubmission, Game, HourKey, MarketError, RunMode, Zone};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const H11: HourKey = HourKey { round: 1, hour: 1 };
const H12: HourKey = HourKey { round: 1, hour: 2 };
const H21: HourKey = HourKey { round: 2, hour: 1 };

fn bid(game: &mut Game, portfolio_id: u32, submission: BidSubmission) {
    game.submit_bids(portfolio_id, &[submission])
        .expect("bid should be accepted");
}

fn bid_both(game: &mut Game, hour: HourKey, a: Decimal, b: Decimal) {
    bid(game, 1, BidSubmission::full(UNIT_A, hour, a, dec!(5), dec!(2)));
    bid(game, 2, BidSubmission::full(UNIT_B, hour, b, dec!(4), dec!(3)));
}

fn record(game: &Game, hour: HourKey, unit_id: u32) -> grid_market::market::records::HourlyRecord {
    game.records()
        .get(hour)
        .and_then(|rows| rows.iter().find(|r| r.unit_id == unit_id))
        .cloned()
        .unwrap_or_else(|| panic!("no record for unit {unit_id} at {hour}"))
}

#[test]
fn marginal_unit_sets_the_uniform_price() {
    let mut game = game_from(&two_unit_config(vec![hour_entry(1, 1, 80, 70, 200)]));
    bid_both(&mut game, H11, dec!(20), dec!(30));

    let outcome = game
        .commit_and_run_hour(H11, RunMode::Normal)
        .expect("hour should run");
    assert_eq!(outcome.clearing_price, dec!(30));
    assert_eq!(outcome.congestion, CongestionStatus::WithinLimits);

    let a = record(&game, H11, UNIT_A);
    let b = record(&game, H11, UNIT_B);
    assert_eq!(a.mwh_produced, dec!(100));
    assert_eq!(b.mwh_produced, dec!(50));
    assert_eq!(a.base_price, dec!(30));
    assert_eq!(b.base_price, dec!(30));

    // single-hour round: O&M is charged
    assert_eq!(a.revenue, dec!(3000));
    assert_eq!(a.profit, dec!(3000) - dec!(1000) - dec!(50));
    assert_eq!(b.profit, dec!(1500) - dec!(750) - dec!(50));

    let row = game.summary_row(H11).expect("row exists");
    assert_eq!(row.line(1).map(|l| l.balance), Some(dec!(2950)));
    assert_eq!(row.line(2).map(|l| l.balance), Some(dec!(1700)));
}

#[test]
fn tight_link_redispatches_to_exactly_the_limit() {
    let mut game = game_from(&two_unit_config(vec![hour_entry(1, 1, 80, 70, 5)]));
    bid_both(&mut game, H11, dec!(20), dec!(30));

    let outcome = game
        .commit_and_run_hour(H11, RunMode::Normal)
        .expect("hour should run");
    assert_eq!(
        outcome.congestion,
        CongestionStatus::Surplus {
            zone: Zone::North,
            excess: dec!(15)
        }
    );
    assert!(outcome.warnings.is_empty());

    let a = record(&game, H11, UNIT_A);
    let b = record(&game, H11, UNIT_B);
    assert_eq!(a.mwh_adjusted_down, dec!(15));
    assert_eq!(a.mwh_produced, dec!(85));
    assert_eq!(b.mwh_adjusted_up, dec!(15));
    assert_eq!(b.mwh_produced, dec!(65));
    // North now exports exactly the link capacity.
    assert_eq!(a.mwh_produced - dec!(80), dec!(5));

    // curtailed energy paid at bid_down, ramped energy at bid_base - bid_up
    assert_eq!(a.adjust_down_revenue, dec!(15) * dec!(2));
    assert_eq!(b.adjust_up_revenue, dec!(15) * (dec!(30) - dec!(4)));
}

#[test]
fn disabled_adjustment_skips_congestion() {
    let mut config = two_unit_config(vec![hour_entry(1, 1, 80, 70, 5)]);
    config.settings.adjustment_mode = AdjustmentMode::Disabled;
    let mut game = game_from(&config);
    bid(&mut game, 1, BidSubmission::base(UNIT_A, H11, dec!(20)));
    bid(&mut game, 2, BidSubmission::base(UNIT_B, H11, dec!(30)));

    let outcome = game
        .commit_and_run_hour(H11, RunMode::Normal)
        .expect("hour should run");
    assert_eq!(outcome.congestion, CongestionStatus::Disabled);
    assert_eq!(record(&game, H11, UNIT_A).mwh_produced, dec!(100));
}

#[test]
fn per_portfolio_adjustment_prices_reach_settlement() {
    let mut config = two_unit_config(vec![hour_entry(1, 1, 80, 70, 5)]);
    config.settings.adjustment_mode = AdjustmentMode::PerPortfolio;
    let mut game = game_from(&config);

    let report = submit_for_hour(&mut game, &mut TruthfulBidder, H11).expect("bids accepted");
    assert_eq!(report.accepted, 6);
    assert_eq!(report.ignored, 0);

    let outcome = game
        .commit_and_run_hour(H11, RunMode::Normal)
        .expect("hour should run");
    assert_eq!(outcome.clearing_price, dec!(15));
    assert!(matches!(outcome.congestion, CongestionStatus::Surplus { zone: Zone::North, .. }));

    let a = record(&game, H11, UNIT_A);
    let b = record(&game, H11, UNIT_B);
    // truthful portfolios offer adjustment at no premium, not at max_bid
    assert_eq!((a.bid_up, a.bid_down), (dec!(0), dec!(0)));
    assert_eq!((b.bid_up, b.bid_down), (dec!(0), dec!(0)));
    assert_eq!(a.mwh_adjusted_down, dec!(15));
    assert_eq!(a.adjust_down_revenue, dec!(0));
    assert_eq!(b.mwh_adjusted_up, dec!(15));
    assert_eq!(b.adjust_up_revenue, dec!(15) * dec!(15));
}

#[test]
fn per_portfolio_mode_ignores_unit_level_adjustments() {
    let mut config = two_unit_config(vec![hour_entry(1, 1, 80, 70, 5)]);
    config.settings.adjustment_mode = AdjustmentMode::PerPortfolio;
    let mut game = game_from(&config);

    let report = game
        .submit_bids(1, &[BidSubmission::full(UNIT_A, H11, dec!(20), dec!(5), dec!(2))])
        .expect("bid accepted");
    assert_eq!((report.accepted, report.ignored), (1, 2));

    let report = game
        .submit_portfolio_adjustment(1, H11, Some(dec!(5).into()), Some(dec!(2).into()))
        .expect("pair accepted");
    assert_eq!(report.accepted, 2);
    let pending = game.ledger().pending(UNIT_A, H11);
    assert_eq!((pending.bid_up, pending.bid_down), (Some(dec!(5)), Some(dec!(2))));
}

#[test]
fn equal_bids_clear_in_unit_id_order() {
    let mut game = game_from(&two_unit_config(vec![hour_entry(1, 1, 60, 60, 200)]));
    bid_both(&mut game, H11, dec!(25), dec!(25));

    game.commit_and_run_hour(H11, RunMode::Normal)
        .expect("hour should run");
    assert_eq!(record(&game, H11, UNIT_A).mwh_produced_initial, dec!(100));
    assert_eq!(record(&game, H11, UNIT_B).mwh_produced_initial, dec!(20));
}

#[test]
fn profit_identity_holds_for_every_record() {
    let mut game = common::classroom_game();
    let outcomes = game.run_remaining().expect("all hours should run");
    assert_eq!(outcomes.len(), 8);
    for (_, rows) in game.records().iter() {
        for r in rows {
            assert_eq!(r.profit, r.revenue - r.cost_var - r.cost_om - r.cost_carbon);
            assert_eq!(
                r.revenue,
                r.base_revenue + r.adjust_down_revenue + r.adjust_up_revenue
            );
        }
    }
    assert!(game.next_pending_hour().is_none());
}

fn two_round_game() -> Game {
    let mut config = two_unit_config(vec![
        hour_entry(1, 1, 80, 70, 200),
        hour_entry(1, 2, 60, 60, 200),
        hour_entry(2, 1, 70, 70, 200),
    ]);
    config.settings.interest_rate = dec!(0.10);
    let mut game = game_from(&config);
    for hour in [H11, H12, H21] {
        bid_both(&mut game, hour, dec!(20), dec!(30));
    }
    game
}

#[test]
fn interest_accrues_at_the_start_of_each_round() {
    let mut game = two_round_game();
    for hour in [H11, H12, H21] {
        game.commit_and_run_hour(hour, RunMode::Normal)
            .expect("hour should run");
    }

    for pid in [1, 2] {
        let prev = game
            .summary_row(H12)
            .and_then(|r| r.line(pid))
            .expect("round 1 last row filled");
        let first = game
            .summary_row(H21)
            .and_then(|r| r.line(pid))
            .expect("round 2 first row filled");
        let expected = (prev.balance * dec!(1.10) + first.profit)
            .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
        assert_eq!(first.balance, expected, "portfolio {pid}");

        let h11 = game.summary_row(H11).and_then(|r| r.line(pid)).expect("filled");
        assert_eq!(prev.balance, h11.balance + prev.profit);
    }
}

#[test]
fn rerun_requires_overwrite_and_rolls_balances_forward() {
    let mut game = two_round_game();
    for hour in [H11, H12] {
        game.commit_and_run_hour(hour, RunMode::Normal)
            .expect("hour should run");
    }

    let err = game.commit_and_run_hour(H11, RunMode::Normal);
    assert!(matches!(err, Err(MarketError::HourAlreadyRun { hour }) if hour == H11));

    // participants are locked out of a committed hour
    let err = game.submit_bids(1, &[BidSubmission::base(UNIT_A, H11, dec!(10))]);
    assert!(matches!(err, Err(MarketError::BidWindowClosed { .. })));

    let before = game.summary_row(H11).and_then(|r| r.line(2)).copied().expect("filled");
    game.override_bids(&[BidSubmission::base(UNIT_B, H11, dec!(40))])
        .expect("operator override");
    game.commit_and_run_hour(H11, RunMode::Overwrite)
        .expect("overwrite should succeed");

    let after = game.summary_row(H11).and_then(|r| r.line(2)).copied().expect("filled");
    assert!(after.profit > before.profit);
    assert_eq!(record(&game, H11, UNIT_B).bid_base, dec!(40));

    let next = game.summary_row(H12).and_then(|r| r.line(2)).copied().expect("filled");
    assert_eq!(next.balance, after.balance + next.profit);
}

#[test]
fn hours_must_run_in_order() {
    let mut game = two_round_game();
    let err = game.commit_and_run_hour(H12, RunMode::Normal);
    assert!(matches!(err, Err(MarketError::InconsistentRowOrder { .. })));
    // nothing was written
    assert!(game.records().is_empty());
    assert_eq!(game.next_pending_hour(), Some(H11));
}

#[test]
fn unscheduled_hour_is_rejected() {
    let mut game = two_round_game();
    let err = game.commit_and_run_hour(HourKey::new(3, 1), RunMode::Normal);
    assert!(matches!(err, Err(MarketError::ScheduleNotFound { .. })));
}

#[test]
fn schedule_exhaustion_ends_the_game() {
    let mut game = two_round_game();
    let outcomes = game.run_remaining().expect("all hours should run");
    assert_eq!(outcomes.len(), 3);
    assert!(game.next_pending_hour().is_none());
    assert!(game.run_remaining().expect("nothing left").is_empty());
}
