//! Game sources: presets, TOML files, CSV directories and the CLI binary.

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use grid_market::config::GameConfig;
use grid_market::io::import::load_config_dir;
use grid_market::market::types::AdjustmentMode;
use grid_market::market::{GameContext, HourKey};
use rust_decimal_macros::dec;

fn sample_game() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("games/two_zone.toml")
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("grid-market-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("scratch dir should be creatable");
    dir
}

#[test]
fn every_preset_builds_a_context() {
    for name in GameConfig::PRESETS {
        let config = GameConfig::from_preset(name).expect("preset should load");
        let ctx = GameContext::from_config(&config)
            .unwrap_or_else(|e| panic!("preset {name} should validate: {e:?}"));
        assert_eq!(ctx.hours().count(), 8);
        assert!(ctx.is_last_hour_of_round(HourKey::new(2, 4)));
        assert!(!ctx.is_last_hour_of_round(HourKey::new(2, 3)));
    }
}

#[test]
fn sample_game_file_loads_and_runs() {
    let config = GameConfig::from_toml_file(&sample_game()).expect("sample game should parse");
    assert_eq!(config.units.len(), 4);
    assert!(config.settings.carbon_enabled);

    let mut game = common::game_from(&config);
    let outcomes = game.run_remaining().expect("all hours should run");
    assert_eq!(outcomes.len(), 3);
    // only the last hour of the round carries O&M
    let om: Vec<_> = outcomes
        .iter()
        .map(|o| o.records.iter().any(|r| !r.cost_om.is_zero()))
        .collect();
    assert_eq!(om, vec![false, false, true]);
}

#[test]
fn invalid_game_reports_every_problem() {
    let mut config = GameConfig::classroom();
    config.settings.min_bid = dec!(600);
    config.units[0].portfolio_id = 99;
    config.schedule[0].slope = dec!(1);

    let errors = GameContext::from_config(&config).expect_err("config should be rejected");
    let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
    assert!(fields.contains(&"settings.min_bid"), "{fields:?}");
    assert!(fields.contains(&"units[0].portfolio_id"), "{fields:?}");
    assert!(fields.contains(&"schedule[0].slope"), "{fields:?}");
}

#[test]
fn csv_directory_in_flat_file_layout_loads() {
    let dir = scratch_dir("csv-config");
    fs::write(
        dir.join("portfolios.csv"),
        "portfolio_id,portfolio_name,unit_id,unit_name,unit_location,unit_capacity,cost_per_mwh,cost_daily_om,carbon_per_mwh\n\
         1,Alpha,1,Hydro,North,100,5,200,0\n\
         2,Beta,2,Gas,South,120,30,300,0.4\n\
         3,Unplayed,3,Coal,South,90,20,100,1\n",
    )
    .expect("write portfolios.csv");
    fs::write(
        dir.join("players.csv"),
        "portfolio_id,portfolio,starting_money\n1,Alpha,2000\n2,Beta,2500\n",
    )
    .expect("write players.csv");
    fs::write(
        dir.join("schedule.csv"),
        "round,hour,north,south,net,n_to_s_capacity,s_to_n_capacity,slope,auction_type\n\
         1,1,60,90,150,30,30,0,uniform\n\
         1,2,70,100,170,30,30,-1,discrete\n",
    )
    .expect("write schedule.csv");
    fs::write(
        dir.join("game_settings.csv"),
        "setting,value\nmin bid,-50\nmax bid,400\nadjustment,per portfolio\ninterest rate,0.01\n",
    )
    .expect("write game_settings.csv");

    let config = load_config_dir(&dir).expect("csv config should load");
    let _ = fs::remove_dir_all(&dir);

    assert_eq!(config.portfolios.len(), 2);
    // units of portfolios without a player are left out
    assert_eq!(config.units.len(), 2);
    assert_eq!(config.settings.adjustment_mode, AdjustmentMode::PerPortfolio);
    assert_eq!(config.settings.max_bid, dec!(400));
    assert_eq!(config.portfolios[1].starting_money, dec!(2500));
    assert!(config.validate().is_empty(), "{:?}", config.validate());
}

#[test]
fn cli_runs_sample_game_and_exports_csv() {
    let out = scratch_dir("cli-export");
    let output = Command::new(env!("CARGO_BIN_EXE_grid-market"))
        .arg("--game")
        .arg(sample_game())
        .args(["--bidder", "truthful", "--out-dir"])
        .arg(&out)
        .output()
        .expect("grid-market process should run");

    assert!(
        output.status.success(),
        "cli run failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    assert!(stdout.contains("Standings after 3 hour(s)"), "{stdout}");
    assert!(stdout.contains("Northern Power"));

    assert!(out.join("summary.csv").exists());
    assert!(out.join("hourly").join("round_1_hour_3.csv").exists());
    let _ = fs::remove_dir_all(&out);
}

#[test]
fn cli_honours_hour_limit_and_rejects_bad_preset() {
    let output = Command::new(env!("CARGO_BIN_EXE_grid-market"))
        .args(["--preset", "classroom", "--hours", "2", "--seed", "7"])
        .output()
        .expect("grid-market process should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Standings after 2 hour(s)"), "{stdout}");

    let output = Command::new(env!("CARGO_BIN_EXE_grid-market"))
        .args(["--preset", "nope"])
        .output()
        .expect("grid-market process should run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown preset"));
}
