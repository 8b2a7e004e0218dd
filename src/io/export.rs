//! CSV export for the summary table and the per-hour sheets.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::market::Game;
use crate::market::records::HourlyRecord;
use crate::market::summary::Summary;
use crate::market::types::{AuctionType, HourKey, PortfolioId};

/// Leading summary columns, one per schedule field.
const SUMMARY_HEADER: &str = "round,hour,north,south,net,n_to_s_capacity,s_to_n_capacity,slope,auction_type";

/// Exports the summary and every run hour into `dir`.
///
/// Writes `summary.csv` and `hourly/round_{r}_hour_{h}.csv`, creating the
/// directories as needed. Returns the paths written.
///
/// # Errors
///
/// Returns an `io::Error` if a directory or file cannot be written.
pub fn export_game(game: &Game, dir: &Path) -> io::Result<Vec<PathBuf>> {
    let hourly_dir = dir.join("hourly");
    fs::create_dir_all(&hourly_dir)?;

    let mut written = Vec::new();
    let portfolio_ids: Vec<PortfolioId> = game.context().portfolios().map(|p| p.portfolio_id).collect();
    let summary_path = dir.join("summary.csv");
    write_summary_csv(game.summary(), &portfolio_ids, io::BufWriter::new(File::create(&summary_path)?))?;
    written.push(summary_path);

    for (hour, records) in game.records().iter() {
        let path = hourly_dir.join(hourly_file_name(hour));
        write_hourly_csv(records, io::BufWriter::new(File::create(&path)?))?;
        written.push(path);
    }
    Ok(written)
}

/// File name of the sheet for `hour`.
pub fn hourly_file_name(hour: HourKey) -> String {
    format!("round_{}_hour_{}.csv", hour.round, hour.hour)
}

/// Writes one hour's records, one row per unit.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_hourly_csv(records: &[HourlyRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the summary in the wide layout: schedule columns, then
/// revenue/cost/profit triples per portfolio, then one balance column per
/// portfolio. Unrun hours leave the money columns empty.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_summary_csv(summary: &Summary, portfolio_ids: &[PortfolioId], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header: Vec<String> = SUMMARY_HEADER.split(',').map(str::to_string).collect();
    for pid in portfolio_ids {
        header.push(format!("player_{pid}_revenue"));
        header.push(format!("player_{pid}_cost"));
        header.push(format!("player_{pid}_profit"));
    }
    header.extend(portfolio_ids.iter().map(|pid| format!("player_{pid}_balance")));
    wtr.write_record(&header)?;

    for row in summary.rows() {
        let mut record = vec![
            row.round.to_string(),
            row.hour.to_string(),
            row.north.to_string(),
            row.south.to_string(),
            row.net.to_string(),
            row.n_to_s_capacity.to_string(),
            row.s_to_n_capacity.to_string(),
            row.slope.to_string(),
            match row.auction_type {
                AuctionType::Uniform => "uniform".to_string(),
                AuctionType::Discrete => "discrete".to_string(),
            },
        ];
        for pid in portfolio_ids {
            match row.line(*pid) {
                Some(l) => record.extend([l.revenue, l.cost, l.profit].map(|v| v.to_string())),
                None => record.extend(std::iter::repeat_n(String::new(), 3)),
            }
        }
        for pid in portfolio_ids {
            record.push(row.line(*pid).map(|l| l.balance.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::market::{GameContext, RunMode};

    fn game_with_one_hour() -> Game {
        let ctx = GameContext::from_config(&GameConfig::classroom()).expect("classroom config is valid");
        let mut game = Game::initialize(ctx);
        game.commit_and_run_hour(HourKey::new(1, 1), RunMode::Normal)
            .expect("first hour runs");
        game
    }

    fn summary_text(game: &Game) -> String {
        let mut buf = Vec::new();
        write_summary_csv(game.summary(), &[1, 2, 3], &mut buf).expect("write to memory");
        String::from_utf8(buf).unwrap_or_default()
    }

    #[test]
    fn summary_header_uses_wide_layout() {
        let text = summary_text(&game_with_one_hour());
        let header = text.lines().next().unwrap_or("");
        assert!(header.starts_with("round,hour,north,south,net"));
        assert!(header.contains("player_1_revenue,player_1_cost,player_1_profit,player_2_revenue"));
        assert!(header.ends_with("player_1_balance,player_2_balance,player_3_balance"));
    }

    #[test]
    fn unrun_hours_have_empty_money_columns() {
        let text = summary_text(&game_with_one_hour());
        let lines: Vec<&str> = text.lines().collect();
        // header + 8 scheduled hours
        assert_eq!(lines.len(), 9);
        assert!(!lines[1].ends_with(",,,"));
        assert!(lines[2].ends_with(",,,"));
    }

    #[test]
    fn hourly_sheet_has_one_row_per_unit() {
        let game = game_with_one_hour();
        let records = game.records().get(HourKey::new(1, 1)).unwrap_or_default();
        let mut buf = Vec::new();
        write_hourly_csv(records, &mut buf).expect("write to memory");

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let headers = rdr.headers().cloned().ok();
        assert_eq!(headers.as_ref().and_then(|h| h.get(0)), Some("round"));
        assert_eq!(headers.as_ref().and_then(|h| h.get(25)), Some("profit"));
        assert_eq!(rdr.records().count(), 6);
    }

    #[test]
    fn deterministic_output() {
        let game = game_with_one_hour();
        assert_eq!(summary_text(&game), summary_text(&game));
    }

    #[test]
    fn hourly_file_names_follow_round_and_hour() {
        assert_eq!(hourly_file_name(HourKey::new(2, 3)), "round_2_hour_3.csv");
    }
}
