use std::env;
use std::path::PathBuf;

/// Automated bidder selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidderKind {
    Truthful,
    Markup,
}

pub struct CliOptions {
    pub game: Option<PathBuf>,
    pub preset: Option<String>,
    pub config_dir: Option<PathBuf>,
    pub bidder: BidderKind,
    pub seed: u64,
    /// Number of hours to run; `None` runs the whole schedule.
    pub hours: Option<usize>,
    pub out_dir: Option<PathBuf>,
    pub verbose: bool,
    pub serve: bool,
    pub port: u16,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    if args.len() == 1 && (args[0] == "--help" || args[0] == "-h") {
        print_usage();
        std::process::exit(0);
    }
    parse_options(&args)
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut game = None;
    let mut preset = None;
    let mut config_dir = None;
    let mut bidder = BidderKind::Markup;
    let mut seed = 42u64;
    let mut hours = None;
    let mut out_dir = None;
    let mut verbose = false;
    let mut serve = false;
    let mut port = 3000u16;

    while i < args.len() {
        match args[i].as_str() {
            "--game" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --game (expected a TOML file path)")?;
                if game.replace(PathBuf::from(path)).is_some() {
                    return Err("--game provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--config-dir" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --config-dir (expected a directory)")?;
                if config_dir.replace(PathBuf::from(path)).is_some() {
                    return Err("--config-dir provided more than once".to_string());
                }
            }
            "--bidder" => {
                i += 1;
                bidder = match args.next_or_err(i, "missing value for --bidder (truthful|markup)")? {
                    "truthful" => BidderKind::Truthful,
                    "markup" => BidderKind::Markup,
                    other => return Err(format!("unknown bidder \"{other}\", expected truthful or markup")),
                };
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                seed = raw
                    .parse()
                    .map_err(|_| format!("--seed value \"{raw}\" is not a valid u64"))?;
            }
            "--hours" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --hours (expected a count)")?;
                hours = Some(
                    raw.parse()
                        .map_err(|_| format!("--hours value \"{raw}\" is not a valid count"))?,
                );
            }
            "--out-dir" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --out-dir (expected a directory)")?;
                if out_dir.replace(PathBuf::from(path)).is_some() {
                    return Err("--out-dir provided more than once".to_string());
                }
            }
            "--verbose" | "-v" => verbose = true,
            "--serve" => serve = true,
            "--port" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --port (expected a u16)")?;
                port = raw
                    .parse()
                    .map_err(|_| format!("--port value \"{raw}\" is not a valid u16"))?;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    let sources = [game.is_some(), preset.is_some(), config_dir.is_some()];
    if sources.iter().filter(|&&s| s).count() > 1 {
        return Err(
            "arguments `--game`, `--preset` and `--config-dir` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    if game.is_none() && config_dir.is_none() && preset.is_none() {
        preset = Some("classroom".to_string());
    }

    Ok(CliOptions {
        game,
        preset,
        config_dir,
        bidder,
        seed,
        hours,
        out_dir,
        verbose,
        serve,
        port,
    })
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("grid-market: classroom electricity market simulator");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  grid-market [--game <toml> | --preset <name> | --config-dir <dir>]");
    eprintln!("              [--bidder truthful|markup] [--seed <u64>] [--hours <n>]");
    eprintln!("              [--out-dir <dir>] [--verbose] [--serve [--port <u16>]]");
    eprintln!();
    eprintln!("Without a source the classroom preset is used.");
}
