//! Grid market entry point: config loading, automated bidding, hour runs.

use std::path::Path;
use std::process;

use grid_market::bidders::{self, BidStrategy, MarkupBidder, TruthfulBidder};
use grid_market::cli::{self, BidderKind, CliOptions};
use grid_market::config::GameConfig;
use grid_market::io::export::export_game;
use grid_market::io::import::load_config_dir;
use grid_market::market::{Game, GameContext, RunMode, Standings};
use tracing::Level;

/// Markup strategy parameters used by the demo bidder.
const MARKUP_MEAN: f32 = 0.15;
const MARKUP_STD: f32 = 0.05;

fn load_config(opts: &CliOptions) -> Result<GameConfig, String> {
    if let Some(ref path) = opts.game {
        GameConfig::from_toml_file(path).map_err(|e| e.to_string())
    } else if let Some(ref dir) = opts.config_dir {
        load_config_dir(dir).map_err(|e| e.to_string())
    } else {
        let name = opts.preset.as_deref().unwrap_or("classroom");
        GameConfig::from_preset(name).map_err(|e| e.to_string())
    }
}

fn make_bidder(opts: &CliOptions) -> Box<dyn BidStrategy> {
    match opts.bidder {
        BidderKind::Truthful => Box::new(TruthfulBidder),
        BidderKind::Markup => Box::new(MarkupBidder::new(MARKUP_MEAN, MARKUP_STD, opts.seed)),
    }
}

fn main() {
    let opts = match cli::parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if opts.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let config = load_config(&opts).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    let ctx = GameContext::from_config(&config).unwrap_or_else(|errors| {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    });

    let mut game = Game::initialize(ctx);
    let mut bidder = make_bidder(&opts);
    tracing::info!(strategy = bidder.name(), seed = opts.seed, "automated bidding");

    let limit = opts.hours.unwrap_or(usize::MAX);
    let mut ran = 0usize;
    while ran < limit {
        let Some(hour) = game.next_pending_hour() else {
            break;
        };
        let outcome = bidders::submit_for_hour(&mut game, bidder.as_mut(), hour)
            .and_then(|_| game.commit_and_run_hour(hour, RunMode::Normal));
        match outcome {
            Ok(outcome) => println!("{outcome}"),
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
        ran += 1;
    }

    println!("{}", Standings::from_summary(game.context(), game.summary()));

    if let Some(ref dir) = opts.out_dir {
        match export_game(&game, Path::new(dir)) {
            Ok(files) => eprintln!("Wrote {} files to {}", files.len(), dir.display()),
            Err(e) => {
                eprintln!("error: failed to write CSV: {e}");
                process::exit(1);
            }
        }
    }

    if opts.serve {
        serve(game, opts.port);
    }
}

#[cfg(feature = "api")]
fn serve(game: Game, port: u16) {
    use std::net::SocketAddr;
    use std::sync::Arc;

    let state = Arc::new(grid_market::api::AppState::new(game));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("error: failed to create tokio runtime: {e}");
        process::exit(1);
    });
    if let Err(e) = rt.block_on(grid_market::api::serve(state, addr)) {
        eprintln!("error: API server failed: {e}");
        process::exit(1);
    }
}

#[cfg(not(feature = "api"))]
fn serve(_game: Game, _port: u16) {
    tracing::warn!("--serve requires building with the `api` feature");
}
