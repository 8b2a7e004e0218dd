//! REST API over a running game.
//!
//! Read endpoints:
//! - `GET /summary`: every summary row
//! - `GET /standings`: cumulative scoreboard
//! - `GET /hours/{round}/{hour}`: records of a run hour
//!
//! Write endpoints:
//! - `POST /portfolios/{id}/bids`: participant bid submission
//! - `POST /portfolios/{id}/adjustment`: portfolio-wide up/down pair
//! - `POST /hours/{round}/{hour}/bids`: operator bid override
//! - `POST /hours/{round}/{hour}/run?overwrite=bool`: operator hour run

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use axum::Router;
use axum::routing::{get, post};

use crate::market::Game;

/// Application state shared across all request handlers.
///
/// Participants and the operator mutate the same game, so it sits behind
/// a lock. Handlers never hold the lock across an await point.
pub struct AppState {
    pub game: RwLock<Game>,
}

impl AppState {
    pub fn new(game: Game) -> Self {
        Self {
            game: RwLock::new(game),
        }
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/summary", get(handlers::get_summary))
        .route("/standings", get(handlers::get_standings))
        .route("/hours/{round}/{hour}", get(handlers::get_hour))
        .route("/hours/{round}/{hour}/run", post(handlers::post_run_hour))
        .route("/hours/{round}/{hour}/bids", post(handlers::post_override_bids))
        .route("/portfolios/{id}/bids", post(handlers::post_bids))
        .route("/portfolios/{id}/adjustment", post(handlers::post_adjustment))
        .with_state(state)
}

/// Binds to the given address and serves the API.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
