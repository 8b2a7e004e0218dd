//! Request handlers for the API endpoints.

use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use super::AppState;
use super::types::{
    AdjustmentRequest, BidsRequest, ErrorResponse, HourResponse, RunQuery, RunResponse, SubmitResponse,
};
use crate::market::standings::Standings;
use crate::market::summary::SummaryRow;
use crate::market::types::{HourKey, PortfolioId};
use crate::market::{Game, MarketError, RunMode};

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Maps engine errors onto HTTP status codes.
fn market_error(err: &MarketError) -> ApiError {
    let status = match err {
        MarketError::UnknownUnitOrPortfolio { .. } | MarketError::ScheduleNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        MarketError::HourAlreadyRun { .. }
        | MarketError::BidWindowClosed { .. }
        | MarketError::InconsistentRowOrder { .. } => StatusCode::CONFLICT,
        MarketError::InvalidBid { .. }
        | MarketError::AdjustmentDisabled
        | MarketError::CongestionUnresolvable { .. } => StatusCode::BAD_REQUEST,
    };
    error(status, err.to_string())
}

fn read_game(state: &AppState) -> Result<RwLockReadGuard<'_, Game>, ApiError> {
    state
        .game
        .read()
        .map_err(|_| error(StatusCode::INTERNAL_SERVER_ERROR, "game state is unavailable"))
}

fn write_game(state: &AppState) -> Result<RwLockWriteGuard<'_, Game>, ApiError> {
    state
        .game
        .write()
        .map_err(|_| error(StatusCode::INTERNAL_SERVER_ERROR, "game state is unavailable"))
}

/// `GET /summary` → 200 + every summary row, run or not.
pub async fn get_summary(State(state): State<Arc<AppState>>) -> ApiResult<Vec<SummaryRow>> {
    let game = read_game(&state)?;
    Ok(Json(game.summary().rows().to_vec()))
}

/// `GET /standings` → 200 + `Standings`
pub async fn get_standings(State(state): State<Arc<AppState>>) -> ApiResult<Standings> {
    let game = read_game(&state)?;
    Ok(Json(Standings::from_summary(game.context(), game.summary())))
}

/// `GET /hours/{round}/{hour}` → 200 + records, 404 if the hour has not been run.
pub async fn get_hour(
    State(state): State<Arc<AppState>>,
    Path((round, hour)): Path<(u32, u32)>,
) -> ApiResult<HourResponse> {
    let key = HourKey::new(round, hour);
    let game = read_game(&state)?;
    let (Some(records), Some(summary)) = (game.records().get(key), game.summary_row(key)) else {
        return Err(error(
            StatusCode::NOT_FOUND,
            format!("hour {key} has not been run"),
        ));
    };
    Ok(Json(HourResponse {
        summary: summary.clone(),
        records: records.to_vec(),
    }))
}

/// `POST /portfolios/{id}/bids` → 200 + `SubmitResponse`
pub async fn post_bids(
    State(state): State<Arc<AppState>>,
    Path(portfolio_id): Path<PortfolioId>,
    Json(body): Json<BidsRequest>,
) -> ApiResult<SubmitResponse> {
    let mut game = write_game(&state)?;
    let report = game
        .submit_bids(portfolio_id, &body.bids)
        .map_err(|e| market_error(&e))?;
    Ok(Json(report.into()))
}

/// `POST /portfolios/{id}/adjustment` → 200 + `SubmitResponse`
pub async fn post_adjustment(
    State(state): State<Arc<AppState>>,
    Path(portfolio_id): Path<PortfolioId>,
    Json(body): Json<AdjustmentRequest>,
) -> ApiResult<SubmitResponse> {
    let mut game = write_game(&state)?;
    let report = game
        .submit_portfolio_adjustment(
            portfolio_id,
            HourKey::new(body.round, body.hour),
            body.bid_up,
            body.bid_down,
        )
        .map_err(|e| market_error(&e))?;
    Ok(Json(report.into()))
}

/// `POST /hours/{round}/{hour}/bids` → 200 + `SubmitResponse`
///
/// Operator edit of any unit's bids for the hour, committed or not. Every
/// submission must name the hour in the path.
pub async fn post_override_bids(
    State(state): State<Arc<AppState>>,
    Path((round, hour)): Path<(u32, u32)>,
    Json(body): Json<BidsRequest>,
) -> ApiResult<SubmitResponse> {
    let key = HourKey::new(round, hour);
    if let Some(other) = body.bids.iter().find(|b| b.key() != key) {
        return Err(error(
            StatusCode::BAD_REQUEST,
            format!("bid for unit {} targets {}, not {key}", other.unit_id, other.key()),
        ));
    }
    let mut game = write_game(&state)?;
    let report = game
        .override_bids(&body.bids)
        .map_err(|e| market_error(&e))?;
    Ok(Json(report.into()))
}

/// `POST /hours/{round}/{hour}/run?overwrite=bool` → 200 + `RunResponse`
pub async fn post_run_hour(
    State(state): State<Arc<AppState>>,
    Path((round, hour)): Path<(u32, u32)>,
    Query(query): Query<RunQuery>,
) -> ApiResult<RunResponse> {
    let mode = if query.overwrite {
        RunMode::Overwrite
    } else {
        RunMode::Normal
    };
    let mut game = write_game(&state)?;
    let outcome = game
        .commit_and_run_hour(HourKey::new(round, hour), mode)
        .map_err(|e| market_error(&e))?;
    Ok(Json(RunResponse::from(&outcome)))
}
