//! API request and response types.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::congestion::CongestionStatus;
use crate::market::ledger::{BidInput, BidSubmission, SubmitReport};
use crate::market::records::HourlyRecord;
use crate::market::summary::{SummaryLine, SummaryRow};
use crate::market::types::PortfolioId;
use crate::market::HourOutcome;

/// Body of `POST /portfolios/{id}/bids`.
#[derive(Debug, Deserialize)]
pub struct BidsRequest {
    pub bids: Vec<BidSubmission>,
}

/// Body of `POST /portfolios/{id}/adjustment`: one up/down pair for every
/// unit of the portfolio.
#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    pub round: u32,
    pub hour: u32,
    #[serde(default)]
    pub bid_up: Option<BidInput>,
    #[serde(default)]
    pub bid_down: Option<BidInput>,
}

/// Result of a bid submission. Corrections are rendered as messages.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub accepted: usize,
    pub ignored: usize,
    pub corrections: Vec<String>,
}

impl From<SubmitReport> for SubmitResponse {
    fn from(report: SubmitReport) -> Self {
        Self {
            accepted: report.accepted,
            ignored: report.ignored,
            corrections: report.corrections.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Records and summary row of one run hour.
#[derive(Debug, Serialize)]
pub struct HourResponse {
    pub summary: SummaryRow,
    pub records: Vec<HourlyRecord>,
}

/// Result of `POST /hours/{round}/{hour}/run`.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub round: u32,
    pub hour: u32,
    pub clearing_price: Decimal,
    pub congestion: CongestionStatus,
    pub lines: BTreeMap<PortfolioId, SummaryLine>,
    pub warnings: Vec<String>,
}

impl From<&HourOutcome> for RunResponse {
    fn from(o: &HourOutcome) -> Self {
        Self {
            round: o.hour.round,
            hour: o.hour.hour,
            clearing_price: o.clearing_price,
            congestion: o.congestion,
            lines: o.lines.clone(),
            warnings: o.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Query of the run endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct RunQuery {
    /// Replace an hour that has already been run.
    #[serde(default)]
    pub overwrite: bool,
}

/// Error response body for 4xx/5xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::error::MarketError;
    use crate::market::types::HourKey;

    #[test]
    fn submit_response_renders_corrections() {
        let report = SubmitReport {
            accepted: 2,
            ignored: 1,
            corrections: vec![MarketError::InvalidBid {
                unit_id: 3,
                hour: HourKey::new(1, 2),
                reason: "bid_base: empty value".into(),
            }],
        };
        let response = SubmitResponse::from(report);
        assert_eq!(response.accepted, 2);
        assert_eq!(
            response.corrections,
            vec!["invalid bid for unit 3 at 1/2: bid_base: empty value".to_string()]
        );
    }

    #[test]
    fn bids_request_accepts_text_and_numbers() {
        let body = r#"{"bids": [{"unit_id": 1, "round": 1, "hour": 1, "bid_base": "25", "bid_down": 3}]}"#;
        let req: BidsRequest = serde_json::from_str(body).expect("valid body");
        assert_eq!(req.bids.len(), 1);
        assert!(req.bids[0].bid_up.is_none());
    }

    #[test]
    fn adjustment_request_fields_are_optional() {
        let req: AdjustmentRequest =
            serde_json::from_str(r#"{"round": 1, "hour": 2, "bid_down": "4.5"}"#).expect("valid body");
        assert_eq!((req.round, req.hour), (1, 2));
        assert!(req.bid_up.is_none());
        assert!(req.bid_down.is_some());
    }
}
