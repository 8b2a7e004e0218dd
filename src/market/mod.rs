pub mod clearing;
pub mod congestion;
pub mod context;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod records;
pub mod settlement;
pub mod standings;
pub mod summary;
pub mod types;

pub use context::GameContext;
pub use engine::{Game, HourOutcome, RunMode};
pub use error::MarketError;
pub use ledger::{BidInput, BidSubmission, SubmitReport};
pub use standings::Standings;
pub use types::{HourKey, Zone};
