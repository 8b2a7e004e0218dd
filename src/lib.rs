//! Classroom electricity market simulator.
//!
//! Participants bid their generating units hour by hour; the engine clears a
//! uniform-price auction, relieves North/South transmission congestion with
//! adjustment bids, settles every unit and rolls portfolio balances forward.

#[cfg(feature = "api")]
pub mod api;
pub mod bidders;
pub mod cli;
pub mod config;
pub mod io;
/// Market engine: ledger, clearing, congestion, settlement and summary.
pub mod market;
