//! Flat-file import and export.

pub mod export;
pub mod import;
