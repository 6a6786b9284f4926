//! NOVA — sportsbook odds consensus and pick ledger
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod analytics;
pub mod config;
pub mod consensus;
pub mod engine;
pub mod ledger;
pub mod markets;
pub mod odds;
pub mod storage;
pub mod strategy;
pub mod types;
