// Library root: re-exports all modules so integration tests and external
// consumers (command dispatch, chart rendering) can access the crate's
// public API.

pub mod cache;
pub mod config;
pub mod names;
pub mod parser;
pub mod report;
pub mod stats;
pub mod sync;
pub mod transport;
