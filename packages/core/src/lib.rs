// Library root: exposes internal modules for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod audit;
pub mod clock;
pub mod distribution;
pub mod eligibility;
pub mod error;
pub mod metrics;
pub mod report;
pub mod store;

// These modules are only needed by the binary.
// Declared pub so main.rs and integration tests can reach them.
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
