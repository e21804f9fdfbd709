// ABOUTME: Shared types and configuration for botswarm.
// ABOUTME: Contains config parsing, worker descriptors, and symbol resolution.

pub mod config;
pub mod symbols;
pub mod worker;

pub use config::{Config, Timings, WorkerEntry};
pub use symbols::SymbolSource;
pub use worker::WorkerSpec;
