//! Core library for fanout: slow-service simulation, cancellation token,
//! execution strategies, and run statistics.
//! Used by the CLI binary; can be reused by other tools.

pub mod cancel;
pub mod config;
pub mod error;
pub mod message;
pub mod runner;
pub mod service;
pub mod stats;
pub mod utils;

// Re-export main API for CLI
pub use cancel::CancelToken;
pub use config::{load_config, Config};
pub use error::RunnerError;
pub use message::Message;
pub use runner::{
    run, run_bounded_pool, run_fork_join, run_sequential, sort_by_delay, PoolPolicy, Strategy,
};
pub use service::{MessageService, SlowService, DEFAULT_MAX_DELAY_MS, DEFAULT_SEED};
pub use stats::RunStats;
pub use utils::{log, log_error, StopWatch};
