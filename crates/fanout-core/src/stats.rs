//! Summary statistics for a completed run, for the CLI report.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Aggregate view of one strategy run over a sorted result set.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub count: usize,
    pub wall_ms: u64,
    pub total_delay_ms: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub mean_delay_ms: u64,
    pub p50_delay_ms: u64,
    pub p95_delay_ms: u64,
    pub p99_delay_ms: u64,
    pub slowest_id: Option<u32>,
}

impl RunStats {
    /// Build stats from the final (delay-sorted) result set and the
    /// observed wall-clock time of the run.
    pub fn from_run(messages: &[Message], wall_ms: u64) -> Self {
        if messages.is_empty() {
            return Self {
                wall_ms,
                ..Self::default()
            };
        }

        let delays: Vec<u64> = messages.iter().map(|m| m.delay_ms).collect();
        let total: u64 = delays.iter().sum();
        let min = delays.iter().copied().min().unwrap_or(0);
        let max = delays.iter().copied().max().unwrap_or(0);
        let slowest = messages
            .iter()
            .max_by_key(|m| m.sort_key())
            .map(|m| m.id);

        Self {
            count: messages.len(),
            wall_ms,
            total_delay_ms: total,
            min_delay_ms: min,
            max_delay_ms: max,
            mean_delay_ms: total / delays.len() as u64,
            p50_delay_ms: percentile(&delays, 50),
            p95_delay_ms: percentile(&delays, 95),
            p99_delay_ms: percentile(&delays, 99),
            slowest_id: slowest,
        }
    }
}

/// Calculate percentile of values (sorted internally).
pub fn percentile(values: &[u64], p: u64) -> u64 {
    if values.is_empty() {
        return 0;
    }

    let mut sorted: Vec<u64> = values.to_vec();
    sorted.sort_unstable();

    let idx = (sorted.len() as u64 * p / 100) as usize;
    sorted[idx.min(sorted.len() - 1)]
}
