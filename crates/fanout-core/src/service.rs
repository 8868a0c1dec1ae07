//! Simulated slow service: deterministic per-id delay, interruptible wait.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cancel::CancelToken;
use crate::error::RunnerError;
use crate::message::Message;

pub const DEFAULT_MAX_DELAY_MS: u64 = 1_000;
pub const DEFAULT_SEED: u64 = 0x5eed_f0a1;

/// The one collaborator the runner fans out over. Implementations must be
/// callable concurrently from many threads; swapping in a stub (zero delay,
/// forced failure, fixed delay) is how the strategies are tested.
pub trait MessageService: Send + Sync {
    fn get_message(&self, id: u32, cancel: &CancelToken) -> Result<Message, RunnerError>;
}

/// Simulates a variable-latency backend. The delay is a pure function of
/// `(seed, id)`, so every strategy observes the same delays and the final
/// sorted sequences can be compared across strategies.
pub struct SlowService {
    max_delay_ms: u64,
    seed: u64,
}

impl SlowService {
    pub fn new(max_delay_ms: u64, seed: u64) -> Self {
        Self { max_delay_ms, seed }
    }

    /// Delay for one id, in `0..=max_delay_ms`. Stateless and reproducible.
    pub fn delay_for(&self, id: u32) -> u64 {
        let stream = self.seed ^ u64::from(id).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        let mut rng = StdRng::seed_from_u64(stream);
        rng.gen_range(0..=self.max_delay_ms)
    }
}

impl Default for SlowService {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELAY_MS, DEFAULT_SEED)
    }
}

impl MessageService for SlowService {
    fn get_message(&self, id: u32, cancel: &CancelToken) -> Result<Message, RunnerError> {
        let delay_ms = self.delay_for(id);
        if !cancel.sleep(Duration::from_millis(delay_ms)) {
            return Err(RunnerError::Cancelled { at_id: Some(id) });
        }
        Ok(Message::new(
            id,
            delay_ms,
            format!("message {} delayed {}ms", id, delay_ms),
        ))
    }
}
