//! Execution strategies over a `MessageService`.
//!
//! Every strategy computes the same result set for the same service and
//! count; only completion order and wall-clock time differ. The final
//! sequence is always sorted ascending by `(delay, id)`, slowest last,
//! which makes the output identical across strategies.

mod forkjoin;
mod pool;

pub use forkjoin::{run_fork_join, split_point};
pub use pool::{PoolPolicy, TaskQueue, TaskQueueBuilder};

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::RecvTimeoutError;

use crate::cancel::CancelToken;
use crate::error::RunnerError;
use crate::message::Message;
use crate::service::MessageService;

/// How often the pool coordinator re-checks deadline and cancellation
/// while waiting on the result channel.
const DRAIN_TICK: Duration = Duration::from_millis(25);

/// Concurrency strategy for one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Sequential,
    Pool,
    ForkJoin,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Sequential, Strategy::Pool, Strategy::ForkJoin];

    pub fn from_name(name: &str) -> Option<Strategy> {
        match name {
            "sequential" => Some(Strategy::Sequential),
            "pool" => Some(Strategy::Pool),
            "forkjoin" => Some(Strategy::ForkJoin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::Pool => "pool",
            Strategy::ForkJoin => "forkjoin",
        }
    }
}

/// Sort results into the presentation order: ascending delay, slowest
/// last, ids breaking ties.
pub fn sort_by_delay(messages: &mut [Message]) {
    messages.sort_unstable_by_key(Message::sort_key);
}

/// Baseline: one call per id, in index order, on the calling thread.
/// Wall time is roughly the sum of all delays.
pub fn run_sequential<S>(
    service: &S,
    count: u32,
    cancel: &CancelToken,
) -> Result<Vec<Message>, RunnerError>
where
    S: MessageService + ?Sized,
{
    let mut messages = Vec::with_capacity(count as usize);
    for id in 0..count {
        if cancel.is_cancelled() {
            return Err(RunnerError::Cancelled { at_id: Some(id) });
        }
        messages.push(service.get_message(id, cancel)?);
    }

    sort_by_delay(&mut messages);
    Ok(messages)
}

/// Fan out over a work-stealing pool sized by `policy`, with a global
/// timeout. All-or-nothing: timeout, cancellation, or any single compute
/// failure discards completed results, reclaims every worker, and fails
/// the whole call.
pub fn run_bounded_pool<S>(
    service: Arc<S>,
    count: u32,
    policy: PoolPolicy,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<Vec<Message>, RunnerError>
where
    S: MessageService + 'static,
{
    if count == 0 {
        return Ok(Vec::new());
    }

    let total = count as usize;
    let workers = policy.worker_count(total);
    let task_cancel = cancel.clone();
    let mut queue: TaskQueue<u32, Result<Message, RunnerError>> = TaskQueueBuilder::new()
        .workers(workers)
        .result_capacity(total)
        .build(move |id| service.get_message(id, &task_cancel));

    queue.submit_batch((0..count).collect());

    let started = Instant::now();
    let deadline = started + timeout;
    let mut messages = Vec::with_capacity(total);

    while messages.len() < total {
        if cancel.is_cancelled() {
            queue.shutdown_and_join();
            return Err(RunnerError::Cancelled { at_id: None });
        }

        let now = Instant::now();
        if now >= deadline {
            cancel.cancel();
            queue.shutdown_and_join();
            return Err(RunnerError::Timeout {
                waited_ms: started.elapsed().as_millis() as u64,
                limit_ms: timeout.as_millis() as u64,
                completed: messages.len(),
                total,
            });
        }

        let wait = DRAIN_TICK.min(deadline - now);
        match queue.recv_timeout(wait) {
            Ok(Ok(message)) => messages.push(message),
            Ok(Err(e)) => {
                cancel.cancel();
                queue.shutdown_and_join();
                return Err(e);
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
        }
    }

    queue.shutdown_and_join();
    sort_by_delay(&mut messages);
    Ok(messages)
}

/// Dispatch a run to the named strategy with one set of knobs. The pool
/// knobs (`policy`, `timeout`) and the fork/join knob (`parallelism`)
/// apply only to their own strategy.
pub fn run<S>(
    strategy: Strategy,
    service: &Arc<S>,
    count: u32,
    policy: PoolPolicy,
    timeout: Duration,
    parallelism: Option<usize>,
    cancel: &CancelToken,
) -> Result<Vec<Message>, RunnerError>
where
    S: MessageService + 'static,
{
    match strategy {
        Strategy::Sequential => run_sequential(service.as_ref(), count, cancel),
        Strategy::Pool => run_bounded_pool(Arc::clone(service), count, policy, timeout, cancel),
        Strategy::ForkJoin => run_fork_join(Arc::clone(service), count, parallelism, cancel),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::SlowService;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    /// Stub with a fixed table of delays: id -> delays[id].
    struct TableService {
        delays: Vec<u64>,
    }

    impl TableService {
        fn new(delays: Vec<u64>) -> Self {
            Self { delays }
        }
    }

    impl MessageService for TableService {
        fn get_message(&self, id: u32, cancel: &CancelToken) -> Result<Message, RunnerError> {
            let delay_ms = self.delays[id as usize];
            if !cancel.sleep(Duration::from_millis(delay_ms)) {
                return Err(RunnerError::Cancelled { at_id: Some(id) });
            }
            Ok(Message::new(id, delay_ms, format!("message {}", id)))
        }
    }

    /// Zero-delay stub that fails one specific id.
    struct FailingService {
        fail_id: u32,
    }

    impl MessageService for FailingService {
        fn get_message(&self, id: u32, _cancel: &CancelToken) -> Result<Message, RunnerError> {
            if id == self.fail_id {
                return Err(RunnerError::Compute {
                    id,
                    source: "injected failure".to_string(),
                });
            }
            Ok(Message::new(id, 0, "ok"))
        }
    }

    #[test]
    fn test_strategy_names_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(Strategy::from_name(strategy.as_str()), Some(strategy));
        }
        assert_eq!(Strategy::from_name("bogus"), None);
    }

    #[test]
    fn test_sequential_sorts_spec_example() {
        // delays [30, 10, 40, 20] -> ids sorted by delay = [1, 3, 0, 2]
        let service = TableService::new(vec![30, 10, 40, 20]);
        let cancel = CancelToken::new();

        let messages = run_sequential(&service, 4, &cancel).unwrap();

        let ids: Vec<u32> = messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3, 0, 2]);
        assert_eq!(messages.last().unwrap().delay_ms, 40);
    }

    #[test]
    fn test_all_strategies_return_identical_sorted_sequences() {
        let service = Arc::new(SlowService::new(30, 99));
        let count = 12;

        let mut runs = Vec::new();
        for strategy in Strategy::ALL {
            let cancel = CancelToken::new();
            let messages = run(
                strategy,
                &service,
                count,
                PoolPolicy::PerCore,
                Duration::from_secs(30),
                None,
                &cancel,
            )
            .unwrap();
            runs.push(messages);
        }

        assert_eq!(runs[0], runs[1]);
        assert_eq!(runs[1], runs[2]);
        assert_eq!(runs[0].len(), count as usize);
    }

    #[test]
    fn test_each_id_appears_exactly_once() {
        let service = Arc::new(SlowService::new(20, 7));
        let cancel = CancelToken::new();

        let messages = run_bounded_pool(
            Arc::clone(&service),
            25,
            PoolPolicy::Fixed(6),
            Duration::from_secs(30),
            &cancel,
        )
        .unwrap();

        let mut ids: Vec<u32> = messages.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..25).collect::<Vec<u32>>());
    }

    #[test]
    fn test_zero_count_is_empty_for_all_strategies() {
        let service = Arc::new(SlowService::new(10, 1));
        for strategy in Strategy::ALL {
            let cancel = CancelToken::new();
            let messages = run(
                strategy,
                &service,
                0,
                PoolPolicy::PerCore,
                Duration::from_secs(1),
                None,
                &cancel,
            )
            .unwrap();
            assert!(messages.is_empty());
        }
    }

    #[test]
    fn test_last_element_is_slowest() {
        let service = Arc::new(SlowService::new(50, 3));
        let cancel = CancelToken::new();

        let messages =
            run_fork_join(Arc::clone(&service), 16, Some(8), &cancel).unwrap();

        let max = messages.iter().map(|m| m.delay_ms).max().unwrap();
        assert_eq!(messages.last().unwrap().delay_ms, max);
    }

    #[test]
    fn test_pool_is_faster_than_the_delay_sum() {
        // 8 items x 50ms: sequential needs >= 400ms, a pool of 8 should
        // finish in roughly one delay. Generous bound: under half the sum.
        let service = Arc::new(TableService::new(vec![50; 8]));
        let cancel = CancelToken::new();

        let start = Instant::now();
        let messages = run_bounded_pool(
            Arc::clone(&service),
            8,
            PoolPolicy::Fixed(8),
            Duration::from_secs(10),
            &cancel,
        )
        .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(messages.len(), 8);
        assert!(
            elapsed < Duration::from_millis(200),
            "pool run took {:?}",
            elapsed
        );
    }

    #[test]
    fn test_sequential_wall_time_is_at_least_the_delay_sum() {
        let service = TableService::new(vec![10; 10]);
        let cancel = CancelToken::new();

        let start = Instant::now();
        run_sequential(&service, 10, &cancel).unwrap();

        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[test]
    fn test_fork_join_runs_leaves_in_parallel() {
        let service = Arc::new(TableService::new(vec![50; 8]));
        let cancel = CancelToken::new();

        let start = Instant::now();
        let messages = run_fork_join(Arc::clone(&service), 8, Some(8), &cancel).unwrap();

        assert_eq!(messages.len(), 8);
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn test_pool_timeout_is_all_or_nothing_and_leaks_nothing() {
        // Slowest item takes 400ms but the budget is 40ms: the call must
        // fail with Timeout and return promptly with all workers joined,
        // well before the 400ms sleep would have finished on its own.
        let service = Arc::new(TableService::new(vec![1, 1, 1, 400]));
        let cancel = CancelToken::new();

        let start = Instant::now();
        let err = run_bounded_pool(
            Arc::clone(&service),
            4,
            PoolPolicy::Fixed(4),
            Duration::from_millis(40),
            &cancel,
        )
        .unwrap_err();
        let elapsed = start.elapsed();

        match err {
            RunnerError::Timeout { total, limit_ms, .. } => {
                assert_eq!(total, 4);
                assert_eq!(limit_ms, 40);
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
        assert!(
            elapsed < Duration::from_millis(300),
            "timed-out call held workers for {:?}",
            elapsed
        );
    }

    #[test]
    fn test_compute_failure_fails_the_whole_pool_call() {
        let service = Arc::new(FailingService { fail_id: 5 });
        let cancel = CancelToken::new();

        let err = run_bounded_pool(
            Arc::clone(&service),
            10,
            PoolPolicy::Fixed(4),
            Duration::from_secs(5),
            &cancel,
        )
        .unwrap_err();

        assert_eq!(
            err,
            RunnerError::Compute {
                id: 5,
                source: "injected failure".to_string()
            }
        );
    }

    #[test]
    fn test_compute_failure_fails_fork_join() {
        let service = Arc::new(FailingService { fail_id: 2 });
        let cancel = CancelToken::new();

        let err = run_fork_join(Arc::clone(&service), 8, None, &cancel).unwrap_err();

        assert!(matches!(err, RunnerError::Compute { id: 2, .. }));
    }

    #[test]
    fn test_external_cancel_aborts_sequential_run() {
        let service = Arc::new(TableService::new(vec![200; 20]));
        let cancel = CancelToken::new();
        let aborter = cancel.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            aborter.cancel();
        });

        let start = Instant::now();
        let err = run_sequential(service.as_ref(), 20, &cancel).unwrap_err();
        handle.join().unwrap();

        assert!(matches!(err, RunnerError::Cancelled { .. }));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_external_cancel_aborts_fork_join() {
        let service = Arc::new(TableService::new(vec![300; 16]));
        let cancel = CancelToken::new();
        let aborter = cancel.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            aborter.cancel();
        });

        let start = Instant::now();
        let err = run_fork_join(Arc::clone(&service), 16, Some(4), &cancel).unwrap_err();
        handle.join().unwrap();

        assert!(matches!(err, RunnerError::Cancelled { .. }));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_pool_does_not_start_tasks_after_cancel() {
        // With one worker and a cancel fired mid-run, ids queued behind the
        // in-flight one must never run the full sleep.
        let started = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&started);

        struct CountingService {
            started: Arc<AtomicU32>,
        }

        impl MessageService for CountingService {
            fn get_message(&self, id: u32, cancel: &CancelToken) -> Result<Message, RunnerError> {
                self.started.fetch_add(1, Ordering::SeqCst);
                if !cancel.sleep(Duration::from_millis(100)) {
                    return Err(RunnerError::Cancelled { at_id: Some(id) });
                }
                Ok(Message::new(id, 100, "slow"))
            }
        }

        let service = Arc::new(CountingService { started: counter });
        let cancel = CancelToken::new();

        let err = run_bounded_pool(
            Arc::clone(&service),
            10,
            PoolPolicy::Fixed(1),
            Duration::from_millis(120),
            &cancel,
        )
        .unwrap_err();

        assert!(matches!(err, RunnerError::Timeout { .. }));
        assert!(started.load(Ordering::SeqCst) < 10);
    }
}
