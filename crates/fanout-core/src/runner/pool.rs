//! Work-stealing task queue backing the bounded-pool strategy.
//!
//! Each worker thread owns a local deque; submission goes through a global
//! injector and idle workers steal from the injector or from siblings.
//! Results travel over a channel to the single coordinating thread, so no
//! worker ever touches a shared result container.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use crossbeam::deque::{Injector, Steal, Stealer, Worker as DequeWorker};

/// Backoff while a worker has nothing to run and nothing to steal.
const IDLE_BACKOFF: Duration = Duration::from_micros(100);

/// Sizing policy for the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolPolicy {
    /// One worker per available core.
    PerCore,
    /// Exactly this many workers.
    Fixed(usize),
    /// One worker per submitted task (unbounded-growth policy).
    PerTask,
}

impl PoolPolicy {
    pub fn worker_count(&self, task_count: usize) -> usize {
        match self {
            PoolPolicy::PerCore => num_cpus::get().max(1),
            PoolPolicy::Fixed(n) => (*n).max(1),
            PoolPolicy::PerTask => task_count.max(1),
        }
    }
}

/// Task queue with work-stealing workers.
pub struct TaskQueue<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    injector: Arc<Injector<T>>,
    result_rx: Receiver<R>,
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
    worker_count: usize,
}

/// Builder for TaskQueue.
pub struct TaskQueueBuilder {
    worker_count: usize,
    result_capacity: usize,
}

impl TaskQueueBuilder {
    pub fn new() -> Self {
        Self {
            worker_count: num_cpus::get().max(1),
            result_capacity: 4096,
        }
    }

    /// Set number of workers.
    pub fn workers(mut self, count: usize) -> Self {
        self.worker_count = count.max(1);
        self
    }

    /// Capacity of the result channel. Must be at least the number of
    /// tasks that will be submitted, so worker sends never block and
    /// shutdown can always join every thread.
    pub fn result_capacity(mut self, capacity: usize) -> Self {
        self.result_capacity = capacity.max(1);
        self
    }

    /// Build the task queue and spawn its workers.
    pub fn build<T, R, F>(self, task_fn: F) -> TaskQueue<T, R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        TaskQueue::new(self.worker_count, self.result_capacity, Arc::new(task_fn))
    }
}

impl Default for TaskQueueBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R> TaskQueue<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Create a new task queue with `worker_count` workers.
    pub fn new<F>(worker_count: usize, result_capacity: usize, task_fn: Arc<F>) -> Self
    where
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let worker_count = worker_count.max(1);
        let (result_tx, result_rx) = bounded(result_capacity.max(1));
        let injector = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        // Local deques are created here so the stealers can be wired up,
        // then each deque moves into its own thread.
        let mut locals = Vec::with_capacity(worker_count);
        let mut stealers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let local = DequeWorker::new_fifo();
            stealers.push(local.stealer());
            locals.push(local);
        }

        let mut handles = Vec::with_capacity(worker_count);
        for (worker_id, local) in locals.into_iter().enumerate() {
            let injector = Arc::clone(&injector);
            let stealers: Vec<Stealer<T>> = stealers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != worker_id)
                .map(|(_, s)| s.clone())
                .collect();
            let result_tx = result_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let task_fn = Arc::clone(&task_fn);

            let handle = thread::spawn(move || {
                Self::worker_loop(local, injector, stealers, result_tx, shutdown, task_fn);
            });

            handles.push(handle);
        }

        // Workers hold the only senders: the channel disconnects once they
        // all exit, so a draining receiver can never hang on a dead pool.
        drop(result_tx);

        Self {
            injector,
            result_rx,
            shutdown,
            handles,
            worker_count,
        }
    }

    /// Worker main loop.
    fn worker_loop<F>(
        local: DequeWorker<T>,
        injector: Arc<Injector<T>>,
        stealers: Vec<Stealer<T>>,
        result_tx: Sender<R>,
        shutdown: Arc<AtomicBool>,
        task_fn: Arc<F>,
    ) where
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        while !shutdown.load(Ordering::Relaxed) {
            match Self::find_task(&local, &injector, &stealers) {
                Some(task) => {
                    let result = (task_fn)(task);
                    let _ = result_tx.send(result);
                }
                None => thread::sleep(IDLE_BACKOFF),
            }
        }
    }

    /// Pop from the local deque, else steal from the injector or a sibling.
    fn find_task(
        local: &DequeWorker<T>,
        injector: &Injector<T>,
        stealers: &[Stealer<T>],
    ) -> Option<T> {
        local.pop().or_else(|| {
            std::iter::repeat_with(|| {
                injector
                    .steal_batch_and_pop(local)
                    .or_else(|| stealers.iter().map(|s| s.steal()).collect())
            })
            .find(|s: &Steal<T>| !s.is_retry())
            .and_then(|s| s.success())
        })
    }

    /// Submit a task to the queue.
    pub fn submit(&self, task: T) {
        self.injector.push(task);
    }

    /// Submit multiple tasks.
    pub fn submit_batch(&self, tasks: Vec<T>) {
        for task in tasks {
            self.injector.push(task);
        }
    }

    /// Get a result with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<R, RecvTimeoutError> {
        self.result_rx.recv_timeout(timeout)
    }

    /// Get number of workers.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Signal workers to stop after their current task.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Stop the pool and wait for every worker to exit.
    pub fn shutdown_and_join(&mut self) {
        self.shutdown();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl<T, R> Drop for TaskQueue<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
