//! Divide-and-conquer execution on a rayon pool.
//!
//! The id range splits recursively into balanced halves until partitions
//! reach size 1; halves run via `rayon::join` and partial results
//! concatenate left-then-right at each join point.

use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::error::RunnerError;
use crate::message::Message;
use crate::service::MessageService;
use crate::utils;

/// Where a range of `len` ids splits: the left half takes the ceiling, so
/// the two partitions differ in size by at most one.
pub fn split_point(len: usize) -> usize {
    (len + 1) / 2
}

/// Run `count` ids through the service by recursive fork/join.
/// `parallelism` sizes a dedicated pool; `None` uses the global one.
pub fn run_fork_join<S>(
    service: Arc<S>,
    count: u32,
    parallelism: Option<usize>,
    cancel: &CancelToken,
) -> Result<Vec<Message>, RunnerError>
where
    S: MessageService + 'static,
{
    if count == 0 {
        return Ok(Vec::new());
    }

    let ids: Vec<u32> = (0..count).collect();
    let run = || compute(service.as_ref(), &ids, cancel);

    match parallelism {
        None => run(),
        Some(threads) => {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(threads.max(1))
                .thread_name(|i| format!("fanout-fj-{}", i))
                .build()
            {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    utils::log_error(&format!(
                        "fork-join pool build failed ({}), using global pool",
                        e
                    ));
                    run()
                }
            }
        }
    }
}

fn compute<S>(service: &S, ids: &[u32], cancel: &CancelToken) -> Result<Vec<Message>, RunnerError>
where
    S: MessageService,
{
    if cancel.is_cancelled() {
        return Err(RunnerError::Cancelled {
            at_id: ids.first().copied(),
        });
    }

    match ids {
        [] => Ok(Vec::new()),
        [id] => service.get_message(*id, cancel).map(|m| vec![m]),
        _ => {
            let (left, right) = ids.split_at(split_point(ids.len()));
            let (left_result, right_result) = rayon::join(
                || compute(service, left, cancel),
                || compute(service, right, cancel),
            );

            let mut messages = left_result?;
            messages.extend(right_result?);
            Ok(messages)
        }
    }
}
