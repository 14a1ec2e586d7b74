//! Bounded retry loop shared by the readiness probe and the completion poller.
use std::future::Future;

use crate::config::RetryPolicy;
use crate::error::WorkerError;

/// What a single attempt observed.
#[derive(Debug)]
pub enum Step<T> {
    Done(T),
    Pending,
    Abort(WorkerError),
}

/// How the whole loop ended.
#[derive(Debug)]
pub enum Outcome<T> {
    Ready(T),
    TimedOut { attempts: u32 },
    Failed(WorkerError),
}

/// Run `attempt` until it reports `Done` or `Abort`, sleeping
/// `policy.interval` between attempts, at most `policy.max_attempts` times.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut attempt: F) -> Outcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Step<T>>,
{
    for n in 1..=policy.max_attempts {
        match attempt().await {
            Step::Done(value) => return Outcome::Ready(value),
            Step::Abort(err) => return Outcome::Failed(err),
            Step::Pending => {}
        }
        if n < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    Outcome::TimedOut { attempts: policy.max_attempts }
}
