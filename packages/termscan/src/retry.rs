//! Bounded retry combinator.
//!
//! Shared by the extractor (polling a page until content appears) and the
//! messaging bridge (waiting for a listener to register). Every loop here
//! terminates after `policy.attempts()` calls.

use std::future::Future;

use tracing::debug;

use crate::types::config::RetryPolicy;

/// Why a bounded retry gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error; holds the last one.
    Exhausted { attempts: u32, last: E },

    /// An attempt failed with an error the predicate refused to retry.
    Aborted { attempt: u32, error: E },
}

impl<E> RetryError<E> {
    /// The error of the final attempt.
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Aborted { error, .. } => error,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::Aborted { attempt, .. } => *attempt,
        }
    }
}

/// Run `attempt` until it succeeds, a non-retryable error occurs, or the
/// policy's attempts are used up.
///
/// `attempt` receives the 1-based attempt number. The delay is applied
/// between attempts only, never after the last one.
pub async fn retry_bounded<T, E, F, Fut, P>(
    policy: RetryPolicy,
    mut attempt: F,
    is_retryable: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max = policy.attempts();
    let mut n = 1;

    loop {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(error) if !is_retryable(&error) => {
                return Err(RetryError::Aborted { attempt: n, error });
            }
            Err(error) if n >= max => {
                return Err(RetryError::Exhausted {
                    attempts: n,
                    last: error,
                });
            }
            Err(_) => {
                debug!(attempt = n, max_attempts = max, "Retrying after delay");
                if policy.delay_ms > 0 {
                    tokio::time::sleep(policy.delay()).await;
                }
                n += 1;
            }
        }
    }
}
