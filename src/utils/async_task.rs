use std::future::Future;

use tokio::time::sleep;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

use crate::BackoffPolicy;
use crate::Error;
use crate::Result;
use crate::TimeoutError;

/// Run `task` until it succeeds, retrying with exponential backoff.
///
/// Each attempt is bounded by `policy.timeout_ms`. After `policy.max_retries`
/// attempts the last error is returned.
pub(crate) async fn task_with_timeout_and_exponential_backoff<F, T, P>(
    name: &str,
    task: F,
    policy: BackoffPolicy,
) -> Result<P>
where
    F: Fn() -> T,
    T: Future<Output = Result<P>>,
{
    let mut retries = 0;
    let mut delay = policy.base_delay();
    let mut last_error = None;

    while retries < policy.max_retries {
        match timeout(policy.timeout(), task()).await {
            Ok(Ok(r)) => {
                if retries > 0 {
                    debug!("{} succeeded after {} retries", name, retries);
                }
                return Ok(r);
            }
            Ok(Err(error)) => {
                warn!("{} failed with error: {:?}", name, &error);
                last_error = Some(error);
            }
            Err(_) => {
                warn!("{} timed out after {:?}", name, policy.timeout());
                last_error = Some(
                    TimeoutError {
                        operation: name.to_string(),
                        after: policy.timeout(),
                        last_known: vec![],
                    }
                    .into(),
                );
            }
        };

        retries += 1;
        if retries < policy.max_retries {
            sleep(delay).await;
            delay = (delay * 2).min(policy.max_delay());
        } else {
            warn!("{} failed after {} attempts", name, retries);
        }
    }

    Err(last_error.unwrap_or_else(|| {
        Error::InvalidConfig(format!("{name}: retry policy allows no attempts"))
    }))
}
