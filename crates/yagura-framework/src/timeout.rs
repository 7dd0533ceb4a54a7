//! Racing futures against a timer.
//!
//! Nothing in the dispatch path applies a timeout on its own; layers and host
//! code opt in where a bound makes sense.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use yagura_framework::TimeoutExt;
//!
//! let reply = client.request(payload).with_timeout(Duration::from_secs(5)).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use yagura_core::{YaguraError, YaguraResult};

/// Awaits `future`, failing with [`YaguraError::Timeout`] if it does not
/// complete within `duration`.
pub async fn with_timeout<F: Future>(duration: Duration, future: F) -> YaguraResult<F::Output> {
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| YaguraError::Timeout(duration))
}

/// Awaits `future`, returning `None` if it does not complete within
/// `duration`.
pub async fn timeout_or_none<F: Future>(duration: Duration, future: F) -> Option<F::Output> {
    tokio::time::timeout(duration, future).await.ok()
}

/// Method-call forms of [`with_timeout`] and [`timeout_or_none`].
pub trait TimeoutExt: Future + Sized {
    fn with_timeout(self, duration: Duration) -> impl Future<Output = YaguraResult<Self::Output>> {
        with_timeout(duration, self)
    }

    fn timeout_or_none(self, duration: Duration) -> impl Future<Output = Option<Self::Output>> {
        timeout_or_none(duration, self)
    }
}

impl<F: Future> TimeoutExt for F {}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_completes_in_time() {
        let value = assert_ok!(with_timeout(Duration::from_secs(1), async { 7 }).await);
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_wins() {
        let slow = tokio::time::sleep(Duration::from_secs(10));
        let error = assert_err!(with_timeout(Duration::from_secs(1), slow).await);
        assert!(matches!(error, YaguraError::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_or_none() {
        let never = std::future::pending::<u8>();
        assert_eq!(timeout_or_none(Duration::from_millis(50), never).await, None);
        assert_eq!(
            timeout_or_none(Duration::from_millis(50), async { 3u8 }).await,
            Some(3)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_extension_methods() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            "late"
        };
        assert!(slow.with_timeout(Duration::from_secs(1)).await.is_err());

        let fast = async { "early" };
        assert_eq!(fast.timeout_or_none(Duration::from_secs(1)).await, Some("early"));
    }
}
