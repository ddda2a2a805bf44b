use std::future::Future;
use std::time::Duration;

use crate::BridgeError;

/// Run `op` under an optional deadline.
///
/// Without a deadline the operation's own result is returned unchanged.
/// When the deadline elapses first the operation future is dropped, which
/// releases whatever it owns (child processes are spawned with
/// `kill_on_drop`, sockets close on drop), and `BridgeError::Timeout` is
/// returned.
pub async fn run_with_timeout<T, F>(timeout: Option<Duration>, op: F) -> Result<T, BridgeError>
where
    F: Future<Output = Result<T, BridgeError>>,
{
    match timeout {
        None => op.await,
        Some(limit) => match tokio::time::timeout(limit, op).await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Timeout(limit)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_deadline_passes_result_through() {
        let value = run_with_timeout(None, async { Ok::<_, BridgeError>(7) }).await;
        assert_eq!(value.unwrap(), 7);
    }

    #[tokio::test]
    async fn no_deadline_passes_failure_through() {
        let err = run_with_timeout(None, async {
            Err::<(), _>(BridgeError::MissingContentType)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, BridgeError::MissingContentType));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_operation_beats_deadline() {
        let value = run_with_timeout(Some(Duration::from_secs(5)), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, BridgeError>("done")
        })
        .await;
        assert_eq!(value.unwrap(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_operation_times_out() {
        let err = run_with_timeout(Some(Duration::from_secs(1)), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, BridgeError>(())
        })
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(err, BridgeError::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_operation_is_dropped() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        struct Flag(Arc<AtomicBool>);
        impl Drop for Flag {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let dropped = Arc::new(AtomicBool::new(false));
        let guard = Flag(Arc::clone(&dropped));
        let _ = run_with_timeout(Some(Duration::from_millis(10)), async move {
            let _guard = guard;
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, BridgeError>(())
        })
        .await;
        assert!(dropped.load(Ordering::SeqCst));
    }
}
