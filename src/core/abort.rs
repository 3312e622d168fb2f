use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::core::error::{LauncherError, LauncherResult};

/// Cooperative cancellation shared by every stage of one launch.
///
/// Stages poll `check()` at their boundaries and `select!` on `cancelled()`
/// while waiting on slow operations.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag {
    inner: Arc<AbortInner>,
}

#[derive(Debug, Default)]
struct AbortInner {
    requested: AtomicBool,
    notify: Notify,
}

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> LauncherResult<()> {
        if self.is_aborted() {
            Err(LauncherError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Resolves once an abort has been requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn check_fails_after_abort() {
        let flag = AbortFlag::new();
        assert!(flag.check().is_ok());
        flag.clone().abort();
        assert!(matches!(flag.check(), Err(LauncherError::Aborted)));
    }

    #[tokio::test]
    async fn cancelled_wakes_waiters() {
        let flag = AbortFlag::new();
        let waiter = {
            let flag = flag.clone();
            tokio::spawn(async move { flag.cancelled().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        flag.abort();
        tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("waiter woke up")
            .unwrap();
    }
}
