//! Cancellable periodic tasks.
//!
//! Used for the unread contact-message badge: the admin front end polls the
//! count on a fixed interval for as long as it is open.

use crate::client::MessagesApi;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A tokio task that runs `tick` every `period` until stopped.
///
/// The first tick runs immediately. Dropping the handle stops the task.
#[derive(Debug)]
pub struct ScheduledTask {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Spawn the task on the current runtime.
    ///
    /// A tick that is still running when the token is cancelled is abandoned
    /// at its next await point.
    pub fn start<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = child.cancelled() => break,
                    _ = interval.tick() => {}
                }
                tokio::select! {
                    () = child.cancelled() => break,
                    () = tick() => {}
                }
            }
        });

        Self {
            token,
            handle: Some(handle),
        }
    }

    /// Stop the task. Safe to call more than once.
    pub fn stop(&mut self) {
        self.token.cancel();
        self.handle.take();
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Poll the unread message count every `period`, handing each result to
/// `on_count`. Failed polls are logged at debug level and skipped.
pub fn poll_unread<A, F>(api: A, period: Duration, on_count: F) -> ScheduledTask
where
    A: MessagesApi + Clone + 'static,
    F: Fn(i64) + Send + Sync + Clone + 'static,
{
    ScheduledTask::start(period, move || {
        let api = api.clone();
        let on_count = on_count.clone();
        async move {
            match api.unread_count().await {
                Ok(count) => on_count(count),
                Err(e) => debug!(error = %e, "Unread count poll failed"),
            }
        }
    })
}
