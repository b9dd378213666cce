//! Outbound notifications.
//!
//! Delivery is best effort. Money paths enqueue on a [`NotificationPool`]
//! after their unit of work has committed; nothing they return depends on
//! whether the message is ever sent.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinSet,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("notifier unavailable")]
    Unavailable,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes every notification to the log instead of sending it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            "notification: {}",
            notification.body
        );
        Ok(())
    }
}

/// Bounded queue drained by a fixed set of worker tasks.
///
/// [`dispatch`](NotificationPool::dispatch) never waits: when the queue is
/// full the message is dropped and a warning is logged. There is no retry.
pub struct NotificationPool {
    sender: mpsc::Sender<Notification>,
    workers: Mutex<JoinSet<()>>,
}

impl fmt::Debug for NotificationPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationPool")
            .field("capacity", &self.sender.max_capacity())
            .finish_non_exhaustive()
    }
}

impl NotificationPool {
    /// Spawns `workers` tasks on the current runtime.
    pub fn start(notifier: Arc<dyn Notifier>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let mut set = JoinSet::new();
        for worker in 0..workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let notifier = Arc::clone(&notifier);
            set.spawn(async move {
                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(notification) = next else {
                        tracing::debug!(worker, "notification queue closed");
                        break;
                    };
                    if let Err(err) = notifier.send(&notification).await {
                        tracing::warn!(
                            worker,
                            to = %notification.to,
                            "notification not delivered: {err}"
                        );
                    }
                }
            });
        }
        Self {
            sender,
            workers: Mutex::new(set),
        }
    }

    /// Enqueues without blocking; returns whether the message was accepted.
    pub fn dispatch(&self, notification: Notification) -> bool {
        match self.sender.try_send(notification) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                tracing::warn!(to = %dropped.to, "notification queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                tracing::warn!(to = %dropped.to, "notification pool stopped, dropping message");
                false
            }
        }
    }

    /// Stops every worker. Queued messages that were not picked up are lost.
    pub async fn shutdown(&self) {
        self.workers.lock().await.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct Recording {
        sent: StdMutex<Vec<Notification>>,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct Stuck;

    #[async_trait]
    impl Notifier for Stuck {
        async fn send(&self, _: &Notification) -> Result<(), NotifyError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn workers_deliver_queued_messages() {
        let notifier = Arc::new(Recording::default());
        let pool = NotificationPool::start(notifier.clone(), 2, 8);

        assert!(pool.dispatch(Notification::new("a@example.com", "hi", "one")));
        assert!(pool.dispatch(Notification::new("b@example.com", "hi", "two")));

        for _ in 0..50 {
            if notifier.sent.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let pool = NotificationPool::start(Arc::new(Stuck), 1, 1);
        let mut accepted = 0;
        for i in 0..10 {
            if pool.dispatch(Notification::new("x@example.com", "s", i.to_string())) {
                accepted += 1;
            }
        }
        // One message held by the stuck worker, at most one waiting in the queue.
        assert!(accepted <= 2);
        assert!(accepted >= 1);
        pool.shutdown().await;
    }
}
