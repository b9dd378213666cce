use std::{fmt, future::Future, pin::Pin, sync::Arc, time::Duration};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::{
    Clock, EngineError, Notification, NotificationPool, Notifier, RandomReferences,
    ReferenceGenerator, ResultEngine, SystemClock, TracingNotifier, WebhookVerifier,
};

mod access;
mod balances;
mod expenses;
mod funding;
mod groups;
mod invitations;
mod reminders;
mod settlement;
mod users;
mod wallets;

pub use balances::{Balance, GroupBalance};
pub use reminders::ReminderReport;
pub use settlement::SettlementOutcome;
pub use users::NewUser;

pub(crate) type TxFuture<'a, T> = Pin<Box<dyn Future<Output = ResultEngine<T>> + Send + 'a>>;

pub struct Engine {
    database: DatabaseConnection,
    operation_timeout: Duration,
    clock: Arc<dyn Clock>,
    references: Arc<dyn ReferenceGenerator>,
    notifier: Arc<dyn Notifier>,
    notifications: NotificationPool,
    webhook: Option<WebhookVerifier>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("operation_timeout", &self.operation_timeout)
            .field("clock", &self.clock)
            .field("references", &self.references)
            .field("notifications", &self.notifications)
            .field("webhook", &self.webhook.is_some())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Run `work` inside one database transaction, bounded by the operation
    /// timeout.
    ///
    /// Commits on `Ok` and rolls back on `Err`. When the deadline passes the
    /// future is dropped, which rolls the open transaction back, and
    /// [`EngineError::Timeout`] is returned.
    pub(crate) async fn with_tx<T, F>(&self, work: F) -> ResultEngine<T>
    where
        T: Send,
        F: for<'a> FnOnce(&'a Engine, &'a DatabaseTransaction) -> TxFuture<'a, T> + Send,
    {
        let unit = async {
            let db_tx = self.database.begin().await?;
            match work(self, &db_tx).await {
                Ok(value) => {
                    db_tx.commit().await?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback) = db_tx.rollback().await {
                        tracing::warn!("rollback failed: {rollback}");
                    }
                    Err(err)
                }
            }
        };

        match tokio::time::timeout(self.operation_timeout, unit).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.operation_timeout.as_millis() as u64,
                    "unit of work timed out"
                );
                Err(EngineError::Timeout(format!(
                    "unit of work exceeded {}ms",
                    self.operation_timeout.as_millis()
                )))
            }
        }
    }

    /// Current time as seen by the engine's clock.
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Best-effort enqueue, used after a unit of work committed.
    fn notify(&self, notification: Notification) {
        if !self.notifications.dispatch(notification) {
            tracing::debug!("notification dropped");
        }
    }

    /// Stop the notification workers.
    pub async fn shutdown(&self) {
        self.notifications.shutdown().await;
    }
}

fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn normalize_email(value: &str) -> ResultEngine<String> {
    let email = normalize_required_text(value, "email")?.to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(EngineError::Validation(format!("invalid email: {email}")));
    }
    Ok(email)
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    operation_timeout: Duration,
    clock: Arc<dyn Clock>,
    references: Arc<dyn ReferenceGenerator>,
    notifier: Arc<dyn Notifier>,
    notification_workers: usize,
    notification_queue: usize,
    webhook_secret: Option<String>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            operation_timeout: Duration::from_secs(5),
            clock: Arc::new(SystemClock),
            references: Arc::new(RandomReferences),
            notifier: Arc::new(TracingNotifier),
            notification_workers: 4,
            notification_queue: 256,
            webhook_secret: None,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Upper bound for every unit of work (default 5 s).
    pub fn operation_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.operation_timeout = timeout;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> EngineBuilder {
        self.clock = clock;
        self
    }

    pub fn references(mut self, references: Arc<dyn ReferenceGenerator>) -> EngineBuilder {
        self.references = references;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> EngineBuilder {
        self.notifier = notifier;
        self
    }

    /// Worker count and queue capacity of the notification pool.
    pub fn notification_pool(mut self, workers: usize, queue: usize) -> EngineBuilder {
        self.notification_workers = workers;
        self.notification_queue = queue;
        self
    }

    /// Shared secret used to verify payment-provider webhooks.
    pub fn webhook_secret(mut self, secret: impl Into<String>) -> EngineBuilder {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if self.operation_timeout.is_zero() {
            return Err(EngineError::Validation(
                "operation timeout must be > 0".to_string(),
            ));
        }
        let webhook = self
            .webhook_secret
            .as_deref()
            .map(WebhookVerifier::new)
            .transpose()?;
        let notifications = NotificationPool::start(
            Arc::clone(&self.notifier),
            self.notification_workers,
            self.notification_queue,
        );

        Ok(Engine {
            database: self.database,
            operation_timeout: self.operation_timeout,
            clock: self.clock,
            references: self.references,
            notifier: self.notifier,
            notifications,
            webhook,
        })
    }
}
