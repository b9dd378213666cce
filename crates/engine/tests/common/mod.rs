#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tempfile::TempDir;

use engine::{
    Clock, Engine, EngineBuilder, FundingEvent, FundingOutcome, LedgerCategory, Money, NewUser,
    Notification, Notifier, NotifyError,
};
use migration::MigratorTrait;

/// Ids of the three seeded accounts and their shared group.
#[derive(Clone, Copy, Debug)]
pub struct Seed {
    pub alice: i64,
    pub bob: i64,
    pub carol: i64,
    pub group: i64,
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        )))
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Records every message, fails for `fail_for` and never finishes sending
/// to `stall_for`.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail_for: Vec<String>,
    pub stall_for: Vec<String>,
}

impl RecordingNotifier {
    pub fn failing_for(emails: &[&str]) -> Self {
        Self {
            fail_for: emails.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn stalling_for(emails: &[&str]) -> Self {
        Self {
            stall_for: emails.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn subjects_for(&self, email: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.to == email)
            .map(|n| n.subject.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.stall_for.contains(&notification.to) {
            std::future::pending::<()>().await;
        }
        if self.fail_for.contains(&notification.to) {
            return Err(NotifyError::Delivery("mailbox unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub async fn memory_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

/// File-backed database with a real connection pool, so units of work can
/// overlap. Keep the `TempDir` alive for the duration of the test.
pub async fn file_db() -> (DatabaseConnection, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("ledger.db").display());
    let mut options = ConnectOptions::new(url);
    options.max_connections(4).min_connections(2).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    (db, dir)
}

pub async fn engine_with_db() -> (Engine, DatabaseConnection, Seed) {
    engine_from(Engine::builder()).await
}

/// Builds the engine from `builder` on a fresh database and seeds alice,
/// bob and carol in one group administered by alice.
pub async fn engine_from(builder: EngineBuilder) -> (Engine, DatabaseConnection, Seed) {
    engine_on(builder, memory_db().await).await
}

pub async fn engine_on(
    builder: EngineBuilder,
    db: DatabaseConnection,
) -> (Engine, DatabaseConnection, Seed) {
    let engine = builder.database(db.clone()).build().await.unwrap();

    let alice = create_user(&engine, "alice").await;
    let bob = create_user(&engine, "bob").await;
    let carol = create_user(&engine, "carol").await;

    let group = engine
        .new_group("Flat 4B", Some("rent and groceries"), alice)
        .await
        .unwrap();
    engine.add_group_member(group.id, alice, bob).await.unwrap();
    engine.add_group_member(group.id, alice, carol).await.unwrap();

    (
        engine,
        db,
        Seed {
            alice,
            bob,
            carol,
            group: group.id,
        },
    )
}

pub async fn create_user(engine: &Engine, username: &str) -> i64 {
    engine
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: username.to_string(),
            password: "password".to_string(),
        })
        .await
        .unwrap()
}

/// `"33.33"` as minor units.
pub fn money(raw: &str) -> Money {
    let (major, minor) = raw.split_once('.').unwrap_or((raw, "00"));
    assert_eq!(minor.len(), 2, "amount needs two decimals: {raw}");
    Money::new(major.parse::<i64>().unwrap() * 100 + minor.parse::<i64>().unwrap())
}

/// Top up a wallet the way a verified provider event would.
pub async fn fund(engine: &Engine, user_id: i64, reference: &str, amount: &str) {
    let outcome = engine
        .apply_funding(FundingEvent {
            reference: reference.to_string(),
            amount: money(amount),
            user_id,
            category: LedgerCategory::Fund,
            description: "top up".to_string(),
        })
        .await
        .unwrap();
    assert!(matches!(outcome, FundingOutcome::Processed { .. }));
}
