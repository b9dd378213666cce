use std::{net::SocketAddr, sync::Arc, time::Duration};

use clap::Parser;
use engine::{Engine, Scheduler, SchedulerConfig};
use migration::{Migrator, MigratorTrait};
use server::{PaymentProvider, ServerState};
use settings::Database;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "splitledger")]
#[command(about = "Shared-expense ledger and settlement service")]
struct Cli {
    /// Settings file (defaults to `settings.toml` when present).
    #[arg(long, env = "SPLITLEDGER_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "splitledger={level},server={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.server.database).await?;

    let mut builder = Engine::builder()
        .database(db.clone())
        .operation_timeout(Duration::from_secs(settings.engine.operation_timeout_secs))
        .notification_pool(
            settings.engine.notification_workers,
            settings.engine.notification_queue,
        );
    let provider = match &settings.payments {
        Some(payments) => {
            builder = builder.webhook_secret(payments.secret_key.as_str());
            Some(Arc::new(PaymentProvider::new(
                payments.base_url.as_str(),
                payments.secret_key.as_str(),
            )?))
        }
        None => {
            tracing::warn!("no payments settings, webhook and wallet funding disabled");
            None
        }
    };
    let engine = Arc::new(builder.build().await?);

    let scheduler = Scheduler::start(
        Arc::clone(&engine),
        SchedulerConfig::default()
            .with_expire_every(Duration::from_secs(settings.scheduler.expire_every_secs))
            .with_remind_every(Duration::from_secs(settings.scheduler.remind_every_secs)),
    );

    let bind = settings
        .server
        .bind
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{}:{}", bind, settings.server.port).parse()?;
    let state = ServerState {
        engine: Arc::clone(&engine),
        db,
        provider,
    };

    let mut tasks = tokio::task::JoinSet::new();
    tasks.spawn(server::run(state, addr));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::error!("failed to listen for shutdown signal: {err}");
            }
            tracing::info!("shutdown requested");
        }
        _ = tasks.join_next() => tracing::warn!("server stopped"),
    }

    tasks.shutdown().await;
    scheduler
        .shutdown(Duration::from_secs(settings.scheduler.shutdown_grace_secs))
        .await;
    engine.shutdown().await;

    Ok(())
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
