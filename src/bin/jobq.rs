//! jobq CLI: run workers, submit jobs, inspect status.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use jobq::config::Config;
use jobq::db::Db;
use jobq::model::JobId;
use jobq::queue::{Health, JobQueue, SubmitResult};
use jobq::store::JobStore;
use jobq::telemetry::{TelemetryConfig, init_telemetry};
use jobq::worker::{DelayExecutor, WorkerPool};

#[derive(Parser)]
#[command(name = "jobq", about = "Durable Postgres job queue")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a pool of workers until Ctrl-C
    Serve {
        /// Number of concurrent workers (defaults to WORKER_COUNT)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Job operations
    Job {
        #[command(subcommand)]
        action: JobAction,
    },
    /// Check that the database is reachable
    Health,
}

#[derive(Subcommand)]
enum JobAction {
    /// Submit a JSON object payload
    Submit {
        /// Payload, e.g. '{"task": "x"}'
        payload: String,
    },
    /// Show a job's status
    Show {
        /// Job ID (full UUID)
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve { workers } => cmd_serve(config, workers).await,
        Command::Job { action } => {
            let db = connect_and_migrate(&config).await?;
            let queue = JobQueue::new(Arc::clone(&db) as Arc<dyn JobStore>);

            let result = match action {
                JobAction::Submit { payload } => cmd_job_submit(&queue, &payload).await,
                JobAction::Show { id } => cmd_job_show(&queue, &id).await,
            };
            db.close().await;
            result
        }
        Command::Health => cmd_health(config).await,
    }
}

async fn cmd_serve(config: Config, workers: Option<usize>) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "jobq".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let db = connect_and_migrate(&config).await?;

    let count = workers.unwrap_or(config.worker_count).max(1);
    let pool = WorkerPool::start(
        count,
        Arc::clone(&db) as Arc<dyn JobStore>,
        Arc::new(DelayExecutor::new(config.exec_delay)),
        config.worker,
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    pool.shutdown().await;
    db.close().await;
    Ok(())
}

/// Connect and apply migrations, closing the pool if migrations fail.
async fn connect_and_migrate(config: &Config) -> anyhow::Result<Arc<Db>> {
    let db = Db::connect(&config.database).await?;
    if let Err(e) = db.migrate().await {
        db.close().await;
        return Err(e.into());
    }
    Ok(Arc::new(db))
}

async fn cmd_job_submit(queue: &JobQueue, payload: &str) -> anyhow::Result<()> {
    let payload: serde_json::Value = serde_json::from_str(payload)?;

    match queue.submit(payload).await? {
        SubmitResult::Created(id) => println!("Created: {id}"),
        SubmitResult::Replaced(id) => println!("Replaced: {id}"),
    }
    Ok(())
}

async fn cmd_job_show(queue: &JobQueue, id: &str) -> anyhow::Result<()> {
    let id: JobId = id.parse()?;

    match queue.status(id).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) if e.is_not_found() => anyhow::bail!("job not found: {id}"),
        Err(e) => Err(e.into()),
    }
}

async fn cmd_health(config: Config) -> anyhow::Result<()> {
    let health = match Db::connect(&config.database).await {
        Ok(db) => {
            let db = Arc::new(db);
            let health = JobQueue::new(Arc::clone(&db) as Arc<dyn JobStore>)
                .health_check()
                .await;
            db.close().await;
            health
        }
        Err(e) => {
            eprintln!("connect failed: {e}");
            Health::Unavailable
        }
    };

    println!("{health}");
    if health == Health::Unavailable {
        anyhow::bail!("database unavailable");
    }
    Ok(())
}
