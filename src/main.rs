//! judgeflow - Judge worker entry point
//!
//! Drains the judge queue with a pool of workers, runs the exam sweeps on
//! their schedules and serves a health probe.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::Router;
use redis::Client as RedisClient;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use judgeflow::{
    config::CONFIG,
    db::{
        self,
        repositories::{ContestRepository, ProblemRepository, SubmissionRepository},
    },
    handlers,
    judge::{CaseRunner, JudgeWorker, RecipeSettings, WorkerPool},
    queue::{JobQueue, RedisJobQueue},
    sandbox::DockerSandbox,
    scheduler::SweepScheduler,
    services::ExamService,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting judgeflow {}", env!("CARGO_PKG_VERSION"));

    // Initialize database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::connection::create_pool(&CONFIG.database).await?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&db_pool).await?;

    // Initialize Docker sandbox
    tracing::info!("Connecting to Docker...");
    let docker = DockerSandbox::connect(&CONFIG.docker)?;
    let sandbox = Arc::new(DockerSandbox::new(docker, &CONFIG.docker));
    sandbox.ping().await?;
    let docker_version = sandbox.docker().version().await?;
    tracing::info!(
        "Connected to Docker version: {}",
        docker_version.version.unwrap_or_default()
    );

    // One queue connection per worker; a blocking pop holds its connection
    tracing::info!("Connecting to Redis...");
    let redis_client = RedisClient::open(CONFIG.redis.url.as_str())?;
    let mut queues: Vec<Arc<dyn JobQueue>> = Vec::with_capacity(CONFIG.judge.workers);
    for _ in 0..CONFIG.judge.workers.max(1) {
        let queue = RedisJobQueue::connect(
            &redis_client,
            &CONFIG.redis.queue_key_prefix,
            CONFIG.judge.poll_timeout_secs,
        )
        .await?;
        queues.push(Arc::new(queue));
    }

    let submissions = Arc::new(SubmissionRepository::new(db_pool.clone()));
    let problems = Arc::new(ProblemRepository::new(db_pool.clone()));
    let contests = Arc::new(ContestRepository::new(db_pool.clone()));

    let runner = CaseRunner::new(
        sandbox.clone(),
        RecipeSettings::from_config(&CONFIG.docker, &CONFIG.judge),
    );
    let worker = Arc::new(JudgeWorker::new(submissions, problems, runner));
    let pool = WorkerPool::new(worker, queues);

    // Exam sweeps
    let exams = Arc::new(ExamService::new(contests));
    let mut scheduler = SweepScheduler::new(CONFIG.exam.clone(), exams).await?;
    scheduler.setup_jobs().await?;
    scheduler.start().await?;

    // Health probe
    let state = AppState::new(db_pool, sandbox);
    let app = Router::new()
        .merge(handlers::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    let addr = SocketAddr::new(CONFIG.server.host.parse()?, CONFIG.server.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Health probe listening on http://{}", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    let shutdown = Arc::new(AtomicBool::new(false));
    tokio::spawn(watch_signals(shutdown.clone()));

    pool.run(shutdown).await;

    scheduler.shutdown().await?;
    tracing::info!("judgeflow shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| CONFIG.server.rust_log.clone().into());

    let (json, text) = if CONFIG.server.json_logs {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

/// Set `shutdown` on Ctrl+C or SIGTERM; workers finish their current job
async fn watch_signals(shutdown: Arc<AtomicBool>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, finishing current jobs...");
    shutdown.store(true, Ordering::SeqCst);
}
