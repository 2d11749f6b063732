//! Vendor Billing server
//!
//! Serves the payment webhook, job trigger and admin endpoints, and
//! optionally runs the daily reconciliation on an in-process schedule.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vendor_billing::adapters::email::{ResendConfig, ResendDispatcher};
use vendor_billing::adapters::http::{
    billing_router, BillingAppState, RouteTimeouts, SharedSecrets,
};
use vendor_billing::adapters::job_lock::{InMemoryJobLock, RedisJobLock};
use vendor_billing::adapters::paystack::{PaystackConfig, PaystackGateway};
use vendor_billing::adapters::postgres::{
    PostgresNotificationLedger, PostgresStoreRepository, PostgresUserRepository,
};
use vendor_billing::application::handlers::billing::{
    BillingDependencies, BillingEngine, JobScope, RunDailySubscriptionJobHandler,
};
use vendor_billing::config::{AppConfig, RedisConfig};
use vendor_billing::domain::foundation::Timestamp;
use vendor_billing::ports::JobLock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(&config);
    tracing::info!("Starting Vendor Billing v{}", env!("CARGO_PKG_VERSION"));

    // Database
    if !config
        .database
        .supports_workers(config.billing.worker_concurrency)
    {
        tracing::warn!(
            max_connections = config.database.max_connections,
            worker_concurrency = config.billing.worker_concurrency,
            "Pool is smaller than job concurrency; workers will queue on connections"
        );
    }
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection established");

    if config.database.run_migrations {
        sqlx::migrate!().run(&pool).await.context("Migrations failed")?;
        tracing::info!("Database migrations applied");
    }

    // Adapters
    let gateway = PaystackGateway::new(
        PaystackConfig::new(config.payment.secret_key.clone())
            .with_base_url(config.payment.base_url.clone())
            .with_request_timeout(config.payment.request_timeout())
            .with_bank_cache_ttl(config.payment.bank_cache_ttl()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to build payment gateway: {}", e))?;

    let dispatcher = ResendDispatcher::new(ResendConfig::new(
        config.email.resend_api_key.clone(),
        config.email.from_header(),
        config.email.dashboard_url.clone(),
    ))
    .map_err(|e| anyhow::anyhow!("Failed to build email dispatcher: {}", e))?;

    let deps = BillingDependencies {
        stores: Arc::new(PostgresStoreRepository::new(pool.clone())),
        users: Arc::new(PostgresUserRepository::new(pool.clone())),
        ledger: Arc::new(PostgresNotificationLedger::new(pool.clone())),
        dispatcher: Arc::new(dispatcher),
        gateway: Arc::new(gateway),
        lock: job_lock(&config.redis).await?,
    };
    let settings = config
        .billing
        .engine_settings(config.payment.callback_url.clone())?;
    let engine = Arc::new(BillingEngine::new(deps, settings));

    // Optional in-process schedule
    let _scheduler = match config.billing.schedule.as_deref() {
        Some(schedule) => Some(start_scheduler(schedule, engine.daily_job.clone()).await?),
        None => {
            tracing::info!("No billing schedule configured, waiting for external triggers");
            None
        }
    };

    // Router
    let secrets = SharedSecrets::new(
        config.security.cron_secret.clone(),
        config.security.admin_secret.clone(),
    );
    let state = BillingAppState::new(engine, secrets);
    let timeouts = RouteTimeouts {
        request: config.server.request_timeout(),
        job: config.server.job_timeout(),
    };
    let app = billing_router(state, timeouts).layer(cors_layer(&config.server.cors_origins_list()));

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.server.log_level.clone().into());

    let (json, plain) = if config.server.json_logs() {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .init();
}

/// Redis lease when Redis is configured, otherwise a process-local lock.
async fn job_lock(redis: &RedisConfig) -> anyhow::Result<Arc<dyn JobLock>> {
    match redis.lock_url() {
        Some(url) => {
            let client = redis::Client::open(url).context("Invalid Redis URL")?;
            let conn = tokio::time::timeout(
                redis.timeout(),
                client.get_multiplexed_async_connection(),
            )
            .await
            .context("Timed out connecting to Redis")?
            .context("Failed to connect to Redis")?;
            tracing::info!("Using Redis job lock");
            Ok(Arc::new(RedisJobLock::new(conn)))
        }
        None => {
            tracing::warn!("Redis not configured, job lock is local to this process");
            Ok(Arc::new(InMemoryJobLock::new()))
        }
    }
}

async fn start_scheduler(
    schedule: &str,
    job: Arc<RunDailySubscriptionJobHandler>,
) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    scheduler
        .add(Job::new_async(schedule, move |_uuid, _l| {
            let job = job.clone();
            Box::pin(async move {
                tracing::info!("Running scheduled subscription job");
                match job.run(JobScope::All, Timestamp::now()).await {
                    Ok(report) => tracing::info!(
                        processed = report.processed,
                        frozen = report.frozen,
                        errors = report.errors.len(),
                        "Scheduled subscription job finished"
                    ),
                    Err(e) => tracing::warn!(error = %e, "Scheduled subscription job did not run"),
                }
            })
        })?)
        .await?;

    scheduler.start().await?;
    tracing::info!(schedule, "Scheduled: daily subscription job");
    Ok(scheduler)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}
