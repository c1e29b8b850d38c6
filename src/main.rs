// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::Extension;
use postrs::config::settings::Settings;
use postrs::domain::repositories::account_repository::AccountRepository;
use postrs::domain::repositories::fingerprint_repository::FingerprintRepository;
use postrs::domain::repositories::proxy_template_repository::ProxyTemplateRepository;
use postrs::domain::repositories::task_batch_repository::TaskBatchRepository;
use postrs::domain::repositories::task_repository::TaskRepository;
use postrs::domain::services::batch_service::BatchAggregator;
use postrs::domain::services::fingerprint_service::FingerprintService;
use postrs::domain::services::proxy_service::ProxyAllocator;
use postrs::domain::services::session_service::SessionManager;
use postrs::infrastructure::database::connection;
use postrs::infrastructure::repositories::account_repo_impl::AccountRepositoryImpl;
use postrs::infrastructure::repositories::fingerprint_repo_impl::FingerprintRepositoryImpl;
use postrs::infrastructure::repositories::proxy_template_repo_impl::ProxyTemplateRepositoryImpl;
use postrs::infrastructure::repositories::task_batch_repo_impl::TaskBatchRepositoryImpl;
use postrs::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use postrs::presentation::routes;
use postrs::providers::rest_client::RestProviderFactory;
use postrs::providers::traits::ProviderClientFactory;
use postrs::queue::governor::ConcurrencyGovernor;
use postrs::queue::scheduler::SchedulerLoop;
use postrs::utils::telemetry;
use postrs::workers::bulk_login::{BulkLoginRunner, JobRegistry};
use postrs::workers::executor::TaskExecutor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

use migration::{Migrator, MigratorTrait};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Arc::new(Settings::new()?);

    // 2. Initialize logging and the metrics exporter
    telemetry::init_telemetry(&settings.telemetry.log_filter);
    info!("Starting postrs...");
    postrs::infrastructure::metrics::init_metrics(&settings.telemetry.metrics_addr);
    info!("Configuration loaded");

    // 3. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    let db = Arc::new(db);
    info!("Database connection established");

    // Run database migrations
    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. Initialize repositories
    let task_repo: Arc<dyn TaskRepository> = Arc::new(TaskRepositoryImpl::new(db.clone()));
    let batch_repo: Arc<dyn TaskBatchRepository> =
        Arc::new(TaskBatchRepositoryImpl::new(db.clone()));
    let account_repo: Arc<dyn AccountRepository> =
        Arc::new(AccountRepositoryImpl::new(db.clone()));
    let fingerprint_repo: Arc<dyn FingerprintRepository> =
        Arc::new(FingerprintRepositoryImpl::new(db.clone()));
    let proxy_repo: Arc<dyn ProxyTemplateRepository> =
        Arc::new(ProxyTemplateRepositoryImpl::new(db.clone()));

    // 5. Initialize domain services
    let session_manager = Arc::new(SessionManager::new(account_repo.clone()));
    let batch_aggregator = Arc::new(BatchAggregator::new(batch_repo.clone()));
    let fingerprint_service = Arc::new(FingerprintService::new(fingerprint_repo.clone()));
    let proxy_allocator = Arc::new(ProxyAllocator::new(
        account_repo.clone(),
        proxy_repo.clone(),
    ));

    let client_factory: Arc<dyn ProviderClientFactory> = Arc::new(RestProviderFactory::new(
        settings.provider.gateway_url.clone(),
        Duration::from_secs(settings.provider.request_timeout_secs),
    ));

    // 6. Start the scheduler and its bounded executor
    let executor = Arc::new(TaskExecutor::new(
        task_repo.clone(),
        account_repo.clone(),
        fingerprint_repo.clone(),
        session_manager.clone(),
        batch_aggregator.clone(),
        client_factory.clone(),
        PathBuf::from(&settings.worker.media_path),
    ));
    let governor = Arc::new(ConcurrencyGovernor::new(
        settings.worker.concurrency,
        executor,
    ));
    let scheduler = SchedulerLoop::new(
        task_repo.clone(),
        governor,
        settings.worker.poll_interval_secs,
    );
    let _scheduler_handle = scheduler.start();

    // 7. Bulk login job registry and runner
    let job_registry = Arc::new(JobRegistry::new(settings.bulk_login.job_ttl_secs));
    let _sweeper_handle = job_registry.start_sweeper(60);
    let bulk_login_runner = Arc::new(BulkLoginRunner::new(
        account_repo.clone(),
        fingerprint_service.clone(),
        session_manager.clone(),
        client_factory.clone(),
        job_registry.clone(),
    ));

    // 8. Start HTTP server
    let app = routes::create_router()
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(Extension(task_repo))
        .layer(Extension(batch_repo))
        .layer(Extension(account_repo))
        .layer(Extension(proxy_allocator))
        .layer(Extension(bulk_login_runner))
        .layer(Extension(settings.clone()));

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
