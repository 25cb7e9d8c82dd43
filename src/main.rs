// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use tracing::info;
use trigger_task::config::settings::Settings;
use trigger_task::handlers::log_handler::LogHandler;
use trigger_task::handlers::registry::HandlerRegistry;
use trigger_task::infrastructure::cache::counter_store::RedisCounterStore;
use trigger_task::infrastructure::cache::redis_client::RedisClient;
use trigger_task::infrastructure::database::connection;
use trigger_task::infrastructure::lock::coordinator::LockCoordinator;
use trigger_task::infrastructure::lock::redis_lock::RedisLockBackend;
use trigger_task::infrastructure::repositories::trigger_task_repo_impl::TriggerTaskRepositoryImpl;
use trigger_task::queue::backoff::BackoffPolicy;
use trigger_task::queue::scheduler::TaskScheduler;
use trigger_task::utils::telemetry;
use trigger_task::workers::executor::TaskExecutor;
use trigger_task::workers::manager::WorkerManager;
use trigger_task::workers::pool::WorkerPool;
use trigger_task::workers::retention_worker::RetentionWorker;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动扫描和清理
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging and metrics
    telemetry::init_telemetry(settings.logging.json);
    info!("Starting trigger-task...");
    trigger_task::infrastructure::metrics::init_metrics(&settings.metrics.listen_addr)?;

    // 3. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    connection::run_migrations(&db).await?;
    let db = Arc::new(db);
    info!("Database connection established");

    // 4. Initialize Redis backed lock and counter
    let redis_client = RedisClient::new(&settings.redis.url)?;
    let scheduler_settings = &settings.scheduler;
    let namespace = settings.application.name.as_str();
    let locks = Arc::new(
        LockCoordinator::new(
            Arc::new(RedisLockBackend::new(redis_client.clone())),
            namespace,
        )
        .with_lease(scheduler_settings.lock_lease())
        .with_retry_interval(scheduler_settings.lock_retry_interval()),
    );
    let backoff = BackoffPolicy::new(Arc::new(RedisCounterStore::new(redis_client)), namespace)
        .with_ttl(scheduler_settings.fail_count_limit_ttl());
    info!("Redis client initialized");

    // 5. Register handlers before scanning begins
    let registry = Arc::new(HandlerRegistry::new().with(Arc::new(LogHandler))?);

    // 6. Build the execution pipeline
    let repository = Arc::new(TriggerTaskRepositoryImpl::new(db.clone()));
    let executor = Arc::new(TaskExecutor::new(
        repository.clone(),
        registry,
        locks.clone(),
    ));
    let pool = Arc::new(WorkerPool::new(
        executor,
        scheduler_settings.worker_pool_size,
    ));

    let scheduler = Arc::new(
        TaskScheduler::new(repository.clone(), pool.clone(), locks.clone(), backoff)
            .with_page_size(scheduler_settings.page_size)
            .with_scan_interval(scheduler_settings.scan_interval()),
    );
    let retention = Arc::new(
        RetentionWorker::new(repository, locks)
            .with_retention(scheduler_settings.retention())
            .with_run_hour_utc(scheduler_settings.retention_hour_utc),
    );

    // 7. Start workers
    let mut worker_manager = WorkerManager::new(pool);
    worker_manager.add_worker(scheduler);
    worker_manager.add_worker(retention);
    worker_manager.start_workers();

    worker_manager.wait_for_shutdown().await;
    Ok(())
}
