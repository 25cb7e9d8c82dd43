// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, DbErr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use trigger_task::domain::models::correlation::CorrelationContext;
use trigger_task::domain::models::trigger_task::{NewTriggerTask, TriggerTask};
use trigger_task::domain::repositories::trigger_task_repository::{
    PageQuery, StoreError, TriggerTaskRepository,
};
use trigger_task::handlers::traits::{HandlerError, TaskHandler};
use trigger_task::infrastructure::lock::backend::{LockBackend, LockError};
use trigger_task::infrastructure::repositories::trigger_task_repo_impl::TriggerTaskRepositoryImpl;
use trigger_task::queue::scheduler::TaskDispatcher;

pub mod handlers;

/// 内存数据库，连接池只有一个连接
pub async fn setup_memory_db() -> Arc<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    Arc::new(db)
}

/// 文件数据库，多个连接，用于并发执行的场景
pub async fn setup_file_db(max_connections: u32) -> (TempDir, Arc<DatabaseConnection>) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("trigger_task.db").display()
    );
    let mut opt = ConnectOptions::new(url);
    opt.max_connections(max_connections)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(opt).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    (dir, Arc::new(db))
}

/// 直接写入一行任务，绕过默认值填充
pub async fn insert_task<R: TriggerTaskRepository>(repo: &R, task: TriggerTask) -> i64 {
    repo.insert(&task).await.unwrap()
}

pub fn due_task(task_type: &str) -> TriggerTask {
    NewTriggerTask::new(task_type)
        .with_trigger_time(Utc::now() - chrono::Duration::seconds(5))
        .into_task(Utc::now(), CorrelationContext::default())
}

/// 记录每次调用的仓库装饰器
pub struct CountingRepository<R: TriggerTaskRepository> {
    inner: R,
    /// 每条批量插入语句的行数
    pub insert_batches: Mutex<Vec<usize>>,
    /// 每次分页查询的 (cursor, 返回行数)
    pub fetches: Mutex<Vec<(i64, usize)>>,
    /// 分页查询前的延迟
    pub fetch_delay: Mutex<Option<Duration>>,
    /// 第几次批量插入开始失败（从 1 计）
    pub fail_insert_batch_at: Mutex<Option<usize>>,
    /// 分页查询是否失败
    pub fail_fetch: Mutex<bool>,
    scans: AtomicUsize,
}

impl<R: TriggerTaskRepository> CountingRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            insert_batches: Mutex::new(Vec::new()),
            fetches: Mutex::new(Vec::new()),
            fetch_delay: Mutex::new(None),
            fail_insert_batch_at: Mutex::new(None),
            fail_fetch: Mutex::new(false),
            scans: AtomicUsize::new(0),
        }
    }

    pub fn insert_batches(&self) -> Vec<usize> {
        self.insert_batches.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> Vec<(i64, usize)> {
        self.fetches.lock().unwrap().clone()
    }

    /// 首页（cursor = 0）查询的次数，即实际执行扫描主体的次数
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

pub fn counting_repository(db: Arc<DatabaseConnection>) -> Arc<CountingRepository<TriggerTaskRepositoryImpl>> {
    Arc::new(CountingRepository::new(TriggerTaskRepositoryImpl::new(db)))
}

#[async_trait]
impl<R: TriggerTaskRepository> TriggerTaskRepository for CountingRepository<R> {
    async fn insert(&self, task: &TriggerTask) -> Result<i64, StoreError> {
        self.inner.insert(task).await
    }

    async fn insert_many(&self, tasks: &[TriggerTask]) -> Result<u64, StoreError> {
        let attempt = {
            let mut batches = self.insert_batches.lock().unwrap();
            batches.push(tasks.len());
            batches.len()
        };
        let fail_at = *self.fail_insert_batch_at.lock().unwrap();
        if fail_at.is_some_and(|at| attempt >= at) {
            return Err(StoreError::Database(DbErr::Custom("injected failure".into())));
        }
        self.inner.insert_many(tasks).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TriggerTask>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<TriggerTask>, StoreError> {
        if query.cursor == 0 {
            self.scans.fetch_add(1, Ordering::SeqCst);
        }
        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_fetch.lock().unwrap() {
            return Err(StoreError::Database(DbErr::Custom("injected failure".into())));
        }

        let page = self.inner.fetch_page(query).await?;
        self.fetches.lock().unwrap().push((query.cursor, page.len()));
        Ok(page)
    }

    async fn begin(&self) -> Result<DatabaseTransaction, StoreError> {
        self.inner.begin().await
    }

    async fn mark_end(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner.mark_end(txn, id, now).await
    }

    async fn record_failure(&self, task: &TriggerTask) -> Result<(), StoreError> {
        self.inner.record_failure(task).await
    }

    async fn delete_ended_before(&self, threshold: DateTime<Utc>) -> Result<u64, StoreError> {
        self.inner.delete_ended_before(threshold).await
    }
}

/// 只记录投递内容的投递目标
#[derive(Default)]
pub struct RecordingDispatcher {
    tasks: Mutex<Vec<TriggerTask>>,
}

impl RecordingDispatcher {
    pub fn ids(&self) -> Vec<i64> {
        self.tasks.lock().unwrap().iter().map(|t| t.id).collect()
    }

    pub fn clear(&self) {
        self.tasks.lock().unwrap().clear();
    }
}

impl TaskDispatcher for RecordingDispatcher {
    fn dispatch(&self, task: TriggerTask) {
        self.tasks.lock().unwrap().push(task);
    }
}

/// 始终失败的处理器
pub struct FailingHandler(pub &'static str);

#[async_trait]
impl TaskHandler for FailingHandler {
    fn task_type(&self) -> &str {
        self.0
    }

    async fn handle(
        &self,
        _task: &TriggerTask,
        _txn: &DatabaseTransaction,
    ) -> Result<(), HandlerError> {
        Err(HandlerError::failed("always fails"))
    }
}

/// 始终不可用的锁后端，模拟 Redis 断连
pub struct UnavailableLockBackend;

fn backend_down() -> LockError {
    LockError::Backend(redis::RedisError::from(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "lock backend down",
    )))
}

#[async_trait]
impl LockBackend for UnavailableLockBackend {
    async fn try_acquire(&self, _key: &str, _token: &str, _lease: Duration) -> Result<bool, LockError> {
        Err(backend_down())
    }

    async fn renew(&self, _key: &str, _token: &str, _lease: Duration) -> Result<bool, LockError> {
        Err(backend_down())
    }

    async fn release(&self, _key: &str, _token: &str) -> Result<bool, LockError> {
        Err(backend_down())
    }
}
