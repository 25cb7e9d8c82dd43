// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    counting_repository, due_task, insert_task, setup_memory_db, CountingRepository,
    RecordingDispatcher, UnavailableLockBackend,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use trigger_task::domain::models::trigger_task::{NewTriggerTask, TaskStatus};
use trigger_task::infrastructure::cache::counter_store::InMemoryCounterStore;
use trigger_task::infrastructure::lock::coordinator::LockCoordinator;
use trigger_task::infrastructure::lock::local_lock::LocalLockBackend;
use trigger_task::infrastructure::repositories::trigger_task_repo_impl::TriggerTaskRepositoryImpl;
use trigger_task::queue::backoff::BackoffPolicy;
use trigger_task::queue::scheduler::{CycleOutcome, TaskScheduler, EXEC_LEADER_JOB};
use trigger_task::queue::task_queue::TriggerTaskQueue;

type Repo = CountingRepository<TriggerTaskRepositoryImpl>;

struct Harness {
    repo: Arc<Repo>,
    dispatcher: Arc<RecordingDispatcher>,
    backoff: BackoffPolicy,
    backend: Arc<LocalLockBackend>,
    scheduler: Arc<TaskScheduler<Repo>>,
}

async fn harness() -> Harness {
    let repo = counting_repository(setup_memory_db().await);
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let backend = Arc::new(LocalLockBackend::new());
    let locks = Arc::new(LockCoordinator::new(backend.clone(), "demo"));
    let backoff = BackoffPolicy::new(Arc::new(InMemoryCounterStore::new()), "demo");

    let scheduler = Arc::new(TaskScheduler::new(
        repo.clone(),
        dispatcher.clone(),
        locks,
        backoff.clone(),
    ));

    Harness {
        repo,
        dispatcher,
        backoff,
        backend,
        scheduler,
    }
}

fn completed(outcome: CycleOutcome) -> trigger_task::queue::scheduler::CycleReport {
    match outcome {
        CycleOutcome::Completed(report) => report,
        CycleOutcome::NotLeader => panic!("expected the cycle to run"),
    }
}

#[tokio::test]
async fn test_keyset_pagination_visits_each_row_once() {
    let h = harness().await;
    let queue = TriggerTaskQueue::new(h.repo.clone());
    let tasks: Vec<NewTriggerTask> = (0..450)
        .map(|_| NewTriggerTask::new("import").with_trigger_time(Utc::now() - Duration::seconds(1)))
        .collect();
    queue.save_batch(tasks).await.unwrap();

    let report = completed(h.scheduler.run_cycle().await.unwrap());
    assert_eq!(report.pages, 3);
    assert_eq!(report.dispatched, 450);

    let fetches = h.repo.fetches();
    assert_eq!(
        fetches.iter().map(|(_, len)| *len).collect::<Vec<_>>(),
        vec![200, 200, 50]
    );

    let ids = h.dispatcher.ids();
    assert_eq!(ids.len(), 450);
    let mut unique = ids.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), 450);

    // 每页的游标是上一页的最大 id
    assert_eq!(fetches[0].0, 0);
    assert_eq!(fetches[1].0, ids[199]);
    assert_eq!(fetches[2].0, ids[399]);
}

#[tokio::test]
async fn test_full_last_page_is_followed_by_an_empty_fetch() {
    let h = harness().await;
    for _ in 0..400 {
        insert_task(h.repo.as_ref(), due_task("import")).await;
    }

    let report = completed(h.scheduler.run_cycle().await.unwrap());
    assert_eq!(report.dispatched, 400);
    assert_eq!(report.pages, 2);
    assert_eq!(
        h.repo.fetches().iter().map(|(_, len)| *len).collect::<Vec<_>>(),
        vec![200, 200, 0]
    );
}

#[tokio::test]
async fn test_only_due_not_end_rows_are_dispatched() {
    let h = harness().await;
    let due = insert_task(h.repo.as_ref(), due_task("import")).await;

    let mut future = due_task("import");
    future.trigger_time = Utc::now() + Duration::hours(1);
    insert_task(h.repo.as_ref(), future).await;

    let mut ended = due_task("import");
    ended.status = TaskStatus::End;
    insert_task(h.repo.as_ref(), ended).await;

    completed(h.scheduler.run_cycle().await.unwrap());
    assert_eq!(h.dispatcher.ids(), vec![due]);
}

#[tokio::test]
async fn test_fail_count_limit_cycles_through_backoff_schedule() {
    let h = harness().await;
    let mut ids = Vec::new();
    for fail_count in [0, 1, 2, 3, 7] {
        let mut task = due_task("import");
        task.fail_count = fail_count;
        ids.push(insert_task(h.repo.as_ref(), task).await);
    }

    let mut attempted = Vec::new();
    for _ in 0..5 {
        h.dispatcher.clear();
        let report = completed(h.scheduler.run_cycle().await.unwrap());
        attempted.push((report.fail_count_limit, h.dispatcher.ids()));
    }

    assert_eq!(attempted[0], (0, vec![ids[0]]));
    assert_eq!(attempted[1], (1, vec![ids[0], ids[1]]));
    assert_eq!(attempted[2], (2, vec![ids[0], ids[1], ids[2]]));
    assert_eq!(attempted[3], (3, ids.clone()));
    assert_eq!(attempted[4], (0, vec![ids[0]]));
}

#[tokio::test]
async fn test_empty_table_still_advances_limit() {
    let h = harness().await;

    let report = completed(h.scheduler.run_cycle().await.unwrap());
    assert_eq!(report.pages, 0);
    assert_eq!(report.dispatched, 0);
    assert_eq!(report.next_fail_count_limit, 1);
    assert_eq!(h.backoff.current_limit().await.unwrap(), 1);
}

#[tokio::test]
async fn test_store_error_abandons_cycle() {
    let h = harness().await;
    insert_task(h.repo.as_ref(), due_task("import")).await;
    *h.repo.fail_fetch.lock().unwrap() = true;

    assert!(h.scheduler.run_cycle().await.is_err());
    assert!(h.dispatcher.ids().is_empty());
    // 计数器不前进，领导者锁已释放
    assert_eq!(h.backoff.current_limit().await.unwrap(), 0);
    assert!(!h.backend.is_held(&format!("demo:{}", EXEC_LEADER_JOB)));

    *h.repo.fail_fetch.lock().unwrap() = false;
    completed(h.scheduler.run_cycle().await.unwrap());
    assert_eq!(h.dispatcher.ids().len(), 1);
}

#[tokio::test]
async fn test_cycle_is_skipped_while_another_instance_leads() {
    let h = harness().await;
    insert_task(h.repo.as_ref(), due_task("import")).await;

    let other = LockCoordinator::new(h.backend.clone(), "demo");
    let held = other.try_acquire_leader(EXEC_LEADER_JOB).await.unwrap().unwrap();

    assert_eq!(h.scheduler.run_cycle().await.unwrap(), CycleOutcome::NotLeader);
    assert!(h.dispatcher.ids().is_empty());
    assert_eq!(h.repo.scans(), 0);

    held.release().await.unwrap();
    completed(h.scheduler.run_cycle().await.unwrap());
    assert_eq!(h.dispatcher.ids().len(), 1);
}

#[tokio::test]
async fn test_exec_after_runs_a_cycle() {
    let h = harness().await;
    let id = insert_task(h.repo.as_ref(), due_task("import")).await;

    h.scheduler.exec_after(0).await.unwrap();

    assert_eq!(h.dispatcher.ids(), vec![id]);
    assert_eq!(h.backoff.current_limit().await.unwrap(), 1);
}

#[tokio::test]
async fn test_lock_backend_failure_abandons_cycle() {
    let h = harness().await;
    insert_task(h.repo.as_ref(), due_task("import")).await;

    let scheduler = TaskScheduler::new(
        h.repo.clone(),
        h.dispatcher.clone(),
        Arc::new(LockCoordinator::new(Arc::new(UnavailableLockBackend), "demo")),
        h.backoff.clone(),
    );

    assert!(scheduler.run_cycle().await.is_err());
    assert!(h.dispatcher.ids().is_empty());
    assert_eq!(h.repo.scans(), 0);
    assert_eq!(h.backoff.current_limit().await.unwrap(), 0);
}
