// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{counting_repository, setup_memory_db};
use chrono::{Duration, Utc};
use sea_orm::{EntityTrait, PaginatorTrait, QueryOrder};
use trigger_task::config::settings::SchedulerSettings;
use trigger_task::domain::models::correlation::CorrelationContext;
use trigger_task::domain::models::trigger_task::{NewTriggerTask, TaskParams, TaskStatus};
use trigger_task::domain::repositories::trigger_task_repository::TriggerTaskRepository;
use trigger_task::infrastructure::database::entities::trigger_task as task_entity;
use trigger_task::queue::task_queue::TriggerTaskQueue;

#[tokio::test]
async fn test_save_applies_defaults_and_captures_context() {
    let db = setup_memory_db().await;
    let repo = counting_repository(db);
    let queue = TriggerTaskQueue::new(repo.clone());

    let context = CorrelationContext::new()
        .with("traceId", "trace-42")
        .with("requestId", "req-7")
        .with("token", "secret")
        .with("requestParam", "{}");

    let before = Utc::now();
    let id = context
        .scope(queue.save(
            NewTriggerTask::new("update_student")
                .with_params(TaskParams::from_values(["42"]).unwrap()),
        ))
        .await
        .unwrap();

    let task = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::NotEnd);
    assert_eq!(task.fail_count, 0);
    assert_eq!(task.fail_message, "");
    assert_eq!(task.remark, "");
    assert_eq!(task.lock_key, "");
    assert!(task.trigger_time >= before);
    assert_eq!(task.params.param1.as_deref(), Some("42"));
    assert!(task.params.param2.is_none());

    assert_eq!(task.correlation_context.get("traceId"), Some("trace-42"));
    assert_eq!(task.correlation_context.get("requestId"), Some("req-7"));
    assert_eq!(task.correlation_context.get("token"), None);
    assert_eq!(task.correlation_context.get("requestParam"), None);
}

#[tokio::test]
async fn test_enqueue_keeps_lock_key_and_trigger_time() {
    let db = setup_memory_db().await;
    let repo = counting_repository(db);
    let queue = TriggerTaskQueue::new(repo.clone());
    let later = Utc::now() + Duration::minutes(30);

    let first = queue
        .enqueue(
            "update_student",
            TaskParams::from_values(["1", "Alice"]).unwrap(),
            Some("student:1".to_string()),
            Some(later),
            Some("rename".to_string()),
        )
        .await
        .unwrap();
    let second = queue
        .enqueue("update_student", TaskParams::default(), None, None, None)
        .await
        .unwrap();
    assert!(second > first);

    let task = repo.find_by_id(first).await.unwrap().unwrap();
    assert_eq!(task.lock_key, "student:1");
    assert_eq!(task.remark, "rename");
    assert!(!task.is_due(Utc::now()));
    assert!(task.correlation_context.is_empty());
}

#[tokio::test]
async fn test_save_batch_issues_one_statement_per_chunk() {
    let db = setup_memory_db().await;
    let repo = counting_repository(db.clone());
    let queue = TriggerTaskQueue::new(repo.clone());

    let tasks: Vec<NewTriggerTask> = (0..1200)
        .map(|i| NewTriggerTask::new("import").with_remark(format!("row-{}", i)))
        .collect();

    let inserted = queue.save_batch(tasks).await.unwrap();

    assert_eq!(inserted, 1200);
    assert_eq!(repo.insert_batches(), vec![500, 500, 200]);

    let rows = task_entity::Entity::find()
        .order_by_asc(task_entity::Column::Id)
        .all(db.as_ref())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1200);
    // 按输入顺序写入，每条只出现一次
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.remark, format!("row-{}", i));
    }
}

#[tokio::test]
async fn test_save_batch_with_empty_input_is_a_no_op() {
    let db = setup_memory_db().await;
    let repo = counting_repository(db);
    let queue = TriggerTaskQueue::new(repo.clone());

    assert_eq!(queue.save_batch(Vec::new()).await.unwrap(), 0);
    assert!(repo.insert_batches().is_empty());
}

#[tokio::test]
async fn test_failed_chunk_keeps_earlier_chunks() {
    let db = setup_memory_db().await;
    let repo = counting_repository(db.clone());
    *repo.fail_insert_batch_at.lock().unwrap() = Some(2);
    let queue = TriggerTaskQueue::new(repo.clone()).with_batch_size(10);

    let tasks: Vec<NewTriggerTask> = (0..25).map(|_| NewTriggerTask::new("import")).collect();
    assert!(queue.save_batch(tasks).await.is_err());

    assert_eq!(repo.insert_batches(), vec![10, 10]);
    let stored = task_entity::Entity::find().count(db.as_ref()).await.unwrap();
    assert_eq!(stored, 10);
}

#[tokio::test]
async fn test_batch_size_comes_from_scheduler_settings() {
    let db = setup_memory_db().await;
    let repo = counting_repository(db);

    let queue = TriggerTaskQueue::from_settings(repo.clone(), &SchedulerSettings::default());
    assert_eq!(queue.batch_size(), 500);

    let settings = SchedulerSettings {
        batch_size: 8,
        ..Default::default()
    };
    let queue = TriggerTaskQueue::from_settings(repo.clone(), &settings);
    let tasks: Vec<NewTriggerTask> = (0..20).map(|_| NewTriggerTask::new("import")).collect();

    assert_eq!(queue.save_batch(tasks).await.unwrap(), 20);
    assert_eq!(repo.insert_batches(), vec![8, 8, 4]);
}
