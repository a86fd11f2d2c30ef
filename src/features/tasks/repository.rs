use super::models::{PerformanceRating, Task, TaskStatus};
use crate::shared::database::collections::TASKS;
use crate::shared::database::{codec, DocumentStore, WriteBatch};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::status::OperationStatus;
use crate::shared::utils::dates::now_millis;
use std::sync::Arc;

const FETCH_FAILED: &str = "فشل تحميل المهام.";
const UPDATE_FAILED: &str = "فشل تحديث حالة المهمة.";
const DELETE_FAILED: &str = "فشل حذف المهمة.";
const TASK_NOT_FOUND: &str = "المهمة غير موجودة.";

/// 達成率から評価を求める
///
/// 90%以上で excellent、70%以上で good、それ未満は weak。
/// 対象タスクが無い場合は excellent とする。
pub fn calculate_performance(completed: usize, total: usize) -> PerformanceRating {
    if total == 0 {
        return PerformanceRating::Excellent;
    }

    let percentage = completed as f64 / total as f64 * 100.0;
    if percentage >= 90.0 {
        PerformanceRating::Excellent
    } else if percentage >= 70.0 {
        PerformanceRating::Good
    } else {
        PerformanceRating::Weak
    }
}

/// `tasks` コレクションの状態コンテナ
pub struct TasksStore {
    store: Arc<dyn DocumentStore>,
    tasks: Vec<Task>,
    status: OperationStatus,
}

impl TasksStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            tasks: Vec::new(),
            status: OperationStatus::default(),
        }
    }

    /// 取得済みのタスク（論理削除済みを含む）
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn status(&self) -> &OperationStatus {
        &self.status
    }

    /// 購読に紐づく有効なタスク（期日順）
    pub fn tasks_for_subscription(&self, subscription_id: &str) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.subscription_id == subscription_id && !t.is_deleted)
            .collect();
        tasks.sort_by_key(|t| t.due_date);
        tasks
    }

    /// 顧客ごとの達成度評価
    pub fn performance(&self, client_id: &str) -> PerformanceRating {
        let (completed, total) = self
            .tasks
            .iter()
            .filter(|t| t.client_id == client_id && !t.is_deleted)
            .fold((0, 0), |(completed, total), task| {
                (completed + usize::from(task.is_completed()), total + 1)
            });
        calculate_performance(completed, total)
    }

    /// タスクを全件読み込み直す
    pub async fn fetch_tasks(&mut self) {
        self.status.begin();
        match self.load().await {
            Ok(tasks) => {
                self.tasks = tasks;
                self.status.finish();
            }
            Err(e) => self.status.fail(&e, FETCH_FAILED),
        }
    }

    /// タスクの状態を更新する
    ///
    /// 完了にした場合は完了日時を記録し、それ以外に戻した場合は消す。
    pub async fn update_task_status(&mut self, task_id: &str, status: TaskStatus) {
        self.status.begin();
        let result = self
            .modify(task_id, |task| {
                task.status = status;
                task.completed_at = (status == TaskStatus::Completed).then(now_millis);
            })
            .await;
        self.complete(result, UPDATE_FAILED).await;
    }

    /// タスクを論理削除する
    pub async fn delete_task(&mut self, task_id: &str) {
        self.status.begin();
        let result = self.modify(task_id, |task| task.is_deleted = true).await;
        self.complete(result, DELETE_FAILED).await;
    }

    async fn load(&self) -> AppResult<Vec<Task>> {
        let documents = self.store.list(TASKS).await?;
        documents.iter().map(codec::decode).collect()
    }

    async fn modify<F>(&self, task_id: &str, change: F) -> AppResult<()>
    where
        F: FnOnce(&mut Task),
    {
        let document = self
            .store
            .get(TASKS, task_id)
            .await?
            .ok_or_else(|| AppError::not_found(TASK_NOT_FOUND))?;
        let mut task: Task = codec::decode(&document)?;
        change(&mut task);

        let mut batch = WriteBatch::new();
        batch.set(TASKS, codec::encode(task_id, &task)?);
        self.store.commit(batch).await
    }

    async fn complete(&mut self, result: AppResult<()>, message: &str) {
        match result {
            Ok(()) => match self.load().await {
                Ok(tasks) => {
                    self.tasks = tasks;
                    self.status.finish();
                }
                Err(e) => self.status.fail(&e, FETCH_FAILED),
            },
            Err(e) => self.status.fail(&e, message),
        }
    }
}
