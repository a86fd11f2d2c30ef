use super::models::{PerformanceRating, Task, TaskStatus};
use crate::AppState;

/// タスク一覧を取得する
///
/// # 引数
/// * `state` - アプリケーション状態
///
/// # 戻り値
/// タスクのリスト（論理削除済みを含む）、または失敗時はエラーメッセージ
pub async fn fetch_tasks(state: &AppState) -> Result<Vec<Task>, String> {
    let mut tasks = state.tasks.lock().await;
    tasks.fetch_tasks().await;
    tasks.status().check()?;
    Ok(tasks.tasks().to_vec())
}

/// 購読に紐づく有効なタスクを期日順に取得する
pub async fn get_subscription_tasks(
    subscription_id: String,
    state: &AppState,
) -> Result<Vec<Task>, String> {
    let tasks = state.tasks.lock().await;
    Ok(tasks
        .tasks_for_subscription(&subscription_id)
        .into_iter()
        .cloned()
        .collect())
}

/// タスクの状態を更新する
pub async fn update_task_status(
    task_id: String,
    status: TaskStatus,
    state: &AppState,
) -> Result<(), String> {
    let mut tasks = state.tasks.lock().await;
    tasks.update_task_status(&task_id, status).await;
    tasks.status().check()
}

/// タスクを論理削除する
pub async fn delete_task(task_id: String, state: &AppState) -> Result<(), String> {
    let mut tasks = state.tasks.lock().await;
    tasks.delete_task(&task_id).await;
    tasks.status().check()
}

/// 顧客の達成度評価を取得する
pub async fn get_client_performance(
    client_id: String,
    state: &AppState,
) -> Result<PerformanceRating, String> {
    Ok(state.tasks.lock().await.performance(&client_id))
}
