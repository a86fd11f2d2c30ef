use super::aggregator::aggregate;
use super::models::{Subscription, SubscriptionForm, Tier};
use crate::features::export::{import_success_message, ExportFile, ExportFormat};
use crate::shared::utils::ids::generate_document_id;
use crate::AppState;
use chrono::{NaiveDate, Utc};
use serde::Serialize;

/// 区分ごとの件数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierCount {
    pub tier: Tier,
    pub label: &'static str,
    pub count: usize,
}

/// 購読一覧を取得する
///
/// # 引数
/// * `state` - アプリケーション状態
///
/// # 戻り値
/// 購読のリスト、または失敗時はエラーメッセージ
pub async fn fetch_subscriptions(state: &AppState) -> Result<Vec<Subscription>, String> {
    let mut subscriptions = state.subscriptions.lock().await;
    subscriptions.fetch_subscriptions().await;
    subscriptions.status().check()?;
    Ok(subscriptions.subscriptions().to_vec())
}

/// ごみ箱の購読一覧を取得する
pub async fn fetch_recycled_subscriptions(state: &AppState) -> Result<Vec<Subscription>, String> {
    let mut subscriptions = state.subscriptions.lock().await;
    subscriptions.fetch_recycled_subscriptions().await;
    subscriptions.status().check()?;
    Ok(subscriptions.recycled_subscriptions().to_vec())
}

/// フォーム入力から購読とタスクを登録する
///
/// # 引数
/// * `form` - 購読登録フォームの入力
/// * `state` - アプリケーション状態
///
/// # 戻り値
/// 登録した購読のID、または失敗時はエラーメッセージ
pub async fn create_subscription(
    form: SubscriptionForm,
    state: &AppState,
) -> Result<String, String> {
    form.validate()?;

    let aggregated = aggregate(&form, &generate_document_id());
    let id = {
        let mut subscriptions = state.subscriptions.lock().await;
        subscriptions
            .add_subscription_and_tasks(
                aggregated.draft,
                aggregated.automatic_tasks,
                aggregated.manual_tasks,
            )
            .await
            .ok_or_else(|| subscriptions.status().check().err().unwrap_or_default())?
    };

    state.tasks.lock().await.fetch_tasks().await;
    Ok(id)
}

/// 購読を更新する
pub async fn update_subscription(
    subscription: Subscription,
    state: &AppState,
) -> Result<Subscription, String> {
    let id = subscription.id.clone();
    let mut subscriptions = state.subscriptions.lock().await;
    subscriptions.update_subscription(subscription).await;
    subscriptions.status().check()?;
    subscriptions
        .find(&id)
        .cloned()
        .ok_or_else(|| "الاشتراك غير موجود.".to_string())
}

/// 手動タスクの完了状態を切り替える
pub async fn toggle_manual_task(
    subscription_id: String,
    task_id: String,
    state: &AppState,
) -> Result<(), String> {
    let mut subscriptions = state.subscriptions.lock().await;
    subscriptions
        .toggle_manual_task(&subscription_id, &task_id)
        .await;
    subscriptions.status().check()
}

/// 手動タスクの説明を変更する
pub async fn edit_manual_task(
    subscription_id: String,
    task_id: String,
    description: String,
    state: &AppState,
) -> Result<(), String> {
    let mut subscriptions = state.subscriptions.lock().await;
    subscriptions
        .edit_manual_task(&subscription_id, &task_id, &description)
        .await;
    subscriptions.status().check()
}

/// 購読をごみ箱へ移動する（紐づく自動タスクも削除される）
pub async fn delete_subscription(id: String, state: &AppState) -> Result<(), String> {
    {
        let mut subscriptions = state.subscriptions.lock().await;
        subscriptions.delete_subscription(&id).await;
        subscriptions.status().check()?;
    }
    state.tasks.lock().await.fetch_tasks().await;
    Ok(())
}

/// ごみ箱の購読を復元する
pub async fn restore_subscription(id: String, state: &AppState) -> Result<(), String> {
    {
        let mut subscriptions = state.subscriptions.lock().await;
        subscriptions.restore_subscription(&id).await;
        subscriptions.status().check()?;
    }
    state.tasks.lock().await.fetch_tasks().await;
    Ok(())
}

/// ごみ箱の購読を完全に削除する
pub async fn purge_recycled_subscription(id: String, state: &AppState) -> Result<(), String> {
    let mut subscriptions = state.subscriptions.lock().await;
    subscriptions.purge_recycled(&id).await;
    subscriptions.status().check()
}

/// 有効な購読を書き出す
///
/// # 引数
/// * `format` - `json` / `excel`（`xlsx`）/ `pdf`
/// * `state` - アプリケーション状態
///
/// # 戻り値
/// ファイル名と内容、または失敗時はエラーメッセージ
pub async fn export_subscriptions(
    format: String,
    state: &AppState,
) -> Result<ExportFile, String> {
    let format = ExportFormat::parse(&format)?;
    let mut subscriptions = state.subscriptions.lock().await;
    match subscriptions.export_subscriptions(format).await {
        Some(file) => Ok(file),
        None => Err(subscriptions.status().check().err().unwrap_or_default()),
    }
}

/// JSONファイルの内容から購読を取り込む
///
/// # 戻り値
/// 成功メッセージ、または失敗時はエラーメッセージ
pub async fn import_subscriptions(contents: String, state: &AppState) -> Result<String, String> {
    let mut subscriptions = state.subscriptions.lock().await;
    match subscriptions.import_subscriptions(&contents).await {
        Some(count) => Ok(import_success_message(count)),
        None => Err(subscriptions.status().check().err().unwrap_or_default()),
    }
}

/// 区分ごとの有効な購読数を取得する
pub async fn get_tier_counts(state: &AppState) -> Result<Vec<TierCount>, String> {
    let subscriptions = state.subscriptions.lock().await;
    Ok(subscriptions
        .tier_counts()
        .into_iter()
        .map(|(tier, count)| TierCount {
            tier,
            label: tier.arabic_label(),
            count,
        })
        .collect())
}

/// 7日以内に終了する購読を取得する
///
/// # 引数
/// * `today` - 基準日（`YYYY-MM-DD`）。省略時は当日（UTC）
pub async fn get_expiring_subscriptions(
    today: Option<String>,
    state: &AppState,
) -> Result<Vec<Subscription>, String> {
    let today = match today {
        Some(text) => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map_err(|_| "التاريخ غير صالح.".to_string())?,
        None => Utc::now().date_naive(),
    };

    let subscriptions = state.subscriptions.lock().await;
    Ok(subscriptions
        .expiring_soon(today)
        .into_iter()
        .cloned()
        .collect())
}
