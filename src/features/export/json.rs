use crate::features::subscriptions::models::Subscription;
use crate::shared::errors::AppResult;

/// 購読一覧を整形済みJSON配列として書き出す
///
/// 日付は `YYYY-MM-DD`、作成日時はミリ秒精度のISO-8601になり、
/// そのままインポートに使える。
pub fn render(subscriptions: &[Subscription]) -> AppResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(subscriptions)?)
}
