use crate::features::subscriptions::aggregator::calculate_end_date;
use crate::features::subscriptions::models::{Subscription, SubscriptionStatus, Tier};
use crate::features::subscriptions::tier::classify_subscription;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::dates::to_iso_string;
use crate::shared::utils::ids::{generate_document_id, is_valid_document_id};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// ファイル全体がJSON配列でない場合のメッセージ
pub const NOT_AN_ARRAY: &str =
    "ملف استيراد غير صالح: يجب أن يكون الملف بصيغة JSON ويحتوي على مصفوفة من الاشتراكات.";

/// レコードの構造が不正な場合のメッセージ
pub const INVALID_RECORD: &str = "ملف استيراد غير صالح: بنية البيانات داخل الملف غير متوافقة.";

/// 取り込み成功時のメッセージ
pub fn import_success_message(count: usize) -> String {
    format!("تم استيراد {count} اشتراك بنجاح.")
}

/// インポートファイルを解析して購読の一覧にする
///
/// 1件でも不正なレコードがあれば全体を拒否する。欠けている項目は次のように補う。
/// - `id`: 新しいドキュメントID
/// - `status`: active
/// - `tier`: サービス構成から再計算
/// - `createdAt`: 取り込み時刻
/// - `endDate`: 開始日 + 期間
///
/// # 引数
/// * `input` - ファイルの内容
/// * `now` - 取り込み時刻
///
/// # 戻り値
/// 保存可能な購読の一覧
pub fn parse_import(input: &str, now: DateTime<Utc>) -> AppResult<Vec<Subscription>> {
    let value: Value = serde_json::from_str(input).map_err(|e| {
        log::warn!("インポートファイルをJSONとして解析できません: {e}");
        AppError::validation(NOT_AN_ARRAY)
    })?;

    let Value::Array(items) = value else {
        return Err(AppError::validation(NOT_AN_ARRAY));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| normalize_record(index, item, now))
        .collect()
}

fn normalize_record(index: usize, item: Value, now: DateTime<Utc>) -> AppResult<Subscription> {
    let Value::Object(mut record) = item else {
        log::warn!("インポートレコードがオブジェクトではありません: index={index}");
        return Err(AppError::validation(INVALID_RECORD));
    };

    let has_client = record.get("clientName").is_some_and(Value::is_string);
    let start_date = record
        .get("startDate")
        .and_then(Value::as_str)
        .map(str::to_string);
    let Some(start_date) = start_date.filter(|_| has_client) else {
        log::warn!("インポートレコードに clientName / startDate がありません: index={index}");
        return Err(AppError::validation(INVALID_RECORD));
    };

    let id_is_valid = record
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(is_valid_document_id);
    if !id_is_valid {
        record.insert("id".to_string(), Value::String(generate_document_id()));
    }

    let status = record
        .get("status")
        .and_then(Value::as_str)
        .and_then(SubscriptionStatus::parse)
        .unwrap_or(SubscriptionStatus::Active);
    record.insert(
        "status".to_string(),
        Value::String(status.as_str().to_string()),
    );

    let known_tier = record.get("tier").and_then(Value::as_str).and_then(Tier::parse);
    // 不明な場合は仮の値を入れて読み込み後に再計算する
    record.insert(
        "tier".to_string(),
        Value::String(known_tier.unwrap_or(Tier::Regular).as_str().to_string()),
    );

    if !has_text(&record, "createdAt") {
        record.insert("createdAt".to_string(), Value::String(to_iso_string(now)));
    }

    if !has_text(&record, "endDate") {
        let duration = record
            .get("duration")
            .and_then(Value::as_u64)
            .and_then(|d| u32::try_from(d).ok())
            .unwrap_or(0);
        record.insert(
            "endDate".to_string(),
            Value::String(calculate_end_date(&start_date, duration)),
        );
    }

    let mut subscription: Subscription =
        serde_json::from_value(Value::Object(record)).map_err(|e| {
            log::warn!("インポートレコードの変換に失敗しました: index={index}, error={e}");
            AppError::validation(INVALID_RECORD)
        })?;

    if known_tier.is_none() {
        subscription.tier = classify_subscription(&subscription);
    }
    Ok(subscription)
}

fn has_text(record: &Map<String, Value>, key: &str) -> bool {
    record
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|text| !text.trim().is_empty())
}
