//! ドメインモデルとストアのドキュメントの相互変換
//!
//! 日付の表現を切り替えるのはこのモジュールだけ。
//! 書き込み時は日時キーをそのままの時刻で、日付キーをUTC午前0時でタイムスタンプに変換し、
//! 読み込み時はタイムスタンプをISO文字列に戻してからデシリアライズする。

use super::document::{fields_from_json, fields_to_json, ArrayValue, Document, FieldValue, MapValue};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::dates::{midnight_utc, parse_date, parse_datetime};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// 時刻まで保持するキー
pub const DATETIME_KEYS: [&str; 3] = ["createdAt", "deletedAt", "completedAt"];

/// 日付のみを保持するキー
pub const DATE_KEYS: [&str; 3] = ["startDate", "endDate", "dueDate"];

/// IDはドキュメント名で表すため、フィールドには保存しない
const ID_KEY: &str = "id";

/// モデルをドキュメントに変換する
///
/// # 引数
/// * `id` - ドキュメントID
/// * `value` - 保存するモデル
///
/// # 戻り値
/// ドキュメント、またはモデルがJSONオブジェクトにならない場合はエラー
pub fn encode<T: Serialize>(id: &str, value: &T) -> AppResult<Document> {
    let json = serde_json::to_value(value)?;
    let Value::Object(mut map) = json else {
        return Err(AppError::Database(
            "オブジェクト以外はドキュメントとして保存できません".to_string(),
        ));
    };
    map.remove(ID_KEY);

    let fields = fields_from_json(&map)
        .into_iter()
        .map(|(key, value)| {
            let value = to_store_value(&key, value);
            (key, value)
        })
        .collect();

    Ok(Document::new(id, fields))
}

/// ドキュメントをモデルに変換する
///
/// タイムスタンプはISO文字列になり、IDはドキュメント名から補われる。
pub fn decode<T: DeserializeOwned>(document: &Document) -> AppResult<T> {
    let mut map = fields_to_json(&document.fields);
    map.insert(ID_KEY.to_string(), Value::String(document.id.clone()));

    serde_json::from_value(Value::Object(map)).map_err(|e| {
        AppError::Database(format!(
            "ドキュメント {} を読み込めません: {e}",
            document.id
        ))
    })
}

/// 日付キーの文字列をタイムスタンプに変換する（入れ子のマップ・配列も対象）
fn to_store_value(key: &str, value: FieldValue) -> FieldValue {
    match value {
        FieldValue::StringValue(text) if DATETIME_KEYS.contains(&key) => {
            if text.trim().is_empty() {
                return FieldValue::null();
            }
            match parse_datetime(&text) {
                Some(dt) => FieldValue::TimestampValue(dt),
                None => {
                    log::warn!("日時として解析できない値をそのまま保存します: {key}={text}");
                    FieldValue::StringValue(text)
                }
            }
        }
        FieldValue::StringValue(text) if DATE_KEYS.contains(&key) => {
            if text.trim().is_empty() {
                return FieldValue::null();
            }
            match parse_date(&text) {
                Some(date) => FieldValue::TimestampValue(midnight_utc(date)),
                None => {
                    log::warn!("日付として解析できない値をそのまま保存します: {key}={text}");
                    FieldValue::StringValue(text)
                }
            }
        }
        FieldValue::MapValue(map) => FieldValue::MapValue(MapValue {
            fields: map
                .fields
                .into_iter()
                .map(|(k, v)| {
                    let v = to_store_value(&k, v);
                    (k, v)
                })
                .collect(),
        }),
        FieldValue::ArrayValue(array) => FieldValue::ArrayValue(ArrayValue {
            values: array
                .values
                .into_iter()
                .map(|v| to_store_value(key, v))
                .collect(),
        }),
        other => other,
    }
}
