//! ドキュメントストアの値モデル
//!
//! Firestore REST API の型付き値（`{"stringValue": "..."}` 形式）と同じ表現を使う。
//! SQLiteストアも同じJSONを保存するため、どちらのストアでもタイムスタンプは
//! ネイティブ型（`timestampValue`）として扱われる。

use crate::shared::utils::dates::to_iso_string;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// ドキュメントのフィールド集合
pub type Fields = BTreeMap<String, FieldValue>;

/// 配列値
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<FieldValue>,
}

/// マップ値
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: Fields,
}

/// 型付きのフィールド値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValue {
    NullValue(()),
    BooleanValue(bool),
    /// Firestoreは64bit整数を文字列で送受信する
    IntegerValue(#[serde(with = "integer_string")] i64),
    DoubleValue(f64),
    TimestampValue(DateTime<Utc>),
    StringValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

mod integer_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(i64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(de::Error::custom),
            Repr::Number(number) => Ok(number),
        }
    }
}

impl FieldValue {
    /// null値
    pub fn null() -> Self {
        FieldValue::NullValue(())
    }

    /// 文字列値
    pub fn string(value: impl Into<String>) -> Self {
        FieldValue::StringValue(value.into())
    }

    /// 文字列として取得する
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::StringValue(value) => Some(value),
            _ => None,
        }
    }

    /// タイムスタンプとして取得する
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::TimestampValue(value) => Some(*value),
            _ => None,
        }
    }

    /// null値かどうか
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::NullValue(()))
    }

    /// 素のJSON値から型付き値に変換する
    ///
    /// タイムスタンプへの変換はここでは行わない（どのキーが日時かは呼び出し側が知っている）。
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::null(),
            Value::Bool(b) => FieldValue::BooleanValue(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::IntegerValue(i),
                None => FieldValue::DoubleValue(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => FieldValue::StringValue(s.clone()),
            Value::Array(items) => FieldValue::ArrayValue(ArrayValue {
                values: items.iter().map(FieldValue::from_json).collect(),
            }),
            Value::Object(map) => FieldValue::MapValue(MapValue {
                fields: fields_from_json(map),
            }),
        }
    }

    /// 型付き値を素のJSON値に変換する
    ///
    /// タイムスタンプはミリ秒精度のISO-8601文字列になる。
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::NullValue(()) => Value::Null,
            FieldValue::BooleanValue(b) => Value::Bool(*b),
            FieldValue::IntegerValue(i) => Value::Number((*i).into()),
            FieldValue::DoubleValue(d) => Number::from_f64(*d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::TimestampValue(ts) => Value::String(to_iso_string(*ts)),
            FieldValue::StringValue(s) => Value::String(s.clone()),
            FieldValue::ArrayValue(array) => {
                Value::Array(array.values.iter().map(FieldValue::to_json).collect())
            }
            FieldValue::MapValue(map) => Value::Object(fields_to_json(&map.fields)),
        }
    }
}

/// JSONオブジェクトをフィールド集合に変換する
pub fn fields_from_json(map: &Map<String, Value>) -> Fields {
    map.iter()
        .map(|(key, value)| (key.clone(), FieldValue::from_json(value)))
        .collect()
}

/// フィールド集合をJSONオブジェクトに変換する
pub fn fields_to_json(fields: &Fields) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

/// ストア内の1ドキュメント
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// ドキュメントID（コレクション内で一意）
    pub id: String,
    /// フィールド
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// フィールドを取得する
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// 文字列フィールドを取得する
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_str)
    }

    /// フィールドを設定したドキュメントを返す
    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}
