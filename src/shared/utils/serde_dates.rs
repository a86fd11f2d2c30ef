//! 日付フィールド用のserdeヘルパー
//!
//! 書き出しは常に正規形（日付は `YYYY-MM-DD`、日時はミリ秒精度のISO-8601）。
//! 読み込みは `YYYY-MM-DD` とRFC3339の両方を受け付ける。

use super::dates::{format_date, midnight_utc, parse_date, parse_datetime, to_iso_string};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};

fn parse_flexible_datetime(value: &str) -> Option<DateTime<Utc>> {
    parse_datetime(value).or_else(|| {
        NaiveDate::parse_from_str(value.trim(), super::dates::DATE_FORMAT)
            .ok()
            .map(midnight_utc)
    })
}

/// 必須の日付
pub mod date {
    use super::*;

    pub fn serialize<S: Serializer>(value: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_date(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_date(&text).ok_or_else(|| de::Error::custom(format!("日付を解析できません: {text}")))
    }
}

/// 任意の日付（未設定は空文字列で表す）
pub mod optional_date {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_str(&format_date(*date)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(text) if text.trim().is_empty() => Ok(None),
            Some(text) => parse_date(&text)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("日付を解析できません: {text}"))),
        }
    }
}

/// 必須の日時
pub mod datetime {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_iso_string(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_flexible_datetime(&text)
            .ok_or_else(|| de::Error::custom(format!("日時を解析できません: {text}")))
    }
}

/// 任意の日時（未設定はnull）
pub mod optional_datetime {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&to_iso_string(*dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(text) if text.trim().is_empty() => Ok(None),
            Some(text) => parse_flexible_datetime(&text)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("日時を解析できません: {text}"))),
        }
    }
}
