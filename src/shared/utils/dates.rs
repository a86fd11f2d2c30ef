use chrono::{
    DateTime, DurationRound, Months, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, Utc,
};
use chrono_tz::Tz;

/// 日付の表示・保存形式（YYYY-MM-DD）
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 日時の表示形式（エクスポート用）
pub const DATETIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// 期限切れ間近とみなす日数
pub const EXPIRING_SOON_DAYS: i64 = 7;

/// 日付文字列を解析する
///
/// `YYYY-MM-DD`、RFC3339（UTCの日付部分を採用）、タイムゾーンなしの
/// `YYYY-MM-DDTHH:MM:SS` を受け付ける。
///
/// # 戻り値
/// 解析できた日付、失敗時はNone
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.with_timezone(&Utc).date_naive());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(datetime.date());
    }
    None
}

/// RFC3339形式の日時文字列を解析する
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// 日付をYYYY-MM-DD形式に整形する
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// 日時をミリ秒精度のISO-8601（UTC, `Z`付き）に整形する
pub fn to_iso_string(datetime: DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 日時を表示用タイムゾーンの `YYYY-MM-DD HH:MM` に整形する
pub fn format_datetime_local(datetime: DateTime<Utc>, timezone: Tz) -> String {
    datetime
        .with_timezone(&timezone)
        .format(DATETIME_DISPLAY_FORMAT)
        .to_string()
}

/// 暦月単位で月数を加算する
///
/// 月末を超える日は加算先の月末に丸める（1月31日 + 1か月 = 2月末日）。
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// 日付の差（日数）を求める
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// 日付をUTC午前0時の日時に変換する
pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// 現在時刻をミリ秒精度で取得する
///
/// 保存先（Firestore）の精度に合わせ、往復しても値が変わらないようにする。
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(now)
}

/// 終了日が基準日から7日以内（当日含む）かどうかを判定する
pub fn is_expiring_soon(end_date: NaiveDate, today: NaiveDate) -> bool {
    let diff = days_between(today, end_date);
    (0..=EXPIRING_SOON_DAYS).contains(&diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-01-01"), Some(date(2024, 1, 1)));
        assert_eq!(
            parse_date("2024-01-01T00:00:00.000Z"),
            Some(date(2024, 1, 1))
        );
        assert_eq!(parse_date("2024-03-15T10:30:00"), Some(date(2024, 3, 15)));
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("2024-13-01"), None);
    }

    #[test]
    fn test_add_months_calendar_arithmetic() {
        assert_eq!(add_months(date(2024, 1, 1), 3), Some(date(2024, 4, 1)));
        // 月末は丸められる
        assert_eq!(add_months(date(2024, 1, 31), 1), Some(date(2024, 2, 29)));
        assert_eq!(add_months(date(2023, 11, 15), 2), Some(date(2024, 1, 15)));
    }

    #[test]
    fn test_days_between() {
        assert_eq!(days_between(date(2024, 1, 1), date(2024, 4, 1)), 91);
        assert_eq!(days_between(date(2024, 1, 1), date(2024, 1, 1)), 0);
        assert_eq!(days_between(date(2024, 1, 2), date(2024, 1, 1)), -1);
    }

    #[test]
    fn test_iso_round_trip_is_exact() {
        let created = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
            + TimeDelta::milliseconds(123);
        let iso = to_iso_string(created);
        assert_eq!(iso, "2024-05-06T07:08:09.123Z");
        assert_eq!(parse_datetime(&iso), Some(created));
    }

    #[test]
    fn test_now_millis_has_no_sub_millisecond_part() {
        let now = now_millis();
        assert_eq!(now.nanosecond() % 1_000_000, 0);
    }

    #[test]
    fn test_format_datetime_local() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 21, 30, 0).unwrap();
        // クウェートはUTC+3
        assert_eq!(
            format_datetime_local(created, chrono_tz::Asia::Kuwait),
            "2024-01-02 00:30"
        );
    }

    #[test]
    fn test_midnight_utc() {
        let midnight = midnight_utc(date(2024, 4, 1));
        assert_eq!(midnight.hour(), 0);
        assert_eq!(midnight.date_naive().day(), 1);
    }

    #[test]
    fn test_is_expiring_soon() {
        let today = date(2024, 1, 1);
        assert!(is_expiring_soon(date(2024, 1, 1), today));
        assert!(is_expiring_soon(date(2024, 1, 8), today));
        assert!(!is_expiring_soon(date(2024, 1, 9), today));
        assert!(!is_expiring_soon(date(2023, 12, 31), today));
    }
}
