/// ID生成（nanoid）
pub mod ids;

/// 日付の解析・整形・暦月計算
pub mod dates;

/// 金額の表示整形
pub mod currency;

/// 日付フィールドのシリアライズ
pub mod serde_dates;

pub use currency::format_currency;
pub use dates::{add_months, format_date, is_expiring_soon, now_millis, parse_date};
pub use ids::{generate_document_id, generate_suffix, is_valid_document_id};
