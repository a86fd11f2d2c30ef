/// 通貨コード（クウェート・ディナール）
pub const CURRENCY_CODE: &str = "KWD";

/// 金額をクウェート・ディナール表記（小数点以下3桁）に整形する
///
/// # 引数
/// * `amount` - 金額
///
/// # 戻り値
/// `"12.500 KWD"` 形式の文字列。数値でない場合は `"0.000 KWD"`
pub fn format_currency(amount: f64) -> String {
    if !amount.is_finite() {
        log::error!("format_currency に不正な金額が渡されました: {amount}");
        return format!("0.000 {CURRENCY_CODE}");
    }
    format!("{amount:.3} {CURRENCY_CODE}")
}
