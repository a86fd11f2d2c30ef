use crate::features::subscriptions::models::Subscription;
use crate::shared::errors::AppResult;
use crate::shared::utils::dates::{format_date, format_datetime_local};
use chrono_tz::Tz;
use rust_xlsxwriter::{Format, Workbook};

/// シート名
pub const SHEET_NAME: &str = "الاشتراكات";

/// 見出し行
pub const HEADERS: [&str; 10] = [
    "معرف الاشتراك",
    "اسم العميل",
    "رقم هاتف العميل",
    "الفئة",
    "المدة (أشهر)",
    "تاريخ البدء",
    "تاريخ الانتهاء",
    "السعر الإجمالي",
    "الحالة",
    "تاريخ الإنشاء",
];

/// 購読一覧の要約を `.xlsx` として書き出す
///
/// # 引数
/// * `subscriptions` - 出力する購読
/// * `timezone` - 作成日時の表示タイムゾーン
///
/// # 戻り値
/// xlsxファイルのバイト列
pub fn render(subscriptions: &[Subscription], timezone: Tz) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;
    worksheet.set_right_to_left(true);

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        worksheet.set_column_width(col as u16, 18)?;
    }

    for (index, sub) in subscriptions.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_string(row, 0, &sub.id)?;
        worksheet.write_string(row, 1, &sub.client_name)?;
        worksheet.write_string(row, 2, &sub.client_phone)?;
        worksheet.write_string(row, 3, sub.tier.arabic_label())?;
        worksheet.write_number(row, 4, sub.duration)?;
        worksheet.write_string(row, 5, format_date(sub.start_date))?;
        worksheet.write_string(row, 6, format_date(sub.end_date))?;
        worksheet.write_number(row, 7, sub.total_price)?;
        worksheet.write_string(row, 8, sub.status.arabic_label())?;
        worksheet.write_string(row, 9, format_datetime_local(sub.created_at, timezone))?;
    }

    let buffer = workbook.save_to_buffer()?;
    log::debug!(
        "xlsxを生成しました: rows={}, bytes={}",
        subscriptions.len(),
        buffer.len()
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::subscriptions::models::sample_subscription;

    #[test]
    fn test_render_produces_xlsx_archive() {
        let subscriptions = vec![
            sample_subscription("sub-1", "شركة النور"),
            sample_subscription("sub-2", "مكتب الأمل"),
        ];
        let bytes = render(&subscriptions, chrono_tz::Asia::Kuwait).unwrap();
        // xlsxはzipアーカイブ
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_render_empty_list() {
        let bytes = render(&[], chrono_tz::UTC).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
