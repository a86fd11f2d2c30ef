use crate::features::subscriptions::models::Subscription;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::currency::format_currency;
use crate::shared::utils::dates::format_date;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const LEFT_MARGIN: f32 = 14.0;
const TOP: f32 = 282.0;
const BOTTOM: f32 = 15.0;
const ROW_HEIGHT: f32 = 7.0;
const TITLE_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 9.0;

/// 列の左端（mm）
const COLUMN_X: [f32; 6] = [LEFT_MARGIN, 68.0, 92.0, 116.0, 140.0, 172.0];

const ARABIC_TITLE: &str = "قائمة الاشتراكات";
const ARABIC_HEADERS: [&str; 6] = ["العميل", "الفئة", "تاريخ البدء", "تاريخ الانتهاء", "السعر", "الحالة"];
const LATIN_TITLE: &str = "Subscriptions";
const LATIN_HEADERS: [&str; 6] = ["Client", "Tier", "Start", "End", "Price", "Status"];

/// 印刷用の一覧をPDFとして書き出す
///
/// アラビア文字を出力するにはTTFフォントの指定が必要。未指定の場合は組み込みの
/// Helveticaを使い、見出しと区分・状態は英語表記、Latin-1外の文字は `?` になる。
///
/// # 引数
/// * `subscriptions` - 出力する購読
/// * `font_path` - 埋め込むTTFフォント
///
/// # 戻り値
/// PDFファイルのバイト列
pub fn render(subscriptions: &[Subscription], font_path: Option<&Path>) -> AppResult<Vec<u8>> {
    let title = if font_path.is_some() { ARABIC_TITLE } else { LATIN_TITLE };
    let (doc, page, layer) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "table");
    let font = load_font(&doc, font_path)?;
    let unicode = font_path.is_some();

    let headers = if unicode { ARABIC_HEADERS } else { LATIN_HEADERS };
    let rows: Vec<[String; 6]> = subscriptions
        .iter()
        .map(|sub| {
            let (tier, status) = if unicode {
                (sub.tier.arabic_label(), sub.status.arabic_label())
            } else {
                (sub.tier.as_str(), sub.status.as_str())
            };
            [
                sub.client_name.clone(),
                tier.to_string(),
                format_date(sub.start_date),
                format_date(sub.end_date),
                format_currency(sub.total_price),
                status.to_string(),
            ]
        })
        .collect();

    if !unicode {
        let lossy = count_lossy_cells(&rows);
        if lossy > 0 {
            log::warn!(
                "PDF_FONT_PATH が未設定のため、{lossy}件のセルでLatin-1外の文字が `?` に置き換えられます"
            );
        }
    }

    let mut current = doc.get_page(page).get_layer(layer);
    current.use_text(title, TITLE_SIZE, Mm(LEFT_MARGIN), Mm(TOP), &font);
    let mut y = TOP - ROW_HEIGHT * 1.5;
    write_row(&current, &headers.map(String::from), y, &font, unicode);

    for row in &rows {
        y -= ROW_HEIGHT;
        if y < BOTTOM {
            let (next_page, next_layer) = doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "table");
            current = doc.get_page(next_page).get_layer(next_layer);
            y = TOP;
            write_row(&current, &headers.map(String::from), y, &font, unicode);
            y -= ROW_HEIGHT;
        }
        write_row(&current, row, y, &font, unicode);
    }

    doc.save_to_bytes()
        .map_err(|e| AppError::export(format!("PDFの保存に失敗しました: {e}")))
}

fn load_font(doc: &PdfDocumentReference, font_path: Option<&Path>) -> AppResult<IndirectFontRef> {
    match font_path {
        Some(path) => {
            let file = File::open(path)?;
            doc.add_external_font(BufReader::new(file)).map_err(|e| {
                AppError::export(format!("フォントを読み込めません: {path:?}: {e}"))
            })
        }
        None => doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::export(format!("組み込みフォントを読み込めません: {e}"))),
    }
}

fn write_row(
    layer: &printpdf::PdfLayerReference,
    cells: &[String; 6],
    y: f32,
    font: &IndirectFontRef,
    unicode: bool,
) {
    for (cell, x) in cells.iter().zip(COLUMN_X) {
        let text = if unicode {
            cell.clone()
        } else {
            to_latin1(cell)
        };
        layer.use_text(text, BODY_SIZE, Mm(x), Mm(y), font);
    }
}

/// 組み込みフォントで表せない文字を含むセルの数
fn count_lossy_cells(rows: &[[String; 6]]) -> usize {
    rows.iter()
        .flatten()
        .filter(|cell| cell.chars().any(|c| (c as u32) >= 0x100))
        .count()
}

/// 組み込みフォントで表せない文字を `?` に置き換える
fn to_latin1(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) < 0x100 { c } else { '?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::subscriptions::models::sample_subscription;

    #[test]
    fn test_render_with_builtin_font() {
        let subscriptions = vec![sample_subscription("sub-1", "Acme")];
        let bytes = render(&subscriptions, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_lossy_cells_are_counted() {
        let row = |name: &str| {
            [
                name.to_string(),
                "vip".to_string(),
                "2024-01-01".to_string(),
                "2024-04-01".to_string(),
                "30.000 KWD".to_string(),
                "active".to_string(),
            ]
        };
        assert_eq!(count_lossy_cells(&[row("Acme"), row("Café")]), 0);
        assert_eq!(count_lossy_cells(&[row("شركة النور"), row("Acme"), row("مكتب")]), 2);
        assert_eq!(to_latin1("مكتب A"), "???? A");
    }

    #[test]
    fn test_render_spills_onto_new_pages() {
        let subscriptions: Vec<_> = (0..120)
            .map(|i| sample_subscription(&format!("sub-{i}"), "شركة النور"))
            .collect();
        let bytes = render(&subscriptions, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_missing_font_file_is_an_error() {
        let result = render(&[], Some(Path::new("/nonexistent/font.ttf")));
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn test_to_latin1() {
        assert_eq!(to_latin1("Acme café"), "Acme café");
        assert_eq!(to_latin1("شركة"), "????");
    }
}
