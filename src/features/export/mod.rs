/// 購読一覧のエクスポート（JSON / Excel / PDF）とJSONインポート
pub mod excel;
pub mod import;
pub mod json;
pub mod pdf;

use crate::features::subscriptions::models::Subscription;
use crate::shared::config::ExportConfig;
use crate::shared::errors::{AppError, AppResult};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub use import::{import_success_message, parse_import};

/// エクスポートファイル名（拡張子なし）
pub const EXPORT_FILE_STEM: &str = "الاشتراكات_النشطة";

/// エクスポート形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Excel,
    Pdf,
}

impl ExportFormat {
    /// ファイル拡張子
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }

    /// 文字列から形式を解析する（`xlsx` は `excel` の別名）
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(AppError::validation(format!(
                "صيغة تصدير غير مدعومة: {other}"
            ))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// 書き出したファイル
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// エクスポートの表示設定
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Excelの作成日時を表示するタイムゾーン
    pub timezone: Tz,
    /// PDFに埋め込むフォント
    pub pdf_font_path: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            timezone: crate::shared::config::DEFAULT_TIMEZONE,
            pdf_font_path: None,
        }
    }
}

impl ExportOptions {
    pub fn new(timezone: Tz, config: &ExportConfig) -> Self {
        Self {
            timezone,
            pdf_font_path: config.pdf_font_path.clone(),
        }
    }
}

/// 購読一覧を指定形式のファイルにする
///
/// # 引数
/// * `format` - 出力形式
/// * `subscriptions` - 出力する購読
/// * `options` - 表示設定
///
/// # 戻り値
/// ファイル名・MIMEタイプ・内容
pub fn render(
    format: ExportFormat,
    subscriptions: &[Subscription],
    options: &ExportOptions,
) -> AppResult<ExportFile> {
    let bytes = match format {
        ExportFormat::Json => json::render(subscriptions)?,
        ExportFormat::Excel => excel::render(subscriptions, options.timezone)?,
        ExportFormat::Pdf => pdf::render(subscriptions, options.pdf_font_path.as_deref())?,
    };

    log::info!(
        "エクスポートファイルを作成しました: format={format}, count={}, bytes={}",
        subscriptions.len(),
        bytes.len()
    );

    Ok(ExportFile {
        file_name: format!("{EXPORT_FILE_STEM}.{}", format.extension()),
        mime_type: format.mime_type().to_string(),
        bytes,
    })
}
