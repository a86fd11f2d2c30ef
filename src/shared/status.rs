use crate::shared::errors::{AppError, ErrorSeverity};
use serde::Serialize;

/// 非同期操作の実行状態
///
/// 操作中は `is_loading` が立ち、失敗した場合は画面表示用のメッセージが `error` に入る。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    pub is_loading: bool,
    pub error: Option<String>,
}

impl OperationStatus {
    /// 操作を開始する（前回のエラーは消す）
    pub fn begin(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    /// 操作が成功した
    pub fn finish(&mut self) {
        self.is_loading = false;
    }

    /// 操作が失敗した
    ///
    /// 入力・未発見・認証エラーはそのメッセージを、それ以外は操作ごとの
    /// 固定メッセージを表示する。
    ///
    /// # 引数
    /// * `error` - 発生したエラー
    /// * `message` - 操作ごとの表示メッセージ
    pub fn fail(&mut self, error: &AppError, message: &str) {
        log::log!(log_level(error.severity()), "{message} ({})", error.details());

        self.error = Some(match error {
            AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Authentication(msg) => {
                msg.clone()
            }
            _ => message.to_string(),
        });
        self.is_loading = false;
    }

    /// 直前の操作結果をコマンド層の戻り値にする
    pub fn check(&self) -> Result<(), String> {
        match &self.error {
            Some(message) => Err(message.clone()),
            None => Ok(()),
        }
    }
}

/// 入力起因の失敗は警告、それ以外はエラーとして記録する
fn log_level(severity: ErrorSeverity) -> log::Level {
    match severity {
        ErrorSeverity::Low => log::Level::Warn,
        ErrorSeverity::Medium | ErrorSeverity::High | ErrorSeverity::Critical => log::Level::Error,
    }
}
