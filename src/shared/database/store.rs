use super::batch::WriteBatch;
use super::document::{Document, FieldValue};
use crate::shared::errors::AppResult;
use async_trait::async_trait;

/// ドキュメントストアの共通インターフェース
///
/// 読み取りは単一ドキュメント取得・コレクション全件取得・等値検索のみ。
/// 書き込みは必ず [`WriteBatch`] 単位でアトミックにコミットする。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// ドキュメントを1件取得する（存在しない場合はNone）
    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>>;

    /// コレクションの全ドキュメントを取得する
    async fn list(&self, collection: &str) -> AppResult<Vec<Document>>;

    /// 指定フィールドが値と等しいドキュメントを取得する
    async fn query_equal(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> AppResult<Vec<Document>>;

    /// バッチをアトミックにコミットする
    async fn commit(&self, batch: WriteBatch) -> AppResult<()>;

    /// 認証済みユーザーのIDトークンを設定する（不要なストアでは何もしない）
    fn set_auth_token(&self, _token: Option<String>) {}

    /// ログ出力用のストア名
    fn backend_name(&self) -> &'static str;
}
