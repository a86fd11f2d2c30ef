use super::batch::{WriteBatch, WriteOp};
use super::connection::{create_tables, initialize_database};
use super::document::{Document, FieldValue, Fields};
use super::store::DocumentStore;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::dates::{now_millis, to_iso_string};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLiteに保存するドキュメントストア
///
/// コミットは1トランザクションで実行するため、バッチの途中で失敗した場合は
/// すべての書き込みがロールバックされる。
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// ファイルデータベースを開く
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = initialize_database(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// メモリデータベースを開く
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    /// 既存の接続から作成する
    pub fn from_connection(conn: Connection) -> AppResult<Self> {
        create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::Database(format!("データベースロックエラー: {e}")))
    }

    fn decode(id: String, data: &str) -> AppResult<Document> {
        let fields: Fields = serde_json::from_str(data).map_err(|e| {
            AppError::Database(format!("ドキュメント {id} の解析に失敗しました: {e}"))
        })?;
        Ok(Document::new(id, fields))
    }

    fn load_collection(conn: &Connection, collection: &str) -> AppResult<Vec<Document>> {
        let mut stmt =
            conn.prepare("SELECT id, data FROM documents WHERE collection = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, data) = row?;
            documents.push(Self::decode(id, &data)?);
        }
        Ok(documents)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        let conn = self.lock()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        data.map(|data| Self::decode(id.to_string(), &data))
            .transpose()
    }

    async fn list(&self, collection: &str) -> AppResult<Vec<Document>> {
        let conn = self.lock()?;
        Self::load_collection(&conn, collection)
    }

    async fn query_equal(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> AppResult<Vec<Document>> {
        let conn = self.lock()?;
        let documents = Self::load_collection(&conn, collection)?;
        Ok(documents
            .into_iter()
            .filter(|doc| doc.get(field) == Some(value))
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> AppResult<()> {
        let operation_count = batch.len();
        let now = to_iso_string(now_millis());

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for op in batch.into_operations() {
            match op {
                WriteOp::Create {
                    collection,
                    document,
                } => {
                    let data = serde_json::to_string(&document.fields)?;
                    tx.execute(
                        "INSERT INTO documents (collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)",
                        params![collection, document.id, data, now],
                    )
                    .map_err(|e| match e {
                        rusqlite::Error::SqliteFailure(err, _)
                            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                        {
                            AppError::Database(format!(
                                "ドキュメント {collection}/{} は既に存在します",
                                document.id
                            ))
                        }
                        other => AppError::from(other),
                    })?;
                }
                WriteOp::Set {
                    collection,
                    document,
                } => {
                    let data = serde_json::to_string(&document.fields)?;
                    tx.execute(
                        "INSERT INTO documents (collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                        params![collection, document.id, data, now],
                    )?;
                }
                WriteOp::Delete { collection, id } => {
                    tx.execute(
                        "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                        params![collection, id],
                    )?;
                }
            }
        }

        // エラーで途中returnした場合、txはdropされロールバックされる
        tx.commit()?;

        log::debug!("SQLiteバッチをコミットしました: operations={operation_count}");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(id: &str, subscription_id: &str) -> Document {
        Document::new(id, Fields::new())
            .with_field("subscriptionId", FieldValue::string(subscription_id))
    }

    #[tokio::test]
    async fn test_set_get_and_list() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();

        let mut batch = WriteBatch::new();
        batch.set("tasks", doc("b", "sub-1")).set("tasks", doc("a", "sub-2"));
        store.commit(batch).await.unwrap();

        let fetched = store.get("tasks", "b").await.unwrap().unwrap();
        assert_eq!(fetched.get_str("subscriptionId"), Some("sub-1"));
        assert!(store.get("tasks", "zzz").await.unwrap().is_none());
        assert!(store.get("subscriptions", "b").await.unwrap().is_none());

        let all = store.list("tasks").await.unwrap();
        let ids: Vec<_> = all.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_query_equal() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let mut batch = WriteBatch::new();
        batch
            .set("tasks", doc("t1", "sub-1"))
            .set("tasks", doc("t2", "sub-2"))
            .set("tasks", doc("t3", "sub-1"));
        store.commit(batch).await.unwrap();

        let matched = store
            .query_equal("tasks", "subscriptionId", &FieldValue::string("sub-1"))
            .await
            .unwrap();
        assert_eq!(matched.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back_everything() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();

        let mut first = WriteBatch::new();
        first.create("tasks", doc("existing", "sub-0"));
        store.commit(first).await.unwrap();

        // 2件目のcreateが衝突するため、1件目のsubscriptionも書き込まれない
        let mut batch = WriteBatch::new();
        batch
            .create("subscriptions", Document::new("sub-1", Fields::new()))
            .create("tasks", doc("existing", "sub-1"));
        let result = store.commit(batch).await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(store.get("subscriptions", "sub-1").await.unwrap().is_none());
        let existing = store.get("tasks", "existing").await.unwrap().unwrap();
        assert_eq!(existing.get_str("subscriptionId"), Some("sub-0"));
    }

    #[tokio::test]
    async fn test_transfer_moves_document() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let mut batch = WriteBatch::new();
        batch.set("subscriptions", doc("sub-1", "x"));
        store.commit(batch).await.unwrap();

        let original = store.get("subscriptions", "sub-1").await.unwrap().unwrap();
        let mut batch = WriteBatch::new();
        batch.transfer("subscriptions", "recycledSubscriptions", original);
        store.commit(batch).await.unwrap();

        assert!(store.get("subscriptions", "sub-1").await.unwrap().is_none());
        assert!(store
            .get("recycledSubscriptions", "sub-1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_file_store_persists_between_opens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("documents.db");

        {
            let store = SqliteDocumentStore::open(&path).unwrap();
            let mut batch = WriteBatch::new();
            batch.set("users", Document::new("uid-1", Fields::new()));
            store.commit(batch).await.unwrap();
        }

        let reopened = SqliteDocumentStore::open(&path).unwrap();
        assert!(reopened.get("users", "uid-1").await.unwrap().is_some());
    }
}
