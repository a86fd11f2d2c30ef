use super::batch::{WriteBatch, WriteOp};
use super::document::{Document, FieldValue, Fields};
use super::store::DocumentStore;
use crate::shared::config::FirebaseConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::rest_client::{RestClient, SendError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::RwLock;

const SERVICE_NAME: &str = "firestore";

/// 1ページあたりの取得件数
const PAGE_SIZE: &str = "300";

/// Firestore REST APIのドキュメント表現
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RemoteDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    fields: Fields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RemoteDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    document: Option<RemoteDocument>,
}

/// Firestore REST APIを使うドキュメントストア
///
/// 書き込みは `:commit` エンドポイントにまとめて送るため、バッチはサーバー側で
/// アトミックに適用される。
pub struct FirestoreDocumentStore {
    client: RestClient,
    documents_root: String,
    api_key: String,
    auth_token: RwLock<Option<String>>,
}

impl FirestoreDocumentStore {
    /// 設定からストアを作成する
    pub fn new(config: &FirebaseConfig) -> AppResult<Self> {
        config.validate().map_err(AppError::configuration)?;

        Ok(Self {
            client: RestClient::new(&config.firestore_endpoint, config.timeout_seconds)?,
            documents_root: config.documents_root(),
            api_key: config.api_key.clone(),
            auth_token: RwLock::new(None),
        })
    }

    fn token(&self) -> Option<String> {
        self.auth_token.read().ok().and_then(|guard| guard.clone())
    }

    /// ドキュメントのリソース名（コミット本文用、エンコードしない）
    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.documents_root)
    }

    /// 単一ドキュメント取得用のURLパス（IDはパーセントエンコードする）
    fn document_path(&self, collection: &str, id: &str) -> String {
        format!(
            "/{}/{collection}/{}",
            self.documents_root,
            urlencoding::encode(id)
        )
    }

    /// レスポンスの `name` はエンコードされていないため、最後の要素をそのままIDとする
    fn into_document(remote: RemoteDocument) -> Document {
        let id = remote.name.rsplit('/').next().unwrap_or_default().to_string();
        Document::new(id, remote.fields)
    }

    fn encode_write(&self, op: WriteOp) -> Value {
        match op {
            WriteOp::Create {
                collection,
                document,
            } => json!({
                "update": {
                    "name": self.document_name(&collection, &document.id),
                    "fields": document.fields,
                },
                "currentDocument": {"exists": false},
            }),
            WriteOp::Set {
                collection,
                document,
            } => json!({
                "update": {
                    "name": self.document_name(&collection, &document.id),
                    "fields": document.fields,
                },
            }),
            WriteOp::Delete { collection, id } => json!({
                "delete": self.document_name(&collection, &id),
            }),
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        let endpoint = self.document_path(collection, id);
        let token = self.token();

        match self
            .client
            .get::<RemoteDocument>(&endpoint, &[("key", self.api_key.as_str())], token.as_deref())
            .await
        {
            Ok(remote) => Ok(Some(Self::into_document(remote))),
            Err(SendError::Status(failure)) if failure.status == 404 => Ok(None),
            Err(e) => Err(e.into_app_error(SERVICE_NAME)),
        }
    }

    async fn list(&self, collection: &str) -> AppResult<Vec<Document>> {
        let endpoint = format!("/{}/{collection}", self.documents_root);
        let token = self.token();
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("key", self.api_key.as_str()), ("pageSize", PAGE_SIZE)];
            if let Some(page) = page_token.as_deref() {
                query.push(("pageToken", page));
            }

            let page: ListResponse = self
                .client
                .get(&endpoint, &query, token.as_deref())
                .await
                .map_err(|e| e.into_app_error(SERVICE_NAME))?;

            documents.extend(page.documents.into_iter().map(Self::into_document));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        log::debug!(
            "Firestoreコレクションを取得しました: collection={collection}, count={}",
            documents.len()
        );
        Ok(documents)
    }

    async fn query_equal(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> AppResult<Vec<Document>> {
        let endpoint = format!("/{}:runQuery", self.documents_root);
        let body = json!({
            "structuredQuery": {
                "from": [{"collectionId": collection}],
                "where": {
                    "fieldFilter": {
                        "field": {"fieldPath": field},
                        "op": "EQUAL",
                        "value": value,
                    }
                }
            }
        });
        let token = self.token();

        let results: Vec<QueryResult> = self
            .client
            .post(&endpoint, &[("key", self.api_key.as_str())], &body, token.as_deref())
            .await
            .map_err(|e| e.into_app_error(SERVICE_NAME))?;

        // 結果が0件の場合も readTime だけの要素が1つ返る
        Ok(results
            .into_iter()
            .filter_map(|result| result.document)
            .map(Self::into_document)
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> AppResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let operation_count = batch.len();
        let writes: Vec<Value> = batch
            .into_operations()
            .into_iter()
            .map(|op| self.encode_write(op))
            .collect();
        let endpoint = format!("/{}:commit", self.documents_root);
        let token = self.token();

        let _: Value = self
            .client
            .post(
                &endpoint,
                &[("key", self.api_key.as_str())],
                &json!({ "writes": writes }),
                token.as_deref(),
            )
            .await
            .map_err(|e| e.into_app_error(SERVICE_NAME))?;

        log::debug!("Firestoreバッチをコミットしました: operations={operation_count}");
        Ok(())
    }

    fn set_auth_token(&self, token: Option<String>) {
        match self.auth_token.write() {
            Ok(mut guard) => *guard = token,
            Err(e) => log::error!("認証トークンの更新に失敗しました: {e}"),
        }
    }

    fn backend_name(&self) -> &'static str {
        "firestore"
    }
}
