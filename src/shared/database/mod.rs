/// コレクション名
pub mod collections;

/// ドキュメントと型付きフィールド値
pub mod document;

/// モデルとドキュメントの変換（日付の正規化）
pub mod codec;

/// アトミックな書き込みバッチ
pub mod batch;

/// ストアの共通トレイト
pub mod store;

/// SQLite接続とテーブル管理
pub mod connection;

/// SQLiteドキュメントストア
pub mod sqlite_store;

/// Firestore RESTドキュメントストア
pub mod firestore_store;

pub use batch::{WriteBatch, WriteOp};
pub use connection::{create_tables, get_database_path, initialize_database};
pub use document::{Document, FieldValue, Fields};
pub use firestore_store::FirestoreDocumentStore;
pub use sqlite_store::SqliteDocumentStore;
pub use store::DocumentStore;
