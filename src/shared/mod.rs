/// 共有エラー型とエラーハンドリング
pub mod errors;

/// ドキュメントストア（SQLite / Firestore）
pub mod database;

/// 共有設定管理
pub mod config;

/// 外部REST APIクライアント
pub mod rest_client;

/// 非同期操作の状態（読み込み中・エラー）
pub mod status;

/// 共有ユーティリティ関数
pub mod utils;

// 便利な再エクスポート
pub use config::{
    get_database_filename, get_environment, initialize_logging_system,
    load_environment_variables, Environment, EnvironmentConfig, FirebaseConfig, StoreConfig,
};
pub use database::{Document, DocumentStore, FieldValue, Fields, WriteBatch};
pub use errors::{AppError, AppResult, ErrorSeverity};
