pub mod features;
pub mod shared;

use features::auth::{AuthSession, FirebaseIdentityClient, IdentityProvider};
use features::export::ExportOptions;
use features::subscriptions::SubscriptionsStore;
use features::tasks::TasksStore;
use log::{error, info, warn};
use shared::config::{
    initialize_logging_system, load_environment_variables, EnvironmentConfig, ExportConfig,
    FirebaseConfig, StoreBackend, StoreConfig,
};
use shared::database::{
    get_database_path, DocumentStore, FirestoreDocumentStore, SqliteDocumentStore,
};
use shared::errors::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::Mutex;

/// アプリケーション状態
///
/// ドキュメントストアと、それを共有する各状態コンテナを保持する。
/// 状態コンテナはコマンド経由でのみ変更する。
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub subscriptions: Mutex<SubscriptionsStore>,
    pub tasks: Mutex<TasksStore>,
    pub auth: Mutex<AuthSession>,
    pub environment: EnvironmentConfig,
}

impl AppState {
    /// 環境変数を読み込み、設定に従ってストアを開いて状態を作成する
    ///
    /// # 戻り値
    /// アプリケーション状態、または設定・ストアの初期化に失敗した場合はエラー
    pub fn initialize() -> AppResult<Self> {
        load_environment_variables();
        initialize_logging_system();

        info!("アプリケーション初期化を開始します...");

        let environment = EnvironmentConfig::from_env();
        let store_config = StoreConfig::from_env();
        let firebase_config = FirebaseConfig::from_env();

        if let Some(config) = &firebase_config {
            info!("Firebase設定: {:?}", config.get_debug_info());
            if let Err(e) = config.validate() {
                error!("Firebase設定の検証に失敗しました: {e}");
                if environment.is_production() {
                    return Err(AppError::configuration(e));
                }
                warn!("開発環境のため、Firebase設定エラーを無視して続行します");
            }
        }

        let store: Arc<dyn DocumentStore> = match store_config.backend {
            StoreBackend::Firestore => {
                let config = firebase_config.as_ref().ok_or_else(|| {
                    AppError::configuration("STORE_BACKEND=firestore にはFirebase設定が必要です")
                })?;
                Arc::new(FirestoreDocumentStore::new(config)?)
            }
            StoreBackend::Sqlite => {
                let path = get_database_path(&store_config)?;
                Arc::new(SqliteDocumentStore::open(&path)?)
            }
        };
        info!("ドキュメントストアを初期化しました: {}", store.backend_name());

        let provider: Option<Arc<dyn IdentityProvider>> = match &firebase_config {
            Some(config) => match FirebaseIdentityClient::new(config) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("IDプロバイダーを初期化できません: {}", e.details());
                    None
                }
            },
            None => {
                warn!("Firebase設定が無いため、サインインは利用できません");
                None
            }
        };

        let export_config = ExportConfig::from_env();
        if let Some(message) = export_config.production_warning(environment.is_production()) {
            warn!("{message}");
        }
        let export_options = ExportOptions::new(environment.timezone, &export_config);
        let state = Self::with_store(store, provider, export_options, environment);

        info!("アプリケーション初期化が完了しました");
        Ok(state)
    }

    /// 既存のストアから状態を作成する
    pub fn with_store(
        store: Arc<dyn DocumentStore>,
        provider: Option<Arc<dyn IdentityProvider>>,
        export_options: ExportOptions,
        environment: EnvironmentConfig,
    ) -> Self {
        Self {
            subscriptions: Mutex::new(SubscriptionsStore::new(Arc::clone(&store), export_options)),
            tasks: Mutex::new(TasksStore::new(Arc::clone(&store))),
            auth: Mutex::new(AuthSession::new(provider, Arc::clone(&store))),
            store,
            environment,
        }
    }
}
