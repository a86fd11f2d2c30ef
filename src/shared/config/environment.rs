use chrono_tz::Tz;
use std::path::PathBuf;

/// 表示用タイムゾーンのデフォルト（クウェート）
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Kuwait;

/// Firebase Identity Toolkit のデフォルトエンドポイント
pub const DEFAULT_AUTH_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";

/// Firestore REST API のデフォルトエンドポイント
pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// アプリケーションの実行環境を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

/// 環境設定を管理する構造体
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// 実行環境
    pub environment: String,
    /// ログレベル
    pub log_level: String,
    /// 日時表示（エクスポート等）に使うタイムゾーン
    pub timezone: Tz,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    ///
    /// # 戻り値
    /// 環境設定
    pub fn from_env() -> Self {
        let environment = get_environment();
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
            if environment == Environment::Development {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });
        let timezone = parse_timezone(std::env::var("APP_TIMEZONE").ok().as_deref());

        Self {
            environment: format!("{environment:?}").to_lowercase(),
            log_level,
            timezone,
        }
    }

    /// プロダクション環境かどうかを判定
    ///
    /// # 戻り値
    /// プロダクション環境の場合はtrue
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// タイムゾーン名を解析する
///
/// 未設定または不正な名前の場合はクウェート時間にフォールバックする。
pub fn parse_timezone(name: Option<&str>) -> Tz {
    match name {
        Some(value) => value.parse::<Tz>().unwrap_or_else(|_| {
            log::warn!("APP_TIMEZONE が不正なため、デフォルト値を使用: {value}");
            DEFAULT_TIMEZONE
        }),
        None => DEFAULT_TIMEZONE,
    }
}

/// 現在の実行環境を判定する
///
/// # 戻り値
/// 現在の実行環境（Development または Production）
///
/// # 判定ロジック
/// 1. コンパイル時埋め込み環境変数を最優先
/// 2. 実行時環境変数 ENVIRONMENT を確認
/// 3. デバッグビルドの場合は Development
/// 4. リリースビルドの場合は Production
pub fn get_environment() -> Environment {
    if let Some(embedded_env) = option_env!("EMBEDDED_ENVIRONMENT") {
        let env = match embedded_env {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
        log::debug!("環境判定: コンパイル時埋め込み値を使用 -> {embedded_env} -> {env:?}");
        return env;
    }

    if let Ok(env_var) = std::env::var("ENVIRONMENT") {
        let env = match env_var.as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
        log::debug!("環境判定: 実行時環境変数を使用 -> {env_var} -> {env:?}");
        return env;
    }

    let env = if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    };
    log::debug!(
        "環境判定: ビルド設定を使用 -> debug_assertions={} -> {env:?}",
        cfg!(debug_assertions)
    );
    env
}

/// 環境に応じたデータベースファイル名を取得する
///
/// # ファイル名の規則
/// - 開発環境: "dev_subscriptions.db"
/// - プロダクション環境: "subscriptions.db"
pub fn get_database_filename(env: Environment) -> &'static str {
    match env {
        Environment::Development => "dev_subscriptions.db",
        Environment::Production => "subscriptions.db",
    }
}

/// 環境に応じた.envファイルを読み込む
///
/// # 処理内容
/// 1. コンパイル時埋め込み環境変数をチェック
/// 2. 環境に応じた.envファイルを読み込み
/// 3. フォールバック処理
pub fn load_environment_variables() {
    if let Some(env) = option_env!("EMBEDDED_ENVIRONMENT") {
        log::info!("コンパイル時埋め込み環境設定を使用: {env}");
        return;
    }

    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let env_file = match environment.as_str() {
        "production" => ".env.production",
        _ => ".env",
    };

    log::info!("環境: {environment}, 読み込み対象: {env_file}");

    match dotenv::from_filename(env_file) {
        Ok(_) => {
            log::info!("{env_file}ファイルを読み込みました");
        }
        Err(_) => {
            if env_file != ".env" && dotenv::dotenv().is_ok() {
                log::warn!("{env_file}が見つからないため、デフォルトの.envファイルを読み込みました");
            } else {
                log::warn!("環境変数ファイルが見つかりません。直接設定された環境変数を使用します。");
            }
        }
    }
}

/// ログシステムを初期化する
///
/// 複数回呼ばれても失敗しない（テストから呼ばれる場合を考慮）。
pub fn initialize_logging_system() {
    let env_config = EnvironmentConfig::from_env();

    let log_level = match env_config.log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    let initialized = env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .is_ok();

    if initialized {
        log::info!(
            "ログシステムを初期化しました: level={}, environment={}, timezone={}",
            env_config.log_level,
            env_config.environment,
            env_config.timezone
        );
    }
}

/// コンパイル時埋め込み値 → 実行時環境変数 の順で設定値を取得する
fn read_setting(embedded: Option<&'static str>, name: &str) -> Option<String> {
    embedded
        .map(|s| {
            log::debug!("コンパイル時埋め込み{name} を使用");
            s.to_string()
        })
        .or_else(|| std::env::var(name).ok())
        .filter(|value| !value.trim().is_empty())
}

/// Firebase（Identity Toolkit / Firestore）の設定を管理する構造体
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Web APIキー
    pub api_key: String,
    /// プロジェクトID
    pub project_id: String,
    /// Identity Toolkit のベースURL
    pub auth_endpoint: String,
    /// Firestore REST のベースURL
    pub firestore_endpoint: String,
    /// HTTPタイムアウト（秒）
    pub timeout_seconds: u64,
}

impl FirebaseConfig {
    /// デフォルトのエンドポイントで設定を作成する
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            auth_endpoint: DEFAULT_AUTH_ENDPOINT.to_string(),
            firestore_endpoint: DEFAULT_FIRESTORE_ENDPOINT.to_string(),
            timeout_seconds: 30,
        }
    }

    /// エンドポイントを差し替える（エミュレータやテスト用）
    pub fn with_endpoints(mut self, auth: impl Into<String>, firestore: impl Into<String>) -> Self {
        self.auth_endpoint = auth.into();
        self.firestore_endpoint = firestore.into();
        self
    }

    /// 環境変数からFirebase設定を読み込む
    ///
    /// # 戻り値
    /// Firebase設定、または必須項目が欠けている場合はNone
    pub fn from_env() -> Option<Self> {
        log::debug!("FirebaseConfig::from_env() - 環境変数の読み込みを開始");

        let api_key = match read_setting(option_env!("EMBEDDED_FIREBASE_API_KEY"), "FIREBASE_API_KEY") {
            Some(val) => val,
            None => {
                log::error!("FIREBASE_API_KEY が見つかりません（コンパイル時埋め込み値・実行時環境変数ともに）");
                return None;
            }
        };

        let project_id = match read_setting(
            option_env!("EMBEDDED_FIREBASE_PROJECT_ID"),
            "FIREBASE_PROJECT_ID",
        ) {
            Some(val) => val,
            None => {
                log::error!("FIREBASE_PROJECT_ID が見つかりません（コンパイル時埋め込み値・実行時環境変数ともに）");
                return None;
            }
        };

        let auth_endpoint = std::env::var("FIREBASE_AUTH_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_AUTH_ENDPOINT.to_string());
        let firestore_endpoint = std::env::var("FIRESTORE_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_FIRESTORE_ENDPOINT.to_string());
        let timeout_seconds = std::env::var("HTTP_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        log::debug!("FirebaseConfig::from_env() - 設定の読み込みが完了しました");
        Some(Self {
            api_key,
            project_id,
            auth_endpoint,
            firestore_endpoint,
            timeout_seconds,
        })
    }

    /// 設定が有効かどうかを判定
    pub fn is_valid(&self) -> bool {
        !self.api_key.is_empty()
            && !self.project_id.is_empty()
            && !self.auth_endpoint.is_empty()
            && !self.firestore_endpoint.is_empty()
    }

    /// 設定を検証する
    ///
    /// # 戻り値
    /// 設定が有効な場合はOk(())、無効な場合はErr
    pub fn validate(&self) -> Result<(), String> {
        if !self.is_valid() {
            return Err("Firebase設定が不完全です".to_string());
        }
        if self.timeout_seconds == 0 {
            return Err("HTTPタイムアウトは1秒以上である必要があります".to_string());
        }
        Ok(())
    }

    /// Firestoreのドキュメントルート（`projects/{id}/databases/(default)/documents`）
    pub fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/(default)/documents",
            self.project_id
        )
    }

    /// デバッグ情報を取得（APIキーはマスクする）
    pub fn get_debug_info(&self) -> std::collections::HashMap<String, String> {
        let mut info = std::collections::HashMap::new();
        info.insert(
            "api_key".to_string(),
            format!("{}****", self.api_key.chars().take(4).collect::<String>()),
        );
        info.insert("project_id".to_string(), self.project_id.clone());
        info.insert("auth_endpoint".to_string(), self.auth_endpoint.clone());
        info.insert(
            "firestore_endpoint".to_string(),
            self.firestore_endpoint.clone(),
        );
        info
    }
}

/// ドキュメントストアの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// ローカルSQLiteファイル
    Sqlite,
    /// リモートFirestore
    Firestore,
}

impl StoreBackend {
    /// 設定値からストア種別を解析する（不明な値はSQLite）
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "firestore" => StoreBackend::Firestore,
            _ => StoreBackend::Sqlite,
        }
    }
}

/// ドキュメントストアの設定
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// 使用するストア
    pub backend: StoreBackend,
    /// SQLiteファイルのパス（未指定時はデータディレクトリ配下）
    pub database_path: Option<PathBuf>,
}

impl StoreConfig {
    /// 環境変数からストア設定を読み込む
    pub fn from_env() -> Self {
        let backend = std::env::var("STORE_BACKEND")
            .map(|v| StoreBackend::parse(&v))
            .unwrap_or(StoreBackend::Sqlite);
        let database_path = std::env::var("DATABASE_PATH").ok().map(PathBuf::from);

        log::debug!("ストア設定: backend={backend:?}, database_path={database_path:?}");
        Self {
            backend,
            database_path,
        }
    }
}

/// エクスポート関連の設定
#[derive(Debug, Clone, Default)]
pub struct ExportConfig {
    /// PDFに埋め込むTTFフォント（アラビア文字を出力する場合に指定）
    pub pdf_font_path: Option<PathBuf>,
}

impl ExportConfig {
    /// 環境変数からエクスポート設定を読み込む
    pub fn from_env() -> Self {
        Self {
            pdf_font_path: std::env::var("PDF_FONT_PATH").ok().map(PathBuf::from),
        }
    }

    /// 本番環境でPDFフォントが未設定の場合の警告
    ///
    /// 組み込みフォントではアラビア文字を出力できないため、本番では指定を推奨する。
    pub fn production_warning(&self, is_production: bool) -> Option<String> {
        match (&self.pdf_font_path, is_production) {
            (None, true) => Some(
                "PDF_FONT_PATH が未設定です。PDF出力のアラビア文字は `?` になります".to_string(),
            ),
            (Some(path), true) if !path.is_file() => Some(format!(
                "PDF_FONT_PATH のフォントが見つかりません: {}",
                path.display()
            )),
            _ => None,
        }
    }
}
