//! 汎用RESTクライアント
//!
//! Google系REST API（Identity Toolkit / Firestore）との通信に使う。
//! 失敗したリクエストは再試行せず、そのままエラーとして返す。
use crate::shared::errors::AppError;
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// Google APIのエラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// 失敗したリクエストの情報
#[derive(Debug, Clone)]
pub struct RequestFailure {
    /// HTTPステータス
    pub status: u16,
    /// サーバーが返したメッセージ（例: `EMAIL_NOT_FOUND`）
    pub message: String,
    /// gRPCステータス名（例: `ALREADY_EXISTS`）
    pub status_name: Option<String>,
}

impl RequestFailure {
    /// 外部サービスエラーに変換する
    pub fn into_app_error(self, service: &str) -> AppError {
        AppError::external_service(
            service.to_string(),
            format!(
                "HTTP {} {} {}",
                self.status,
                self.status_name.as_deref().unwrap_or("-"),
                self.message
            ),
        )
    }
}

/// リクエスト送信結果
#[derive(Debug)]
pub enum SendError {
    /// 接続・解析エラー
    Transport(AppError),
    /// サーバーがエラーステータスを返した
    Status(RequestFailure),
}

impl SendError {
    /// AppErrorに変換する
    pub fn into_app_error(self, service: &str) -> AppError {
        match self {
            SendError::Transport(error) => error,
            SendError::Status(failure) => failure.into_app_error(service),
        }
    }
}

/// 汎用RESTクライアント
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    /// 新しいクライアントを作成
    ///
    /// # 引数
    /// * `base_url` - ベースURL（末尾の`/`は取り除く）
    /// * `timeout_seconds` - リクエストタイムアウト
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTPクライアント初期化失敗: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// ベースURL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GETリクエストを送信
    pub async fn get<T>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        auth_token: Option<&str>,
    ) -> Result<T, SendError>
    where
        T: DeserializeOwned,
    {
        debug!("GETリクエスト送信: endpoint={endpoint}");

        let url = format!("{}{endpoint}", self.base_url);
        let request = with_auth(self.client.get(&url).query(query), auth_token);

        self.send(request, "GET", endpoint).await
    }

    /// POSTリクエストを送信
    pub async fn post<B, T>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        body: &B,
        auth_token: Option<&str>,
    ) -> Result<T, SendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POSTリクエスト送信: endpoint={endpoint}");

        let url = format!("{}{endpoint}", self.base_url);
        let request = with_auth(self.client.post(&url).query(query).json(body), auth_token);

        self.send(request, "POST", endpoint).await
    }

    async fn send<T>(
        &self,
        request: RequestBuilder,
        method: &str,
        endpoint: &str,
    ) -> Result<T, SendError>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await.map_err(|e| {
            SendError::Transport(AppError::ExternalService(format!(
                "サーバーへの接続に失敗しました: {e}"
            )))
        })?;

        if !response.status().is_success() {
            return Err(SendError::Status(handle_error_response(response).await));
        }

        let result: T = response.json().await.map_err(|e| {
            SendError::Transport(AppError::ExternalService(format!(
                "レスポンス解析エラー: {e}"
            )))
        })?;

        info!("{method}リクエスト成功: endpoint={endpoint}");
        Ok(result)
    }
}

fn with_auth(request: RequestBuilder, auth_token: Option<&str>) -> RequestBuilder {
    match auth_token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// エラーレスポンスを解析する
async fn handle_error_response(response: Response) -> RequestFailure {
    let status = response.status().as_u16();
    let response_text = response
        .text()
        .await
        .unwrap_or_else(|_| "レスポンス読み取り失敗".to_string());

    if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&response_text) {
        debug!(
            "構造化エラーレスポンスを受信: status={status}, message={}",
            error_response.error.message
        );
        return RequestFailure {
            status,
            message: error_response.error.message,
            status_name: error_response.error.status,
        };
    }

    warn!("非構造化エラーレスポンス: status={status}, body={response_text}");
    RequestFailure {
        status,
        message: response_text,
        status_name: None,
    }
}
