use super::models::AuthTokens;
use crate::shared::config::FirebaseConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::rest_client::{RestClient, SendError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// メールアドレスまたはパスワードが誤っている
pub const INVALID_CREDENTIALS: &str = "البريد الإلكتروني أو كلمة المرور غير صحيحة.";
/// メールアドレスの形式が不正
pub const INVALID_EMAIL: &str = "صيغة البريد الإلكتروني غير صحيحة.";
/// その他のサインイン失敗
pub const LOGIN_FAILED: &str =
    "فشل تسجيل الدخول. يرجى التحقق من البريد الإلكتروني وكلمة المرور.";

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("メールアドレスの正規表現が不正です"));

/// メールアドレスの形式を検証する
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email.trim())
}

/// メールアドレスとパスワードで認証するIDプロバイダー
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// サインインする
    ///
    /// 失敗した場合は画面表示用のメッセージを持つ認証エラーを返す。
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthTokens>;

    /// サインアウトする（サーバー側の処理が不要なプロバイダーでは何もしない）
    async fn sign_out(&self, _tokens: &AuthTokens) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: String,
}

/// Firebase Identity Toolkit（`accounts:signInWithPassword`）のクライアント
pub struct FirebaseIdentityClient {
    client: RestClient,
    api_key: String,
}

impl FirebaseIdentityClient {
    pub fn new(config: &FirebaseConfig) -> AppResult<Self> {
        config.validate().map_err(AppError::configuration)?;

        Ok(Self {
            client: RestClient::new(&config.auth_endpoint, config.timeout_seconds)?,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityClient {
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthTokens> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AppError::authentication(INVALID_EMAIL));
        }

        let request = SignInRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response: SignInResponse = self
            .client
            .post(
                "/accounts:signInWithPassword",
                &[("key", self.api_key.as_str())],
                &request,
                None,
            )
            .await
            .map_err(map_sign_in_error)?;

        log::info!("サインインしました: uid={}", response.local_id);
        Ok(AuthTokens {
            local_id: response.local_id,
            email: response.email,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in.parse().unwrap_or(0),
        })
    }
}

/// Identity Toolkitのエラーコードを表示用メッセージに変換する
///
/// メッセージは `INVALID_PASSWORD` や `TOO_MANY_ATTEMPTS_TRY_LATER : ...` の形で返る。
fn map_sign_in_error(error: SendError) -> AppError {
    match error {
        SendError::Status(failure) => {
            let code = failure
                .message
                .split([' ', ':'])
                .next()
                .unwrap_or_default();
            log::warn!("サインインに失敗しました: status={}, code={code}", failure.status);
            match code {
                "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                    AppError::authentication(INVALID_CREDENTIALS)
                }
                "INVALID_EMAIL" => AppError::authentication(INVALID_EMAIL),
                _ => AppError::authentication(LOGIN_FAILED),
            }
        }
        SendError::Transport(e) => {
            log::error!("サインイン要求を送信できません: {}", e.details());
            AppError::authentication(LOGIN_FAILED)
        }
    }
}
