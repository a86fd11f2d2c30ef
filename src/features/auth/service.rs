use super::identity::{IdentityProvider, LOGIN_FAILED};
use super::models::{AuthState, AuthTokens, UserProfile};
use crate::shared::database::collections::USERS;
use crate::shared::database::{codec, DocumentStore};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::status::OperationStatus;
use std::sync::Arc;

/// プロフィールを読み込めない場合のメッセージ
pub const PROFILE_LOAD_FAILED: &str = "فشل في تحميل ملف تعريف المستخدم.";
/// サインアウトの失敗
pub const LOGOUT_FAILED: &str = "فشل تسجيل الخروج.";

/// 認証状態のコンテナ
///
/// サインインに成功したらIDトークンをストアに渡し、`users/{uid}` のプロフィールを読み込む。
/// プロフィールが無い場合はサインアウトしてエラーにする。
pub struct AuthSession {
    provider: Option<Arc<dyn IdentityProvider>>,
    store: Arc<dyn DocumentStore>,
    user: Option<UserProfile>,
    tokens: Option<AuthTokens>,
    status: OperationStatus,
}

impl AuthSession {
    /// 認証セッションを作成する
    ///
    /// # 引数
    /// * `provider` - IDプロバイダー（未設定の場合はサインインできない）
    /// * `store` - プロフィールを読むドキュメントストア
    pub fn new(provider: Option<Arc<dyn IdentityProvider>>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            provider,
            store,
            user: None,
            tokens: None,
            status: OperationStatus::default(),
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn status(&self) -> &OperationStatus {
        &self.status
    }

    /// 画面用の認証状態
    pub fn state(&self) -> AuthState {
        AuthState {
            user: self.user.clone(),
            is_authenticated: self.is_authenticated(),
            is_loading: self.status.is_loading,
            error: self.status.error.clone(),
        }
    }

    /// メールアドレスとパスワードでサインインする
    ///
    /// # 戻り値
    /// プロフィールまで読み込めた場合はtrue
    pub async fn login(&mut self, email: &str, password: &str) -> bool {
        self.status.begin();

        let Some(provider) = self.provider.clone() else {
            let error = AppError::configuration("IDプロバイダーが設定されていません");
            self.status.fail(&error, LOGIN_FAILED);
            return false;
        };

        let tokens = match provider.sign_in(email, password).await {
            Ok(tokens) => tokens,
            Err(e) => {
                self.status.fail(&e, LOGIN_FAILED);
                return false;
            }
        };

        self.store.set_auth_token(Some(tokens.id_token.clone()));
        match self.load_profile(&tokens.local_id).await {
            Ok(profile) => {
                log::info!("ユーザープロフィールを読み込みました: uid={}", profile.id);
                self.user = Some(profile);
                self.tokens = Some(tokens);
                self.status.finish();
                true
            }
            Err(e) => {
                log::error!(
                    "プロフィールが読み込めないためサインアウトします: uid={}, {}",
                    tokens.local_id,
                    e.details()
                );
                if let Err(sign_out_error) = provider.sign_out(&tokens).await {
                    log::warn!("サインアウトに失敗しました: {}", sign_out_error.details());
                }
                self.clear();
                self.status
                    .fail(&AppError::authentication(PROFILE_LOAD_FAILED), LOGIN_FAILED);
                false
            }
        }
    }

    /// サインアウトする
    pub async fn logout(&mut self) -> bool {
        self.status.begin();

        if let (Some(provider), Some(tokens)) = (self.provider.clone(), self.tokens.as_ref()) {
            if let Err(e) = provider.sign_out(tokens).await {
                self.status.fail(&e, LOGOUT_FAILED);
                return false;
            }
        }

        self.clear();
        self.status.finish();
        log::info!("サインアウトしました");
        true
    }

    async fn load_profile(&self, uid: &str) -> AppResult<UserProfile> {
        let document = self
            .store
            .get(USERS, uid)
            .await?
            .ok_or_else(|| AppError::not_found(format!("users/{uid}")))?;
        codec::decode(&document)
    }

    fn clear(&mut self) {
        self.store.set_auth_token(None);
        self.user = None;
        self.tokens = None;
    }
}
