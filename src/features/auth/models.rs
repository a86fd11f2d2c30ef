use serde::{Deserialize, Serialize};

/// `users/{uid}` に保存されているユーザープロフィール
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// FirebaseのUID（ドキュメントID）
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    /// 表示名
    #[serde(default, alias = "name")]
    pub display_name: String,
    /// 権限（`admin` など）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// サインインで得られる資格情報
#[derive(Debug, Clone, PartialEq)]
pub struct AuthTokens {
    /// ユーザーのUID
    pub local_id: String,
    pub email: String,
    /// Firestoreへのリクエストに付けるIDトークン
    pub id_token: String,
    pub refresh_token: String,
    /// IDトークンの有効期間（秒）
    pub expires_in: u64,
}

/// 画面に渡す認証状態
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}
