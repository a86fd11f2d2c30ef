use super::models::AuthState;
use crate::AppState;

/// サインインする
///
/// # 引数
/// * `email` - メールアドレス
/// * `password` - パスワード
/// * `state` - アプリケーション状態
///
/// # 戻り値
/// サインイン後の認証状態、または失敗時はエラーメッセージ
pub async fn login(email: String, password: String, state: &AppState) -> Result<AuthState, String> {
    let mut auth = state.auth.lock().await;
    auth.login(&email, &password).await;
    auth.status().check()?;
    Ok(auth.state())
}

/// サインアウトする
pub async fn logout(state: &AppState) -> Result<(), String> {
    let mut auth = state.auth.lock().await;
    auth.logout().await;
    auth.status().check()
}

/// 現在の認証状態を取得する
pub async fn get_auth_state(state: &AppState) -> Result<AuthState, String> {
    Ok(state.auth.lock().await.state())
}
