/// 認証機能モジュール
///
/// - Firebase Identity Toolkit によるメールアドレス・パスワード認証
/// - `users/{uid}` のプロフィール読み込み
/// - IDトークンのドキュメントストアへの受け渡し
pub mod commands;
pub mod identity;
pub mod models;
pub mod service;

pub use identity::{FirebaseIdentityClient, IdentityProvider};
pub use models::{AuthState, AuthTokens, UserProfile};
pub use service::AuthSession;
