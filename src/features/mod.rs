/// 機能別モジュール
///
/// 各機能モジュールは、その機能に関連するモデル・状態コンテナ・コマンドを含む。
pub mod auth;
pub mod export;
pub mod subscriptions;
pub mod tasks;
