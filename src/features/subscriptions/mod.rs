/// 購読機能モジュール
///
/// - フォーム入力の検証と集計（合計金額・終了日・区分・タスク）
/// - サービス区分の数による区分判定
/// - 購読とタスクの一括保存、ごみ箱への移動と復元
/// - エクスポート・インポート
pub mod aggregator;
pub mod commands;
pub mod models;
pub mod repository;
pub mod tier;

#[cfg(test)]
mod integration_tests;

pub use aggregator::{aggregate, AggregatedSubscription, SubscriptionDraft};
pub use models::{Platform, Subscription, SubscriptionForm, SubscriptionStatus, Tier};
pub use repository::SubscriptionsStore;
pub use tier::classify;
