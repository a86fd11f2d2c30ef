//! コレクション名

/// 有効な購読
pub const SUBSCRIPTIONS: &str = "subscriptions";

/// 削除済み（ごみ箱）の購読
pub const RECYCLED_SUBSCRIPTIONS: &str = "recycledSubscriptions";

/// 購読から生成されたタスク
pub const TASKS: &str = "tasks";

/// ユーザープロファイル（ドキュメントID = 認証UID）
pub const USERS: &str = "users";
