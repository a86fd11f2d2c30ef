/// タスク機能モジュール
///
/// - 購読期間に均等配置する自動タスクの生成
/// - 手動タスクのプレースホルダー生成
/// - `tasks` コレクションの読み込み・状態更新・論理削除
/// - 顧客ごとの達成度評価
pub mod commands;
pub mod generator;
pub mod models;
pub mod repository;

pub use generator::{generate, manual_placeholders, TaskSchedule};
pub use models::{PerformanceRating, SchedulingType, ServiceCategory, Task, TaskStatus};
pub use repository::{calculate_performance, TasksStore};
