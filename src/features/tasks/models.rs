use crate::shared::utils::serde_dates;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// タスクの進捗状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    InProgress,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::InProgress => "in-progress",
        }
    }
}

/// スケジュールの決め方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingType {
    /// 期間内に均等配置する
    #[default]
    Automatic,
    /// 期日を担当者が決める
    Manual,
}

/// サービス区分（4種類固定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Website,
    Design,
    Management,
    Advertising,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Website => "website",
            ServiceCategory::Design => "design",
            ServiceCategory::Management => "management",
            ServiceCategory::Advertising => "advertising",
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// タスクデータモデル
///
/// 自動タスクは `tasks` コレクションの独立したドキュメント、
/// 手動タスクは購読ドキュメントの `manualTasks` に埋め込まれる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub description: String,
    pub client_id: String,
    pub client_name: String,
    pub subscription_id: String,
    #[serde(default, with = "serde_dates::optional_date")]
    pub due_date: Option<NaiveDate>, // 手動タスクは未設定（空文字列）
    #[serde(default)]
    pub status: TaskStatus,
    pub service_category: ServiceCategory,
    pub service_type: String,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub scheduling_type: SchedulingType,
    #[serde(
        default,
        with = "serde_dates::optional_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// 完了済みかどうか
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// 担当者の達成度評価
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceRating {
    Excellent,
    Good,
    Weak,
}
