use super::models::{SchedulingType, ServiceCategory, Task, TaskStatus};
use crate::shared::utils::dates::{days_between, parse_date};
use crate::shared::utils::ids::generate_suffix;
use chrono::Days;

/// 1回の生成で作るタスク数の上限（120か月 × 月1000件）
pub const MAX_INSTANCES: i64 = 120_000;

/// タスク生成の入力
#[derive(Debug, Clone)]
pub struct TaskSchedule<'a> {
    pub subscription_id: &'a str,
    pub client_id: &'a str,
    pub client_name: &'a str,
    pub category: ServiceCategory,
    pub service_type: &'a str,
    /// 生成する件数（0以下なら何も生成しない）
    pub total_instances: i64,
    pub start_date: &'a str,
    pub end_date: &'a str,
    /// 説明文の先頭部分（末尾に「i من n」が付く）
    pub description_template: &'a str,
}

/// 期間内に均等な間隔で自動タスクを生成する
///
/// 間隔は `max(1, floor(期間日数 / 件数))`。件数が日数を上回ると間隔は1日になり、
/// 後ろのタスクは期間終了日を越えて並ぶ。
///
/// # 引数
/// * `schedule` - 生成条件
///
/// # 戻り値
/// 生成されたタスク。入力が不正な場合は空（ログのみ出力）
pub fn generate(schedule: &TaskSchedule<'_>) -> Vec<Task> {
    if schedule.subscription_id.is_empty()
        || schedule.client_id.is_empty()
        || schedule.start_date.is_empty()
        || schedule.end_date.is_empty()
    {
        log::error!(
            "タスク生成の必須パラメータが不足しています: subscription_id={}, client_id={}",
            schedule.subscription_id,
            schedule.client_id
        );
        return Vec::new();
    }

    if schedule.total_instances <= 0 {
        return Vec::new();
    }
    if schedule.total_instances > MAX_INSTANCES {
        log::error!(
            "タスク件数が上限を超えています: subscription_id={}, total={}",
            schedule.subscription_id,
            schedule.total_instances
        );
        return Vec::new();
    }

    let (Some(start), Some(end)) = (parse_date(schedule.start_date), parse_date(schedule.end_date))
    else {
        log::error!(
            "タスク生成の日付形式が不正です: start={}, end={}",
            schedule.start_date,
            schedule.end_date
        );
        return Vec::new();
    };

    if start > end {
        log::error!("開始日が終了日より後です: start={start}, end={end}");
        return Vec::new();
    }

    let total = schedule.total_instances;
    let interval = (days_between(start, end) / total).max(1);

    let mut tasks = Vec::new();
    for i in 0..total {
        let offset = i.checked_mul(interval).and_then(|o| u64::try_from(o).ok());
        let Some(due_date) = offset.and_then(|o| start.checked_add_days(Days::new(o))) else {
            log::error!("期日の計算が範囲外です: start={start}, index={i}, interval={interval}");
            return Vec::new();
        };

        tasks.push(Task {
            id: format!(
                "{}-{}-{}-{i}-{}",
                schedule.subscription_id,
                schedule.category,
                schedule.service_type,
                generate_suffix()
            ),
            description: format!(
                "{} - {} من {total}",
                schedule.description_template,
                i + 1
            ),
            client_id: schedule.client_id.to_string(),
            client_name: schedule.client_name.to_string(),
            subscription_id: schedule.subscription_id.to_string(),
            due_date: Some(due_date),
            status: TaskStatus::Pending,
            service_category: schedule.category,
            service_type: schedule.service_type.to_string(),
            is_deleted: false,
            scheduling_type: SchedulingType::Automatic,
            completed_at: None,
        });
    }

    log::debug!(
        "自動タスクを生成しました: subscription_id={}, category={}, count={total}, interval={interval}",
        schedule.subscription_id,
        schedule.category
    );
    tasks
}

/// 手動スケジュール用のプレースホルダータスクを生成する
///
/// 期日は設定せず、件数と番号だけを自動タスクと揃える。日付は参照しない。
pub fn manual_placeholders(schedule: &TaskSchedule<'_>) -> Vec<Task> {
    if schedule.total_instances <= 0 || schedule.total_instances > MAX_INSTANCES {
        return Vec::new();
    }

    let total = schedule.total_instances;
    let prefix = match schedule.category {
        ServiceCategory::Management => "mgmt",
        other => other.as_str(),
    };

    (1..=total)
        .map(|n| Task {
            id: format!(
                "{}-manual-{prefix}-{}-{n}",
                schedule.subscription_id, schedule.service_type
            ),
            description: format!(
                "مهمة يدوية: {} - {n} من {total}",
                schedule.description_template
            ),
            client_id: schedule.client_id.to_string(),
            client_name: schedule.client_name.to_string(),
            subscription_id: schedule.subscription_id.to_string(),
            due_date: None,
            status: TaskStatus::Pending,
            service_category: schedule.category,
            service_type: schedule.service_type.to_string(),
            is_deleted: false,
            scheduling_type: SchedulingType::Manual,
            completed_at: None,
        })
        .collect()
}
