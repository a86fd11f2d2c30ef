use super::models::{
    join_platforms, AdvertisingService, DesignService, EmailCredential, ManagementService,
    SubscriptionForm, SubscriptionStatus, Tier, WebsiteService,
};
use super::tier::classify;
use crate::features::tasks::generator::{generate, manual_placeholders, TaskSchedule};
use crate::features::tasks::models::{SchedulingType, ServiceCategory, Task};
use crate::shared::utils::dates::{add_months, format_date, now_millis, parse_date};
use chrono::{DateTime, Utc};

/// 保存前の購読
///
/// 日付はフォームの文字列のまま保持する。開始日を解析できなかった場合の終了日は空文字列で、
/// 保存時に拒否される。
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionDraft {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub client_phone: String,
    pub duration: u32,
    pub start_date: String,
    pub end_date: String,
    pub total_price: f64,
    pub email_credentials: Vec<EmailCredential>,
    pub website_services: Vec<WebsiteService>,
    pub design_services: Vec<DesignService>,
    pub management_services: Vec<ManagementService>,
    pub advertising_services: Vec<AdvertisingService>,
    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
}

/// 集計結果
#[derive(Debug, Clone)]
pub struct AggregatedSubscription {
    pub draft: SubscriptionDraft,
    /// `tasks` コレクションに保存する自動タスク
    pub automatic_tasks: Vec<Task>,
    /// 購読に埋め込む手動タスク
    pub manual_tasks: Vec<Task>,
}

/// 開始日に暦月を加算して終了日を求める
///
/// # 戻り値
/// `YYYY-MM-DD` 形式の終了日。開始日を解析できない場合は空文字列
pub fn calculate_end_date(start_date: &str, duration_months: u32) -> String {
    let end = parse_date(start_date).and_then(|start| add_months(start, duration_months));
    match end {
        Some(end) => format_date(end),
        None => {
            log::error!("終了日を計算できません: start_date={start_date}, duration={duration_months}");
            String::new()
        }
    }
}

/// 合計金額を求める
///
/// ウェブサイトと広告は固定料金（広告予算は含めない）、デザインと運用は
/// 単価 × 月間件数 × 期間。
pub fn calculate_total_price(form: &SubscriptionForm) -> f64 {
    let duration = f64::from(form.duration);

    let website: f64 = form.website_services.iter().map(|s| s.price).sum();
    let design: f64 = form
        .design_services
        .iter()
        .map(|s| s.price * f64::from(s.monthly_instances) * duration)
        .sum();
    let management: f64 = form
        .management_services
        .iter()
        .map(|s| s.price * f64::from(s.monthly_updates) * duration)
        .sum();
    let advertising: f64 = form.advertising_services.iter().map(|s| s.price).sum();

    website + design + management + advertising
}

/// フォーム入力から購読とタスクを組み立てる
///
/// # 引数
/// * `form` - 検証済みのフォーム入力
/// * `subscription_id` - 新しい購読のID
///
/// # 戻り値
/// 保存前の購読と、自動タスク・手動タスク
pub fn aggregate(form: &SubscriptionForm, subscription_id: &str) -> AggregatedSubscription {
    let end_date = calculate_end_date(&form.start_date, form.duration);

    let mut automatic_tasks = Vec::new();
    let mut manual_tasks = Vec::new();

    for service in &form.design_services {
        let description = format!(
            "تصميم {} ({})",
            service.service_type,
            join_platforms(&service.platforms)
        );
        let schedule = TaskSchedule {
            subscription_id,
            client_id: &form.client_id,
            client_name: &form.client_name,
            category: ServiceCategory::Design,
            service_type: &service.service_type,
            total_instances: instance_total(service.monthly_instances, form.duration),
            start_date: &form.start_date,
            end_date: &end_date,
            description_template: &description,
        };
        split_by_scheduling(service.scheduling_type, &schedule, &mut automatic_tasks, &mut manual_tasks);
    }

    for service in &form.management_services {
        let description = format!(
            "إدارة {} ({})",
            service.service_type,
            join_platforms(&service.platforms)
        );
        let schedule = TaskSchedule {
            subscription_id,
            client_id: &form.client_id,
            client_name: &form.client_name,
            category: ServiceCategory::Management,
            service_type: &service.service_type,
            total_instances: instance_total(service.monthly_updates, form.duration),
            start_date: &form.start_date,
            end_date: &end_date,
            description_template: &description,
        };
        split_by_scheduling(service.scheduling_type, &schedule, &mut automatic_tasks, &mut manual_tasks);
    }

    let draft = SubscriptionDraft {
        id: subscription_id.to_string(),
        client_id: form.client_id.clone(),
        client_name: form.client_name.clone(),
        client_phone: form.client_phone.clone(),
        duration: form.duration,
        start_date: form.start_date.clone(),
        end_date,
        total_price: calculate_total_price(form),
        email_credentials: form.email_credentials.clone(),
        website_services: form.website_services.clone(),
        design_services: form.design_services.clone(),
        management_services: form.management_services.clone(),
        advertising_services: form.advertising_services.clone(),
        tier: classify(
            &form.website_services,
            &form.design_services,
            &form.management_services,
            &form.advertising_services,
        ),
        status: SubscriptionStatus::Active,
        created_at: now_millis(),
    };

    log::info!(
        "購読を集計しました: id={subscription_id}, tier={}, automatic={}, manual={}",
        draft.tier,
        automatic_tasks.len(),
        manual_tasks.len()
    );

    AggregatedSubscription {
        draft,
        automatic_tasks,
        manual_tasks,
    }
}

/// 月間件数 × 期間。桁あふれする場合は0（タスクを生成しない）
fn instance_total(monthly: u32, duration: u32) -> i64 {
    i64::from(monthly)
        .checked_mul(i64::from(duration))
        .unwrap_or_else(|| {
            log::error!("タスク件数が大きすぎます: monthly={monthly}, duration={duration}");
            0
        })
}

fn split_by_scheduling(
    scheduling_type: SchedulingType,
    schedule: &TaskSchedule<'_>,
    automatic: &mut Vec<Task>,
    manual: &mut Vec<Task>,
) {
    match scheduling_type {
        SchedulingType::Automatic => automatic.extend(generate(schedule)),
        SchedulingType::Manual => manual.extend(manual_placeholders(schedule)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::subscriptions::models::Platform;

    fn design_form(scheduling_type: SchedulingType) -> SubscriptionForm {
        SubscriptionForm {
            client_id: "client-1".to_string(),
            client_name: "شركة النور".to_string(),
            client_phone: "+96550000000".to_string(),
            duration: 3,
            start_date: "2024-01-01".to_string(),
            design_services: vec![DesignService {
                service_type: "post".to_string(),
                price: 5.0,
                monthly_instances: 2,
                scheduling_type,
                platforms: vec![Platform::Facebook, Platform::Instagram],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_calculate_end_date() {
        assert_eq!(calculate_end_date("2024-01-01", 3), "2024-04-01");
        assert_eq!(calculate_end_date("2024-01-31", 1), "2024-02-29");
        assert_eq!(calculate_end_date("2024-01-01T00:00:00.000Z", 12), "2025-01-01");
        assert_eq!(calculate_end_date("not a date", 3), "");
    }

    #[test]
    fn test_total_price_excludes_budget() {
        let form = SubscriptionForm {
            duration: 2,
            website_services: vec![WebsiteService {
                service_type: "landing".to_string(),
                price: 100.0,
            }],
            management_services: vec![ManagementService {
                service_type: "reels".to_string(),
                price: 3.0,
                monthly_updates: 4,
                scheduling_type: SchedulingType::Automatic,
                platforms: vec![],
            }],
            advertising_services: vec![AdvertisingService {
                service_type: "campaign".to_string(),
                price: 40.0,
                platforms: vec![Platform::Google],
                budget: 1000.0,
            }],
            ..design_form(SchedulingType::Automatic)
        };
        // 100 + 5*2*2 + 3*4*2 + 40
        assert_eq!(calculate_total_price(&form), 184.0);
    }

    #[test]
    fn test_automatic_design_generates_tasks() {
        let result = aggregate(&design_form(SchedulingType::Automatic), "sub-1");

        assert_eq!(result.draft.end_date, "2024-04-01");
        assert_eq!(result.draft.total_price, 30.0);
        assert_eq!(result.draft.tier, Tier::Regular);
        assert_eq!(result.draft.status, SubscriptionStatus::Active);
        assert_eq!(result.automatic_tasks.len(), 6);
        assert!(result.manual_tasks.is_empty());
        assert_eq!(
            result.automatic_tasks[0].description,
            "تصميم post (facebook, instagram) - 1 من 6"
        );
    }

    #[test]
    fn test_manual_design_bypasses_generator() {
        let result = aggregate(&design_form(SchedulingType::Manual), "sub-1");

        assert!(result.automatic_tasks.is_empty());
        assert_eq!(result.manual_tasks.len(), 6);
        assert!(result.manual_tasks.iter().all(|t| t.due_date.is_none()));
        assert_eq!(result.manual_tasks[0].id, "sub-1-manual-design-post-1");
    }

    #[test]
    fn test_oversized_counts_produce_no_tasks() {
        let mut form = design_form(SchedulingType::Automatic);
        form.duration = u32::MAX;
        form.design_services[0].monthly_instances = u32::MAX;

        let result = aggregate(&form, "sub-1");
        assert!(result.automatic_tasks.is_empty());
        assert!(result.manual_tasks.is_empty());
        assert_eq!(instance_total(u32::MAX, u32::MAX), 0);
        assert_eq!(instance_total(2, 3), 6);
    }

    #[test]
    fn test_unparseable_start_fails_soft() {
        let mut form = design_form(SchedulingType::Automatic);
        form.start_date = "01/02/2024".to_string();
        let result = aggregate(&form, "sub-1");

        assert_eq!(result.draft.end_date, "");
        assert!(result.automatic_tasks.is_empty());
    }
}
