use crate::features::tasks::models::{SchedulingType, Task};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::serde_dates;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 購読の区分（利用しているサービス区分の数で決まる）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Gold,
    Silver,
    Bronze,
    Regular,
}

impl Tier {
    /// 上位から順の全区分
    pub const ALL: [Tier; 4] = [Tier::Gold, Tier::Silver, Tier::Bronze, Tier::Regular];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Gold => "gold",
            Tier::Silver => "silver",
            Tier::Bronze => "bronze",
            Tier::Regular => "regular",
        }
    }

    /// 表示名
    pub fn arabic_label(&self) -> &'static str {
        match self {
            Tier::Gold => "ذهبي",
            Tier::Silver => "فضي",
            Tier::Bronze => "برونزي",
            Tier::Regular => "عادي",
        }
    }

    /// 文字列から区分を得る（大文字小文字は区別しない）
    pub fn parse(value: &str) -> Option<Self> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 購読の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Deleted,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Deleted => "deleted",
        }
    }

    pub fn arabic_label(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "نشط",
            SubscriptionStatus::Deleted => "محذوف",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "active" => Some(SubscriptionStatus::Active),
            "deleted" => Some(SubscriptionStatus::Deleted),
            _ => None,
        }
    }
}

/// SNSなどの配信先
///
/// 既知の値以外（インポートされた独自タグなど）は `Other` に入る。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Facebook,
    Instagram,
    Twitter,
    Tiktok,
    Snapchat,
    Linkedin,
    Youtube,
    Google,
    Other(String),
}

impl Platform {
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::Tiktok => "tiktok",
            Platform::Snapchat => "snapchat",
            Platform::Linkedin => "linkedin",
            Platform::Youtube => "youtube",
            Platform::Google => "google",
            Platform::Other(tag) => tag,
        }
    }
}

impl From<String> for Platform {
    fn from(value: String) -> Self {
        match value.as_str() {
            "facebook" => Platform::Facebook,
            "instagram" => Platform::Instagram,
            "twitter" => Platform::Twitter,
            "tiktok" => Platform::Tiktok,
            "snapchat" => Platform::Snapchat,
            "linkedin" => Platform::Linkedin,
            "youtube" => Platform::Youtube,
            "google" => Platform::Google,
            _ => Platform::Other(value),
        }
    }
}

impl From<Platform> for String {
    fn from(value: Platform) -> Self {
        match value {
            Platform::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// 配信先を `, ` 区切りで連結する（タスク説明文用）
pub fn join_platforms(platforms: &[Platform]) -> String {
    platforms
        .iter()
        .map(Platform::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// ウェブサイトサービス（固定料金）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebsiteService {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub price: f64,
}

/// デザインサービス（単価 × 月間制作数 × 期間）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignService {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub monthly_instances: u32,
    #[serde(default)]
    pub scheduling_type: SchedulingType,
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

/// 運用サービス（単価 × 月間更新数 × 期間）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementService {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub monthly_updates: u32,
    #[serde(default)]
    pub scheduling_type: SchedulingType,
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

/// 広告サービス（固定料金。広告予算は合計に含めない）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvertisingService {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub budget: f64,
}

/// 購読に添付するメールアカウント情報
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailCredential {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// 購読期間の上限（月）
pub const MAX_DURATION_MONTHS: u32 = 120;

/// 1サービスあたりの月間制作数・更新数の上限
pub const MAX_MONTHLY_COUNT: u32 = 1000;

/// 購読データモデル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub client_id: String,
    pub client_name: String,
    #[serde(default)]
    pub client_phone: String,
    pub duration: u32, // 月数
    #[serde(with = "serde_dates::date")]
    pub start_date: NaiveDate,
    #[serde(with = "serde_dates::date")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub email_credentials: Vec<EmailCredential>,
    #[serde(default)]
    pub website_services: Vec<WebsiteService>,
    #[serde(default)]
    pub design_services: Vec<DesignService>,
    #[serde(default)]
    pub management_services: Vec<ManagementService>,
    #[serde(default)]
    pub advertising_services: Vec<AdvertisingService>,
    #[serde(default)]
    pub manual_tasks: Vec<Task>,
    pub tier: Tier,
    #[serde(default)]
    pub status: SubscriptionStatus,
    #[serde(with = "serde_dates::datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        with = "serde_dates::optional_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_at: Option<DateTime<Utc>>,
    /// ごみ箱へ移動した際に退避した自動タスク（復元時に `tasks` へ戻す）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub archived_tasks: Vec<Task>,
}

impl Subscription {
    /// 有効な購読かどうか
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}

/// 購読登録フォームの入力
///
/// サービス区分ごとに型の決まったレコードを持ち、集計の前に `validate` で検証する。
/// 開始日は文字列のまま受け取り、解析は集計・保存時に行う。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionForm {
    pub client_id: String,
    pub client_name: String,
    #[serde(default)]
    pub client_phone: String,
    pub duration: u32,
    pub start_date: String,
    #[serde(default)]
    pub email_credentials: Vec<EmailCredential>,
    #[serde(default)]
    pub website_services: Vec<WebsiteService>,
    #[serde(default)]
    pub design_services: Vec<DesignService>,
    #[serde(default)]
    pub management_services: Vec<ManagementService>,
    #[serde(default)]
    pub advertising_services: Vec<AdvertisingService>,
}

impl SubscriptionForm {
    /// フォーム入力を検証する
    ///
    /// # 戻り値
    /// 検証成功時はOk(())、失敗時は表示用メッセージを持つバリデーションエラー
    pub fn validate(&self) -> AppResult<()> {
        if self.client_id.trim().is_empty() || self.client_name.trim().is_empty() {
            return Err(AppError::validation("يرجى اختيار العميل."));
        }

        if self.duration == 0 {
            return Err(AppError::validation("يجب أن تكون مدة الاشتراك شهراً واحداً على الأقل."));
        }
        if self.duration > MAX_DURATION_MONTHS {
            return Err(AppError::validation(format!(
                "لا يمكن أن تتجاوز مدة الاشتراك {MAX_DURATION_MONTHS} شهراً."
            )));
        }

        let prices = self
            .website_services
            .iter()
            .map(|s| (s.service_type.as_str(), s.price))
            .chain(self.design_services.iter().map(|s| (s.service_type.as_str(), s.price)))
            .chain(
                self.management_services
                    .iter()
                    .map(|s| (s.service_type.as_str(), s.price)),
            )
            .chain(
                self.advertising_services
                    .iter()
                    .map(|s| (s.service_type.as_str(), s.price)),
            );
        for (service_type, price) in prices {
            if service_type.trim().is_empty() {
                return Err(AppError::validation("نوع الخدمة مطلوب."));
            }
            if !price.is_finite() || price < 0.0 {
                return Err(AppError::validation(format!(
                    "سعر الخدمة {service_type} غير صالح."
                )));
            }
        }

        if let Some(service) = self.design_services.iter().find(|s| s.monthly_instances == 0) {
            return Err(AppError::validation(format!(
                "يجب تحديد عدد التصاميم الشهرية للخدمة {}.",
                service.service_type
            )));
        }
        if let Some(service) = self
            .design_services
            .iter()
            .find(|s| s.monthly_instances > MAX_MONTHLY_COUNT)
        {
            return Err(AppError::validation(format!(
                "عدد التصاميم الشهرية للخدمة {} يتجاوز الحد المسموح ({MAX_MONTHLY_COUNT}).",
                service.service_type
            )));
        }

        if let Some(service) = self.management_services.iter().find(|s| s.monthly_updates == 0) {
            return Err(AppError::validation(format!(
                "يجب تحديد عدد التحديثات الشهرية للخدمة {}.",
                service.service_type
            )));
        }
        if let Some(service) = self
            .management_services
            .iter()
            .find(|s| s.monthly_updates > MAX_MONTHLY_COUNT)
        {
            return Err(AppError::validation(format!(
                "عدد التحديثات الشهرية للخدمة {} يتجاوز الحد المسموح ({MAX_MONTHLY_COUNT}).",
                service.service_type
            )));
        }

        if let Some(service) = self
            .advertising_services
            .iter()
            .find(|s| !s.budget.is_finite() || s.budget < 0.0)
        {
            return Err(AppError::validation(format!(
                "ميزانية الإعلان للخدمة {} غير صالحة.",
                service.service_type
            )));
        }

        Ok(())
    }
}

/// テスト用の購読（2024-01-01から3か月、サービスなし）
#[cfg(test)]
pub(crate) fn sample_subscription(id: &str, client_name: &str) -> Subscription {
    use chrono::TimeZone;

    Subscription {
        id: id.to_string(),
        client_id: format!("client-{id}"),
        client_name: client_name.to_string(),
        client_phone: "+96550000000".to_string(),
        duration: 3,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        total_price: 120.5,
        email_credentials: Vec::new(),
        website_services: Vec::new(),
        design_services: Vec::new(),
        management_services: Vec::new(),
        advertising_services: Vec::new(),
        manual_tasks: Vec::new(),
        tier: Tier::Regular,
        status: SubscriptionStatus::Active,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap(),
        deleted_at: None,
        archived_tasks: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form() -> SubscriptionForm {
        SubscriptionForm {
            client_id: "client-1".to_string(),
            client_name: "شركة النور".to_string(),
            duration: 3,
            start_date: "2024-01-01".to_string(),
            design_services: vec![DesignService {
                service_type: "post".to_string(),
                price: 10.0,
                monthly_instances: 2,
                scheduling_type: SchedulingType::Automatic,
                platforms: vec![Platform::Facebook],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_accepts_complete_form() {
        assert!(form().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut missing_client = form();
        missing_client.client_name = "  ".to_string();
        assert!(matches!(missing_client.validate(), Err(AppError::Validation(_))));

        let mut zero_duration = form();
        zero_duration.duration = 0;
        assert!(zero_duration.validate().is_err());

        let mut negative_price = form();
        negative_price.design_services[0].price = -1.0;
        assert!(negative_price.validate().is_err());

        let mut zero_instances = form();
        zero_instances.design_services[0].monthly_instances = 0;
        assert!(zero_instances.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_counts() {
        let mut long_duration = form();
        long_duration.duration = u32::MAX;
        assert!(matches!(long_duration.validate(), Err(AppError::Validation(_))));

        let mut too_many = form();
        too_many.design_services[0].monthly_instances = u32::MAX;
        assert!(matches!(too_many.validate(), Err(AppError::Validation(_))));

        let mut at_limit = form();
        at_limit.duration = MAX_DURATION_MONTHS;
        at_limit.design_services[0].monthly_instances = MAX_MONTHLY_COUNT;
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_platform_tags() {
        let platforms: Vec<Platform> =
            serde_json::from_value(json!(["facebook", "threads"])).unwrap();
        assert_eq!(
            platforms,
            vec![Platform::Facebook, Platform::Other("threads".to_string())]
        );
        assert_eq!(
            serde_json::to_value(&platforms).unwrap(),
            json!(["facebook", "threads"])
        );
        assert_eq!(join_platforms(&platforms), "facebook, threads");
    }

    #[test]
    fn test_tier_labels_and_parse() {
        assert_eq!(Tier::parse("GOLD"), Some(Tier::Gold));
        assert_eq!(Tier::parse("platinum"), None);
        assert_eq!(Tier::Bronze.arabic_label(), "برونزي");
        assert_eq!(SubscriptionStatus::parse("deleted"), Some(SubscriptionStatus::Deleted));
        assert_eq!(SubscriptionStatus::parse("expired"), None);
    }
}
