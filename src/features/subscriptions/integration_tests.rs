//! 購読の登録からごみ箱・エクスポートまでを通しで確認する統合テスト

use super::commands;
use super::models::{
    DesignService, Platform, Subscription, SubscriptionForm, SubscriptionStatus, Tier,
    WebsiteService,
};
use crate::features::export::ExportOptions;
use crate::features::tasks::models::{SchedulingType, Task, TaskStatus};
use crate::shared::config::EnvironmentConfig;
use crate::shared::database::collections::{RECYCLED_SUBSCRIPTIONS, SUBSCRIPTIONS, TASKS};
use crate::shared::database::{
    codec, Document, DocumentStore, FieldValue, SqliteDocumentStore, WriteBatch,
};
use crate::shared::errors::{AppError, AppResult};
use crate::AppState;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// コミットだけを失敗させられるストア
struct FlakyStore {
    inner: SqliteDocumentStore,
    fail_commits: AtomicBool,
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: &str) -> AppResult<Vec<Document>> {
        self.inner.list(collection).await
    }

    async fn query_equal(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> AppResult<Vec<Document>> {
        self.inner.query_equal(collection, field, value).await
    }

    async fn commit(&self, batch: WriteBatch) -> AppResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(AppError::ExternalService("unavailable".to_string()));
        }
        self.inner.commit(batch).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn memory_store() -> Arc<dyn DocumentStore> {
    Arc::new(SqliteDocumentStore::open_in_memory().unwrap())
}

fn app_with(store: Arc<dyn DocumentStore>) -> AppState {
    AppState::with_store(
        store,
        None,
        ExportOptions::default(),
        EnvironmentConfig::from_env(),
    )
}

fn design_form(scheduling_type: SchedulingType) -> SubscriptionForm {
    SubscriptionForm {
        client_id: "client-1".to_string(),
        client_name: "شركة النور".to_string(),
        client_phone: "+96550000000".to_string(),
        duration: 3,
        start_date: "2024-01-01".to_string(),
        design_services: vec![DesignService {
            service_type: "post".to_string(),
            price: 10.0,
            monthly_instances: 2,
            scheduling_type,
            platforms: vec![Platform::Instagram],
        }],
        ..Default::default()
    }
}

async fn stored_tasks(store: &Arc<dyn DocumentStore>) -> Vec<Task> {
    let documents = store.list(TASKS).await.unwrap();
    let mut tasks: Vec<Task> = documents.iter().map(|d| codec::decode(d).unwrap()).collect();
    tasks.sort_by_key(|t| t.due_date);
    tasks
}

#[tokio::test]
async fn test_automatic_design_subscription_end_to_end() {
    let store = memory_store();
    let app = app_with(Arc::clone(&store));

    let id = commands::create_subscription(design_form(SchedulingType::Automatic), &app)
        .await
        .unwrap();

    let subscriptions = commands::fetch_subscriptions(&app).await.unwrap();
    assert_eq!(subscriptions.len(), 1);
    let sub = &subscriptions[0];
    assert_eq!(sub.id, id);
    assert_eq!(sub.start_date, date(2024, 1, 1));
    assert_eq!(sub.end_date, date(2024, 4, 1));
    assert_eq!(sub.total_price, 60.0);
    assert_eq!(sub.tier, Tier::Regular);
    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert!(sub.manual_tasks.is_empty());

    let tasks = stored_tasks(&store).await;
    assert_eq!(tasks.len(), 6);
    let due: Vec<_> = tasks.iter().map(|t| t.due_date.unwrap()).collect();
    assert_eq!(
        due,
        vec![
            date(2024, 1, 1),
            date(2024, 1, 16),
            date(2024, 1, 31),
            date(2024, 2, 15),
            date(2024, 3, 1),
            date(2024, 3, 16),
        ]
    );
    assert!(tasks.iter().all(|t| t.subscription_id == id
        && t.status == TaskStatus::Pending
        && t.scheduling_type == SchedulingType::Automatic));

    // タスクの状態コンテナも再読み込みされている
    assert_eq!(app.tasks.lock().await.tasks_for_subscription(&id).len(), 6);
}

#[tokio::test]
async fn test_manual_design_subscription_embeds_tasks() {
    let store = memory_store();
    let app = app_with(Arc::clone(&store));

    let id = commands::create_subscription(design_form(SchedulingType::Manual), &app)
        .await
        .unwrap();

    let subscriptions = commands::fetch_subscriptions(&app).await.unwrap();
    let sub = &subscriptions[0];
    assert_eq!(sub.manual_tasks.len(), 6);
    assert!(sub
        .manual_tasks
        .iter()
        .all(|t| t.due_date.is_none() && t.subscription_id == id));
    assert!(stored_tasks(&store).await.is_empty());
}

#[tokio::test]
async fn test_website_only_subscription() {
    let app = app_with(memory_store());
    let form = SubscriptionForm {
        client_id: "client-2".to_string(),
        client_name: "مكتب الأمل".to_string(),
        duration: 12,
        start_date: "2024-03-15".to_string(),
        website_services: vec![
            WebsiteService {
                service_type: "landing".to_string(),
                price: 150.0,
            },
            WebsiteService {
                service_type: "store".to_string(),
                price: 350.0,
            },
        ],
        ..Default::default()
    };

    commands::create_subscription(form, &app).await.unwrap();

    let sub = &commands::fetch_subscriptions(&app).await.unwrap()[0];
    assert_eq!(sub.tier, Tier::Regular);
    assert_eq!(sub.total_price, 500.0);
    assert_eq!(sub.end_date, date(2025, 3, 15));
}

#[tokio::test]
async fn test_invalid_form_is_rejected_before_saving() {
    let store = memory_store();
    let app = app_with(Arc::clone(&store));
    let mut form = design_form(SchedulingType::Automatic);
    form.client_name = String::new();

    assert!(commands::create_subscription(form, &app).await.is_err());
    assert!(store.list(SUBSCRIPTIONS).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unparseable_start_date_is_rejected_by_gateway() {
    let store = memory_store();
    let app = app_with(Arc::clone(&store));
    let mut form = design_form(SchedulingType::Automatic);
    form.start_date = "15/01/2024".to_string();

    let error = commands::create_subscription(form, &app).await.unwrap_err();
    assert_eq!(error, "تاريخ البدء غير صالح.");
    assert!(store.list(SUBSCRIPTIONS).await.unwrap().is_empty());
    assert!(store.list(TASKS).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_and_restore_are_symmetric() {
    let store = memory_store();
    let app = app_with(Arc::clone(&store));
    let id = commands::create_subscription(design_form(SchedulingType::Automatic), &app)
        .await
        .unwrap();

    let before_sub: Subscription =
        codec::decode(&store.get(SUBSCRIPTIONS, &id).await.unwrap().unwrap()).unwrap();
    let before_tasks = stored_tasks(&store).await;

    commands::delete_subscription(id.clone(), &app).await.unwrap();

    assert!(store.get(SUBSCRIPTIONS, &id).await.unwrap().is_none());
    assert!(stored_tasks(&store).await.is_empty());
    let recycled = commands::fetch_recycled_subscriptions(&app).await.unwrap();
    assert_eq!(recycled.len(), 1);
    assert_eq!(recycled[0].status, SubscriptionStatus::Deleted);
    assert!(recycled[0].deleted_at.is_some());
    assert!(commands::fetch_subscriptions(&app).await.unwrap().is_empty());
    assert!(app.tasks.lock().await.tasks().is_empty());

    commands::restore_subscription(id.clone(), &app).await.unwrap();

    let after_sub: Subscription =
        codec::decode(&store.get(SUBSCRIPTIONS, &id).await.unwrap().unwrap()).unwrap();
    assert_eq!(after_sub, before_sub);
    assert_eq!(stored_tasks(&store).await, before_tasks);
    assert!(store.list(RECYCLED_SUBSCRIPTIONS).await.unwrap().is_empty());
    assert!(commands::fetch_recycled_subscriptions(&app)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_delete_missing_subscription() {
    let app = app_with(memory_store());
    let error = commands::delete_subscription("missing".to_string(), &app)
        .await
        .unwrap_err();
    assert_eq!(error, "الاشتراك غير موجود.");
}

#[tokio::test]
async fn test_json_export_then_import_reproduces_subscriptions() {
    let source = app_with(memory_store());
    commands::create_subscription(design_form(SchedulingType::Manual), &source)
        .await
        .unwrap();
    let mut bundle = design_form(SchedulingType::Automatic);
    bundle.client_name = "مجموعة الخليج".to_string();
    bundle.website_services = vec![WebsiteService {
        service_type: "landing".to_string(),
        price: 100.0,
    }];
    commands::create_subscription(bundle, &source).await.unwrap();

    let file = commands::export_subscriptions("json".to_string(), &source)
        .await
        .unwrap();
    assert_eq!(file.file_name, "الاشتراكات_النشطة.json");

    let target = app_with(memory_store());
    let contents = String::from_utf8(file.bytes).unwrap();
    let message = commands::import_subscriptions(contents, &target)
        .await
        .unwrap();
    assert_eq!(message, "تم استيراد 2 اشتراك بنجاح.");

    let mut exported = commands::fetch_subscriptions(&source).await.unwrap();
    let mut imported = commands::fetch_subscriptions(&target).await.unwrap();
    exported.sort_by(|a, b| a.id.cmp(&b.id));
    imported.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(imported, exported);
}

#[tokio::test]
async fn test_excel_and_pdf_exports() {
    let app = app_with(memory_store());
    commands::create_subscription(design_form(SchedulingType::Automatic), &app)
        .await
        .unwrap();

    let excel = commands::export_subscriptions("xlsx".to_string(), &app)
        .await
        .unwrap();
    assert_eq!(excel.file_name, "الاشتراكات_النشطة.xlsx");
    assert!(excel.bytes.starts_with(b"PK"));

    let pdf = commands::export_subscriptions("pdf".to_string(), &app)
        .await
        .unwrap();
    assert!(pdf.bytes.starts_with(b"%PDF"));

    let error = commands::export_subscriptions("csv".to_string(), &app)
        .await
        .unwrap_err();
    assert!(error.contains("csv"));
}

#[tokio::test]
async fn test_export_with_nothing_active() {
    let app = app_with(memory_store());
    let error = commands::export_subscriptions("json".to_string(), &app)
        .await
        .unwrap_err();
    assert_eq!(error, "لا توجد اشتراكات نشطة لتصديرها.");
}

#[tokio::test]
async fn test_manual_task_toggle_and_edit() {
    let app = app_with(memory_store());
    let id = commands::create_subscription(design_form(SchedulingType::Manual), &app)
        .await
        .unwrap();
    let task_id = commands::fetch_subscriptions(&app).await.unwrap()[0].manual_tasks[0]
        .id
        .clone();

    commands::toggle_manual_task(id.clone(), task_id.clone(), &app)
        .await
        .unwrap();
    commands::edit_manual_task(id.clone(), task_id.clone(), "  تصميم منشور العيد ".to_string(), &app)
        .await
        .unwrap();

    let sub = commands::fetch_subscriptions(&app).await.unwrap().remove(0);
    let task = sub.manual_tasks.iter().find(|t| t.id == task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.completed_at.is_some());
    assert_eq!(task.description, "تصميم منشور العيد");

    commands::toggle_manual_task(id.clone(), task_id.clone(), &app)
        .await
        .unwrap();
    let sub = commands::fetch_subscriptions(&app).await.unwrap().remove(0);
    let task = sub.manual_tasks.iter().find(|t| t.id == task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(task.completed_at.is_none());

    let error = commands::edit_manual_task(id.clone(), task_id, "   ".to_string(), &app)
        .await
        .unwrap_err();
    assert_eq!(error, "وصف المهمة مطلوب.");
    let error = commands::toggle_manual_task(id, "missing".to_string(), &app)
        .await
        .unwrap_err();
    assert_eq!(error, "المهمة غير موجودة.");
}

#[tokio::test]
async fn test_failed_commit_leaves_state_untouched() {
    let flaky = Arc::new(FlakyStore {
        inner: SqliteDocumentStore::open_in_memory().unwrap(),
        fail_commits: AtomicBool::new(false),
    });
    let app = app_with(flaky.clone());
    let id = commands::create_subscription(design_form(SchedulingType::Automatic), &app)
        .await
        .unwrap();
    let before = commands::fetch_subscriptions(&app).await.unwrap();

    flaky.fail_commits.store(true, Ordering::SeqCst);

    let error = commands::delete_subscription(id.clone(), &app)
        .await
        .unwrap_err();
    assert_eq!(error, "فشل حذف الاشتراك ونقل للمحذوفات.");
    {
        let subscriptions = app.subscriptions.lock().await;
        assert_eq!(subscriptions.subscriptions(), before.as_slice());
        assert!(subscriptions.recycled_subscriptions().is_empty());
        assert!(!subscriptions.status().is_loading);
    }

    let error = commands::create_subscription(design_form(SchedulingType::Automatic), &app)
        .await
        .unwrap_err();
    assert_eq!(error, "فشل إضافة الاشتراك والمهام.");

    let mut changed = before[0].clone();
    changed.client_phone = "+96599999999".to_string();
    let error = commands::update_subscription(changed, &app).await.unwrap_err();
    assert_eq!(error, "فشل تحديث الاشتراك.");

    // 空の取り込みはコミットしない
    let result = commands::import_subscriptions("[]".to_string(), &app).await;
    assert_eq!(result, Ok("تم استيراد 0 اشتراك بنجاح.".to_string()));

    let subscriptions = app.subscriptions.lock().await;
    assert_eq!(subscriptions.subscriptions(), before.as_slice());
    assert_eq!(subscriptions.status().error, None);
    assert_eq!(flaky.inner.list(TASKS).await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_tier_counts_and_filters() {
    let app = app_with(memory_store());
    commands::create_subscription(design_form(SchedulingType::Automatic), &app)
        .await
        .unwrap();
    let mut bronze = design_form(SchedulingType::Automatic);
    bronze.website_services = vec![WebsiteService {
        service_type: "landing".to_string(),
        price: 100.0,
    }];
    commands::create_subscription(bronze, &app).await.unwrap();

    let counts = commands::get_tier_counts(&app).await.unwrap();
    let pairs: Vec<_> = counts.iter().map(|c| (c.tier, c.count)).collect();
    assert_eq!(
        pairs,
        vec![
            (Tier::Gold, 0),
            (Tier::Silver, 0),
            (Tier::Bronze, 1),
            (Tier::Regular, 1)
        ]
    );
    assert_eq!(counts[2].label, Tier::Bronze.arabic_label());

    let expiring =
        commands::get_expiring_subscriptions(Some("2024-03-28".to_string()), &app)
            .await
            .unwrap();
    assert_eq!(expiring.len(), 2);
    let none = commands::get_expiring_subscriptions(Some("2024-01-10".to_string()), &app)
        .await
        .unwrap();
    assert!(none.is_empty());
}
