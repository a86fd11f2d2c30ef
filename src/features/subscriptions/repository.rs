use super::aggregator::SubscriptionDraft;
use super::models::{Subscription, SubscriptionStatus, Tier};
use super::tier::classify_subscription;
use crate::features::export::{self, parse_import, ExportFile, ExportFormat, ExportOptions};
use crate::features::tasks::models::{SchedulingType, Task, TaskStatus};
use crate::shared::database::collections::{RECYCLED_SUBSCRIPTIONS, SUBSCRIPTIONS, TASKS};
use crate::shared::database::{codec, DocumentStore, FieldValue, WriteBatch};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::status::OperationStatus;
use crate::shared::utils::dates::{is_expiring_soon, now_millis, parse_date};
use crate::shared::utils::ids::{generate_document_id, is_valid_document_id};
use chrono::NaiveDate;
use std::sync::Arc;

const FETCH_FAILED: &str = "فشل تحميل الاشتراكات.";
const FETCH_RECYCLED_FAILED: &str = "فشل تحميل الاشتراكات المحذوفة.";
const ADD_FAILED: &str = "فشل إضافة الاشتراك والمهام.";
const UPDATE_FAILED: &str = "فشل تحديث الاشتراك.";
const DELETE_FAILED: &str = "فشل حذف الاشتراك ونقل للمحذوفات.";
const RESTORE_FAILED: &str = "فشل استعادة الاشتراك.";
const PURGE_FAILED: &str = "فشل حذف الاشتراك نهائياً.";
const EXPORT_FAILED: &str = "فشل تصدير الاشتراكات.";
const IMPORT_FAILED: &str = "فشل استيراد الاشتراكات.";

const SUBSCRIPTION_NOT_FOUND: &str = "الاشتراك غير موجود.";
const TASK_NOT_FOUND: &str = "المهمة غير موجودة.";
const NO_ACTIVE_SUBSCRIPTIONS: &str = "لا توجد اشتراكات نشطة لتصديرها.";
const INVALID_START_DATE: &str = "تاريخ البدء غير صالح.";
const INVALID_END_DATE: &str = "تاريخ الانتهاء غير صالح.";
const EMPTY_TASK_DESCRIPTION: &str = "وصف المهمة مطلوب.";

/// タスクの購読IDフィールド
const SUBSCRIPTION_ID_FIELD: &str = "subscriptionId";

/// 購読の状態コンテナ
///
/// `subscriptions` と `recycledSubscriptions` の2コレクションを保持する。
/// 書き込みはすべて1回のコミットで行い、成功後に両一覧を読み込み直す。
/// 失敗した場合は一覧を変更せず、`status` にメッセージを設定する。
pub struct SubscriptionsStore {
    store: Arc<dyn DocumentStore>,
    subscriptions: Vec<Subscription>,
    recycled_subscriptions: Vec<Subscription>,
    status: OperationStatus,
    export_options: ExportOptions,
}

impl SubscriptionsStore {
    pub fn new(store: Arc<dyn DocumentStore>, export_options: ExportOptions) -> Self {
        Self {
            store,
            subscriptions: Vec::new(),
            recycled_subscriptions: Vec::new(),
            status: OperationStatus::default(),
            export_options,
        }
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn recycled_subscriptions(&self) -> &[Subscription] {
        &self.recycled_subscriptions
    }

    pub fn status(&self) -> &OperationStatus {
        &self.status
    }

    pub fn find(&self, id: &str) -> Option<&Subscription> {
        self.subscriptions.iter().find(|s| s.id == id)
    }

    /// 指定区分の有効な購読
    pub fn by_tier(&self, tier: Tier) -> Vec<&Subscription> {
        self.subscriptions
            .iter()
            .filter(|s| s.is_active() && s.tier == tier)
            .collect()
    }

    /// 区分ごとの有効な購読数（gold から順）
    pub fn tier_counts(&self) -> Vec<(Tier, usize)> {
        Tier::ALL
            .iter()
            .map(|tier| (*tier, self.by_tier(*tier).len()))
            .collect()
    }

    /// 7日以内に終了する有効な購読（終了日順）
    pub fn expiring_soon(&self, today: NaiveDate) -> Vec<&Subscription> {
        let mut expiring: Vec<&Subscription> = self
            .subscriptions
            .iter()
            .filter(|s| s.is_active() && is_expiring_soon(s.end_date, today))
            .collect();
        expiring.sort_by_key(|s| s.end_date);
        expiring
    }

    /// 購読一覧を読み込み直す
    pub async fn fetch_subscriptions(&mut self) {
        self.status.begin();
        match self.load(SUBSCRIPTIONS).await {
            Ok(subscriptions) => {
                self.subscriptions = subscriptions;
                self.status.finish();
            }
            Err(e) => self.status.fail(&e, FETCH_FAILED),
        }
    }

    /// ごみ箱の一覧を読み込み直す
    pub async fn fetch_recycled_subscriptions(&mut self) {
        self.status.begin();
        match self.load(RECYCLED_SUBSCRIPTIONS).await {
            Ok(recycled) => {
                self.recycled_subscriptions = recycled;
                self.status.finish();
            }
            Err(e) => self.status.fail(&e, FETCH_RECYCLED_FAILED),
        }
    }

    /// 購読と自動タスクを1回のコミットで登録する
    ///
    /// 自動タスクのIDはストア用に振り直し、手動タスクは購読に埋め込む。
    ///
    /// # 引数
    /// * `draft` - 集計済みの購読
    /// * `automatic_tasks` - `tasks` コレクションに保存するタスク
    /// * `manual_tasks` - 購読に埋め込むタスク
    ///
    /// # 戻り値
    /// 登録した購読のID。失敗した場合はNone
    pub async fn add_subscription_and_tasks(
        &mut self,
        draft: SubscriptionDraft,
        automatic_tasks: Vec<Task>,
        manual_tasks: Vec<Task>,
    ) -> Option<String> {
        self.status.begin();
        let result = self.insert(draft, automatic_tasks, manual_tasks).await;
        match result {
            Ok(id) => {
                self.complete(Ok(()), ADD_FAILED).await;
                Some(id)
            }
            Err(e) => {
                self.status.fail(&e, ADD_FAILED);
                None
            }
        }
    }

    /// 購読を上書き保存する（区分は再計算する）
    pub async fn update_subscription(&mut self, subscription: Subscription) -> bool {
        self.status.begin();
        let result = self.replace(subscription).await;
        self.complete(result, UPDATE_FAILED).await
    }

    /// 手動タスクの完了状態を切り替える
    pub async fn toggle_manual_task(&mut self, subscription_id: &str, task_id: &str) -> bool {
        self.change_manual_task(subscription_id, task_id, |task| {
            if task.is_completed() {
                task.status = TaskStatus::Pending;
                task.completed_at = None;
            } else {
                task.status = TaskStatus::Completed;
                task.completed_at = Some(now_millis());
            }
            Ok(())
        })
        .await
    }

    /// 手動タスクの説明を変更する
    pub async fn edit_manual_task(
        &mut self,
        subscription_id: &str,
        task_id: &str,
        description: &str,
    ) -> bool {
        let description = description.trim().to_string();
        self.change_manual_task(subscription_id, task_id, move |task| {
            if description.is_empty() {
                return Err(AppError::validation(EMPTY_TASK_DESCRIPTION));
            }
            task.description = description;
            Ok(())
        })
        .await
    }

    /// 購読をごみ箱へ移動し、紐づく自動タスクを削除する
    ///
    /// 削除したタスクは購読の `archivedTasks` に退避し、復元時に戻す。
    pub async fn delete_subscription(&mut self, id: &str) -> bool {
        self.status.begin();
        let result = self.move_to_recycle(id).await;
        self.complete(result, DELETE_FAILED).await
    }

    /// ごみ箱の購読を元に戻す
    pub async fn restore_subscription(&mut self, id: &str) -> bool {
        self.status.begin();
        let result = self.move_from_recycle(id).await;
        self.complete(result, RESTORE_FAILED).await
    }

    /// ごみ箱の購読を完全に削除する
    pub async fn purge_recycled(&mut self, id: &str) -> bool {
        self.status.begin();
        let result = self.purge(id).await;
        self.complete(result, PURGE_FAILED).await
    }

    /// 有効な購読を指定形式で書き出す
    ///
    /// 最新の一覧を読み込み直してから出力する。有効な購読が無い場合はエラー。
    pub async fn export_subscriptions(&mut self, format: ExportFormat) -> Option<ExportFile> {
        self.status.begin();
        let result = self.export(format).await;
        match result {
            Ok(file) => {
                self.status.finish();
                Some(file)
            }
            Err(e) => {
                self.status.fail(&e, EXPORT_FAILED);
                None
            }
        }
    }

    /// JSONファイルから購読を取り込む
    ///
    /// 全件を検証してから1回のコミットで保存する。
    ///
    /// # 戻り値
    /// 取り込んだ件数。失敗した場合はNone
    pub async fn import_subscriptions(&mut self, input: &str) -> Option<usize> {
        self.status.begin();
        let result = self.import(input).await;
        match result {
            Ok(count) => {
                self.complete(Ok(()), IMPORT_FAILED).await;
                log::info!("購読を取り込みました: count={count}");
                Some(count)
            }
            Err(e) => {
                self.status.fail(&e, IMPORT_FAILED);
                None
            }
        }
    }

    async fn load(&self, collection: &str) -> AppResult<Vec<Subscription>> {
        let documents = self.store.list(collection).await?;
        documents.iter().map(codec::decode).collect()
    }

    async fn insert(
        &self,
        draft: SubscriptionDraft,
        automatic_tasks: Vec<Task>,
        manual_tasks: Vec<Task>,
    ) -> AppResult<String> {
        let start_date =
            parse_date(&draft.start_date).ok_or_else(|| AppError::validation(INVALID_START_DATE))?;
        let end_date =
            parse_date(&draft.end_date).ok_or_else(|| AppError::validation(INVALID_END_DATE))?;

        let id = if is_valid_document_id(&draft.id) {
            draft.id
        } else {
            generate_document_id()
        };

        let manual_tasks: Vec<Task> = manual_tasks
            .into_iter()
            .map(|mut task| {
                task.subscription_id = id.clone();
                task.scheduling_type = SchedulingType::Manual;
                task
            })
            .collect();

        let mut subscription = Subscription {
            id: id.clone(),
            client_id: draft.client_id,
            client_name: draft.client_name,
            client_phone: draft.client_phone,
            duration: draft.duration,
            start_date,
            end_date,
            total_price: draft.total_price,
            email_credentials: draft.email_credentials,
            website_services: draft.website_services,
            design_services: draft.design_services,
            management_services: draft.management_services,
            advertising_services: draft.advertising_services,
            manual_tasks,
            tier: draft.tier,
            status: SubscriptionStatus::Active,
            created_at: draft.created_at,
            deleted_at: None,
            archived_tasks: Vec::new(),
        };
        subscription.tier = classify_subscription(&subscription);

        let mut batch = WriteBatch::new();
        batch.create(SUBSCRIPTIONS, codec::encode(&id, &subscription)?);
        for mut task in automatic_tasks {
            task.id = generate_document_id();
            task.subscription_id = id.clone();
            task.scheduling_type = SchedulingType::Automatic;
            batch.create(TASKS, codec::encode(&task.id, &task)?);
        }

        let operations = batch.len();
        self.store.commit(batch).await?;
        log::info!("購読を登録しました: id={id}, operations={operations}");
        Ok(id)
    }

    async fn replace(&self, mut subscription: Subscription) -> AppResult<()> {
        if self.store.get(SUBSCRIPTIONS, &subscription.id).await?.is_none() {
            return Err(AppError::not_found(SUBSCRIPTION_NOT_FOUND));
        }

        subscription.tier = classify_subscription(&subscription);
        for task in &mut subscription.manual_tasks {
            task.subscription_id = subscription.id.clone();
        }

        let mut batch = WriteBatch::new();
        batch.set(SUBSCRIPTIONS, codec::encode(&subscription.id, &subscription)?);
        self.store.commit(batch).await
    }

    async fn change_manual_task<F>(&mut self, subscription_id: &str, task_id: &str, change: F) -> bool
    where
        F: FnOnce(&mut Task) -> AppResult<()>,
    {
        let prepared = self.find(subscription_id).cloned().ok_or_else(|| {
            AppError::not_found(SUBSCRIPTION_NOT_FOUND)
        });
        let prepared = prepared.and_then(|mut subscription| {
            let task = subscription
                .manual_tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| AppError::not_found(TASK_NOT_FOUND))?;
            change(task)?;
            Ok(subscription)
        });

        match prepared {
            Ok(subscription) => self.update_subscription(subscription).await,
            Err(e) => {
                self.status.begin();
                self.status.fail(&e, UPDATE_FAILED);
                false
            }
        }
    }

    async fn move_to_recycle(&self, id: &str) -> AppResult<()> {
        let document = self
            .store
            .get(SUBSCRIPTIONS, id)
            .await?
            .ok_or_else(|| AppError::not_found(SUBSCRIPTION_NOT_FOUND))?;
        let mut subscription: Subscription = codec::decode(&document)?;

        let task_documents = self
            .store
            .query_equal(TASKS, SUBSCRIPTION_ID_FIELD, &FieldValue::string(id))
            .await?;
        let tasks: Vec<Task> = task_documents
            .iter()
            .map(codec::decode)
            .collect::<AppResult<_>>()?;

        subscription.status = SubscriptionStatus::Deleted;
        subscription.deleted_at = Some(now_millis());
        subscription.archived_tasks = tasks;

        let mut batch = WriteBatch::new();
        batch.transfer(
            SUBSCRIPTIONS,
            RECYCLED_SUBSCRIPTIONS,
            codec::encode(id, &subscription)?,
        );
        for task in &subscription.archived_tasks {
            batch.delete(TASKS, &task.id);
        }

        self.store.commit(batch).await?;
        log::info!(
            "購読をごみ箱へ移動しました: id={id}, tasks={}",
            subscription.archived_tasks.len()
        );
        Ok(())
    }

    async fn move_from_recycle(&self, id: &str) -> AppResult<()> {
        let document = self
            .store
            .get(RECYCLED_SUBSCRIPTIONS, id)
            .await?
            .ok_or_else(|| AppError::not_found(SUBSCRIPTION_NOT_FOUND))?;
        let mut subscription: Subscription = codec::decode(&document)?;

        let tasks = std::mem::take(&mut subscription.archived_tasks);
        subscription.status = SubscriptionStatus::Active;
        subscription.deleted_at = None;

        let mut batch = WriteBatch::new();
        batch.transfer(
            RECYCLED_SUBSCRIPTIONS,
            SUBSCRIPTIONS,
            codec::encode(id, &subscription)?,
        );
        for task in &tasks {
            batch.set(TASKS, codec::encode(&task.id, task)?);
        }

        self.store.commit(batch).await?;
        log::info!("購読を復元しました: id={id}, tasks={}", tasks.len());
        Ok(())
    }

    async fn purge(&self, id: &str) -> AppResult<()> {
        if self.store.get(RECYCLED_SUBSCRIPTIONS, id).await?.is_none() {
            return Err(AppError::not_found(SUBSCRIPTION_NOT_FOUND));
        }

        let mut batch = WriteBatch::new();
        batch.delete(RECYCLED_SUBSCRIPTIONS, id);
        self.store.commit(batch).await?;
        log::info!("購読を完全に削除しました: id={id}");
        Ok(())
    }

    async fn export(&mut self, format: ExportFormat) -> AppResult<ExportFile> {
        self.subscriptions = self.load(SUBSCRIPTIONS).await?;

        let active: Vec<Subscription> = self
            .subscriptions
            .iter()
            .filter(|s| s.is_active())
            .cloned()
            .collect();
        if active.is_empty() {
            return Err(AppError::validation(NO_ACTIVE_SUBSCRIPTIONS));
        }

        export::render(format, &active, &self.export_options)
    }

    async fn import(&self, input: &str) -> AppResult<usize> {
        let subscriptions = parse_import(input, now_millis())?;

        let mut batch = WriteBatch::new();
        for subscription in &subscriptions {
            batch.set(SUBSCRIPTIONS, codec::encode(&subscription.id, subscription)?);
        }
        if !batch.is_empty() {
            self.store.commit(batch).await?;
        }
        Ok(subscriptions.len())
    }

    /// 書き込み結果を反映する
    ///
    /// # 戻り値
    /// 書き込みが成功したかどうか（再読み込みの失敗は含まない）
    async fn complete(&mut self, result: AppResult<()>, message: &str) -> bool {
        if let Err(e) = result {
            self.status.fail(&e, message);
            return false;
        }

        let reloaded = match self.load(SUBSCRIPTIONS).await {
            Ok(subscriptions) => self
                .load(RECYCLED_SUBSCRIPTIONS)
                .await
                .map(|recycled| (subscriptions, recycled)),
            Err(e) => Err(e),
        };
        match reloaded {
            Ok((subscriptions, recycled)) => {
                self.subscriptions = subscriptions;
                self.recycled_subscriptions = recycled;
                self.status.finish();
            }
            Err(e) => self.status.fail(&e, FETCH_FAILED),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::subscriptions::models::{sample_subscription, WebsiteService};
    use crate::shared::database::SqliteDocumentStore;
    use chrono::Days;

    async fn seeded(subscriptions: &[Subscription]) -> SubscriptionsStore {
        let store: Arc<dyn DocumentStore> =
            Arc::new(SqliteDocumentStore::open_in_memory().unwrap());
        let mut batch = WriteBatch::new();
        for sub in subscriptions {
            batch.set(SUBSCRIPTIONS, codec::encode(&sub.id, sub).unwrap());
        }
        store.commit(batch).await.unwrap();

        let mut repo = SubscriptionsStore::new(store, ExportOptions::default());
        repo.fetch_subscriptions().await;
        repo
    }

    #[tokio::test]
    async fn test_read_models() {
        let mut gold = sample_subscription("gold-1", "a");
        gold.tier = Tier::Gold;
        let mut bronze = sample_subscription("bronze-1", "b");
        bronze.tier = Tier::Bronze;
        let regular = sample_subscription("regular-1", "c");
        let mut deleted = sample_subscription("regular-2", "d");
        deleted.status = SubscriptionStatus::Deleted;

        let repo = seeded(&[gold, bronze, regular, deleted]).await;

        assert_eq!(repo.subscriptions().len(), 4);
        assert_eq!(repo.by_tier(Tier::Regular).len(), 1);
        assert_eq!(
            repo.tier_counts(),
            vec![
                (Tier::Gold, 1),
                (Tier::Silver, 0),
                (Tier::Bronze, 1),
                (Tier::Regular, 1)
            ]
        );
    }

    #[tokio::test]
    async fn test_expiring_soon() {
        let soon = sample_subscription("soon", "a");
        let mut later = sample_subscription("later", "b");
        later.end_date = later.end_date + Days::new(30);

        let repo = seeded(&[soon.clone(), later]).await;
        let today = soon.end_date - Days::new(3);
        let expiring: Vec<_> = repo.expiring_soon(today).iter().map(|s| s.id.clone()).collect();
        assert_eq!(expiring, vec!["soon".to_string()]);
    }

    #[tokio::test]
    async fn test_update_recomputes_tier() {
        let sub = sample_subscription("sub-1", "a");
        let mut repo = seeded(&[sub.clone()]).await;

        let mut changed = sub.clone();
        changed.tier = Tier::Gold;
        changed.website_services = vec![WebsiteService {
            service_type: "landing".to_string(),
            price: 100.0,
        }];
        assert!(repo.update_subscription(changed).await);
        assert_eq!(repo.find("sub-1").unwrap().tier, Tier::Regular);
        assert_eq!(repo.find("sub-1").unwrap().website_services.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_subscription() {
        let mut repo = seeded(&[]).await;
        assert!(!repo.update_subscription(sample_subscription("ghost", "x")).await);
        assert_eq!(
            repo.status().error.as_deref(),
            Some(SUBSCRIPTION_NOT_FOUND)
        );
        assert!(repo.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_export_requires_active_subscriptions() {
        let mut deleted = sample_subscription("sub-1", "a");
        deleted.status = SubscriptionStatus::Deleted;
        let mut repo = seeded(&[deleted]).await;

        assert!(repo.export_subscriptions(ExportFormat::Json).await.is_none());
        assert_eq!(
            repo.status().error.as_deref(),
            Some(NO_ACTIVE_SUBSCRIPTIONS)
        );
        assert!(!repo.status().is_loading);
    }

    #[tokio::test]
    async fn test_purge_recycled() {
        let mut repo = seeded(&[sample_subscription("sub-1", "a")]).await;
        assert!(repo.delete_subscription("sub-1").await);
        assert_eq!(repo.recycled_subscriptions().len(), 1);

        assert!(repo.purge_recycled("sub-1").await);
        assert!(repo.recycled_subscriptions().is_empty());
        assert!(repo.subscriptions().is_empty());

        assert!(!repo.purge_recycled("sub-1").await);
        assert_eq!(
            repo.status().error.as_deref(),
            Some(SUBSCRIPTION_NOT_FOUND)
        );
    }

    #[tokio::test]
    async fn test_invalid_import_commits_nothing() {
        let mut repo = seeded(&[sample_subscription("sub-1", "a")]).await;
        assert!(repo.import_subscriptions("{}").await.is_none());
        assert_eq!(
            repo.status().error.as_deref(),
            Some(export::import::NOT_AN_ARRAY)
        );
        assert_eq!(repo.subscriptions().len(), 1);
    }
}
