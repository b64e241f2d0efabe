//! In-process store used by tests and local development.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::campaign::Campaign;
use crate::period::TimeWindow;
use crate::store::{
    bucket_date, newest_first, AdminCampaignFilter, CampaignFilter, CampaignStore, OwnedCampaign,
    OwnerSummary, Page, PageRequest, StatusCounts, StoreError, TrendBucket, UserStore,
};
use crate::user::{normalize_email, CredentialUpdate, NewUser, Role, User};

#[derive(Debug, thiserror::Error)]
#[error("writes are disabled on this store")]
struct WritesRejected;

#[derive(Default)]
pub struct InMemoryStore {
    campaigns: RwLock<HashMap<Uuid, Campaign>>,
    users: RwLock<HashMap<Uuid, User>>,
    reject_writes: AtomicBool,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent campaign write fail with a backend error.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::backend(WritesRejected));
        }
        Ok(())
    }

    async fn owned_sorted(&self, owner_id: Uuid, filter: &CampaignFilter) -> Vec<Campaign> {
        let campaigns = self.campaigns.read().await;
        let mut items: Vec<Campaign> = campaigns
            .values()
            .filter(|c| c.owner_id == owner_id && filter.matches(c))
            .cloned()
            .collect();
        items.sort_by(newest_first);
        items
    }
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let items = items
        .into_iter()
        .skip(offset)
        .take(page.limit as usize)
        .collect();
    Page {
        items,
        total,
        page: page.page,
        limit: page.limit,
    }
}

fn owner_summary(user: &User) -> OwnerSummary {
    OwnerSummary {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        company_name: user.company_name.clone(),
    }
}

#[async_trait]
impl CampaignStore for InMemoryStore {
    async fn find(
        &self,
        owner_id: Uuid,
        filter: &CampaignFilter,
        page: PageRequest,
    ) -> Result<Page<Campaign>, StoreError> {
        Ok(paginate(self.owned_sorted(owner_id, filter).await, page))
    }

    async fn find_all(&self, owner_id: Uuid) -> Result<Vec<Campaign>, StoreError> {
        Ok(self.owned_sorted(owner_id, &CampaignFilter::default()).await)
    }

    async fn find_one(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Campaign>, StoreError> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns
            .get(&id)
            .filter(|c| c.owner_id == owner_id)
            .cloned())
    }

    async fn find_by_remote_id(
        &self,
        owner_id: Uuid,
        remote_campaign_id: &str,
    ) -> Result<Option<Campaign>, StoreError> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns
            .values()
            .find(|c| c.owner_id == owner_id && c.remote_campaign_id == remote_campaign_id)
            .cloned())
    }

    async fn insert(&self, campaign: Campaign) -> Result<Campaign, StoreError> {
        self.check_writable()?;
        let mut campaigns = self.campaigns.write().await;
        let duplicate = campaigns.values().any(|c| {
            c.owner_id == campaign.owner_id && c.remote_campaign_id == campaign.remote_campaign_id
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "campaign {} already exists for owner",
                campaign.remote_campaign_id
            )));
        }
        campaigns.insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        mut campaign: Campaign,
    ) -> Result<Campaign, StoreError> {
        self.check_writable()?;
        let mut campaigns = self.campaigns.write().await;
        let existing = campaigns
            .get_mut(&id)
            .filter(|c| c.owner_id == owner_id)
            .ok_or(StoreError::NotFound)?;
        campaign.id = existing.id;
        campaign.owner_id = existing.owner_id;
        campaign.remote_campaign_id.clone_from(&existing.remote_campaign_id);
        campaign.created_at = existing.created_at;
        campaign.updated_at = Utc::now();
        *existing = campaign.clone();
        Ok(campaign)
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut campaigns = self.campaigns.write().await;
        let owned = campaigns.get(&id).is_some_and(|c| c.owner_id == owner_id);
        if owned {
            campaigns.remove(&id);
        }
        Ok(owned)
    }

    async fn count_by_status(
        &self,
        owner_id: Uuid,
        filter: &CampaignFilter,
    ) -> Result<StatusCounts, StoreError> {
        let mut counts = StatusCounts::default();
        for campaign in self.owned_sorted(owner_id, filter).await {
            counts.record(campaign.status);
        }
        Ok(counts)
    }

    async fn sum_spend(
        &self,
        owner_id: Uuid,
        filter: &CampaignFilter,
    ) -> Result<Decimal, StoreError> {
        Ok(self
            .owned_sorted(owner_id, filter)
            .await
            .iter()
            .map(|c| c.metrics.spend)
            .sum())
    }

    async fn daily_trends(
        &self,
        owner_id: Uuid,
        filter: &CampaignFilter,
        window: TimeWindow,
    ) -> Result<Vec<TrendBucket>, StoreError> {
        let mut buckets: BTreeMap<NaiveDate, TrendBucket> = BTreeMap::new();
        for campaign in self.owned_sorted(owner_id, filter).await {
            if !window.contains(campaign.last_synced_at) {
                continue;
            }
            let date = bucket_date(campaign.last_synced_at);
            let bucket = buckets.entry(date).or_insert_with(|| TrendBucket {
                date,
                impressions: 0,
                clicks: 0,
                spend: Decimal::ZERO,
                conversions: 0,
                count: 0,
            });
            bucket.impressions += campaign.metrics.impressions;
            bucket.clicks += campaign.metrics.clicks;
            bucket.spend += campaign.metrics.spend;
            bucket.conversions += campaign.metrics.conversions;
            bucket.count += 1;
        }
        Ok(buckets.into_values().collect())
    }

    async fn find_unscoped(
        &self,
        filter: &AdminCampaignFilter,
        page: PageRequest,
    ) -> Result<Page<OwnedCampaign>, StoreError> {
        let users = self.users.read().await;
        let campaigns = self.campaigns.read().await;
        let mut items: Vec<&Campaign> = campaigns
            .values()
            .filter(|c| filter.owner_id.is_none_or(|o| c.owner_id == o))
            .filter(|c| filter.status.is_none_or(|s| c.status == s))
            .collect();
        items.sort_by(|a, b| newest_first(a, b));

        let owned = items
            .into_iter()
            .map(|c| OwnedCampaign {
                campaign: c.clone(),
                owner: users.get(&c.owner_id).map_or_else(
                    || OwnerSummary {
                        id: c.owner_id,
                        name: String::new(),
                        email: String::new(),
                        company_name: None,
                    },
                    owner_summary,
                ),
            })
            .collect();
        Ok(paginate(owned, page))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let email = normalize_email(&user.email);
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict(format!("email {email} already registered")));
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name.trim().to_string(),
            email,
            password_hash: user.password_hash,
            role: user.role,
            meta_access_token: None,
            meta_ad_account_id: None,
            meta_page_id: None,
            company_name: user.company_name,
            currency: user.currency,
            created_at: Utc::now(),
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn set_meta_credentials(
        &self,
        id: Uuid,
        update: &CredentialUpdate,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.meta_access_token = Some(update.access_token.clone());
        user.meta_ad_account_id = Some(update.ad_account_id.clone());
        if let Some(page_id) = &update.page_id {
            user.meta_page_id = Some(page_id.clone());
        }
        if let Some(currency) = update.currency {
            user.currency = currency;
        }
        Ok(user.clone())
    }

    async fn list_clients(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        let mut clients: Vec<User> = users
            .values()
            .filter(|u| u.role == Role::Client)
            .cloned()
            .collect();
        clients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(clients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{
        generate_local_id, Audience, CampaignSettings, CampaignStatus, Creatives, Metrics,
    };
    use crate::currency::Currency;
    use chrono::Duration;

    fn campaign(owner_id: Uuid, remote_id: &str, status: CampaignStatus) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: Uuid::new_v4(),
            owner_id,
            remote_campaign_id: remote_id.to_string(),
            name: format!("Campaign {remote_id}"),
            status,
            objective: "OUTCOME_TRAFFIC".to_string(),
            remote_objective: None,
            daily_budget: Decimal::new(10, 0),
            lifetime_budget: None,
            remote_daily_budget_minor_units: None,
            remote_lifetime_budget_minor_units: None,
            currency: Currency::Usd,
            audience: Audience::default(),
            creatives: Creatives::default(),
            settings: CampaignSettings::default(),
            metrics: Metrics {
                impressions: 100,
                clicks: 5,
                ctr: Decimal::new(5, 0),
                spend: Decimal::new(250, 2),
                conversions: 1,
            },
            start_time: None,
            end_time: None,
            last_synced_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role,
            company_name: Some("Acme".to_string()),
            currency: Currency::Usd,
        }
    }

    #[tokio::test]
    async fn queries_are_scoped_by_owner() {
        let store = InMemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mine = store
            .insert(campaign(alice, "1", CampaignStatus::Active))
            .await
            .unwrap();
        store
            .insert(campaign(bob, "2", CampaignStatus::Active))
            .await
            .unwrap();

        assert_eq!(store.find_all(alice).await.unwrap().len(), 1);
        assert!(store.find_one(bob, mine.id).await.unwrap().is_none());
        assert!(!store.delete(bob, mine.id).await.unwrap());
        assert!(store.find_one(alice, mine.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_remote_id_per_owner_conflicts() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        store
            .insert(campaign(owner, "42", CampaignStatus::Paused))
            .await
            .unwrap();
        let err = store
            .insert(campaign(owner, "42", CampaignStatus::Paused))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Same remote id under another owner is fine.
        store
            .insert(campaign(Uuid::new_v4(), "42", CampaignStatus::Paused))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_preserves_identity_columns() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let stored = store
            .insert(campaign(owner, "7", CampaignStatus::Paused))
            .await
            .unwrap();

        let mut changed = stored.clone();
        changed.owner_id = Uuid::new_v4();
        changed.remote_campaign_id = generate_local_id(Utc::now());
        changed.name = "Renamed".to_string();

        let updated = store.update(owner, stored.id, changed).await.unwrap();
        assert_eq!(updated.owner_id, owner);
        assert_eq!(updated.remote_campaign_id, "7");
        assert_eq!(updated.name, "Renamed");
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let c = campaign(owner, "7", CampaignStatus::Paused);
        let err = store.update(owner, c.id, c).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn aggregates_follow_filter() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        for (id, status) in [
            ("1", CampaignStatus::Active),
            ("2", CampaignStatus::Active),
            ("3", CampaignStatus::Paused),
        ] {
            store.insert(campaign(owner, id, status)).await.unwrap();
        }

        let all = CampaignFilter::default();
        let counts = store.count_by_status(owner, &all).await.unwrap();
        assert_eq!((counts.total, counts.active, counts.paused), (3, 2, 1));
        assert_eq!(store.sum_spend(owner, &all).await.unwrap(), Decimal::new(750, 2));

        let active = CampaignFilter {
            status: Some(CampaignStatus::Active),
        };
        let page = store
            .find(owner, &active, PageRequest::new(Some(1), Some(1)))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.pages(), 2);
    }

    #[tokio::test]
    async fn daily_trends_bucket_by_sync_day() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let now = Utc::now();
        let mut old = campaign(owner, "old", CampaignStatus::Active);
        old.last_synced_at = now - Duration::days(40);
        store.insert(old).await.unwrap();
        store
            .insert(campaign(owner, "a", CampaignStatus::Active))
            .await
            .unwrap();
        store
            .insert(campaign(owner, "b", CampaignStatus::Active))
            .await
            .unwrap();

        let window = TimeWindow {
            start: now - Duration::days(7),
            end: now + Duration::seconds(1),
        };
        let trends = store
            .daily_trends(owner, &CampaignFilter::default(), window)
            .await
            .unwrap();
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].count, 2);
        assert_eq!(trends[0].impressions, 200);
    }

    #[tokio::test]
    async fn unscoped_listing_spans_owners_with_owner_details() {
        let store = InMemoryStore::new();
        let alice = store
            .create_user(new_user("alice@example.com", Role::Client))
            .await
            .unwrap();
        let bob = store
            .create_user(new_user("bob@example.com", Role::Client))
            .await
            .unwrap();
        store
            .insert(campaign(alice.id, "1", CampaignStatus::Active))
            .await
            .unwrap();
        store
            .insert(campaign(bob.id, "2", CampaignStatus::Paused))
            .await
            .unwrap();

        let all = store
            .find_unscoped(&AdminCampaignFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);
        assert!(all.items.iter().any(|o| o.owner.email == "bob@example.com"));

        let only_bob = store
            .find_unscoped(
                &AdminCampaignFilter {
                    owner_id: Some(bob.id),
                    status: None,
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(only_bob.total, 1);
        assert_eq!(only_bob.items[0].owner.company_name.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let store = InMemoryStore::new();
        store
            .create_user(new_user("jane@example.com", Role::Client))
            .await
            .unwrap();
        let err = store
            .create_user(new_user(" JANE@example.com", Role::Client))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn credentials_and_currency_are_saved() {
        let store = InMemoryStore::new();
        let user = store
            .create_user(new_user("c@example.com", Role::Client))
            .await
            .unwrap();
        let updated = store
            .set_meta_credentials(
                user.id,
                &CredentialUpdate {
                    access_token: "tok".to_string(),
                    ad_account_id: "123".to_string(),
                    page_id: None,
                    currency: Some(Currency::Pkr),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.currency, Currency::Pkr);
        assert!(updated.owner().credential.is_some());
    }

    #[tokio::test]
    async fn rejected_writes_surface_as_backend_errors() {
        let store = InMemoryStore::new();
        store.set_reject_writes(true);
        let err = store
            .insert(campaign(Uuid::new_v4(), "1", CampaignStatus::Active))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
