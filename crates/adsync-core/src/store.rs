//! Persistence seams for campaigns and users.
//!
//! Every campaign query is scoped by `owner_id` except
//! [`CampaignStore::find_unscoped`], the read-only admin listing. Results are
//! ordered newest `created_at` first.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::campaign::{Campaign, CampaignStatus};
use crate::period::TimeWindow;
use crate::user::{CredentialUpdate, NewUser, User};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CampaignFilter {
    pub status: Option<CampaignStatus>,
}

impl CampaignFilter {
    #[must_use]
    pub fn matches(&self, campaign: &Campaign) -> bool {
        self.status.is_none_or(|s| campaign.status == s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdminCampaignFilter {
    pub owner_id: Option<Uuid>,
    pub status: Option<CampaignStatus>,
}

/// 1-based page request. Out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .clamp(1, MAX_PAGE_LIMIT),
        }
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    #[must_use]
    pub fn pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OwnedCampaign {
    pub campaign: Campaign,
    pub owner: OwnerSummary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: u64,
    pub active: u64,
    pub paused: u64,
    pub stopped: u64,
    pub deleted: u64,
}

impl StatusCounts {
    pub fn record(&mut self, status: CampaignStatus) {
        self.add(status, 1);
    }

    /// Adds `count` campaigns with `status`, as returned by a grouped query.
    pub fn add(&mut self, status: CampaignStatus, count: u64) {
        self.total += count;
        let slot = match status {
            CampaignStatus::Active => &mut self.active,
            CampaignStatus::Paused => &mut self.paused,
            CampaignStatus::Stopped => &mut self.stopped,
            CampaignStatus::Deleted => &mut self.deleted,
        };
        *slot += count;
    }
}

/// Metrics summed over the campaigns last synced on one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendBucket {
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub spend: Decimal,
    pub conversions: i64,
    pub count: u64,
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn find(
        &self,
        owner_id: Uuid,
        filter: &CampaignFilter,
        page: PageRequest,
    ) -> Result<Page<Campaign>, StoreError>;

    async fn find_all(&self, owner_id: Uuid) -> Result<Vec<Campaign>, StoreError>;

    async fn find_one(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Campaign>, StoreError>;

    async fn find_by_remote_id(
        &self,
        owner_id: Uuid,
        remote_campaign_id: &str,
    ) -> Result<Option<Campaign>, StoreError>;

    /// Fails with [`StoreError::Conflict`] if the owner already has a record
    /// with the same `remote_campaign_id`.
    async fn insert(&self, campaign: Campaign) -> Result<Campaign, StoreError>;

    /// Replaces the stored record. Ownership and identity columns are taken
    /// from the existing row, not from `campaign`.
    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        campaign: Campaign,
    ) -> Result<Campaign, StoreError>;

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError>;

    async fn count_by_status(
        &self,
        owner_id: Uuid,
        filter: &CampaignFilter,
    ) -> Result<StatusCounts, StoreError>;

    async fn sum_spend(&self, owner_id: Uuid, filter: &CampaignFilter)
        -> Result<Decimal, StoreError>;

    async fn daily_trends(
        &self,
        owner_id: Uuid,
        filter: &CampaignFilter,
        window: TimeWindow,
    ) -> Result<Vec<TrendBucket>, StoreError>;

    async fn find_unscoped(
        &self,
        filter: &AdminCampaignFilter,
        page: PageRequest,
    ) -> Result<Page<OwnedCampaign>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] on a duplicate email.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn set_meta_credentials(
        &self,
        id: Uuid,
        update: &CredentialUpdate,
    ) -> Result<User, StoreError>;

    async fn list_clients(&self) -> Result<Vec<User>, StoreError>;
}

/// Shared ordering for stores that sort in memory.
pub(crate) fn newest_first(a: &Campaign, b: &Campaign) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}

pub(crate) fn bucket_date(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_limits() {
        assert_eq!(PageRequest::new(None, None), PageRequest::default());
        assert_eq!(PageRequest::new(Some(0), Some(0)).page, 1);
        assert_eq!(PageRequest::new(Some(0), Some(0)).limit, 1);
        assert_eq!(PageRequest::new(Some(3), Some(500)).limit, MAX_PAGE_LIMIT);
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn page_count_rounds_up() {
        let page: Page<u8> = Page {
            items: vec![],
            total: 21,
            page: 1,
            limit: 10,
        };
        assert_eq!(page.pages(), 3);
    }

    #[test]
    fn status_counts_track_each_status() {
        let mut counts = StatusCounts::default();
        counts.record(CampaignStatus::Active);
        counts.record(CampaignStatus::Active);
        counts.record(CampaignStatus::Paused);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.active, 2);
        assert_eq!(counts.paused, 1);
    }
}
