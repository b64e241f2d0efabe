//! Postgres implementations of the core persistence traits.

use adsync_core::{
    AdminCampaignFilter, Campaign, CampaignFilter, CampaignStore, CredentialUpdate, NewUser,
    OwnedCampaign, Page, PageRequest, StatusCounts, StoreError, TimeWindow, TrendBucket, User,
    UserStore,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{campaigns, users};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CampaignStore for PgStore {
    async fn find(
        &self,
        owner_id: Uuid,
        filter: &CampaignFilter,
        page: PageRequest,
    ) -> Result<Page<Campaign>, StoreError> {
        let (items, total) = campaigns::list_campaigns(&self.pool, owner_id, filter, page).await?;
        Ok(Page {
            items,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn find_all(&self, owner_id: Uuid) -> Result<Vec<Campaign>, StoreError> {
        Ok(campaigns::list_all_campaigns(&self.pool, owner_id).await?)
    }

    async fn find_one(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Campaign>, StoreError> {
        Ok(campaigns::get_campaign(&self.pool, owner_id, id).await?)
    }

    async fn find_by_remote_id(
        &self,
        owner_id: Uuid,
        remote_campaign_id: &str,
    ) -> Result<Option<Campaign>, StoreError> {
        Ok(campaigns::get_campaign_by_remote_id(&self.pool, owner_id, remote_campaign_id).await?)
    }

    async fn insert(&self, campaign: Campaign) -> Result<Campaign, StoreError> {
        Ok(campaigns::insert_campaign(&self.pool, &campaign).await?)
    }

    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        campaign: Campaign,
    ) -> Result<Campaign, StoreError> {
        Ok(campaigns::update_campaign(&self.pool, owner_id, id, &campaign).await?)
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        Ok(campaigns::delete_campaign(&self.pool, owner_id, id).await?)
    }

    async fn count_by_status(
        &self,
        owner_id: Uuid,
        filter: &CampaignFilter,
    ) -> Result<StatusCounts, StoreError> {
        Ok(campaigns::count_campaigns_by_status(&self.pool, owner_id, filter).await?)
    }

    async fn sum_spend(
        &self,
        owner_id: Uuid,
        filter: &CampaignFilter,
    ) -> Result<Decimal, StoreError> {
        Ok(campaigns::sum_campaign_spend(&self.pool, owner_id, filter).await?)
    }

    async fn daily_trends(
        &self,
        owner_id: Uuid,
        filter: &CampaignFilter,
        window: TimeWindow,
    ) -> Result<Vec<TrendBucket>, StoreError> {
        Ok(campaigns::campaign_daily_trends(&self.pool, owner_id, filter, window).await?)
    }

    async fn find_unscoped(
        &self,
        filter: &AdminCampaignFilter,
        page: PageRequest,
    ) -> Result<Page<OwnedCampaign>, StoreError> {
        let (items, total) = campaigns::list_campaigns_unscoped(&self.pool, filter, page).await?;
        Ok(Page {
            items,
            total,
            page: page.page,
            limit: page.limit,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        Ok(users::create_user(&self.pool, &user).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(users::get_user_by_email(&self.pool, email).await?)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(users::get_user(&self.pool, id).await?)
    }

    async fn set_meta_credentials(
        &self,
        id: Uuid,
        update: &CredentialUpdate,
    ) -> Result<User, StoreError> {
        Ok(users::set_meta_credentials(&self.pool, id, update).await?)
    }

    async fn list_clients(&self) -> Result<Vec<User>, StoreError> {
        Ok(users::list_clients(&self.pool).await?)
    }
}
