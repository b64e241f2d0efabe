use std::sync::Arc;

use adsync_core::currency::{amount_to_local, local_to_minor_units, minor_units_to_local};
use adsync_core::{
    generate_local_id, Campaign, CampaignStatus, CampaignStore, CampaignUpdate, Currency, Metrics,
    NewCampaign, Owner, RemoteCredential, StoreError,
};
use adsync_meta::{
    AdPlatform, CreateCampaignSpec, CredentialCheck, MetaError, RemoteCampaign,
    RemoteCampaignPatch, RemoteObjective, RemoteStatus,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::SyncError;
use crate::outcome::{
    CreateOutcome, DeleteOutcome, MutationOutcome, RemoteOutcome, SkipReason, SyncReport,
};

/// Graph date preset used for the metrics cached during sync.
pub const SYNC_INSIGHTS_PRESET: &str = "last_30d";

pub const MAX_NAME_LEN: usize = 255;

/// Largest budget, in the owner's currency, accepted on create or update.
pub const MAX_BUDGET: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

#[derive(Debug, thiserror::Error)]
enum ItemError {
    #[error("unsupported remote status '{0}'")]
    UnsupportedStatus(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

enum ItemResult {
    Created,
    Updated,
}

/// Orchestrates dual writes between the campaign store and the ad platform.
#[derive(Clone)]
pub struct SyncEngine {
    platform: Arc<dyn AdPlatform>,
    store: Arc<dyn CampaignStore>,
}

impl SyncEngine {
    pub fn new(platform: Arc<dyn AdPlatform>, store: Arc<dyn CampaignStore>) -> Self {
        Self { platform, store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CampaignStore> {
        &self.store
    }

    /// Pulls every remote campaign into the owner's local store.
    ///
    /// # Errors
    ///
    /// [`SyncError::CredentialsMissing`] without a credential,
    /// [`SyncError::Remote`] if the campaign listing fails, and
    /// [`SyncError::Persistence`] if the refreshed list cannot be read.
    /// Failures on individual campaigns are counted in the report instead.
    pub async fn sync_all(&self, owner: &Owner) -> Result<SyncReport, SyncError> {
        self.sync_limited(owner, None).await
    }

    /// Like [`SyncEngine::sync_all`] but only processes the first `max`
    /// remote campaigns.
    ///
    /// # Errors
    ///
    /// See [`SyncEngine::sync_all`].
    pub async fn sync_bounded(&self, owner: &Owner, max: usize) -> Result<SyncReport, SyncError> {
        self.sync_limited(owner, Some(max)).await
    }

    async fn sync_limited(
        &self,
        owner: &Owner,
        limit: Option<usize>,
    ) -> Result<SyncReport, SyncError> {
        let credential = owner
            .credential
            .as_ref()
            .ok_or(SyncError::CredentialsMissing)?;

        let mut remote = self.platform.list_campaigns(credential).await?;
        if let Some(max) = limit {
            remote.truncate(max);
        }

        let now = Utc::now();
        let mut report = SyncReport {
            total: remote.len(),
            ..SyncReport::default()
        };
        for item in &remote {
            match self.sync_one(owner, credential, item, now).await {
                Ok(ItemResult::Created) => report.created += 1,
                Ok(ItemResult::Updated) => report.updated += 1,
                Err(e) => {
                    report.errors += 1;
                    tracing::warn!(
                        owner_id = %owner.id,
                        remote_id = %item.id,
                        error = %e,
                        "skipping remote campaign during sync"
                    );
                }
            }
        }

        report.campaigns = self.store.find_all(owner.id).await?;
        tracing::info!(
            owner_id = %owner.id,
            created = report.created,
            updated = report.updated,
            errors = report.errors,
            total = report.total,
            "campaign sync finished"
        );
        Ok(report)
    }

    async fn sync_one(
        &self,
        owner: &Owner,
        credential: &RemoteCredential,
        item: &RemoteCampaign,
        now: DateTime<Utc>,
    ) -> Result<ItemResult, ItemError> {
        let status = RemoteStatus::to_local(&item.status)
            .ok_or_else(|| ItemError::UnsupportedStatus(item.status.clone()))?;

        let insights = self
            .platform
            .get_insights(&credential.access_token, &item.id, SYNC_INSIGHTS_PRESET)
            .await;
        let metrics = Metrics {
            impressions: insights.impressions,
            clicks: insights.clicks,
            ctr: insights.ctr,
            spend: amount_to_local(insights.spend, owner.currency, item.currency),
            conversions: insights.conversions,
        };
        let daily_budget = item
            .daily_budget_minor_units
            .map_or(Decimal::ZERO, |m| minor_units_to_local(m, owner.currency, item.currency));
        let lifetime_budget = item
            .lifetime_budget_minor_units
            .map(|m| minor_units_to_local(m, owner.currency, item.currency));

        if let Some(mut existing) = self.store.find_by_remote_id(owner.id, &item.id).await? {
            existing.name.clone_from(&item.name);
            existing.status = status;
            if let Some(objective) = &item.objective {
                existing.objective.clone_from(objective);
                existing.remote_objective = Some(objective.clone());
            }
            existing.daily_budget = daily_budget;
            existing.lifetime_budget = lifetime_budget;
            existing.remote_daily_budget_minor_units = item.daily_budget_minor_units;
            existing.remote_lifetime_budget_minor_units = item.lifetime_budget_minor_units;
            existing.currency = owner.currency;
            existing.metrics = metrics;
            existing.start_time = item.start_time;
            existing.end_time = item.end_time;
            existing.last_synced_at = now;
            self.store.update(owner.id, existing.id, existing).await?;
            return Ok(ItemResult::Updated);
        }

        let objective = item
            .objective
            .clone()
            .unwrap_or_else(|| RemoteObjective::Traffic.as_str().to_string());
        let campaign = Campaign {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            remote_campaign_id: item.id.clone(),
            name: item.name.clone(),
            status,
            remote_objective: item.objective.clone(),
            objective,
            daily_budget,
            lifetime_budget,
            remote_daily_budget_minor_units: item.daily_budget_minor_units,
            remote_lifetime_budget_minor_units: item.lifetime_budget_minor_units,
            currency: owner.currency,
            audience: adsync_core::Audience::default(),
            creatives: adsync_core::Creatives::default(),
            settings: adsync_core::CampaignSettings::default(),
            metrics,
            start_time: item.start_time,
            end_time: item.end_time,
            last_synced_at: now,
            created_at: item.created_time.unwrap_or(now),
            updated_at: now,
        };
        self.store.insert(campaign).await?;
        Ok(ItemResult::Created)
    }

    /// Creates a campaign remotely when possible and always locally.
    ///
    /// # Errors
    ///
    /// [`SyncError::Validation`] before any remote call, or
    /// [`SyncError::Persistence`] if the local insert fails.
    pub async fn create(
        &self,
        owner: &Owner,
        new: NewCampaign,
    ) -> Result<CreateOutcome, SyncError> {
        validate_new(&new)?;
        let now = Utc::now();
        let name = new.name.trim().to_string();
        let objective = new.objective.trim().to_string();

        let mut campaign = Campaign {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            remote_campaign_id: generate_local_id(now),
            name: name.clone(),
            status: local_create_status(new.status.as_deref()),
            objective: objective.clone(),
            remote_objective: None,
            daily_budget: new.daily_budget,
            lifetime_budget: new.lifetime_budget,
            remote_daily_budget_minor_units: None,
            remote_lifetime_budget_minor_units: None,
            currency: owner.currency,
            audience: new.audience,
            creatives: new.creatives,
            settings: new.settings,
            metrics: Metrics::default(),
            start_time: new.start_time,
            end_time: new.end_time,
            last_synced_at: now,
            created_at: now,
            updated_at: now,
        };

        let remote = match &owner.credential {
            None => RemoteOutcome::Skipped(SkipReason::NoCredentials),
            Some(credential) => {
                let spec = CreateCampaignSpec {
                    name,
                    objective,
                    status: new.status,
                    daily_budget: new.daily_budget,
                    lifetime_budget: new.lifetime_budget,
                    currency: owner.currency,
                };
                match self.platform.create_campaign(credential, &spec).await {
                    Ok(created) => {
                        campaign.remote_campaign_id = created.id;
                        campaign.remote_objective = Some(created.objective);
                        campaign.remote_daily_budget_minor_units =
                            Some(created.daily_budget_minor_units);
                        campaign.remote_lifetime_budget_minor_units =
                            created.lifetime_budget_minor_units;
                        if let Some(status) = RemoteStatus::to_local(created.status.as_str()) {
                            campaign.status = status;
                        }
                        RemoteOutcome::Synced
                    }
                    Err(e) => remote_failure(owner, "create", None, &e),
                }
            }
        };

        let remote_id = campaign.remote_campaign_id.clone();
        let campaign = self.store.insert(campaign).await.map_err(|e| {
            if remote.is_synced() {
                tracing::error!(owner_id = %owner.id, %remote_id, error = %e, "remote campaign created but local insert failed");
            }
            SyncError::from(e)
        })?;

        tracing::info!(
            owner_id = %owner.id,
            campaign_id = %campaign.id,
            remote_synced = remote.is_synced(),
            "campaign created"
        );
        Ok(CreateOutcome { campaign, remote })
    }

    /// Applies a whitelisted patch, pushing the Graph-supported subset first.
    ///
    /// # Errors
    ///
    /// [`SyncError::Validation`], [`SyncError::NotFound`], or
    /// [`SyncError::Persistence`].
    pub async fn update(
        &self,
        owner: &Owner,
        id: Uuid,
        update: CampaignUpdate,
        rejected_fields: Vec<String>,
    ) -> Result<MutationOutcome, SyncError> {
        validate_update(&update)?;
        let mut campaign = self.load(owner, id).await?;

        let remote = match remote_target(owner, &campaign) {
            Err(reason) => RemoteOutcome::Skipped(reason),
            Ok(_) if !update.touches_remote_fields() => {
                RemoteOutcome::Skipped(SkipReason::NothingToSync)
            }
            Ok(credential) => {
                let patch = remote_patch(&update, owner.currency);
                match self
                    .platform
                    .update_campaign(&credential.access_token, &campaign.remote_campaign_id, &patch)
                    .await
                {
                    Ok(()) => {
                        if patch.daily_budget_minor_units.is_some() {
                            campaign.remote_daily_budget_minor_units =
                                patch.daily_budget_minor_units;
                        }
                        if patch.lifetime_budget_minor_units.is_some() {
                            campaign.remote_lifetime_budget_minor_units =
                                patch.lifetime_budget_minor_units;
                        }
                        RemoteOutcome::Synced
                    }
                    Err(e) => {
                        remote_failure(owner, "update", Some(&campaign.remote_campaign_id), &e)
                    }
                }
            }
        };

        if !rejected_fields.is_empty() {
            tracing::warn!(campaign_id = %id, rejected = ?rejected_fields, "ignored non-updatable fields");
        }
        update.apply_to(&mut campaign);
        campaign.last_synced_at = Utc::now();
        let campaign = self.store.update(owner.id, id, campaign).await?;

        Ok(MutationOutcome {
            campaign,
            remote,
            rejected_fields,
        })
    }

    /// Changes status remotely (best effort) and locally.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`] or [`SyncError::Persistence`].
    pub async fn set_status(
        &self,
        owner: &Owner,
        id: Uuid,
        status: CampaignStatus,
    ) -> Result<MutationOutcome, SyncError> {
        let mut campaign = self.load(owner, id).await?;

        let remote = match remote_target(owner, &campaign) {
            Err(reason) => RemoteOutcome::Skipped(reason),
            Ok(credential) => match self
                .platform
                .set_status(
                    &credential.access_token,
                    &campaign.remote_campaign_id,
                    RemoteStatus::from_local(status),
                )
                .await
            {
                Ok(()) => RemoteOutcome::Synced,
                Err(e) => {
                    remote_failure(owner, "set_status", Some(&campaign.remote_campaign_id), &e)
                }
            },
        };

        tracing::info!(campaign_id = %id, from = %campaign.status, to = %status, "campaign status change");
        campaign.status = status;
        campaign.last_synced_at = Utc::now();
        let campaign = self.store.update(owner.id, id, campaign).await?;

        Ok(MutationOutcome {
            campaign,
            remote,
            rejected_fields: Vec::new(),
        })
    }

    /// Deletes remotely (best effort) and then locally, unconditionally.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`] or [`SyncError::Persistence`].
    pub async fn delete(&self, owner: &Owner, id: Uuid) -> Result<DeleteOutcome, SyncError> {
        let campaign = self.load(owner, id).await?;

        let remote = match remote_target(owner, &campaign) {
            Err(reason) => RemoteOutcome::Skipped(reason),
            Ok(credential) => match self
                .platform
                .delete_campaign(&credential.access_token, &campaign.remote_campaign_id)
                .await
            {
                Ok(()) => RemoteOutcome::Synced,
                Err(e) => remote_failure(owner, "delete", Some(&campaign.remote_campaign_id), &e),
            },
        };

        if !self.store.delete(owner.id, id).await? {
            return Err(SyncError::NotFound);
        }
        tracing::info!(owner_id = %owner.id, campaign_id = %id, remote_deleted = remote.is_synced(), "campaign deleted");

        Ok(DeleteOutcome {
            campaign_name: campaign.name,
            remote,
        })
    }

    /// Probes the owner's token and ad account.
    ///
    /// # Errors
    ///
    /// [`SyncError::CredentialsMissing`] without a credential.
    pub async fn validate_credentials(&self, owner: &Owner) -> Result<CredentialCheck, SyncError> {
        let credential = owner
            .credential
            .as_ref()
            .ok_or(SyncError::CredentialsMissing)?;
        Ok(self.platform.validate_credential(credential).await)
    }

    async fn load(&self, owner: &Owner, id: Uuid) -> Result<Campaign, SyncError> {
        self.store
            .find_one(owner.id, id)
            .await?
            .ok_or(SyncError::NotFound)
    }
}

/// The credential to use for a remote write, or why there is none.
fn remote_target<'a>(
    owner: &'a Owner,
    campaign: &Campaign,
) -> Result<&'a RemoteCredential, SkipReason> {
    if !campaign.is_remote_linked() {
        return Err(SkipReason::NotLinked);
    }
    owner.credential.as_ref().ok_or(SkipReason::NoCredentials)
}

fn remote_failure(
    owner: &Owner,
    operation: &str,
    remote_id: Option<&str>,
    err: &MetaError,
) -> RemoteOutcome {
    tracing::warn!(
        owner_id = %owner.id,
        operation,
        remote_id = remote_id.unwrap_or("-"),
        error = %err,
        "remote write failed; continuing with local write"
    );
    RemoteOutcome::Failed(err.user_message())
}

/// Graph only accepts name, budgets and status on update. Budgets are sent
/// in USD minor units.
fn remote_patch(update: &CampaignUpdate, owner_currency: Currency) -> RemoteCampaignPatch {
    RemoteCampaignPatch {
        name: update.name.as_ref().map(|n| n.trim().to_string()),
        daily_budget_minor_units: update
            .daily_budget
            .map(|b| local_to_minor_units(b, owner_currency, Currency::Usd)),
        lifetime_budget_minor_units: update
            .lifetime_budget
            .map(|b| local_to_minor_units(b, owner_currency, Currency::Usd)),
        status: update.status.map(RemoteStatus::from_local),
    }
}

fn local_create_status(requested: Option<&str>) -> CampaignStatus {
    match requested.map(str::parse::<CampaignStatus>) {
        None => CampaignStatus::Paused,
        Some(Ok(status)) => status,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "unrecognized status on create; using PAUSED");
            CampaignStatus::Paused
        }
    }
}

fn validate_name(name: &str) -> Result<(), SyncError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SyncError::Validation("Campaign name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(SyncError::Validation(format!(
            "Campaign name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_daily_budget(daily_budget: Decimal) -> Result<(), SyncError> {
    if daily_budget < Decimal::ONE {
        return Err(SyncError::Validation(
            "Daily budget must be at least 1".to_string(),
        ));
    }
    if daily_budget > MAX_BUDGET {
        return Err(SyncError::Validation(format!(
            "Daily budget cannot exceed {MAX_BUDGET}"
        )));
    }
    Ok(())
}

fn validate_lifetime_budget(lifetime_budget: Option<Decimal>) -> Result<(), SyncError> {
    let Some(budget) = lifetime_budget else {
        return Ok(());
    };
    if budget.is_sign_negative() && !budget.is_zero() {
        return Err(SyncError::Validation(
            "Lifetime budget cannot be negative".to_string(),
        ));
    }
    if budget > MAX_BUDGET {
        return Err(SyncError::Validation(format!(
            "Lifetime budget cannot exceed {MAX_BUDGET}"
        )));
    }
    Ok(())
}

fn validate_new(new: &NewCampaign) -> Result<(), SyncError> {
    validate_name(&new.name)?;
    if new.objective.trim().is_empty() {
        return Err(SyncError::Validation(
            "Campaign objective is required".to_string(),
        ));
    }
    validate_daily_budget(new.daily_budget)?;
    validate_lifetime_budget(new.lifetime_budget)
}

fn validate_update(update: &CampaignUpdate) -> Result<(), SyncError> {
    if update.is_empty() {
        return Err(SyncError::Validation(
            "No updatable fields provided".to_string(),
        ));
    }
    if let Some(name) = &update.name {
        validate_name(name)?;
    }
    if let Some(objective) = &update.objective {
        if objective.trim().is_empty() {
            return Err(SyncError::Validation(
                "Campaign objective cannot be empty".to_string(),
            ));
        }
    }
    if let Some(daily_budget) = update.daily_budget {
        validate_daily_budget(daily_budget)?;
    }
    validate_lifetime_budget(update.lifetime_budget)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation_trims_and_bounds_length() {
        assert!(validate_name("  ").is_err());
        assert!(validate_name("ok").is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn daily_budget_must_reach_one_unit() {
        assert!(validate_daily_budget(Decimal::new(5, 1)).is_err());
        assert!(validate_daily_budget(Decimal::ONE).is_ok());
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(matches!(
            validate_update(&CampaignUpdate::default()),
            Err(SyncError::Validation(_))
        ));
    }

    #[test]
    fn create_status_is_permissive() {
        assert_eq!(local_create_status(None), CampaignStatus::Paused);
        assert_eq!(local_create_status(Some("active")), CampaignStatus::Active);
        assert_eq!(local_create_status(Some("running")), CampaignStatus::Paused);
    }

    #[test]
    fn remote_patch_converts_budgets_to_usd_minor_units() {
        let update = CampaignUpdate {
            daily_budget: Some(Decimal::new(1400, 0)),
            status: Some(CampaignStatus::Stopped),
            objective: Some("OUTCOME_SALES".to_string()),
            ..CampaignUpdate::default()
        };
        let patch = remote_patch(&update, Currency::Pkr);
        assert_eq!(patch.daily_budget_minor_units, Some(500));
        assert_eq!(patch.status, Some(RemoteStatus::Archived));
        assert_eq!(patch.name, None);
    }

    #[test]
    fn objective_only_update_yields_empty_patch() {
        let update = CampaignUpdate {
            objective: Some("OUTCOME_SALES".to_string()),
            ..CampaignUpdate::default()
        };
        assert!(remote_patch(&update, Currency::Usd).is_empty());
    }
}
