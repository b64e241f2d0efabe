//! Shared fixtures: a scriptable `AdPlatform` that records every call.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use adsync_core::{Currency, InMemoryStore, Owner, RemoteCredential};
use adsync_meta::{
    AdPlatform, CreateCampaignSpec, CreatedCampaign, CredentialCheck, GraphErrorReason, Insights,
    MetaError, RemoteCampaign, RemoteCampaignPatch, RemoteStatus,
};
use adsync_sync::SyncEngine;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Default)]
pub struct MockPlatform {
    calls: Mutex<Vec<String>>,
    campaigns: Mutex<Vec<RemoteCampaign>>,
    failing_insights: Mutex<HashSet<String>>,
    insights: Mutex<Insights>,
    /// When set, every write fails with this reason.
    write_failure: Mutex<Option<GraphErrorReason>>,
    next_remote_id: Mutex<u32>,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_campaigns(&self, campaigns: Vec<RemoteCampaign>) {
        *self.campaigns.lock().unwrap() = campaigns;
    }

    pub fn set_insights(&self, insights: Insights) {
        *self.insights.lock().unwrap() = insights;
    }

    pub fn fail_insights_for(&self, remote_id: &str) {
        self.failing_insights
            .lock()
            .unwrap()
            .insert(remote_id.to_string());
    }

    pub fn fail_writes_with(&self, reason: GraphErrorReason) {
        *self.write_failure.lock().unwrap() = Some(reason);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(':').next() == Some(operation))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn scripted_failure(&self) -> Result<(), MetaError> {
        match self.write_failure.lock().unwrap().clone() {
            Some(reason @ GraphErrorReason::TokenExpired) => Err(MetaError::Auth { reason }),
            Some(reason) => Err(MetaError::Rejected { reason }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AdPlatform for MockPlatform {
    async fn list_campaigns(
        &self,
        credential: &RemoteCredential,
    ) -> Result<Vec<RemoteCampaign>, MetaError> {
        self.record(format!("list:{}", credential.ad_account_id));
        Ok(self.campaigns.lock().unwrap().clone())
    }

    async fn fetch_insights(
        &self,
        _access_token: &str,
        remote_id: &str,
        date_preset: &str,
    ) -> Result<Insights, MetaError> {
        self.record(format!("insights:{remote_id}:{date_preset}"));
        if self.failing_insights.lock().unwrap().contains(remote_id) {
            return Err(MetaError::HttpStatus { status: 500 });
        }
        Ok(self.insights.lock().unwrap().clone())
    }

    async fn fetch_insights_range(
        &self,
        _access_token: &str,
        remote_id: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Insights, MetaError> {
        self.record(format!("insights_range:{remote_id}:{since}:{until}"));
        Ok(self.insights.lock().unwrap().clone())
    }

    async fn create_campaign(
        &self,
        _credential: &RemoteCredential,
        spec: &CreateCampaignSpec,
    ) -> Result<CreatedCampaign, MetaError> {
        self.record(format!("create:{}", spec.name));
        self.scripted_failure()?;
        let mut next = self.next_remote_id.lock().unwrap();
        *next += 1;
        Ok(CreatedCampaign {
            id: format!("2380{next:04}"),
            objective: adsync_meta::remap_objective(&spec.objective)
                .as_str()
                .to_string(),
            status: if spec.status.as_deref() == Some("ACTIVE") {
                RemoteStatus::Active
            } else {
                RemoteStatus::Paused
            },
            currency: Currency::Usd,
            daily_budget_minor_units: adsync_core::currency::local_to_minor_units(
                spec.daily_budget,
                spec.currency,
                Currency::Usd,
            ),
            lifetime_budget_minor_units: None,
        })
    }

    async fn update_campaign(
        &self,
        _access_token: &str,
        remote_id: &str,
        patch: &RemoteCampaignPatch,
    ) -> Result<(), MetaError> {
        self.record(format!("update:{remote_id}:{patch:?}"));
        self.scripted_failure()
    }

    async fn set_status(
        &self,
        _access_token: &str,
        remote_id: &str,
        status: RemoteStatus,
    ) -> Result<(), MetaError> {
        self.record(format!("status:{remote_id}:{}", status.as_str()));
        self.scripted_failure()
    }

    async fn delete_campaign(&self, _access_token: &str, remote_id: &str) -> Result<(), MetaError> {
        self.record(format!("delete:{remote_id}"));
        self.scripted_failure()
    }

    async fn validate_credential(&self, credential: &RemoteCredential) -> CredentialCheck {
        self.record(format!("validate:{}", credential.ad_account_id));
        CredentialCheck {
            valid: true,
            ..CredentialCheck::default()
        }
    }
}

pub fn remote_campaign(id: &str, name: &str, status: &str) -> RemoteCampaign {
    RemoteCampaign {
        id: id.to_string(),
        name: name.to_string(),
        status: status.to_string(),
        objective: Some("OUTCOME_TRAFFIC".to_string()),
        daily_budget_minor_units: Some(500),
        lifetime_budget_minor_units: None,
        start_time: None,
        end_time: None,
        created_time: None,
        updated_time: None,
        currency: Currency::Usd,
    }
}

pub fn sample_insights() -> Insights {
    Insights {
        impressions: 1000,
        clicks: 50,
        ctr: Decimal::new(500, 2),
        spend: Decimal::new(1250, 2),
        conversions: 3,
        ..Insights::default()
    }
}

pub fn owner(currency: Currency) -> Owner {
    Owner {
        id: Uuid::new_v4(),
        currency,
        credential: RemoteCredential::from_parts(Some("token"), Some("12345")),
    }
}

pub fn owner_without_credentials() -> Owner {
    Owner {
        id: Uuid::new_v4(),
        currency: Currency::Usd,
        credential: None,
    }
}

pub struct Harness {
    pub platform: Arc<MockPlatform>,
    pub store: Arc<InMemoryStore>,
    pub engine: SyncEngine,
}

pub fn harness() -> Harness {
    let platform = MockPlatform::new();
    let store = Arc::new(InMemoryStore::new());
    let engine = SyncEngine::new(platform.clone(), store.clone());
    Harness {
        platform,
        store,
        engine,
    }
}
