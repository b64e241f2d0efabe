use adsync_core::RemoteCredential;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::MetaError;
use crate::types::{
    CreateCampaignSpec, CreatedCampaign, CredentialCheck, Insights, RemoteCampaign,
    RemoteCampaignPatch, RemoteStatus,
};

/// Outbound operations against the remote ad platform.
///
/// None of the methods retry. Callers decide whether a failure is fatal.
#[async_trait]
pub trait AdPlatform: Send + Sync {
    /// Lists up to 100 campaigns of the credential's ad account, each stamped
    /// with the account currency.
    async fn list_campaigns(
        &self,
        credential: &RemoteCredential,
    ) -> Result<Vec<RemoteCampaign>, MetaError>;

    async fn fetch_insights(
        &self,
        access_token: &str,
        remote_id: &str,
        date_preset: &str,
    ) -> Result<Insights, MetaError>;

    async fn fetch_insights_range(
        &self,
        access_token: &str,
        remote_id: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Insights, MetaError>;

    async fn create_campaign(
        &self,
        credential: &RemoteCredential,
        spec: &CreateCampaignSpec,
    ) -> Result<CreatedCampaign, MetaError>;

    async fn update_campaign(
        &self,
        access_token: &str,
        remote_id: &str,
        patch: &RemoteCampaignPatch,
    ) -> Result<(), MetaError>;

    async fn set_status(
        &self,
        access_token: &str,
        remote_id: &str,
        status: RemoteStatus,
    ) -> Result<(), MetaError>;

    async fn delete_campaign(&self, access_token: &str, remote_id: &str) -> Result<(), MetaError>;

    async fn validate_credential(&self, credential: &RemoteCredential) -> CredentialCheck;

    /// Best-effort insights: any failure is logged and yields zeroed metrics.
    async fn get_insights(&self, access_token: &str, remote_id: &str, date_preset: &str) -> Insights {
        match self.fetch_insights(access_token, remote_id, date_preset).await {
            Ok(insights) => insights,
            Err(e) => {
                tracing::warn!(remote_id, error = %e, "insights fetch failed; using zeroed metrics");
                Insights::default()
            }
        }
    }

    /// Best-effort variant of [`AdPlatform::fetch_insights_range`].
    async fn get_insights_range(
        &self,
        access_token: &str,
        remote_id: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Insights {
        match self
            .fetch_insights_range(access_token, remote_id, since, until)
            .await
        {
            Ok(insights) => insights,
            Err(e) => {
                tracing::warn!(remote_id, %since, %until, error = %e, "range insights fetch failed; using zeroed metrics");
                Insights::default()
            }
        }
    }
}
