//! Campaign reconciliation between the local store and the Meta Graph API.
//!
//! Local persistence is authoritative: if it fails the operation fails.
//! Remote effects are advisory: their failures are reported as
//! [`RemoteOutcome::Failed`] alongside a successful local result.

pub mod analytics;
mod engine;
mod error;
mod outcome;

pub use analytics::{
    campaign_analytics, campaign_list_analytics, daily_average, AnalyticsQuery, AnalyticsSummary,
    CampaignAnalytics, CampaignListAnalytics, DailyAverage,
};
pub use engine::{SyncEngine, MAX_BUDGET, MAX_NAME_LEN, SYNC_INSIGHTS_PRESET};
pub use error::SyncError;
pub use outcome::{
    CreateOutcome, DeleteOutcome, MutationOutcome, RemoteOutcome, SkipReason, SyncReport,
    CREDENTIALS_MISSING_MESSAGE,
};
