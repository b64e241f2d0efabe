mod app_config;
pub mod campaign;
mod config;
pub mod currency;
pub mod memory;
pub mod period;
pub mod store;
pub mod user;

pub use app_config::{AppConfig, Environment, DEFAULT_META_BASE_URL};
pub use campaign::{
    generate_local_id, is_local_only_id, Audience, AudienceLocation, Campaign, CampaignSettings,
    CampaignStatus, CampaignUpdate, Creatives, Metrics, NewCampaign, LOCAL_ID_PREFIX,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use currency::Currency;
pub use memory::InMemoryStore;
pub use period::{Period, TimeWindow};
pub use store::{
    AdminCampaignFilter, CampaignFilter, CampaignStore, OwnedCampaign, OwnerSummary, Page,
    PageRequest, StatusCounts, StoreError, TrendBucket, UserStore,
};
pub use user::{CredentialUpdate, NewUser, Owner, RemoteCredential, Role, User};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Errors raised while parsing domain values at the edge.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("invalid campaign status: {0}")]
    InvalidStatus(String),

    #[error("invalid period '{0}'; expected one of today, yesterday, last7d, last30d, this_month, last_month")]
    InvalidPeriod(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("invalid campaign patch: {0}")]
    InvalidPatch(String),
}
