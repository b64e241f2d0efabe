//! Client for the Meta Graph Marketing API.
//!
//! [`MetaClient`] is the production [`AdPlatform`]; the sync engine only ever
//! sees the trait so tests can swap in a recording fake.

mod client;
mod error;
pub mod insights;
pub mod objective;
mod platform;
pub mod types;

pub use client::{account_path, MetaClient, ACCOUNT_PREFIX, DAILY_BUDGET_FLOOR_MINOR_UNITS};
pub use error::{GraphErrorReason, MetaError};
pub use objective::{remap_objective, RemoteObjective};
pub use platform::AdPlatform;
pub use types::{
    CreateCampaignSpec, CreatedCampaign, CredentialCheck, Insights, RemoteCampaign,
    RemoteCampaignPatch, RemoteStatus,
};
