//! Local campaign records and the patch type used to edit them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::currency::Currency;
use crate::CoreError;

/// Prefix carried by every campaign id that was never confirmed remotely.
pub const LOCAL_ID_PREFIX: &str = "local_";

const LOCAL_ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[must_use]
pub fn is_local_only_id(remote_campaign_id: &str) -> bool {
    remote_campaign_id.starts_with(LOCAL_ID_PREFIX)
}

/// Generates a placeholder id of the form `local_<unix-millis>_<9 base36 chars>`.
#[must_use]
pub fn generate_local_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..LOCAL_ID_SUFFIX_LEN)
        .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
        .collect();
    format!("{LOCAL_ID_PREFIX}{}_{suffix}", now.timestamp_millis())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CampaignStatus {
    Active,
    Paused,
    Stopped,
    Deleted,
}

impl CampaignStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Active => "ACTIVE",
            CampaignStatus::Paused => "PAUSED",
            CampaignStatus::Stopped => "STOPPED",
            CampaignStatus::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(CampaignStatus::Active),
            "PAUSED" => Ok(CampaignStatus::Paused),
            "STOPPED" => Ok(CampaignStatus::Stopped),
            "DELETED" => Ok(CampaignStatus::Deleted),
            _ => Err(CoreError::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudienceLocation {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

/// Targeting data kept locally; the Graph campaign object never returns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Audience {
    pub age_min: Option<u8>,
    pub age_max: Option<u8>,
    pub genders: Vec<String>,
    pub locations: Vec<AudienceLocation>,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Creatives {
    pub primary_text: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub call_to_action: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignSettings {
    pub billing_event: Option<String>,
    pub optimization_goal: Option<String>,
    pub bid_strategy: Option<String>,
}

/// Cached performance counters. `spend` is in the owner's display currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    pub impressions: i64,
    pub clicks: i64,
    pub ctr: Decimal,
    pub spend: Decimal,
    pub conversions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub remote_campaign_id: String,
    pub name: String,
    pub status: CampaignStatus,
    pub objective: String,
    pub remote_objective: Option<String>,
    pub daily_budget: Decimal,
    pub lifetime_budget: Option<Decimal>,
    /// Budget last exchanged with Graph, in integer minor units.
    ///
    /// The denomination depends on the last writer: create and sync store the
    /// ad account's currency, a successful update stores USD cents (the unit
    /// update pushes). Read `daily_budget` for the owner-currency amount.
    pub remote_daily_budget_minor_units: Option<i64>,
    /// Same denomination rules as `remote_daily_budget_minor_units`.
    pub remote_lifetime_budget_minor_units: Option<i64>,
    pub currency: Currency,
    pub audience: Audience,
    pub creatives: Creatives,
    pub settings: CampaignSettings,
    pub metrics: Metrics,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// True when the record points at a campaign the Graph API has confirmed.
    #[must_use]
    pub fn is_remote_linked(&self) -> bool {
        !is_local_only_id(&self.remote_campaign_id)
    }
}

/// Create request as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewCampaign {
    pub name: String,
    pub objective: String,
    pub daily_budget: Decimal,
    pub lifetime_budget: Option<Decimal>,
    /// Free text; unknown values fall back to `PAUSED`.
    pub status: Option<String>,
    pub audience: Audience,
    pub creatives: Creatives,
    pub settings: CampaignSettings,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// JSON keys a client may change on an existing campaign.
pub const UPDATABLE_FIELDS: [&str; 8] = [
    "name",
    "dailyBudget",
    "lifetimeBudget",
    "objective",
    "audience",
    "creatives",
    "settings",
    "status",
];

/// Whitelisted partial update of a campaign.
///
/// Build one with [`CampaignUpdate::from_json`] so that identity fields such
/// as `ownerId` or `remoteCampaignId` are dropped and reported instead of
/// being applied.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignUpdate {
    pub name: Option<String>,
    pub daily_budget: Option<Decimal>,
    pub lifetime_budget: Option<Decimal>,
    pub objective: Option<String>,
    pub audience: Option<Audience>,
    pub creatives: Option<Creatives>,
    pub settings: Option<CampaignSettings>,
    pub status: Option<CampaignStatus>,
}

impl CampaignUpdate {
    /// Splits a raw JSON body into an update and the list of keys that were
    /// ignored because they are not updatable.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPatch`] if the body is not an object or a
    /// whitelisted key holds a value of the wrong shape.
    pub fn from_json(body: Value) -> Result<(Self, Vec<String>), CoreError> {
        let Value::Object(fields) = body else {
            return Err(CoreError::InvalidPatch(
                "request body must be a JSON object".to_string(),
            ));
        };

        let mut accepted = Map::new();
        let mut rejected = Vec::new();
        for (key, value) in fields {
            if UPDATABLE_FIELDS.contains(&key.as_str()) {
                accepted.insert(key, value);
            } else {
                rejected.push(key);
            }
        }
        rejected.sort();

        let update = serde_json::from_value(Value::Object(accepted))
            .map_err(|e| CoreError::InvalidPatch(e.to_string()))?;
        Ok((update, rejected))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == CampaignUpdate::default()
    }

    /// True when at least one field the Graph API accepts on update is set.
    #[must_use]
    pub fn touches_remote_fields(&self) -> bool {
        self.name.is_some()
            || self.daily_budget.is_some()
            || self.lifetime_budget.is_some()
            || self.status.is_some()
    }

    pub fn apply_to(&self, campaign: &mut Campaign) {
        if let Some(name) = &self.name {
            campaign.name.clone_from(name);
        }
        if let Some(daily_budget) = self.daily_budget {
            campaign.daily_budget = daily_budget;
        }
        if let Some(lifetime_budget) = self.lifetime_budget {
            campaign.lifetime_budget = Some(lifetime_budget);
        }
        if let Some(objective) = &self.objective {
            campaign.objective.clone_from(objective);
        }
        if let Some(audience) = &self.audience {
            campaign.audience = audience.clone();
        }
        if let Some(creatives) = &self.creatives {
            campaign.creatives = creatives.clone();
        }
        if let Some(settings) = &self.settings {
            campaign.settings = settings.clone();
        }
        if let Some(status) = self.status {
            campaign.status = status;
        }
    }
}
