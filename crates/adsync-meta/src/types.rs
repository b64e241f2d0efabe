//! Graph API payloads and the values the client hands back to callers.
//!
//! Wire types (`Raw*`) mirror Graph's JSON, where numbers frequently arrive as
//! strings. Public types carry parsed values.

use adsync_core::{CampaignStatus, Currency};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Campaign listing
// ---------------------------------------------------------------------------

/// `{ "data": [...], "paging": {...} }` list envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCampaign {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub daily_budget: Option<Value>,
    #[serde(default)]
    pub lifetime_budget: Option<Value>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub updated_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAccountCurrency {
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCreated {
    pub id: String,
}

/// A campaign as listed under an ad account.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCampaign {
    pub id: String,
    pub name: String,
    /// Graph's effective status token, e.g. `ACTIVE`, `PAUSED`, `ARCHIVED`.
    pub status: String,
    pub objective: Option<String>,
    pub daily_budget_minor_units: Option<i64>,
    pub lifetime_budget_minor_units: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_time: Option<DateTime<Utc>>,
    pub updated_time: Option<DateTime<Utc>>,
    /// Currency of the ad account; budgets are minor units of it.
    pub currency: Currency,
}

impl RemoteCampaign {
    pub(crate) fn from_raw(raw: RawCampaign, currency: Currency) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            status: raw.status.to_ascii_uppercase(),
            objective: raw.objective,
            daily_budget_minor_units: raw.daily_budget.as_ref().and_then(value_to_i64),
            lifetime_budget_minor_units: raw.lifetime_budget.as_ref().and_then(value_to_i64),
            start_time: raw.start_time.as_deref().and_then(parse_graph_time),
            end_time: raw.end_time.as_deref().and_then(parse_graph_time),
            created_time: raw.created_time.as_deref().and_then(parse_graph_time),
            updated_time: raw.updated_time.as_deref().and_then(parse_graph_time),
            currency,
        }
    }
}

// ---------------------------------------------------------------------------
// Insights
// ---------------------------------------------------------------------------

/// Performance counters summed over the requested range. Money values are
/// major units of the account currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub impressions: i64,
    pub clicks: i64,
    pub ctr: Decimal,
    pub spend: Decimal,
    pub conversions: i64,
    pub cpc: Decimal,
    pub cpm: Decimal,
    pub reach: i64,
    pub frequency: Decimal,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Status tokens Graph accepts on campaign writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    Active,
    Paused,
    Archived,
    Deleted,
}

impl RemoteStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteStatus::Active => "ACTIVE",
            RemoteStatus::Paused => "PAUSED",
            RemoteStatus::Archived => "ARCHIVED",
            RemoteStatus::Deleted => "DELETED",
        }
    }

    /// `STOPPED` has no Graph equivalent and is sent as `ARCHIVED`.
    #[must_use]
    pub fn from_local(status: CampaignStatus) -> Self {
        match status {
            CampaignStatus::Active => RemoteStatus::Active,
            CampaignStatus::Paused => RemoteStatus::Paused,
            CampaignStatus::Stopped => RemoteStatus::Archived,
            CampaignStatus::Deleted => RemoteStatus::Deleted,
        }
    }

    /// Inverse of [`RemoteStatus::from_local`] over Graph's listing tokens.
    #[must_use]
    pub fn to_local(token: &str) -> Option<CampaignStatus> {
        match token.to_ascii_uppercase().as_str() {
            "ACTIVE" => Some(CampaignStatus::Active),
            "PAUSED" => Some(CampaignStatus::Paused),
            "ARCHIVED" => Some(CampaignStatus::Stopped),
            "DELETED" => Some(CampaignStatus::Deleted),
            _ => None,
        }
    }
}

/// Input to `create_campaign`. Budgets are display amounts in `currency`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateCampaignSpec {
    pub name: String,
    pub objective: String,
    /// Free text; anything but `ACTIVE` is sent as `PAUSED`.
    pub status: Option<String>,
    pub daily_budget: Decimal,
    pub lifetime_budget: Option<Decimal>,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCampaign {
    pub id: String,
    pub objective: String,
    pub status: RemoteStatus,
    /// Account currency the budgets below are denominated in.
    pub currency: Currency,
    pub daily_budget_minor_units: i64,
    pub lifetime_budget_minor_units: Option<i64>,
}

/// Fields Graph accepts on a campaign update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCampaignPatch {
    pub name: Option<String>,
    pub daily_budget_minor_units: Option<i64>,
    pub lifetime_budget_minor_units: Option<i64>,
    pub status: Option<RemoteStatus>,
}

impl RemoteCampaignPatch {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(name) = &self.name {
            params.push(("name", name.clone()));
        }
        if let Some(daily) = self.daily_budget_minor_units {
            params.push(("daily_budget", daily.to_string()));
        }
        if let Some(lifetime) = self.lifetime_budget_minor_units {
            params.push(("lifetime_budget", lifetime.to_string()));
        }
        if let Some(status) = self.status {
            params.push(("status", status.as_str().to_string()));
        }
        params
    }
}

// ---------------------------------------------------------------------------
// Credential validation
// ---------------------------------------------------------------------------

/// Outcome of probing a token and ad account. Never an error: failures are
/// reported through `valid` and `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_account: Option<Value>,
    pub permissions: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Lenient value parsing
// ---------------------------------------------------------------------------

/// Accepts `123`, `"123"`, or `"123.0"`.
pub(crate) fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok()).and_then(decimal_to_i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<Decimal>().ok().and_then(decimal_to_i64))
        }
        _ => None,
    }
}

pub(crate) fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok())),
        Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    }
}

fn decimal_to_i64(d: Decimal) -> Option<i64> {
    use rust_decimal::prelude::ToPrimitive;
    d.round().to_i64()
}

/// Graph timestamps look like `2024-01-15T10:00:00+0000`.
pub(crate) fn parse_graph_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lenient_integer_parsing() {
        assert_eq!(value_to_i64(&json!(500)), Some(500));
        assert_eq!(value_to_i64(&json!("500")), Some(500));
        assert_eq!(value_to_i64(&json!("500.0")), Some(500));
        assert_eq!(value_to_i64(&json!(null)), None);
        assert_eq!(value_to_i64(&json!("abc")), None);
    }

    #[test]
    fn graph_time_without_colon_in_offset() {
        let t = parse_graph_time("2024-01-15T10:00:00+0000").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-01-15T10:00:00+00:00");
        assert!(parse_graph_time("2024-01-15T10:00:00Z").is_some());
        assert!(parse_graph_time("yesterday").is_none());
    }

    #[test]
    fn raw_campaign_budgets_parse_from_strings() {
        let raw: RawCampaign = serde_json::from_value(json!({
            "id": "120",
            "name": "Launch",
            "status": "active",
            "daily_budget": "2500",
        }))
        .unwrap();
        let campaign = RemoteCampaign::from_raw(raw, Currency::Usd);
        assert_eq!(campaign.status, "ACTIVE");
        assert_eq!(campaign.daily_budget_minor_units, Some(2500));
        assert_eq!(campaign.lifetime_budget_minor_units, None);
    }

    #[test]
    fn status_mapping_round_trips() {
        for status in [
            CampaignStatus::Active,
            CampaignStatus::Paused,
            CampaignStatus::Stopped,
            CampaignStatus::Deleted,
        ] {
            let token = RemoteStatus::from_local(status).as_str();
            assert_eq!(RemoteStatus::to_local(token), Some(status));
        }
        assert_eq!(RemoteStatus::to_local("IN_PROCESS"), None);
    }

    #[test]
    fn patch_params_include_only_set_fields() {
        let patch = RemoteCampaignPatch {
            name: Some("New".to_string()),
            status: Some(RemoteStatus::Paused),
            ..RemoteCampaignPatch::default()
        };
        assert_eq!(
            patch.to_params(),
            vec![("name", "New".to_string()), ("status", "PAUSED".to_string())]
        );
        assert!(RemoteCampaignPatch::default().to_params().is_empty());
    }
}
