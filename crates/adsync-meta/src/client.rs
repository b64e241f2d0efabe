//! HTTP client for the Meta Graph Marketing API.
//!
//! Wraps `reqwest` with Graph-specific error decoding, `act_` path handling,
//! and lenient parsing of Graph's stringly-typed numbers. Every request
//! carries the caller's `access_token` as a query parameter; URLs are never
//! logged because of that.

use std::time::Duration;

use adsync_core::currency::local_to_minor_units;
use adsync_core::{AppConfig, Currency, RemoteCredential, DEFAULT_META_BASE_URL};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Url};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::MetaError;
use crate::insights::summarize;
use crate::objective::remap_objective;
use crate::platform::AdPlatform;
use crate::types::{
    CreateCampaignSpec, CreatedCampaign, CredentialCheck, Insights, ListResponse,
    RawAccountCurrency, RawCampaign, RawCreated, RemoteCampaign, RemoteCampaignPatch,
    RemoteStatus,
};

/// Literal prefix Graph expects on ad account ids in paths.
pub const ACCOUNT_PREFIX: &str = "act_";

/// Graph rejects daily budgets below one major unit.
pub const DAILY_BUDGET_FLOOR_MINOR_UNITS: i64 = 100;

const CAMPAIGN_FIELDS: &str =
    "id,name,status,objective,daily_budget,lifetime_budget,start_time,end_time,created_time,updated_time";
const INSIGHT_FIELDS: &str = "impressions,clicks,ctr,spend,conversions,cpc,cpm,frequency,reach";
const CAMPAIGN_LIST_LIMIT: &str = "100";
const SPECIAL_AD_CATEGORIES: &str = "[]";
const BUYING_TYPE: &str = "AUCTION";
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Adds the `act_` prefix unless it is already present.
#[must_use]
pub fn account_path(ad_account_id: &str) -> String {
    let id = ad_account_id.trim();
    if id.starts_with(ACCOUNT_PREFIX) {
        id.to_string()
    } else {
        format!("{ACCOUNT_PREFIX}{id}")
    }
}

/// Client for the Graph Marketing API.
///
/// Use [`MetaClient::new`] for production or [`MetaClient::with_base_url`] to
/// point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct MetaClient {
    client: Client,
    base_url: Url,
}

impl MetaClient {
    /// Creates a client pointed at the production Graph API.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::Unavailable`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64) -> Result<Self, MetaError> {
        Self::with_base_url(timeout_secs, DEFAULT_META_BASE_URL)
    }

    /// Creates a client from the application's Meta settings.
    ///
    /// # Errors
    ///
    /// See [`MetaClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, MetaError> {
        Self::with_base_url(config.meta_timeout_secs, &config.meta_base_url)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::Unavailable`] if the `reqwest::Client` cannot be
    /// built, or [`MetaError::InvalidBaseUrl`] if `base_url` does not parse as
    /// a hierarchical URL.
    pub fn with_base_url(timeout_secs: u64, base_url: &str) -> Result<Self, MetaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent("adsync/0.1 (campaign-sync)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| MetaError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(MetaError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "URL cannot carry a path".to_string(),
            });
        }

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    /// Builds `<base>/<path>?access_token=..&<extra>` with each path segment
    /// and query value percent-encoded.
    fn endpoint(&self, path: &str, access_token: &str, extra: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("access_token", access_token);
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    /// Sends the request and parses the body as JSON, decoding Graph error
    /// envelopes on non-2xx responses.
    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Value, MetaError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(MetaError::from_response(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(|e| MetaError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }

    fn parse<T: DeserializeOwned>(body: Value, context: &str) -> Result<T, MetaError> {
        serde_json::from_value(body).map_err(|e| MetaError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }

    /// Looks up the account currency, falling back to USD on any failure.
    async fn account_currency(&self, credential: &RemoteCredential) -> Currency {
        let account = account_path(&credential.ad_account_id);
        let url = self.endpoint(&account, &credential.access_token, &[("fields", "currency")]);
        let result = self
            .send(self.client.get(url), "account currency")
            .await
            .and_then(|body| Self::parse::<RawAccountCurrency>(body, "account currency"));
        match result {
            Ok(RawAccountCurrency {
                currency: Some(code),
            }) => {
                let currency = Currency::from_code_or_usd(&code);
                if currency.code() != code.trim().to_ascii_uppercase() {
                    tracing::warn!(%code, "unsupported account currency; treating amounts as USD");
                }
                currency
            }
            Ok(_) => Currency::Usd,
            Err(e) => {
                tracing::warn!(account = %account, error = %e, "could not fetch account currency; using USD");
                Currency::Usd
            }
        }
    }

    async fn insights(
        &self,
        access_token: &str,
        remote_id: &str,
        range: &[(&str, &str)],
    ) -> Result<Insights, MetaError> {
        let mut params = vec![("fields", INSIGHT_FIELDS), ("time_increment", "1")];
        params.extend_from_slice(range);
        let url = self.endpoint(&format!("{remote_id}/insights"), access_token, &params);
        let context = format!("insights({remote_id})");
        let body = self.send(self.client.get(url), &context).await?;
        let rows: ListResponse<Value> = Self::parse(body, &context)?;
        Ok(summarize(&rows.data))
    }

    async fn permissions(&self, access_token: &str) -> Vec<Value> {
        let url = self.endpoint("me/permissions", access_token, &[]);
        match self.send(self.client.get(url), "me/permissions").await {
            Ok(body) => Self::parse::<ListResponse<Value>>(body, "me/permissions")
                .map(|list| list.data)
                .unwrap_or_default(),
            Err(e) => {
                tracing::debug!(error = %e, "permission lookup failed");
                Vec::new()
            }
        }
    }
}

fn create_status(requested: Option<&str>) -> RemoteStatus {
    match requested.map(|s| s.trim().to_ascii_uppercase()) {
        None => RemoteStatus::Paused,
        Some(s) if s == "ACTIVE" => RemoteStatus::Active,
        Some(s) if s == "PAUSED" => RemoteStatus::Paused,
        Some(other) => {
            tracing::warn!(status = %other, "status not accepted on create; using PAUSED");
            RemoteStatus::Paused
        }
    }
}

fn create_budgets(spec: &CreateCampaignSpec, account: Currency) -> (i64, Option<i64>) {
    let daily = local_to_minor_units(spec.daily_budget, spec.currency, account)
        .max(DAILY_BUDGET_FLOOR_MINOR_UNITS);
    let lifetime = spec
        .lifetime_budget
        .filter(|b| *b > Decimal::ZERO)
        .map(|b| local_to_minor_units(b, spec.currency, account));
    (daily, lifetime)
}

#[async_trait]
impl AdPlatform for MetaClient {
    async fn list_campaigns(
        &self,
        credential: &RemoteCredential,
    ) -> Result<Vec<RemoteCampaign>, MetaError> {
        let account = account_path(&credential.ad_account_id);
        let url = self.endpoint(
            &format!("{account}/campaigns"),
            &credential.access_token,
            &[("fields", CAMPAIGN_FIELDS), ("limit", CAMPAIGN_LIST_LIMIT)],
        );
        let body = self.send(self.client.get(url), "list campaigns").await?;
        let list: ListResponse<RawCampaign> = Self::parse(body, "list campaigns")?;
        tracing::debug!(account = %account, count = list.data.len(), "listed remote campaigns");

        if list.data.is_empty() {
            return Ok(Vec::new());
        }
        let currency = self.account_currency(credential).await;
        Ok(list
            .data
            .into_iter()
            .map(|raw| RemoteCampaign::from_raw(raw, currency))
            .collect())
    }

    async fn fetch_insights(
        &self,
        access_token: &str,
        remote_id: &str,
        date_preset: &str,
    ) -> Result<Insights, MetaError> {
        self.insights(access_token, remote_id, &[("date_preset", date_preset)])
            .await
    }

    async fn fetch_insights_range(
        &self,
        access_token: &str,
        remote_id: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Insights, MetaError> {
        let time_range = serde_json::json!({
            "since": since.format("%Y-%m-%d").to_string(),
            "until": until.format("%Y-%m-%d").to_string(),
        })
        .to_string();
        self.insights(access_token, remote_id, &[("time_range", &time_range)])
            .await
    }

    async fn create_campaign(
        &self,
        credential: &RemoteCredential,
        spec: &CreateCampaignSpec,
    ) -> Result<CreatedCampaign, MetaError> {
        let objective = remap_objective(&spec.objective);
        let status = create_status(spec.status.as_deref());
        let currency = self.account_currency(credential).await;
        let (daily, lifetime) = create_budgets(spec, currency);

        let daily_param = daily.to_string();
        let lifetime_param = lifetime.map(|l| l.to_string());
        let mut params = vec![
            ("name", spec.name.as_str()),
            ("objective", objective.as_str()),
            ("status", status.as_str()),
            ("special_ad_categories", SPECIAL_AD_CATEGORIES),
            ("buying_type", BUYING_TYPE),
            ("daily_budget", daily_param.as_str()),
        ];
        if let Some(lifetime) = lifetime_param.as_deref() {
            params.push(("lifetime_budget", lifetime));
        }

        let account = account_path(&credential.ad_account_id);
        let url = self.endpoint(
            &format!("{account}/campaigns"),
            &credential.access_token,
            &params,
        );
        let body = self.send(self.client.post(url), "create campaign").await?;
        let created: RawCreated = Self::parse(body, "create campaign")?;

        tracing::info!(
            remote_id = %created.id,
            objective = objective.as_str(),
            status = status.as_str(),
            currency = currency.code(),
            daily_budget_minor_units = daily,
            "created remote campaign"
        );

        Ok(CreatedCampaign {
            id: created.id,
            objective: objective.as_str().to_string(),
            status,
            currency,
            daily_budget_minor_units: daily,
            lifetime_budget_minor_units: lifetime,
        })
    }

    async fn update_campaign(
        &self,
        access_token: &str,
        remote_id: &str,
        patch: &RemoteCampaignPatch,
    ) -> Result<(), MetaError> {
        let owned = patch.to_params();
        let params: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let url = self.endpoint(remote_id, access_token, &params);
        self.send(self.client.post(url), "update campaign").await?;
        Ok(())
    }

    async fn set_status(
        &self,
        access_token: &str,
        remote_id: &str,
        status: RemoteStatus,
    ) -> Result<(), MetaError> {
        let url = self.endpoint(remote_id, access_token, &[("status", status.as_str())]);
        self.send(self.client.post(url), "set status").await?;
        Ok(())
    }

    async fn delete_campaign(&self, access_token: &str, remote_id: &str) -> Result<(), MetaError> {
        let url = self.endpoint(remote_id, access_token, &[]);
        self.send(self.client.delete(url), "delete campaign").await?;
        Ok(())
    }

    async fn validate_credential(&self, credential: &RemoteCredential) -> CredentialCheck {
        let token = &credential.access_token;
        let failed = |e: &MetaError| CredentialCheck {
            valid: false,
            error: Some(e.user_message()),
            ..CredentialCheck::default()
        };

        let me_url = self.endpoint("me", token, &[("fields", "id,name")]);
        let user = match self.send(self.client.get(me_url), "me").await {
            Ok(user) => user,
            Err(e) => return failed(&e),
        };

        let account_url = self.endpoint(
            &account_path(&credential.ad_account_id),
            token,
            &[("fields", "id,name,account_status,currency")],
        );
        let ad_account = match self.send(self.client.get(account_url), "ad account").await {
            Ok(account) => account,
            Err(e) => return failed(&e),
        };

        CredentialCheck {
            valid: true,
            user: Some(user),
            ad_account: Some(ad_account),
            permissions: self.permissions(token).await,
            error: None,
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
