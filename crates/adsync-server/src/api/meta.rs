use adsync_core::{CredentialUpdate, Currency};
use adsync_meta::CredentialCheck;
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{campaign_view, map_store_error, map_sync_error, ApiError, ApiResponse, AppState};
use crate::middleware::{CurrentUser, RequestId};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateAndSyncBody {
    #[serde(default)]
    meta_access_token: String,
    #[serde(default)]
    meta_ad_account_id: String,
    meta_page_id: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SyncStats {
    new: usize,
    updated: usize,
    errors: usize,
    total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncData {
    message: String,
    total: usize,
    campaigns: Vec<Value>,
    sync_stats: SyncStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateAndSyncData {
    message: &'static str,
    synced_campaigns: usize,
    meta_ad_account_id: Option<String>,
    currency: Currency,
}

fn sync_message(created: usize, updated: usize, considered: usize) -> String {
    if considered == 0 {
        return "No campaigns found in your Meta Ad Account".to_string();
    }
    format!("Synced {created} new campaigns, updated {updated} existing campaigns")
}

pub(super) async fn sync_campaigns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<SyncData>>, ApiError> {
    let report = state
        .engine
        .sync_all(&user.owner())
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        SyncData {
            message: sync_message(report.created, report.updated, report.total),
            total: report.campaigns.len(),
            campaigns: report.campaigns.iter().map(campaign_view).collect(),
            sync_stats: SyncStats {
                new: report.created,
                updated: report.updated,
                errors: report.errors,
                total: report.total,
            },
        },
    )))
}

/// Stores new credentials and currency, then syncs a bounded number of
/// remote campaigns. Listing failures are logged and reported as zero synced.
pub(super) async fn update_and_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<UpdateAndSyncBody>,
) -> Result<Json<ApiResponse<UpdateAndSyncData>>, ApiError> {
    let currency = match body.currency.as_deref().map(str::trim) {
        None | Some("") => Currency::Usd,
        Some(code) => code
            .parse::<Currency>()
            .map_err(|e| ApiError::new(&req_id.0, "validation_error", e.to_string()))?,
    };
    let update = CredentialUpdate {
        access_token: body.meta_access_token.trim().to_string(),
        ad_account_id: body.meta_ad_account_id.trim().to_string(),
        page_id: body.meta_page_id,
        currency: Some(currency),
    };
    let updated = state
        .users
        .set_meta_credentials(user.id, &update)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    let synced = match state
        .engine
        .sync_bounded(&updated.owner(), state.sync_bounded_limit)
        .await
    {
        Ok(report) => report.created + report.updated,
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "post-credential sync failed");
            0
        }
    };

    Ok(Json(ApiResponse::new(
        req_id.0,
        UpdateAndSyncData {
            message: "Meta credentials updated successfully",
            synced_campaigns: synced,
            meta_ad_account_id: updated.meta_ad_account_id,
            currency: updated.currency,
        },
    )))
}

pub(super) async fn validate_credentials(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<CredentialCheck>>, ApiError> {
    let check = state
        .engine
        .validate_credentials(&user.owner())
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), e))?;
    Ok(Json(ApiResponse::new(req_id.0, check)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_account_gets_its_own_message() {
        assert_eq!(sync_message(0, 0, 0), "No campaigns found in your Meta Ad Account");
        assert_eq!(
            sync_message(2, 1, 3),
            "Synced 2 new campaigns, updated 1 existing campaigns"
        );
    }
}
