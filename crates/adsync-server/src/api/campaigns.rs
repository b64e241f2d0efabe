use adsync_core::{CampaignFilter, CampaignStatus, CampaignUpdate, NewCampaign, PageRequest};
use adsync_sync::{RemoteOutcome, SkipReason};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{
    campaign_view, map_store_error, map_sync_error, parse_status_filter, ApiError, ApiResponse,
    AppState,
};
use crate::middleware::{CurrentUser, RequestId};

#[derive(Debug, Deserialize)]
pub(super) struct CampaignListQuery {
    status: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusBody {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Serialize)]
pub(super) struct CampaignListData {
    campaigns: Vec<Value>,
    total: u64,
    page: u32,
    pages: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateData {
    message: String,
    campaign: Value,
    #[serde(flatten)]
    remote: RemoteOutcome,
    meta_campaign_id: Option<String>,
    meta_objective: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MutationData {
    message: &'static str,
    campaign: Value,
    #[serde(flatten)]
    remote: RemoteOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rejected_fields: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DeleteData {
    message: &'static str,
    campaign_id: Uuid,
    campaign_name: String,
    remote_deleted: bool,
    #[serde(flatten)]
    remote: RemoteOutcome,
}

fn invalid_id(req_id: &str) -> ApiError {
    ApiError::new(req_id, "validation_error", "campaign id must be a UUID")
}

fn parse_id(req_id: &str, raw: &str) -> Result<Uuid, ApiError> {
    raw.parse().map_err(|_| invalid_id(req_id))
}

fn create_message(name: &str, remote: &RemoteOutcome) -> String {
    match remote {
        RemoteOutcome::Synced => {
            format!("Campaign \"{name}\" created in Meta Business and the local database")
        }
        RemoteOutcome::Failed(reason) => {
            format!("Campaign \"{name}\" created locally only. {reason}")
        }
        RemoteOutcome::Skipped(_) => {
            format!("Campaign \"{name}\" created locally only. Connect Meta account to sync.")
        }
    }
}

fn status_message(remote: &RemoteOutcome) -> &'static str {
    if remote.is_synced() {
        "Campaign status updated locally and on Meta Ads"
    } else {
        "Campaign status updated locally (Meta sync not available)"
    }
}

fn update_message(remote: &RemoteOutcome) -> &'static str {
    match remote {
        RemoteOutcome::Synced => "Campaign updated locally and synced with Meta Ads",
        RemoteOutcome::Skipped(SkipReason::NothingToSync) => "Campaign updated locally",
        _ => "Campaign updated locally (Meta sync not available)",
    }
}

pub(super) async fn list_campaigns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<CampaignListQuery>,
) -> Result<Json<ApiResponse<CampaignListData>>, ApiError> {
    let filter = CampaignFilter {
        status: parse_status_filter(&req_id.0, query.status.as_deref())?,
    };
    let page = state
        .engine
        .store()
        .find(user.id, &filter, PageRequest::new(query.page, query.limit))
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        CampaignListData {
            campaigns: page.items.iter().map(campaign_view).collect(),
            total: page.total,
            page: page.page,
            pages: page.pages(),
        },
    )))
}

pub(super) async fn create_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<NewCampaign>,
) -> Result<(StatusCode, Json<ApiResponse<CreateData>>), ApiError> {
    let outcome = state
        .engine
        .create(&user.owner(), body)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), e))?;

    let campaign = &outcome.campaign;
    let linked = campaign.is_remote_linked();
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            req_id.0,
            CreateData {
                message: create_message(&campaign.name, &outcome.remote),
                campaign: campaign_view(campaign),
                meta_campaign_id: linked.then(|| campaign.remote_campaign_id.clone()),
                meta_objective: campaign.remote_objective.clone(),
                remote: outcome.remote,
            },
        )),
    ))
}

pub(super) async fn update_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<MutationData>>, ApiError> {
    let id = parse_id(&req_id.0, &id)?;
    let (update, rejected) = CampaignUpdate::from_json(body)
        .map_err(|e| ApiError::new(&req_id.0, "validation_error", e.to_string()))?;

    let outcome = state
        .engine
        .update(&user.owner(), id, update, rejected)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        MutationData {
            message: update_message(&outcome.remote),
            campaign: campaign_view(&outcome.campaign),
            remote: outcome.remote,
            rejected_fields: outcome.rejected_fields,
        },
    )))
}

pub(super) async fn update_campaign_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<ApiResponse<MutationData>>, ApiError> {
    let id = parse_id(&req_id.0, &id)?;
    let status = body
        .status
        .parse::<CampaignStatus>()
        .map_err(|e| ApiError::new(&req_id.0, "validation_error", e.to_string()))?;

    let outcome = state
        .engine
        .set_status(&user.owner(), id, status)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        MutationData {
            message: status_message(&outcome.remote),
            campaign: campaign_view(&outcome.campaign),
            remote: outcome.remote,
            rejected_fields: outcome.rejected_fields,
        },
    )))
}

pub(super) async fn delete_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeleteData>>, ApiError> {
    let id = parse_id(&req_id.0, &id)?;
    let outcome = state
        .engine
        .delete(&user.owner(), id)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), e))?;

    let remote_deleted = outcome.remote_deleted();
    Ok(Json(ApiResponse::new(
        req_id.0,
        DeleteData {
            message: if remote_deleted {
                "Campaign deleted locally and from Meta Business"
            } else {
                "Campaign deleted locally (Meta sync not available or local campaign)"
            },
            campaign_id: id,
            campaign_name: outcome.campaign_name,
            remote_deleted,
            remote: outcome.remote,
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_message_reflects_remote_outcome() {
        assert!(create_message("Spring", &RemoteOutcome::Synced).contains("Meta Business"));
        let failed = create_message("Spring", &RemoteOutcome::Failed("token expired".into()));
        assert_eq!(failed, "Campaign \"Spring\" created locally only. token expired");
        let skipped = create_message("Spring", &RemoteOutcome::Skipped(SkipReason::NoCredentials));
        assert!(skipped.ends_with("Connect Meta account to sync."));
    }

    #[test]
    fn update_message_distinguishes_local_only_patches() {
        assert_eq!(
            update_message(&RemoteOutcome::Skipped(SkipReason::NothingToSync)),
            "Campaign updated locally"
        );
        assert_eq!(
            update_message(&RemoteOutcome::Skipped(SkipReason::NotLinked)),
            "Campaign updated locally (Meta sync not available)"
        );
    }

    #[test]
    fn malformed_id_is_a_validation_error() {
        let err = parse_id("req-1", "abc").expect_err("not a uuid");
        assert_eq!(err.code, "validation_error");
    }
}
