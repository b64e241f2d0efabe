use adsync_core::{AdminCampaignFilter, OwnedCampaign, PageRequest};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::auth::{profile, UserProfile};
use super::{campaign_view, map_store_error, parse_status_filter, ApiError, ApiResponse, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AdminCampaignQuery {
    client_id: Option<Uuid>,
    status: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(super) struct ClientListData {
    clients: Vec<UserProfile>,
    total: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct AdminCampaignListData {
    campaigns: Vec<Value>,
    total: u64,
    page: u32,
    pages: u64,
}

/// Campaign view with the owning client embedded under `client`.
fn owned_view(owned: &OwnedCampaign) -> Value {
    let mut view = campaign_view(&owned.campaign);
    if let Value::Object(fields) = &mut view {
        fields.insert(
            "client".to_string(),
            serde_json::to_value(&owned.owner).unwrap_or_default(),
        );
    }
    view
}

pub(super) async fn list_clients(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ClientListData>>, ApiError> {
    let clients = state
        .users
        .list_clients()
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        ClientListData {
            total: clients.len(),
            clients: clients.iter().map(profile).collect(),
        },
    )))
}

pub(super) async fn list_all_campaigns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<AdminCampaignQuery>,
) -> Result<Json<ApiResponse<AdminCampaignListData>>, ApiError> {
    let filter = AdminCampaignFilter {
        owner_id: query.client_id,
        status: parse_status_filter(&req_id.0, query.status.as_deref())?,
    };
    let page = state
        .engine
        .store()
        .find_unscoped(&filter, PageRequest::new(query.page, query.limit))
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        AdminCampaignListData {
            campaigns: page.items.iter().map(owned_view).collect(),
            total: page.total,
            page: page.page,
            pages: page.pages(),
        },
    )))
}
