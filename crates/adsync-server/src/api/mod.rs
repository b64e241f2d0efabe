mod admin;
mod analytics;
mod auth;
mod campaigns;
mod meta;

use std::sync::Arc;
use std::time::Duration;

use adsync_core::{
    currency, AppConfig, Campaign, CampaignStatus, Period, StoreError, UserStore,
};
use adsync_sync::{SyncEngine, SyncError, CREDENTIALS_MISSING_MESSAGE};
use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::TokenKeys;
use crate::middleware::{
    enforce_rate_limit, request_id, require_admin, require_auth, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub engine: SyncEngine,
    pub tokens: TokenKeys,
    /// `None` when running against in-memory stores.
    pub pool: Option<PgPool>,
    pub sync_bounded_limit: usize,
    pub allow_admin_signup: bool,
}

impl AppState {
    /// Wires a Postgres-backed state from configuration.
    pub fn from_config(
        config: &AppConfig,
        pool: PgPool,
        platform: Arc<dyn adsync_meta::AdPlatform>,
    ) -> Self {
        let store = Arc::new(adsync_db::PgStore::new(pool.clone()));
        Self {
            users: store.clone(),
            engine: SyncEngine::new(platform, store),
            tokens: TokenKeys::new(&config.jwt_secret, config.jwt_ttl_secs),
            pool: Some(pool),
            sync_bounded_limit: config.sync_bounded_limit,
            allow_admin_signup: config.env.is_development(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Self {
        Self {
            success: true,
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: message.into(),
            code: code.into(),
            details: None,
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" | "credentials_missing" | "remote_rejected" => {
                StatusCode::BAD_REQUEST
            }
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "remote_unavailable" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_store_error(request_id: String, error: &StoreError) -> ApiError {
    match error {
        StoreError::NotFound => ApiError::new(request_id, "not_found", "record not found"),
        StoreError::Conflict(message) => ApiError::new(request_id, "conflict", message.clone()),
        StoreError::Backend(_) => {
            tracing::error!(error = %error, "database operation failed");
            ApiError::new(request_id, "internal_error", "database operation failed")
        }
    }
}

pub(super) fn map_sync_error(request_id: String, error: SyncError) -> ApiError {
    match error {
        SyncError::Validation(message) => ApiError::new(request_id, "validation_error", message),
        SyncError::CredentialsMissing => {
            ApiError::new(request_id, "credentials_missing", CREDENTIALS_MISSING_MESSAGE)
        }
        SyncError::NotFound => ApiError::new(request_id, "not_found", "Campaign not found"),
        SyncError::Remote(e) => {
            let code = if e.is_unavailable() {
                "remote_unavailable"
            } else {
                "remote_rejected"
            };
            tracing::warn!(error = %e, code, "remote listing failed");
            ApiError::new(request_id, code, format!("Meta API Error: {}", e.user_message()))
        }
        SyncError::Persistence(e) => map_store_error(request_id, &e),
    }
}

/// `None`, empty and `ALL` mean no status filter.
pub(super) fn parse_status_filter(
    request_id: &str,
    raw: Option<&str>,
) -> Result<Option<CampaignStatus>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("ALL") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|e: adsync_core::CoreError| {
                ApiError::new(request_id, "validation_error", e.to_string())
            }),
    }
}

pub(super) fn parse_period(request_id: &str, raw: Option<&str>) -> Result<Period, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Period::default()),
        Some(s) => s.parse().map_err(|e: adsync_core::CoreError| {
            ApiError::new(request_id, "validation_error", e.to_string())
        }),
    }
}

/// A campaign as sent to clients: the stored record plus display strings.
pub(super) fn campaign_view(campaign: &Campaign) -> Value {
    let mut view = serde_json::to_value(campaign).unwrap_or_default();
    if let Value::Object(fields) = &mut view {
        fields.insert(
            "dailyBudgetFormatted".to_string(),
            Value::String(currency::format(campaign.daily_budget, campaign.currency)),
        );
        fields.insert(
            "lifetimeBudgetFormatted".to_string(),
            Value::String(currency::format(
                campaign.lifetime_budget.unwrap_or_default(),
                campaign.currency,
            )),
        );
        fields.insert(
            "isRemoteLinked".to_string(),
            Value::Bool(campaign.is_remote_linked()),
        );
        if let Some(Value::Object(metrics)) = fields.get_mut("metrics") {
            metrics.insert(
                "spendFormatted".to_string(),
                Value::String(currency::format(campaign.metrics.spend, campaign.currency)),
            );
        }
    }
    view
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/api/clients/admin/clients", get(admin::list_clients))
        .route("/api/clients/admin/campaigns", get(admin::list_all_campaigns))
        .layer(axum::middleware::from_fn(require_admin))
}

fn protected_router(state: &AppState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/meta-credentials", put(auth::update_meta_credentials))
        .route(
            "/api/ads/campaigns",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .route("/api/ads/campaigns/sync", get(meta::sync_campaigns))
        .route(
            "/api/ads/campaigns/analytics",
            get(analytics::list_campaign_analytics),
        )
        .route(
            "/api/ads/campaigns/{id}",
            put(campaigns::update_campaign).delete(campaigns::delete_campaign),
        )
        .route(
            "/api/ads/campaigns/{id}/status",
            put(campaigns::update_campaign_status),
        )
        .route(
            "/api/ads/campaigns/{id}/analytics",
            get(analytics::get_campaign_analytics),
        )
        .route("/api/ads/meta/update-and-sync", put(meta::update_and_sync))
        .route("/api/ads/meta/validate", get(meta::validate_credentials))
        .merge(admin_router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    require_auth,
                )),
        )
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(&state, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let Some(pool) = &state.pool else {
        return (
            StatusCode::OK,
            Json(ApiResponse::new(
                req_id.0,
                HealthData {
                    status: "ok",
                    database: "disabled",
                },
            )),
        );
    };

    match adsync_db::health_check(pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::new(
                req_id.0,
                HealthData {
                    status: "ok",
                    database: "ok",
                },
            )),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::new(
                    req_id.0,
                    HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                )),
            )
        }
    }
}

pub fn rate_limit_state(config: &AppConfig) -> RateLimitState {
    RateLimitState::new(
        usize::try_from(config.rate_limit_per_minute).unwrap_or(usize::MAX),
        Duration::from_secs(60),
    )
}
