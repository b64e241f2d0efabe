use adsync_core::{CredentialUpdate, Currency, NewUser, Role, User};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{map_store_error, ApiError, ApiResponse, AppState};
use crate::auth::{hash_password, verify_password, AuthError};
use crate::middleware::{CurrentUser, RequestId};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RegisterBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    role: Option<Role>,
    company_name: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MetaCredentialsBody {
    #[serde(default)]
    meta_access_token: String,
    #[serde(default)]
    meta_ad_account_id: String,
    meta_page_id: Option<String>,
}

/// Public view of a user; never carries the password hash or raw token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserProfile {
    id: Uuid,
    name: String,
    email: String,
    role: Role,
    company_name: Option<String>,
    currency: Currency,
    meta_ad_account_id: Option<String>,
    has_meta_token: bool,
    has_meta_ad_account: bool,
    created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            company_name: user.company_name.clone(),
            currency: user.currency,
            meta_ad_account_id: user.meta_ad_account_id.clone(),
            has_meta_token: user.has_meta_token(),
            has_meta_ad_account: user.has_meta_ad_account(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SessionData {
    message: &'static str,
    user: UserProfile,
    token: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ProfileData {
    user: UserProfile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CredentialsData {
    message: &'static str,
    meta_ad_account_id: Option<String>,
}

pub(super) fn profile(user: &User) -> UserProfile {
    UserProfile::from(user)
}

fn internal(req_id: &str, error: &AuthError) -> ApiError {
    tracing::error!(error = %error, "authentication internals failed");
    ApiError::new(req_id, "internal_error", "authentication failed")
}

async fn hash_off_thread(req_id: &str, password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password hashing task failed");
            ApiError::new(req_id, "internal_error", "authentication failed")
        })?
        .map_err(|e| internal(req_id, &e))
}

async fn verify_off_thread(req_id: &str, password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password verification task failed");
            ApiError::new(req_id, "internal_error", "authentication failed")
        })?
        .map_err(|e| internal(req_id, &e))
}

pub(super) async fn register(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<ApiResponse<SessionData>>), ApiError> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "Name, email and password are required",
        ));
    }
    let role = body.role.unwrap_or(Role::Client);
    if role == Role::Admin && !state.allow_admin_signup {
        return Err(ApiError::new(
            req_id.0,
            "forbidden",
            "Admin accounts cannot be self-registered",
        ));
    }
    let currency = match body.currency.as_deref() {
        None => Currency::Usd,
        Some(code) => code
            .parse::<Currency>()
            .map_err(|e| ApiError::new(&req_id.0, "validation_error", e.to_string()))?,
    };

    let existing = state
        .users
        .find_user_by_email(&body.email)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;
    if existing.is_some() {
        return Err(ApiError::new(req_id.0, "validation_error", "User already exists"));
    }

    let password_hash = hash_off_thread(&req_id.0, body.password).await?;
    let user = state
        .users
        .create_user(NewUser {
            name: body.name,
            email: body.email,
            password_hash,
            role,
            company_name: body.company_name.filter(|c| !c.trim().is_empty()),
            currency,
        })
        .await
        .map_err(|e| match e {
            adsync_core::StoreError::Conflict(_) => {
                ApiError::new(&req_id.0, "validation_error", "User already exists")
            }
            other => map_store_error(req_id.0.clone(), &other),
        })?;
    let token = state.tokens.issue(&user).map_err(|e| internal(&req_id.0, &e))?;
    tracing::info!(user_id = %user.id, role = %user.role, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            req_id.0,
            SessionData {
                message: "Registration successful!",
                user: profile(&user),
                token,
            },
        )),
    ))
}

pub(super) async fn login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<LoginBody>,
) -> Result<Json<ApiResponse<SessionData>>, ApiError> {
    let invalid = || ApiError::new(&req_id.0, "unauthorized", "Invalid credentials");

    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(invalid());
    }
    let user = state
        .users
        .find_user_by_email(&body.email)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?
        .ok_or_else(invalid)?;

    if !verify_off_thread(&req_id.0, body.password, user.password_hash.clone()).await? {
        tracing::debug!(user_id = %user.id, "login rejected");
        return Err(invalid());
    }
    let token = state.tokens.issue(&user).map_err(|e| internal(&req_id.0, &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0.clone(),
        SessionData {
            message: "Login successful!",
            user: profile(&user),
            token,
        },
    )))
}

pub(super) async fn me(
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<ApiResponse<ProfileData>> {
    Json(ApiResponse::new(
        req_id.0,
        ProfileData {
            user: profile(&user),
        },
    ))
}

pub(super) async fn update_meta_credentials(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<MetaCredentialsBody>,
) -> Result<Json<ApiResponse<CredentialsData>>, ApiError> {
    let update = CredentialUpdate {
        access_token: body.meta_access_token.trim().to_string(),
        ad_account_id: body.meta_ad_account_id.trim().to_string(),
        page_id: body.meta_page_id,
        currency: None,
    };
    let updated = state
        .users
        .set_meta_credentials(user.id, &update)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;
    tracing::info!(user_id = %user.id, connected = updated.owner().credential.is_some(), "meta credentials updated");

    Ok(Json(ApiResponse::new(
        req_id.0,
        CredentialsData {
            message: "Meta credentials updated successfully",
            meta_ad_account_id: updated.meta_ad_account_id,
        },
    )))
}
