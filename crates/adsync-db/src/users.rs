//! Database operations for the `users` table.

use adsync_core::user::normalize_email;
use adsync_core::{CredentialUpdate, Currency, NewUser, Role, User};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, meta_access_token, \
     meta_ad_account_id, meta_page_id, company_name, currency, created_at";

/// A row from the `users` table.
#[derive(Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub meta_access_token: Option<String>,
    pub meta_ad_account_id: Option<String>,
    pub meta_page_id: Option<String>,
    pub company_name: Option<String>,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(|e| DbError::Decode {
            column: "role",
            reason: e.to_string(),
        })?;
        let currency = row.currency.parse::<Currency>().map_err(|e| DbError::Decode {
            column: "currency",
            reason: e.to_string(),
        })?;
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            meta_access_token: row.meta_access_token,
            meta_ad_account_id: row.meta_ad_account_id,
            meta_page_id: row.meta_page_id,
            company_name: row.company_name,
            currency,
            created_at: row.created_at,
        })
    }
}

/// Inserts a user with a normalized email.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, including a unique
/// violation on `email`.
pub async fn create_user(pool: &PgPool, user: &NewUser) -> Result<User, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO users (id, name, email, password_hash, role, company_name, currency) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user.name.trim())
    .bind(normalize_email(&user.email))
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(&user.company_name)
    .bind(user.currency.code())
    .fetch_one(pool)
    .await?;
    User::try_from(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(normalize_email(email))
    .fetch_optional(pool)
    .await?;
    row.map(User::try_from).transpose()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<Option<User>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(User::try_from).transpose()
}

/// Stores Graph credentials. `page_id` and `currency` are only overwritten
/// when supplied.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the user does not exist.
pub async fn set_meta_credentials(
    pool: &PgPool,
    id: Uuid,
    update: &CredentialUpdate,
) -> Result<User, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "UPDATE users \
         SET meta_access_token  = $2, \
             meta_ad_account_id = $3, \
             meta_page_id       = COALESCE($4, meta_page_id), \
             currency           = COALESCE($5, currency) \
         WHERE id = $1 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(&update.access_token)
    .bind(&update.ad_account_id)
    .bind(&update.page_id)
    .bind(update.currency.map(Currency::code))
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    User::try_from(row)
}

/// Users with the `client` role, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_clients(pool: &PgPool) -> Result<Vec<User>, DbError> {
    let rows = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role = 'client' ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(User::try_from).collect()
}
