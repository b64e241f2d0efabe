//! Database operations for the `campaigns` table.

use adsync_core::{
    AdminCampaignFilter, Audience, Campaign, CampaignFilter, CampaignSettings, CampaignStatus,
    Creatives, Currency, Metrics, OwnedCampaign, OwnerSummary, PageRequest, StatusCounts,
    TimeWindow, TrendBucket,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

const CAMPAIGN_COLUMNS: &str = "c.id, c.owner_id, c.remote_campaign_id, c.name, c.status, \
     c.objective, c.remote_objective, c.daily_budget, c.lifetime_budget, \
     c.remote_daily_budget_minor_units, c.remote_lifetime_budget_minor_units, c.currency, \
     c.audience, c.creatives, c.settings, c.impressions, c.clicks, c.ctr, c.spend, \
     c.conversions, c.start_time, c.end_time, c.last_synced_at, c.created_at, c.updated_at";

/// A row from the `campaigns` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub remote_campaign_id: String,
    pub name: String,
    pub status: String,
    pub objective: String,
    pub remote_objective: Option<String>,
    pub daily_budget: Decimal,
    pub lifetime_budget: Option<Decimal>,
    pub remote_daily_budget_minor_units: Option<i64>,
    pub remote_lifetime_budget_minor_units: Option<i64>,
    pub currency: String,
    pub audience: Json<Audience>,
    pub creatives: Json<Creatives>,
    pub settings: Json<CampaignSettings>,
    pub impressions: i64,
    pub clicks: i64,
    pub ctr: Decimal,
    pub spend: Decimal,
    pub conversions: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = DbError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<CampaignStatus>()
            .map_err(|e| DbError::Decode {
                column: "status",
                reason: e.to_string(),
            })?;
        let currency = row.currency.parse::<Currency>().map_err(|e| DbError::Decode {
            column: "currency",
            reason: e.to_string(),
        })?;
        Ok(Campaign {
            id: row.id,
            owner_id: row.owner_id,
            remote_campaign_id: row.remote_campaign_id,
            name: row.name,
            status,
            objective: row.objective,
            remote_objective: row.remote_objective,
            daily_budget: row.daily_budget,
            lifetime_budget: row.lifetime_budget,
            remote_daily_budget_minor_units: row.remote_daily_budget_minor_units,
            remote_lifetime_budget_minor_units: row.remote_lifetime_budget_minor_units,
            currency,
            audience: row.audience.0,
            creatives: row.creatives.0,
            settings: row.settings.0,
            metrics: Metrics {
                impressions: row.impressions,
                clicks: row.clicks,
                ctr: row.ctr,
                spend: row.spend,
                conversions: row.conversions,
            },
            start_time: row.start_time,
            end_time: row.end_time,
            last_synced_at: row.last_synced_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A campaign row joined with its owner's public profile.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OwnedCampaignRow {
    #[sqlx(flatten)]
    pub campaign: CampaignRow,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_company_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct TrendRow {
    date: NaiveDate,
    impressions: i64,
    clicks: i64,
    spend: Decimal,
    conversions: i64,
    count: i64,
}

fn to_campaigns(rows: Vec<CampaignRow>) -> Result<Vec<Campaign>, DbError> {
    rows.into_iter().map(Campaign::try_from).collect()
}

fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

fn status_param(status: Option<CampaignStatus>) -> Option<&'static str> {
    status.map(CampaignStatus::as_str)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns one page of an owner's campaigns, newest first, and the total
/// number of matching rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails or [`DbError::Decode`] on a
/// malformed row.
pub async fn list_campaigns(
    pool: &PgPool,
    owner_id: Uuid,
    filter: &CampaignFilter,
    page: PageRequest,
) -> Result<(Vec<Campaign>, u64), DbError> {
    let status = status_param(filter.status);
    let rows = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns c \
         WHERE c.owner_id = $1 AND ($2::TEXT IS NULL OR c.status = $2) \
         ORDER BY c.created_at DESC, c.id DESC \
         LIMIT $3 OFFSET $4"
    ))
    .bind(owner_id)
    .bind(status)
    .bind(i64::from(page.limit))
    .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM campaigns \
         WHERE owner_id = $1 AND ($2::TEXT IS NULL OR status = $2)",
    )
    .bind(owner_id)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok((to_campaigns(rows)?, count_to_u64(total)))
}

/// Returns every campaign the owner has, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_all_campaigns(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Campaign>, DbError> {
    let rows = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns c \
         WHERE c.owner_id = $1 \
         ORDER BY c.created_at DESC, c.id DESC"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    to_campaigns(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_campaign(
    pool: &PgPool,
    owner_id: Uuid,
    id: Uuid,
) -> Result<Option<Campaign>, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns c WHERE c.id = $1 AND c.owner_id = $2"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;
    row.map(Campaign::try_from).transpose()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_campaign_by_remote_id(
    pool: &PgPool,
    owner_id: Uuid,
    remote_campaign_id: &str,
) -> Result<Option<Campaign>, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns c \
         WHERE c.owner_id = $1 AND c.remote_campaign_id = $2"
    ))
    .bind(owner_id)
    .bind(remote_campaign_id)
    .fetch_optional(pool)
    .await?;
    row.map(Campaign::try_from).transpose()
}

/// Inserts a campaign and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, including a unique
/// violation on `(owner_id, remote_campaign_id)`.
pub async fn insert_campaign(pool: &PgPool, campaign: &Campaign) -> Result<Campaign, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "WITH c AS ( \
           INSERT INTO campaigns \
             (id, owner_id, remote_campaign_id, name, status, objective, remote_objective, \
              daily_budget, lifetime_budget, remote_daily_budget_minor_units, \
              remote_lifetime_budget_minor_units, currency, audience, creatives, settings, \
              impressions, clicks, ctr, spend, conversions, start_time, end_time, \
              last_synced_at, created_at, updated_at) \
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                   $16, $17, $18, $19, $20, $21, $22, $23, $24, $25) \
           RETURNING * \
         ) SELECT {CAMPAIGN_COLUMNS} FROM c"
    ))
    .bind(campaign.id)
    .bind(campaign.owner_id)
    .bind(&campaign.remote_campaign_id)
    .bind(&campaign.name)
    .bind(campaign.status.as_str())
    .bind(&campaign.objective)
    .bind(&campaign.remote_objective)
    .bind(campaign.daily_budget)
    .bind(campaign.lifetime_budget)
    .bind(campaign.remote_daily_budget_minor_units)
    .bind(campaign.remote_lifetime_budget_minor_units)
    .bind(campaign.currency.code())
    .bind(Json(&campaign.audience))
    .bind(Json(&campaign.creatives))
    .bind(Json(&campaign.settings))
    .bind(campaign.metrics.impressions)
    .bind(campaign.metrics.clicks)
    .bind(campaign.metrics.ctr)
    .bind(campaign.metrics.spend)
    .bind(campaign.metrics.conversions)
    .bind(campaign.start_time)
    .bind(campaign.end_time)
    .bind(campaign.last_synced_at)
    .bind(campaign.created_at)
    .bind(campaign.updated_at)
    .fetch_one(pool)
    .await?;
    Campaign::try_from(row)
}

/// Overwrites the mutable columns of an owner's campaign. Identity columns
/// (`id`, `owner_id`, `remote_campaign_id`, `created_at`) are never written.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the owner has no such campaign.
pub async fn update_campaign(
    pool: &PgPool,
    owner_id: Uuid,
    id: Uuid,
    campaign: &Campaign,
) -> Result<Campaign, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "WITH c AS ( \
           UPDATE campaigns \
           SET name = $3, status = $4, objective = $5, remote_objective = $6, \
               daily_budget = $7, lifetime_budget = $8, \
               remote_daily_budget_minor_units = $9, remote_lifetime_budget_minor_units = $10, \
               currency = $11, audience = $12, creatives = $13, settings = $14, \
               impressions = $15, clicks = $16, ctr = $17, spend = $18, conversions = $19, \
               start_time = $20, end_time = $21, last_synced_at = $22, updated_at = NOW() \
           WHERE id = $1 AND owner_id = $2 \
           RETURNING * \
         ) SELECT {CAMPAIGN_COLUMNS} FROM c"
    ))
    .bind(id)
    .bind(owner_id)
    .bind(&campaign.name)
    .bind(campaign.status.as_str())
    .bind(&campaign.objective)
    .bind(&campaign.remote_objective)
    .bind(campaign.daily_budget)
    .bind(campaign.lifetime_budget)
    .bind(campaign.remote_daily_budget_minor_units)
    .bind(campaign.remote_lifetime_budget_minor_units)
    .bind(campaign.currency.code())
    .bind(Json(&campaign.audience))
    .bind(Json(&campaign.creatives))
    .bind(Json(&campaign.settings))
    .bind(campaign.metrics.impressions)
    .bind(campaign.metrics.clicks)
    .bind(campaign.metrics.ctr)
    .bind(campaign.metrics.spend)
    .bind(campaign.metrics.conversions)
    .bind(campaign.start_time)
    .bind(campaign.end_time)
    .bind(campaign.last_synced_at)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Campaign::try_from(row)
}

/// Returns `true` if a row was removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_campaign(pool: &PgPool, owner_id: Uuid, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM campaigns WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Decode`] if a
/// stored status is unknown.
pub async fn count_campaigns_by_status(
    pool: &PgPool,
    owner_id: Uuid,
    filter: &CampaignFilter,
) -> Result<StatusCounts, DbError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM campaigns \
         WHERE owner_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
         GROUP BY status",
    )
    .bind(owner_id)
    .bind(status_param(filter.status))
    .fetch_all(pool)
    .await?;

    let mut counts = StatusCounts::default();
    for (status, count) in rows {
        let status = status.parse::<CampaignStatus>().map_err(|e| DbError::Decode {
            column: "status",
            reason: e.to_string(),
        })?;
        counts.add(status, count_to_u64(count));
    }
    Ok(counts)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sum_campaign_spend(
    pool: &PgPool,
    owner_id: Uuid,
    filter: &CampaignFilter,
) -> Result<Decimal, DbError> {
    let total = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(spend), 0) FROM campaigns \
         WHERE owner_id = $1 AND ($2::TEXT IS NULL OR status = $2)",
    )
    .bind(owner_id)
    .bind(status_param(filter.status))
    .fetch_one(pool)
    .await?;
    Ok(total)
}

/// Sums metrics per UTC day of `last_synced_at` inside `window`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn campaign_daily_trends(
    pool: &PgPool,
    owner_id: Uuid,
    filter: &CampaignFilter,
    window: TimeWindow,
) -> Result<Vec<TrendBucket>, DbError> {
    let rows = sqlx::query_as::<_, TrendRow>(
        "SELECT (last_synced_at AT TIME ZONE 'UTC')::DATE AS date, \
                COALESCE(SUM(impressions), 0)::BIGINT AS impressions, \
                COALESCE(SUM(clicks), 0)::BIGINT AS clicks, \
                COALESCE(SUM(spend), 0) AS spend, \
                COALESCE(SUM(conversions), 0)::BIGINT AS conversions, \
                COUNT(*) AS count \
         FROM campaigns \
         WHERE owner_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
           AND last_synced_at >= $3 AND last_synced_at < $4 \
         GROUP BY 1 \
         ORDER BY 1",
    )
    .bind(owner_id)
    .bind(status_param(filter.status))
    .bind(window.start)
    .bind(window.end)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| TrendBucket {
            date: r.date,
            impressions: r.impressions,
            clicks: r.clicks,
            spend: r.spend,
            conversions: r.conversions,
            count: count_to_u64(r.count),
        })
        .collect())
}

/// Admin listing across all owners, joined with each owner's profile.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn list_campaigns_unscoped(
    pool: &PgPool,
    filter: &AdminCampaignFilter,
    page: PageRequest,
) -> Result<(Vec<OwnedCampaign>, u64), DbError> {
    let status = status_param(filter.status);
    let rows = sqlx::query_as::<_, OwnedCampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS}, u.name AS owner_name, u.email AS owner_email, \
                u.company_name AS owner_company_name \
         FROM campaigns c \
         JOIN users u ON u.id = c.owner_id \
         WHERE ($1::UUID IS NULL OR c.owner_id = $1) AND ($2::TEXT IS NULL OR c.status = $2) \
         ORDER BY c.created_at DESC, c.id DESC \
         LIMIT $3 OFFSET $4"
    ))
    .bind(filter.owner_id)
    .bind(status)
    .bind(i64::from(page.limit))
    .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM campaigns \
         WHERE ($1::UUID IS NULL OR owner_id = $1) AND ($2::TEXT IS NULL OR status = $2)",
    )
    .bind(filter.owner_id)
    .bind(status)
    .fetch_one(pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| {
            let owner = OwnerSummary {
                id: row.campaign.owner_id,
                name: row.owner_name,
                email: row.owner_email,
                company_name: row.owner_company_name,
            };
            Campaign::try_from(row.campaign).map(|campaign| OwnedCampaign { campaign, owner })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((items, count_to_u64(total)))
}
