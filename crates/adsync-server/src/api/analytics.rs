use adsync_core::{currency, Currency, Metrics, PageRequest, Period, TrendBucket};
use adsync_sync::{
    campaign_analytics, campaign_list_analytics, AnalyticsQuery, AnalyticsSummary, DailyAverage,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{
    campaign_view, map_sync_error, parse_period, parse_status_filter, ApiError, ApiResponse,
    AppState,
};
use crate::middleware::{CurrentUser, RequestId};

#[derive(Debug, Deserialize)]
pub(super) struct AnalyticsListQuery {
    period: Option<String>,
    status: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PeriodQuery {
    period: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TrendPoint {
    date: NaiveDate,
    impressions: i64,
    clicks: i64,
    spend: Decimal,
    spend_formatted: String,
    conversions: i64,
    count: u64,
}

impl TrendPoint {
    fn new(bucket: TrendBucket, currency: Currency) -> Self {
        Self {
            date: bucket.date,
            impressions: bucket.impressions,
            clicks: bucket.clicks,
            spend_formatted: currency::format(bucket.spend, currency),
            spend: bucket.spend,
            conversions: bucket.conversions,
            count: bucket.count,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct AnalyticsListData {
    campaigns: Vec<Value>,
    analytics: AnalyticsSummary,
    trends: Vec<TrendPoint>,
    page: u32,
    pages: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CampaignAnalyticsData {
    campaign_id: String,
    name: String,
    period: Period,
    campaign: Value,
    metrics: Metrics,
    daily_average: DailyAverage,
    currency: Currency,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

pub(super) async fn list_campaign_analytics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<AnalyticsListQuery>,
) -> Result<Json<ApiResponse<AnalyticsListData>>, ApiError> {
    let query = AnalyticsQuery {
        period: parse_period(&req_id.0, query.period.as_deref())?,
        status: parse_status_filter(&req_id.0, query.status.as_deref())?,
        page: PageRequest::new(query.page, query.limit),
    };
    let owner = user.owner();
    let result = campaign_list_analytics(state.engine.store().as_ref(), &owner, query, Utc::now())
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), e))?;

    let pages = result.campaigns.pages();
    Ok(Json(ApiResponse::new(
        req_id.0,
        AnalyticsListData {
            campaigns: result.campaigns.items.iter().map(campaign_view).collect(),
            trends: result
                .trends
                .into_iter()
                .map(|bucket| TrendPoint::new(bucket, owner.currency))
                .collect(),
            analytics: result.summary,
            page: result.campaigns.page,
            pages,
        },
    )))
}

pub(super) async fn get_campaign_analytics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ApiResponse<CampaignAnalyticsData>>, ApiError> {
    let id = id
        .parse::<Uuid>()
        .map_err(|_| ApiError::new(&req_id.0, "validation_error", "campaign id must be a UUID"))?;
    let period = parse_period(&req_id.0, query.period.as_deref())?;
    let result = campaign_analytics(
        state.engine.store().as_ref(),
        &user.owner(),
        id,
        period,
        Utc::now(),
    )
    .await
    .map_err(|e| map_sync_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        CampaignAnalyticsData {
            campaign_id: result.campaign.remote_campaign_id.clone(),
            name: result.campaign.name.clone(),
            period: result.period,
            campaign: campaign_view(&result.campaign),
            metrics: result.campaign.metrics.clone(),
            daily_average: result.daily_average,
            currency: result.currency,
            start_date: result.start_date,
            end_date: result.end_date,
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_point_formats_spend_in_owner_currency() {
        let bucket = TrendBucket {
            date: NaiveDate::from_ymd_opt(2026, 3, 1).expect("date"),
            impressions: 10,
            clicks: 2,
            spend: Decimal::new(140_000, 2),
            conversions: 1,
            count: 1,
        };
        let point = TrendPoint::new(bucket, Currency::Pkr);
        assert_eq!(point.spend_formatted, "₨1,400.00");
        let json = serde_json::to_value(&point).expect("serialize");
        assert_eq!(json["spendFormatted"], "₨1,400.00");
        assert_eq!(json["date"], "2026-03-01");
    }
}
