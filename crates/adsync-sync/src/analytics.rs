//! Read-only aggregates over an owner's stored campaigns.

use adsync_core::currency;
use adsync_core::{
    Campaign, CampaignFilter, CampaignStatus, CampaignStore, Currency, Metrics, Owner, Page,
    PageRequest, Period, TrendBucket,
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use uuid::Uuid;

use crate::error::SyncError;

/// Days the single-campaign daily average is spread over.
const DAILY_AVERAGE_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyticsQuery {
    pub period: Period,
    pub status: Option<CampaignStatus>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total: u64,
    pub active: u64,
    pub total_spend: Decimal,
    pub total_spend_formatted: String,
    pub currency: Currency,
    pub period: Period,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignListAnalytics {
    pub campaigns: Page<Campaign>,
    pub summary: AnalyticsSummary,
    pub trends: Vec<TrendBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAverage {
    pub impressions: Decimal,
    pub clicks: Decimal,
    pub spend: Decimal,
    pub spend_formatted: String,
    pub conversions: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignAnalytics {
    pub campaign: Campaign,
    pub period: Period,
    pub daily_average: DailyAverage,
    pub currency: Currency,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

fn per_day(total: Decimal) -> Decimal {
    (total / Decimal::from(DAILY_AVERAGE_DAYS))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Cached metrics spread evenly over a week.
#[must_use]
pub fn daily_average(metrics: &Metrics, currency: Currency) -> DailyAverage {
    let spend = per_day(metrics.spend);
    DailyAverage {
        impressions: per_day(Decimal::from(metrics.impressions)),
        clicks: per_day(Decimal::from(metrics.clicks)),
        spend_formatted: currency::format(spend, currency),
        spend,
        conversions: per_day(Decimal::from(metrics.conversions)),
    }
}

/// Paged campaign list plus summary counts and a daily trend series for the
/// query's period.
///
/// # Errors
///
/// Returns [`SyncError::Persistence`] if any store query fails.
pub async fn campaign_list_analytics(
    store: &dyn CampaignStore,
    owner: &Owner,
    query: AnalyticsQuery,
    now: DateTime<Utc>,
) -> Result<CampaignListAnalytics, SyncError> {
    let filter = CampaignFilter {
        status: query.status,
    };
    let window = query.period.window(now);

    let campaigns = store.find(owner.id, &filter, query.page).await?;
    let counts = store.count_by_status(owner.id, &filter).await?;
    let total_spend = store.sum_spend(owner.id, &filter).await?;
    let trends = store.daily_trends(owner.id, &filter, window).await?;

    tracing::debug!(
        owner_id = %owner.id,
        period = %query.period,
        total = counts.total,
        buckets = trends.len(),
        "campaign analytics computed"
    );

    Ok(CampaignListAnalytics {
        campaigns,
        summary: AnalyticsSummary {
            total: counts.total,
            active: counts.active,
            total_spend,
            total_spend_formatted: currency::format(total_spend, owner.currency),
            currency: owner.currency,
            period: query.period,
            start_date: window.start,
            end_date: window.end,
        },
        trends,
    })
}

/// Analytics for one owner-scoped campaign.
///
/// # Errors
///
/// [`SyncError::NotFound`] when the campaign is absent or owned by someone
/// else, [`SyncError::Persistence`] on store failure.
pub async fn campaign_analytics(
    store: &dyn CampaignStore,
    owner: &Owner,
    id: Uuid,
    period: Period,
    now: DateTime<Utc>,
) -> Result<CampaignAnalytics, SyncError> {
    let campaign = store
        .find_one(owner.id, id)
        .await?
        .ok_or(SyncError::NotFound)?;
    let window = period.window(now);
    Ok(CampaignAnalytics {
        daily_average: daily_average(&campaign.metrics, owner.currency),
        campaign,
        period,
        currency: owner.currency,
        start_date: window.start,
        end_date: window.end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_average_divides_by_seven() {
        let metrics = Metrics {
            impressions: 700,
            clicks: 70,
            ctr: Decimal::new(10, 0),
            spend: Decimal::new(1400, 0),
            conversions: 10,
        };
        let avg = daily_average(&metrics, Currency::Pkr);
        assert_eq!(avg.impressions, Decimal::new(100, 0));
        assert_eq!(avg.clicks, Decimal::new(10, 0));
        assert_eq!(avg.spend, Decimal::new(200, 0));
        assert_eq!(avg.spend_formatted, "₨200.00");
        assert_eq!(avg.conversions, Decimal::new(143, 2));
    }

    #[test]
    fn zero_metrics_average_to_zero() {
        let avg = daily_average(&Metrics::default(), Currency::Usd);
        assert!(avg.spend.is_zero());
        assert_eq!(avg.spend_formatted, "$0.00");
    }
}
