//! Folding Graph's per-day insight rows into one [`Insights`] value.

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::types::{value_to_decimal, value_to_i64, Insights};

/// Reads an integer metric. Action metrics such as `conversions` arrive as
/// `[{"action_type": ..., "value": "3"}]` and are summed.
fn count_field(row: &Value, field: &str) -> i64 {
    match row.get(field) {
        Some(Value::Array(actions)) => actions
            .iter()
            .filter_map(|a| a.get("value").and_then(value_to_i64))
            .sum(),
        Some(v) => value_to_i64(v).unwrap_or(0),
        None => 0,
    }
}

fn money_field(row: &Value, field: &str) -> Decimal {
    row.get(field).and_then(value_to_decimal).unwrap_or_default()
}

fn ratio(numerator: Decimal, denominator: Decimal, scale: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    (numerator * scale / denominator)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sums daily rows and derives `ctr`, `cpc`, `cpm` and `frequency` from the
/// totals rather than averaging the per-day ratios.
#[must_use]
pub fn summarize(rows: &[Value]) -> Insights {
    let mut total = Insights::default();
    for row in rows {
        total.impressions += count_field(row, "impressions");
        total.clicks += count_field(row, "clicks");
        total.conversions += count_field(row, "conversions");
        total.reach += count_field(row, "reach");
        total.spend += money_field(row, "spend");
    }

    let impressions = Decimal::from(total.impressions);
    let clicks = Decimal::from(total.clicks);
    total.ctr = ratio(clicks, impressions, Decimal::ONE_HUNDRED);
    total.cpc = ratio(total.spend, clicks, Decimal::ONE);
    total.cpm = ratio(total.spend, impressions, Decimal::ONE_THOUSAND);
    total.frequency = ratio(impressions, Decimal::from(total.reach), Decimal::ONE);
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_rows_are_zero() {
        assert_eq!(summarize(&[]), Insights::default());
    }

    #[test]
    fn rows_are_summed_and_ratios_recomputed() {
        let rows = vec![
            json!({"impressions": "1000", "clicks": "10", "spend": "5.50", "reach": "800"}),
            json!({"impressions": "3000", "clicks": "30", "spend": "14.50", "reach": "1200",
                   "conversions": [{"action_type": "purchase", "value": "2"},
                                   {"action_type": "lead", "value": "1"}]}),
        ];
        let insights = summarize(&rows);
        assert_eq!(insights.impressions, 4000);
        assert_eq!(insights.clicks, 40);
        assert_eq!(insights.conversions, 3);
        assert_eq!(insights.spend, Decimal::new(2000, 2));
        assert_eq!(insights.ctr, Decimal::ONE);
        assert_eq!(insights.cpc, Decimal::new(50, 2));
        assert_eq!(insights.cpm, Decimal::new(500, 2));
        assert_eq!(insights.frequency, Decimal::new(200, 2));
    }

    #[test]
    fn zero_impressions_do_not_divide() {
        let insights = summarize(&[json!({"spend": "1.00"})]);
        assert_eq!(insights.ctr, Decimal::ZERO);
        assert_eq!(insights.cpc, Decimal::ZERO);
    }
}
