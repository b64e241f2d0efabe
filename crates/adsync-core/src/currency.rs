//! Fixed-rate currency conversion and display formatting.
//!
//! Rates are expressed as units of the currency per one US dollar. There is no
//! live FX feed: amounts are converted once, when a campaign is synced or
//! written, and stored in the owner's display currency.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::CoreError;

const MINOR_UNITS_SCALE: u32 = 2;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Pkr,
    Eur,
    Gbp,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Usd, Currency::Pkr, Currency::Eur, Currency::Gbp];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Pkr => "PKR",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Pkr => "₨",
            Currency::Eur => "€",
            Currency::Gbp => "£",
        }
    }

    /// Units of this currency bought by one US dollar.
    #[must_use]
    pub fn units_per_usd(self) -> Decimal {
        match self {
            Currency::Usd => Decimal::ONE,
            Currency::Pkr => Decimal::new(280, 0),
            Currency::Eur => Decimal::new(92, 2),
            Currency::Gbp => Decimal::new(79, 2),
        }
    }

    /// Lenient parse used for values coming back from the Graph API, where an
    /// unknown account currency is treated as USD.
    #[must_use]
    pub fn from_code_or_usd(code: &str) -> Self {
        code.parse().unwrap_or_default()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "PKR" => Ok(Currency::Pkr),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            _ => Err(CoreError::UnsupportedCurrency(s.to_string())),
        }
    }
}

fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MINOR_UNITS_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Saturates at `Decimal::MAX` / `Decimal::MIN` instead of overflowing.
fn convert_exact(amount: Decimal, from: Currency, to: Currency) -> Decimal {
    if from == to {
        return amount;
    }
    amount
        .checked_div(from.units_per_usd())
        .and_then(|usd| usd.checked_mul(to.units_per_usd()))
        .unwrap_or_else(|| saturated(amount))
}

fn saturated(amount: Decimal) -> Decimal {
    if amount.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

/// Converts a major-unit amount between currencies, rounded to cents.
#[must_use]
pub fn convert(amount: Decimal, from: Currency, to: Currency) -> Decimal {
    round_cents(convert_exact(amount, from, to))
}

/// Converts a remote minor-unit amount (e.g. a Graph `daily_budget` of `500`
/// cents) in `source` currency into a display amount in `owner` currency.
#[must_use]
pub fn minor_units_to_local(minor_units: i64, owner: Currency, source: Currency) -> Decimal {
    if minor_units == 0 {
        return Decimal::ZERO;
    }
    convert(Decimal::new(minor_units, MINOR_UNITS_SCALE), source, owner)
}

/// Converts a remote major-unit amount (insight `spend`) into `owner` currency.
#[must_use]
pub fn amount_to_local(amount: Decimal, owner: Currency, source: Currency) -> Decimal {
    if amount.is_zero() {
        return Decimal::ZERO;
    }
    convert(amount, source, owner)
}

/// Inverse of [`minor_units_to_local`]: a display amount in `owner` currency
/// becomes integer minor units of `target`, rounded to the nearest unit.
///
/// Amounts too large for `i64` minor units saturate.
#[must_use]
pub fn local_to_minor_units(amount: Decimal, owner: Currency, target: Currency) -> i64 {
    let saturate = if amount.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    };
    convert_exact(amount, owner, target)
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|minor| minor.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|minor| minor.to_i64())
        .unwrap_or(saturate)
}

/// Renders `amount` as `<symbol><grouped>.<cents>`, e.g. `₨1,400.00`.
#[must_use]
pub fn format(amount: Decimal, currency: Currency) -> String {
    let rounded = round_cents(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!(
        "{sign}{}{}.{cents}",
        currency.symbol(),
        group_thousands(whole)
    )
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    #[test]
    fn zero_converts_to_zero_for_every_currency() {
        for currency in Currency::ALL {
            assert_eq!(minor_units_to_local(0, currency, Currency::Usd), Decimal::ZERO);
            assert_eq!(amount_to_local(Decimal::ZERO, currency, Currency::Usd), Decimal::ZERO);
        }
    }

    #[test]
    fn zero_formats_with_symbol_and_two_decimals() {
        for currency in Currency::ALL {
            let formatted = format(Decimal::ZERO, currency);
            assert_eq!(formatted, format!("{}0.00", currency.symbol()));
        }
    }

    #[test]
    fn pkr_budget_uses_fixed_rate() {
        let fifty_cents = minor_units_to_local(50, Currency::Pkr, Currency::Usd);
        assert_eq!(fifty_cents, dec("140.00"));
        assert_eq!(format(fifty_cents, Currency::Pkr), "₨140.00");

        let five_dollars = minor_units_to_local(500, Currency::Pkr, Currency::Usd);
        assert_eq!(five_dollars, dec("1400"));
        assert_eq!(format(five_dollars, Currency::Pkr), "₨1,400.00");
    }

    #[test]
    fn usd_minor_units_round_trip_within_one_cent() {
        for minor in [1_i64, 99, 100, 12_345, 987_654, 5_000_000] {
            for currency in Currency::ALL {
                let local = minor_units_to_local(minor, currency, Currency::Usd);
                let back = local_to_minor_units(local, currency, Currency::Usd);
                assert!(
                    (back - minor).abs() <= 1,
                    "{currency}: {minor} -> {local} -> {back}"
                );
            }
        }
    }

    #[test]
    fn converts_through_usd_between_non_usd_currencies() {
        // 280 PKR = 1 USD = 0.92 EUR
        assert_eq!(convert(dec("280"), Currency::Pkr, Currency::Eur), dec("0.92"));
    }

    #[test]
    fn non_usd_account_currency_is_respected() {
        // 1000 minor units of EUR = 10 EUR ≈ 10.87 USD
        assert_eq!(
            minor_units_to_local(1000, Currency::Usd, Currency::Eur),
            dec("10.87")
        );
    }

    #[test]
    fn local_to_minor_units_inverts_rate() {
        assert_eq!(local_to_minor_units(dec("1400"), Currency::Pkr, Currency::Usd), 500);
        assert_eq!(local_to_minor_units(dec("12.345"), Currency::Usd, Currency::Usd), 1235);
    }

    #[test]
    fn oversized_amounts_saturate_instead_of_overflowing() {
        let huge = Decimal::MAX / Decimal::TEN;
        assert_eq!(local_to_minor_units(huge, Currency::Usd, Currency::Usd), i64::MAX);
        assert_eq!(local_to_minor_units(huge, Currency::Usd, Currency::Pkr), i64::MAX);
        assert_eq!(local_to_minor_units(-huge, Currency::Pkr, Currency::Usd), i64::MIN);
        assert_eq!(convert(huge, Currency::Usd, Currency::Pkr), Decimal::MAX);
    }

    #[test]
    fn format_groups_thousands_and_rounds() {
        assert_eq!(format(dec("1234567.891"), Currency::Usd), "$1,234,567.89");
        assert_eq!(format(dec("999.995"), Currency::Gbp), "£1,000.00");
        assert_eq!(format(dec("12"), Currency::Eur), "€12.00");
    }

    #[test]
    fn format_negative_amount_places_sign_before_symbol() {
        assert_eq!(format(dec("-1500.5"), Currency::Usd), "-$1,500.50");
    }

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!("pkr".parse::<Currency>(), Ok(Currency::Pkr));
        assert_eq!(" GBP ".parse::<Currency>(), Ok(Currency::Gbp));
        assert!(matches!(
            "JPY".parse::<Currency>(),
            Err(CoreError::UnsupportedCurrency(_))
        ));
        assert_eq!(Currency::from_code_or_usd("JPY"), Currency::Usd);
    }

    #[test]
    fn serializes_as_upper_case_code() {
        let json = serde_json::to_string(&Currency::Pkr).expect("serialize");
        assert_eq!(json, "\"PKR\"");
    }
}
