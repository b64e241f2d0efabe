use super::*;

fn test_client(base_url: &str) -> MetaClient {
    MetaClient::with_base_url(30, base_url).expect("client construction should not fail")
}

fn spec(daily: &str, currency: Currency) -> CreateCampaignSpec {
    CreateCampaignSpec {
        name: "Launch".to_string(),
        objective: "LINK_CLICKS".to_string(),
        status: None,
        daily_budget: daily.parse().expect("decimal"),
        lifetime_budget: None,
        currency,
    }
}

#[test]
fn endpoint_appends_path_under_versioned_base() {
    let client = test_client("https://graph.facebook.com/v18.0");
    let url = client.endpoint("act_42/campaigns", "tok", &[("limit", "100")]);
    assert_eq!(
        url.as_str(),
        "https://graph.facebook.com/v18.0/act_42/campaigns?access_token=tok&limit=100"
    );
}

#[test]
fn endpoint_tolerates_trailing_slash() {
    let client = test_client("https://graph.facebook.com/v18.0/");
    let url = client.endpoint("me", "tok", &[]);
    assert_eq!(
        url.as_str(),
        "https://graph.facebook.com/v18.0/me?access_token=tok"
    );
}

#[test]
fn endpoint_encodes_query_values() {
    let client = test_client("https://graph.facebook.com/v18.0");
    let url = client.endpoint("1/insights", "t&k", &[("time_range", "{\"since\":\"x\"}")]);
    assert!(url.as_str().contains("access_token=t%26k"), "{url}");
    assert!(!url.as_str().contains('"'), "{url}");
}

#[test]
fn invalid_base_url_is_rejected() {
    assert!(matches!(
        MetaClient::with_base_url(30, "not a url"),
        Err(MetaError::InvalidBaseUrl { .. })
    ));
}

#[test]
fn account_path_adds_prefix_once() {
    assert_eq!(account_path("123"), "act_123");
    assert_eq!(account_path("act_123"), "act_123");
    assert_eq!(account_path(" 123 "), "act_123");
}

#[test]
fn create_status_defaults_to_paused() {
    assert_eq!(create_status(None), RemoteStatus::Paused);
    assert_eq!(create_status(Some("active")), RemoteStatus::Active);
    assert_eq!(create_status(Some("STOPPED")), RemoteStatus::Paused);
    assert_eq!(create_status(Some("")), RemoteStatus::Paused);
}

#[test]
fn create_budgets_convert_to_account_minor_units() {
    let (daily, lifetime) = create_budgets(&spec("1400", Currency::Pkr), Currency::Usd);
    assert_eq!(daily, 500);
    assert_eq!(lifetime, None);
}

#[test]
fn create_budgets_apply_daily_floor() {
    // 10 PKR is about 3.6 US cents.
    let (daily, _) = create_budgets(&spec("10", Currency::Pkr), Currency::Usd);
    assert_eq!(daily, DAILY_BUDGET_FLOOR_MINOR_UNITS);
}

#[test]
fn create_budgets_skip_non_positive_lifetime() {
    let mut s = spec("20", Currency::Usd);
    s.lifetime_budget = Some(Decimal::ZERO);
    assert_eq!(create_budgets(&s, Currency::Usd).1, None);
    s.lifetime_budget = Some(Decimal::new(150, 0));
    assert_eq!(create_budgets(&s, Currency::Usd).1, Some(15_000));
}
