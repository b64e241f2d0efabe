//! Live integration tests for adsync-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/adsync-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory. Run with `--ignored` and `DATABASE_URL` set.

use adsync_core::{
    AdminCampaignFilter, Audience, Campaign, CampaignFilter, CampaignSettings, CampaignStatus,
    CampaignStore, Creatives, CredentialUpdate, Currency, Metrics, NewUser, PageRequest, Period,
    Role, StoreError, User, UserStore,
};
use adsync_db::PgStore;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_test_user(store: &PgStore, email: &str) -> User {
    store
        .create_user(NewUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Client,
            company_name: None,
            currency: Currency::Usd,
        })
        .await
        .unwrap_or_else(|e| panic!("insert_test_user failed for '{email}': {e}"))
}

fn campaign(owner_id: Uuid, remote_id: &str, status: CampaignStatus, spend: i64) -> Campaign {
    let now = Utc::now();
    Campaign {
        id: Uuid::new_v4(),
        owner_id,
        remote_campaign_id: remote_id.to_string(),
        name: format!("Campaign {remote_id}"),
        status,
        objective: "OUTCOME_TRAFFIC".to_string(),
        remote_objective: None,
        daily_budget: Decimal::TEN,
        lifetime_budget: None,
        remote_daily_budget_minor_units: Some(1000),
        remote_lifetime_budget_minor_units: None,
        currency: Currency::Usd,
        audience: Audience {
            age_min: Some(18),
            ..Audience::default()
        },
        creatives: Creatives::default(),
        settings: CampaignSettings::default(),
        metrics: Metrics {
            impressions: 100,
            clicks: 5,
            ctr: Decimal::new(500, 2),
            spend: Decimal::new(spend, 0),
            conversions: 1,
        },
        start_time: None,
        end_time: None,
        last_synced_at: now,
        created_at: now,
        updated_at: now,
    }
}

// ---------------------------------------------------------------------------
// Campaigns
// ---------------------------------------------------------------------------

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn insert_and_find_round_trips_jsonb_fields(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let user = insert_test_user(&store, "a@example.com").await;

    let stored = store
        .insert(campaign(user.id, "1", CampaignStatus::Active, 3))
        .await
        .expect("insert");
    let found = store
        .find_one(user.id, stored.id)
        .await
        .expect("query")
        .expect("present");
    assert_eq!(found.audience.age_min, Some(18));
    assert_eq!(found.metrics.spend, Decimal::new(3, 0));
    assert!(store
        .find_by_remote_id(user.id, "1")
        .await
        .expect("query")
        .is_some());
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_remote_id_per_owner_is_a_conflict(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let user = insert_test_user(&store, "a@example.com").await;

    store
        .insert(campaign(user.id, "1", CampaignStatus::Active, 0))
        .await
        .expect("first insert");
    let err = store
        .insert(campaign(user.id, "1", CampaignStatus::Paused, 0))
        .await
        .expect_err("duplicate");
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn update_keeps_identity_columns(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let user = insert_test_user(&store, "a@example.com").await;
    let stored = store
        .insert(campaign(user.id, "1", CampaignStatus::Active, 0))
        .await
        .expect("insert");

    let mut changed = stored.clone();
    changed.name = "Renamed".to_string();
    changed.owner_id = Uuid::new_v4();
    changed.remote_campaign_id = "999".to_string();
    let updated = store
        .update(user.id, stored.id, changed)
        .await
        .expect("update");
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.owner_id, user.id);
    assert_eq!(updated.remote_campaign_id, "1");

    let missing = store
        .update(user.id, Uuid::new_v4(), stored)
        .await
        .expect_err("absent");
    assert!(matches!(missing, StoreError::NotFound));
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn aggregates_respect_owner_and_filter(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let a = insert_test_user(&store, "a@example.com").await;
    let b = insert_test_user(&store, "b@example.com").await;
    for (i, status) in [CampaignStatus::Active, CampaignStatus::Active, CampaignStatus::Paused]
        .into_iter()
        .enumerate()
    {
        store
            .insert(campaign(a.id, &i.to_string(), status, 10))
            .await
            .expect("insert");
    }
    store
        .insert(campaign(b.id, "x", CampaignStatus::Active, 99))
        .await
        .expect("insert");

    let all = CampaignFilter::default();
    let counts = store.count_by_status(a.id, &all).await.expect("counts");
    assert_eq!((counts.total, counts.active, counts.paused), (3, 2, 1));
    assert_eq!(
        store.sum_spend(a.id, &all).await.expect("sum"),
        Decimal::new(30, 0)
    );

    let window = Period::Last7d.window(Utc::now() + chrono::Duration::minutes(1));
    let trends = store.daily_trends(a.id, &all, window).await.expect("trends");
    assert_eq!(trends.len(), 1);
    assert_eq!(trends[0].count, 3);
    assert_eq!(trends[0].impressions, 300);

    let page = store
        .find(a.id, &all, PageRequest::new(Some(2), Some(2)))
        .await
        .expect("page");
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);

    let unscoped = store
        .find_unscoped(&AdminCampaignFilter::default(), PageRequest::default())
        .await
        .expect("admin listing");
    assert_eq!(unscoped.total, 4);
    assert!(unscoped
        .items
        .iter()
        .any(|c| c.owner.email == "b@example.com"));
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn delete_is_owner_scoped(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let a = insert_test_user(&store, "a@example.com").await;
    let b = insert_test_user(&store, "b@example.com").await;
    let stored = store
        .insert(campaign(a.id, "1", CampaignStatus::Active, 0))
        .await
        .expect("insert");

    assert!(!store.delete(b.id, stored.id).await.expect("foreign delete"));
    assert!(store.delete(a.id, stored.id).await.expect("own delete"));
    assert!(store
        .find_one(a.id, stored.id)
        .await
        .expect("query")
        .is_none());
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn users_are_unique_by_normalized_email(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    insert_test_user(&store, "Someone@Example.com").await;

    let err = store
        .create_user(NewUser {
            name: "Dup".to_string(),
            email: " someone@example.com ".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Client,
            company_name: None,
            currency: Currency::Usd,
        })
        .await
        .expect_err("duplicate email");
    assert!(matches!(err, StoreError::Conflict(_)));
    assert!(store
        .find_user_by_email("SOMEONE@example.com")
        .await
        .expect("query")
        .is_some());
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn credentials_update_sets_token_and_currency(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let user = insert_test_user(&store, "a@example.com").await;

    let updated = store
        .set_meta_credentials(
            user.id,
            &CredentialUpdate {
                access_token: "tok".to_string(),
                ad_account_id: "12345".to_string(),
                page_id: None,
                currency: Some(Currency::Pkr),
            },
        )
        .await
        .expect("update");
    assert!(updated.has_meta_token());
    assert_eq!(updated.currency, Currency::Pkr);
    assert_eq!(store.list_clients().await.expect("clients").len(), 1);
}
