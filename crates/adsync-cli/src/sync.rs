//! Sync and credential-check commands.
//!
//! Both resolve the account by email, then drive the same engine the HTTP
//! server uses. Per-campaign failures during a sync are counted in the
//! summary instead of aborting the run.

use std::sync::Arc;

use adsync_core::{AppConfig, User, UserStore};
use adsync_db::PgStore;
use adsync_meta::MetaClient;
use adsync_sync::{SyncEngine, SyncReport};
use sqlx::PgPool;

fn engine_for(config: &AppConfig, store: Arc<PgStore>) -> anyhow::Result<SyncEngine> {
    let platform = Arc::new(MetaClient::from_config(config)?);
    Ok(SyncEngine::new(platform, store))
}

async fn load_user(store: &PgStore, email: &str) -> anyhow::Result<User> {
    store
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no account registered for '{email}'"))
}

pub(crate) fn summary_line(report: &SyncReport) -> String {
    format!(
        "considered {} remote campaign(s): {} new, {} updated, {} failed; {} stored locally",
        report.total,
        report.created,
        report.updated,
        report.errors,
        report.campaigns.len()
    )
}

pub(crate) async fn run_sync(
    config: &AppConfig,
    pool: PgPool,
    email: &str,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let store = Arc::new(PgStore::new(pool));
    let user = load_user(&store, email).await?;
    let engine = engine_for(config, store)?;
    let owner = user.owner();

    let report = match limit {
        Some(max) => engine.sync_bounded(&owner, max).await?,
        None => engine.sync_all(&owner).await?,
    };
    if report.errors > 0 {
        tracing::warn!(user_id = %user.id, errors = report.errors, "some campaigns failed to sync");
    }
    println!("{}", summary_line(&report));
    Ok(())
}

pub(crate) async fn run_validate(
    config: &AppConfig,
    pool: PgPool,
    email: &str,
) -> anyhow::Result<()> {
    let store = Arc::new(PgStore::new(pool));
    let user = load_user(&store, email).await?;
    let engine = engine_for(config, store)?;

    let check = engine.validate_credentials(&user.owner()).await?;
    println!("{}", serde_json::to_string_pretty(&check)?);
    if !check.valid {
        anyhow::bail!("Meta credentials for '{email}' are not valid");
    }
    Ok(())
}
