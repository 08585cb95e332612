// This is the entry point of the mission portal service.
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Seed the catalog with sample missions
// 4. Follow the live feed until Ctrl-C

use mission_control::config::{PortalConfig, StoreBackend};
use mission_control::core::catalog::CatalogQuery;
use mission_control::core::content::sample_missions::seed_if_empty;
use mission_control::core::content::{ContentKind, ContentService, RecordStore};
use mission_control::core::identity::Viewer;
use mission_control::core::moderation::ContentFilter;
use mission_control::core::workflow::SubmissionWorkflow;
use mission_control::infra::content::{InMemoryRecordStore, SqliteRecordStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the subscriber so RUST_LOG from the file applies
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = PortalConfig::from_env()?;
    tracing::info!(
        admins = config.admins.len(),
        banned_words = config.policy.banned_words.len(),
        allowed_domains = config.policy.allowed_domains.len(),
        edit_policy = ?config.edit_policy,
        "Configuration loaded"
    );

    let filter = Arc::new(ContentFilter::new(config.policy.clone()));
    let workflow = SubmissionWorkflow::new(filter, config.edit_policy);

    match &config.store {
        StoreBackend::InMemory => {
            tracing::warn!("Using in-memory store, records are lost on exit");
            run(ContentService::new(InMemoryRecordStore::new(), workflow), &config).await
        }
        StoreBackend::Sqlite(database_url) => {
            let store = SqliteRecordStore::new(database_url).await?;
            tracing::info!(database_url = %database_url, "SQLite record store ready");
            run(ContentService::new(store, workflow), &config).await
        }
    }
}

async fn run<S: RecordStore>(
    service: ContentService<S>,
    config: &PortalConfig,
) -> anyhow::Result<()> {
    let publisher = config.publisher();

    if config.seed_sample_missions {
        seed_if_empty(&service, &publisher).await?;
    }

    let mut projects = service.subscribe(ContentKind::Project).await?;
    let mut posts = service.subscribe(ContentKind::CommunityPost).await?;
    log_summary(&service, &publisher).await?;

    tracing::info!("Following the content feed, press Ctrl-C to stop");
    loop {
        tokio::select! {
            changed = projects.changed() => {
                let snapshot = changed?;
                let overridden = service.reconcile(ContentKind::Project, &snapshot);
                if overridden > 0 {
                    tracing::info!(overridden, "Project counters replaced by store values");
                }
                log_summary(&service, &publisher).await?;
            }
            changed = posts.changed() => {
                let snapshot = changed?;
                let overridden = service.reconcile(ContentKind::CommunityPost, &snapshot);
                if overridden > 0 {
                    tracing::info!(overridden, "Post counters replaced by store values");
                }
                log_summary(&service, &publisher).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn log_summary<S: RecordStore>(
    service: &ContentService<S>,
    admin: &Viewer,
) -> anyhow::Result<()> {
    let catalog = service.browse(admin, &CatalogQuery::default()).await?;
    let posts = service.posts(admin).await?;
    let queue = service.submission_queue(admin).await?;

    tracing::info!(
        projects = catalog.len(),
        posts = posts.len(),
        pending = queue.len(),
        flagged = queue.flagged_count(),
        trending = catalog.first().map(|p| p.title.as_str()).unwrap_or("-"),
        "Catalog summary"
    );
    Ok(())
}
