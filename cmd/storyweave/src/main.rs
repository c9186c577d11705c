//! # storyweave
//!
//! Assembles the application from configuration and compile-time features,
//! then serves the HTTP API until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::web::{router, AppState};
use auth_adapters::Argon2Hasher;
use configs::{LogFormat, Settings, StorySettings};
use domains::rules::ContributionPolicy;
use domains::{StoryRepository, UserRepository};
use secrecy::ExposeSecret;
use services::{AccountService, StoryPolicy, StoryService};
use storage_adapters::InMemoryStore;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "auth-jwt")]
use auth_adapters::JwtTokens;

#[cfg(not(feature = "auth-jwt"))]
compile_error!("storyweave needs a token issuer; enable the `auth-jwt` feature");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(settings.log.format);

    let (users, stories) = open_store(&settings).await?;

    let accounts = AccountService::new(
        users.clone(),
        Arc::new(Argon2Hasher::new()),
        Arc::new(JwtTokens::new(
            settings.auth.jwt_secret.expose_secret().as_bytes(),
            chrono::Duration::hours(settings.auth.token_ttl_hours),
        )),
    );
    let accounts = match &settings.stories.default_profile_image {
        Some(url) => accounts.with_default_profile_image(url.clone()),
        None => accounts,
    };
    let stories = StoryService::new(stories, users, story_policy(&settings.stories));

    let app = router(AppState::new(accounts, stories));

    let address = settings.server.address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "storyweave listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("storyweave stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

fn story_policy(stories: &StorySettings) -> StoryPolicy {
    StoryPolicy {
        contribution: ContributionPolicy {
            max_lines: stories.max_story_lines,
            reject_duplicates: stories.reject_duplicate_lines,
        },
        blacklist_hides_story: stories.blacklist_hides_story,
        trending_limit: stories.trending_limit,
    }
}

type Repositories = (Arc<dyn UserRepository>, Arc<dyn StoryRepository>);

/// Postgres when `database.url` is set and the build supports it,
/// the in-memory store otherwise.
async fn open_store(settings: &Settings) -> anyhow::Result<Repositories> {
    #[cfg(feature = "db-postgres")]
    if let Some(url) = &settings.database.url {
        let store = storage_adapters::PgStore::connect(
            url.expose_secret(),
            settings.database.max_connections,
        )
        .await
        .context("connecting to postgres")?;
        store.migrate().await.context("applying schema")?;
        info!("using postgres store");

        let store = Arc::new(store);
        let users: Arc<dyn UserRepository> = store.clone();
        let stories: Arc<dyn StoryRepository> = store;
        return Ok((users, stories));
    }

    if settings.database.url.is_some() {
        warn!("database.url is set but this build has no postgres support");
    }
    warn!("using in-memory store; data is lost on restart");
    let store = Arc::new(InMemoryStore::new());
    let users: Arc<dyn UserRepository> = store.clone();
    let stories: Arc<dyn StoryRepository> = store;
    Ok((users, stories))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
