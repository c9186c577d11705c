//! # seed
//!
//! Fills a Postgres database with demo users and a story, going through the
//! services so every rule applies. Safe to run more than once: existing
//! users are reused.

use std::sync::Arc;

use anyhow::{bail, Context};
use auth_adapters::{Argon2Hasher, JwtTokens};
use configs::Settings;
use domains::{DomainError, UserId, VoteAction};
use secrecy::ExposeSecret;
use services::{AccountService, Login, Registration, StoryPolicy, StoryService};
use storage_adapters::PgStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

const PASSWORD: &str = "storyweave-demo";

const USERS: [(&str, &str, &str); 3] = [
    ("kendrick", "Kendrick", "Lamar"),
    ("ada", "Ada", "Lovelace"),
    ("grace", "Grace", "Hopper"),
];

const LINES: [&str; 6] = [
    "A hungry fox saw some fine bunches of grapes.",
    "They hung from a vine trained along a high trellis.",
    "The fox jumped and jumped, but could not reach them.",
    "At last she gave up and walked away with dignity.",
    "\"They were probably sour anyway,\" she told the crows.",
    "The crows, who had eaten the grapes, said nothing.",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load().context("loading configuration")?;
    let Some(url) = &settings.database.url else {
        bail!("database.url is not set; export STORYWEAVE__DATABASE__URL");
    };

    let store = PgStore::connect(url.expose_secret(), settings.database.max_connections)
        .await
        .context("connecting to postgres")?;
    store.migrate().await.context("applying schema")?;
    let store = Arc::new(store);

    let accounts = AccountService::new(
        store.clone(),
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
    let stories = StoryService::new(store.clone(), store, StoryPolicy::default());

    let mut users = Vec::with_capacity(USERS.len());
    for (username, first_name, last_name) in USERS {
        users.push(ensure_user(&accounts, username, first_name, last_name).await?);
    }

    let story = stories
        .create_story(users[0], Some("The Fox and the Grapes".into()))
        .await?;
    for (i, line) in LINES.iter().enumerate() {
        let writer = users[i % users.len()];
        stories.add_line(writer, story.id, Some(line.to_string())).await?;
    }
    for voter in &users[1..] {
        stories.vote(*voter, story.id, VoteAction::Vote).await?;
    }

    info!(
        story_id = story.id,
        users = users.len(),
        lines = LINES.len(),
        "seeded"
    );
    Ok(())
}

async fn ensure_user(
    accounts: &AccountService,
    username: &str,
    first_name: &str,
    last_name: &str,
) -> anyhow::Result<UserId> {
    let registered = accounts
        .register(Registration {
            username: Some(username.into()),
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            password: Some(PASSWORD.into()),
        })
        .await;
    match registered {
        Ok(author) => {
            info!(username, user_id = author.id(), "user created");
            return Ok(author.id());
        }
        Err(DomainError::Validation(errors)) if errors.get("username").is_some() => {
            info!(username, "user exists");
        }
        Err(err) => return Err(err.into()),
    }

    let session = accounts
        .login(Login {
            username: Some(username.into()),
            password: Some(PASSWORD.into()),
        })
        .await
        .with_context(|| format!("{username} exists with a different password"))?;
    Ok(session.user_id)
}
