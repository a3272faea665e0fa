use anyhow::{Context, Result};
use chrono::Duration;
use idgate::api::{create_router, AppState};
use idgate::config::{apply_server_env, load_config_or_default, Secrets};
use idgate::credentials::PasswordHasher;
use idgate::identity::{seed_demo_accounts, IdentityStore};
use idgate::oauth::GitHubProvider;
use idgate::service::IdentityService;
use idgate::token::TokenService;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "idgate=info".into()),
        )
        .init();

    info!("idgate starting...");

    let config_path = std::env::var("IDGATE_CONFIG").unwrap_or_else(|_| "idgate.toml".to_string());
    let mut config = load_config_or_default(&config_path)?;
    apply_server_env(&mut config.server);
    let secrets = Secrets::from_env()?;

    let hasher = PasswordHasher::new(config.auth.hash_iterations);
    let store = IdentityStore::new(hasher);
    let tokens = TokenService::new(
        secrets.jwt_secret.as_bytes(),
        Duration::days(config.auth.token_ttl_days),
    );
    let provider = Arc::new(GitHubProvider::new(
        config.github.clone(),
        secrets.github_secret.clone(),
    ));

    let service = IdentityService::new(
        store.clone(),
        hasher,
        tokens,
        provider,
        config.auth.temporary_password_length,
    );

    seed_demo_accounts(&store)
        .await
        .context("Failed to seed demo accounts")?;

    let app = create_router(AppState { service });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app).await?;

    Ok(())
}
