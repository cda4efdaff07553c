use std::sync::Arc;

use bookshelf_backend::{
    config::{mask_secret, Config},
    db::connection::{create_pool_with_config, PoolConfig},
    repositories::PgStore,
    services::{OtpService, TracingNotifier},
};
use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookshelf_backend=debug,otp_cleanup=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        jwt_secret = %mask_secret(&config.jwt_secret),
        otp_ttl_seconds = config.otp_ttl_seconds,
        "Loaded configuration from environment/.env"
    );

    let pool = create_pool_with_config(&config.database_url, PoolConfig::from(&config)).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let otp = OtpService::new(
        PgStore::new(),
        Arc::new(TracingNotifier),
        config.otp_ttl_seconds,
    );
    let mut conn = pool.acquire().await?;
    let expired = otp.expire_stale(&mut *conn, Utc::now()).await?;

    if expired.matched > 0 {
        tracing::info!("Expired {} stale passcodes", expired.matched);
    }

    Ok(())
}
