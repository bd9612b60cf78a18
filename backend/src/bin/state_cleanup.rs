//! Periodic sweep of abandoned authorization state. Intended to run from
//! cron; a flow the user never finishes leaves its stashed session behind
//! until this deletes it.

use std::sync::Arc;

use chrono::Duration;

use pulsy_backend::{
    config::Config,
    db::connection::create_pool,
    repositories::{OauthStateRepositoryTrait, PgOauthStateRepository},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;

    let states = Arc::new(PgOauthStateRepository::new(pool.clone()));
    let deleted = states
        .delete_expired(Duration::minutes(config.oauth_state_ttl_minutes))
        .await
        .expect("cleanup expired authorization states");

    if deleted > 0 {
        tracing::info!("Deleted {} expired authorization states", deleted);
    }

    sqlx::query("VACUUM (ANALYZE) oauth_states")
        .execute(&*pool)
        .await
        .expect("vacuum oauth_states table");

    Ok(())
}
