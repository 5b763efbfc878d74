mod api;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = dtmobile_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = dtmobile_db::PoolConfig::from_app_config(&config);
    let pool = dtmobile_db::connect_pool(&config.database_url, pool_config).await?;
    dtmobile_db::run_migrations(&pool).await?;

    let auth = AuthState::from_env(
        matches!(config.env, dtmobile_core::Environment::Development),
        config.api_key_hash_salt.as_deref(),
    )?;
    let state = AppState {
        contacts: Arc::new(dtmobile_db::PgContactsRepository::new(
            pool.clone(),
            config.site_url.clone(),
        )),
        health: Arc::new(pool),
    };
    let app = build_app(state, &config.api_namespace, auth, rate_limit_state(&config));

    tracing::info!(
        bind_addr = %config.bind_addr,
        namespace = %config.api_namespace,
        "dtmobile-server listening"
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
