use std::sync::Arc;

use common_auth::Authorizer;
use library_service::app::build_router;
use library_service::app_state::AppState;
use library_service::catalog::BookCatalog;
use library_service::config::load_service_config;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_service_config()?;
    info!(
        domain = %config.auth.domain,
        audience = %config.auth.audience,
        jwks_url = %config.auth.jwks_url(),
        "configured bearer-token authorizer"
    );

    let authorizer = Arc::new(Authorizer::new(config.auth.clone()));
    let state = AppState::new(Arc::new(BookCatalog::new()), authorizer);
    let app = build_router(state);

    info!(addr = %config.addr, "starting library-service");
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
