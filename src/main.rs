use pantry::{config::AppConfig, db, routes, services::create_email_service, AppState};

use std::net::{IpAddr, SocketAddr};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pantry=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing secrets or origin stop the process here
    let config = AppConfig::from_env()?;
    tracing::info!("Starting with {:?}", config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let email_service = create_email_service(config.is_production());
    let addr = SocketAddr::from((config.host.parse::<IpAddr>()?, config.port));

    let app_state = AppState::new(config, pool, email_service)?;
    let app = routes::build_router(app_state);

    tracing::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
