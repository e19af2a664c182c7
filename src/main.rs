use pubregistry::importers::PubmedClient;
use pubregistry::{db, router, AppState, Config};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::connect(&config).await?;
    db::migrate(&pool).await?;

    let state = AppState::new(pool, PubmedClient::new(config.pubmed_base_url.clone()));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    info!("Server is running on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
