use diary_services::{
    config::Config,
    database::{self, PgStorage},
    routes, telemetry,
    users::PgUserStorage,
    version::{BUILD_BRANCH, BUILD_COMMIT, BUILD_DATE, build_version},
};
use std::net::{IpAddr, SocketAddr};
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config: Config = Config::init()?;

    // Initialize tracing
    telemetry::init_tracing(&config)?;

    // Print build information
    print_build_info();

    info!(
        environment = %config.environment(),
        server_addr = %config.server_addr(),
        port = %config.port(),
        "Configuration loaded"
    );

    // Initialize database connection pool and schema
    let pool = database::create_pool(&config).await?;
    database::run_migrations(&pool).await?;

    let sql_storage = PgStorage::new(pool);
    let user_storage = PgUserStorage::new(sql_storage.clone());

    // Build the application router
    let route = routes(sql_storage, user_storage, config.clone()).await;

    // Create socket address
    let addr = SocketAddr::from((config.server_addr().parse::<IpAddr>()?, config.port()));

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, route).await?;

    Ok(())
}

/// Print build information
fn print_build_info() {
    info!("===========================================");
    info!("  Diary Services v{}", build_version());
    info!("===========================================");
    info!("Build Date:   {}", BUILD_DATE);
    info!("Build Commit: {}", BUILD_COMMIT);
    info!("Build Branch: {}", BUILD_BRANCH);
    info!("===========================================");
}
