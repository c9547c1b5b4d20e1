use std::error::Error;

use explore_server::config::load_dotenv;
use explore_server::runtime::{init_tracing, serve};
use explore_server::{DbConfig, DbState, db_router, http_client, service};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let dotenv = load_dotenv(None)?;
    init_tracing();
    if let Some(path) = dotenv {
        tracing::info!(path = %path.display(), "loaded environment file");
    }

    let config = DbConfig::from_env()?;
    tracing::info!(project = %config.project_id, bucket = %config.storage_bucket, "database server starting");
    let state = DbState::from_config(&config, http_client()?);
    serve(service(db_router(state), &config.listen), config.listen.addr()).await;
    Ok(())
}
