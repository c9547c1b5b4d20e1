use std::error::Error;

use explore_server::config::load_dotenv;
use explore_server::runtime::{init_tracing, serve};
use explore_server::{ChatConfig, ChatState, chat_router, http_client, service};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let dotenv = load_dotenv(None)?;
    init_tracing();
    if let Some(path) = dotenv {
        tracing::info!(path = %path.display(), "loaded environment file");
    }

    let config = ChatConfig::from_env()?;
    tracing::info!(model = %config.openai_model, "chat server starting");
    let state = ChatState::from_config(&config, http_client()?);
    serve(service(chat_router(state), &config.listen), config.listen.addr()).await;
    Ok(())
}
