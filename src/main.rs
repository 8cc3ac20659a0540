use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use relay_server::config::ServerConfig;
use relay_server::{db, storage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env()?;
    let pool = db::init_pool(&config.database_url).await?;
    let storage = Arc::new(storage::Storage::with_poll_interval(pool, config.poll_interval));

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, database = %config.database_url, "relay listening");
    relay_server::serve(listener, storage).await?;

    Ok(())
}
