#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Context as _;
use dotenv::dotenv;
use serenity::prelude::*;
use tokio::sync::mpsc;
use torgenius::{
    config::Config,
    handler::{self, Handler},
    logger::Logger,
    manager::Manager,
};
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    Logger::initialize()?;

    let config = Config::from_env()?;
    let token = config.discord_token.clone();

    let (outbound, posted) = mpsc::unbounded_channel();
    let manager = Manager::with_config(config, outbound)
        .await
        .context("Error loading stored configuration")?;

    let mut client = Client::builder(&token)
        .event_handler(Handler::new(manager))
        .await
        .context("Error creating client")?;

    tokio::spawn(handler::posting_thread(
        client.cache_and_http.http.clone(),
        posted,
    ));

    if let Err(why) = client.start().await {
        error!(error = %why, "client error");
    }

    Ok(())
}
