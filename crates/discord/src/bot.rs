use std::sync::Arc;

use {
    secrecy::ExposeSecret,
    serenity::Client,
    tracing::{info, warn},
};

use crosspost_relay::{CommandRouter, RelayPipeline};

use crate::{Error, Result, config::DiscordAccountConfig, handler::DiscordHandler};

/// Connect to the gateway and run until the connection ends or Ctrl-C
/// is received.
pub async fn start(
    config: DiscordAccountConfig,
    router: Arc<CommandRouter>,
    pipeline: Arc<RelayPipeline>,
) -> Result<()> {
    if !config.has_token() {
        return Err(Error::message("discord bot token is empty"));
    }

    let handler = DiscordHandler {
        router,
        pipeline,
        register_commands: config.register_commands,
    };
    let mut client = Client::builder(config.token.expose_secret(), DiscordHandler::intents())
        .event_handler(handler)
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested, closing gateway connection"),
            Err(e) => warn!(error = %e, "failed to listen for ctrl-c, closing gateway connection"),
        }
        shard_manager.shutdown_all().await;
    });

    info!("connecting to discord gateway");
    client.start().await?;
    info!("discord gateway connection closed");
    Ok(())
}
