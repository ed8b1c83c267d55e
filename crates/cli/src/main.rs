use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::Parser,
    secrecy::ExposeSecret,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    crosspost_config::CrosspostConfig,
    crosspost_discord::DiscordAccountConfig,
    crosspost_relay::{CommandRouter, RelayPipeline, Settings, store::JsonFileStore},
};

#[derive(Parser)]
#[command(name = "crosspost", about = "Relay messages between two Discord servers")]
struct Cli {
    /// Path to a config file (defaults to discovering crosspost.toml).
    #[arg(long, env = "CROSSPOST_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the blacklist, channel pair and manage role records.
    #[arg(long, env = "CROSSPOST_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Discord bot token (overrides the config file).
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Leave the global slash-command set untouched on startup.
    #[arg(long, default_value_t = false)]
    skip_command_registration: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// The token flag (or `DISCORD_TOKEN`) wins over the config file.
fn resolve_token(cli: &Cli, config: &CrosspostConfig) -> Option<String> {
    cli.token
        .clone()
        .or_else(|| {
            config
                .discord
                .token
                .as_ref()
                .map(|t| t.expose_secret().clone())
        })
        .filter(|t| !t.trim().is_empty())
}

fn resolve_data_dir(cli: &Cli, config: &CrosspostConfig) -> PathBuf {
    cli.data_dir
        .clone()
        .or_else(|| config.data_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "crosspost starting");

    let config = crosspost_config::discover_and_load(cli.config.as_deref())
        .context("failed to load config")?;
    let token = resolve_token(&cli, &config)
        .context("no discord token: set DISCORD_TOKEN or [discord] token in crosspost.toml")?;

    let data_dir = resolve_data_dir(&cli, &config);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
    info!(data_dir = %data_dir.display(), "using data directory");

    let settings = Arc::new(Settings::load(Arc::new(JsonFileStore::new(data_dir))));
    let router = Arc::new(CommandRouter::new(Arc::clone(&settings)));
    let pipeline = Arc::new(RelayPipeline::new(
        settings,
        config.relay.correlation_capacity,
    ));

    let mut account = DiscordAccountConfig::new(token);
    account.register_commands = !cli.skip_command_registration;

    crosspost_discord::bot::start(account, router, pipeline).await?;
    Ok(())
}
