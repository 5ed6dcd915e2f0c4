use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use emotebot_common::models::ChatEvent;
use emotebot_core::platforms::twitch_helix::TwitchHelixStatusApi;
use emotebot_core::platforms::twitch_irc::{IrcSettings, TwitchIrcTransport};
use emotebot_core::{BotConfig, DefaultHttpClient, EmoteBot, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "emotebot")]
#[command(author, version, about = "Emote bot for Twitch chat")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "./config.toml")]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["emotebot_core=info", "emotebot_server=info"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }

    let result = match format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            fmt().with_env_filter(filter).finish(),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            fmt().json().with_env_filter(filter).finish(),
        ),
    };
    if let Err(e) = result {
        eprintln!("Failed to set global subscriber: {e}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    dotenv::dotenv().ok();
    init_tracing(args.log_format);

    match run(args).await {
        Ok(()) => {
            info!("Emote bot stopped.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Emote bot exiting: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let config = BotConfig::load(&args.config)?;
    info!(
        "Loaded config from {} ({} channel(s))",
        args.config.display(),
        config.connection.channels.len()
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel::<ChatEvent>();
    let transport = Arc::new(TwitchIrcTransport::new(
        IrcSettings::from_config(&config),
        events_tx,
    ));
    let http = Arc::new(DefaultHttpClient::new()?);
    let status_api = Arc::new(TwitchHelixStatusApi::new(&config, http));

    let bot = EmoteBot::new(config, transport, status_api)?;

    let shutdown = bot.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down.");
                shutdown.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    bot.run(events_rx).await
}
