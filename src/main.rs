use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;
use std::path::PathBuf;

use wellchat::TransportKind;
use wellchat::core::config::{CliOverrides, load_config, resolve};

#[derive(Parser)]
#[command(name = "wellchat", about = "Terminal client for wellchat conversations")]
struct Args {
    /// Conversation to open on start
    #[arg(short, long)]
    conversation: Option<String>,

    /// Base URL of the REST API
    #[arg(long)]
    api_url: Option<String>,

    /// WebSocket URL of the real-time channel
    #[arg(long)]
    realtime_url: Option<String>,

    /// Real-time transport to use
    #[arg(short, long, default_value_t, value_enum)]
    transport: TransportKind,

    /// Where to write the log
    #[arg(long, default_value = "wellchat.log")]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - stdout belongs to the console
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create(&args.log_file) {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let config = load_config().map_err(|e| {
        log::error!("{}", e);
        std::io::Error::other(e.to_string())
    })?;
    let resolved = resolve(
        &config,
        &CliOverrides {
            conversation: args.conversation,
            api_url: args.api_url,
            realtime_url: args.realtime_url,
        },
    );

    log::info!(
        "wellchat starting up with {:?} transport, api {}",
        args.transport,
        resolved.api_base_url
    );

    wellchat::console::run(resolved, args.transport).await
}
