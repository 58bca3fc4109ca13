use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use bridge_core::{
    config::DEFAULT_SETTINGS_FILE, load_settings_from, BridgeClient, BridgeHandle, ChannelSink,
};
use clap::Parser;
use shared::protocol::DomainEvent;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Logs in with browser cookies, connects the realtime stream and prints
/// every bridge event as one JSON line.
#[derive(Parser, Debug)]
struct Args {
    /// `Cookie` header value copied from a logged-in browser.
    #[arg(long, conflicts_with = "cookie_file")]
    cookies: Option<String>,
    /// File holding the cookie header value.
    #[arg(long)]
    cookie_file: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,
    /// Print the login outcome and exit without connecting.
    #[arg(long)]
    login_only: bool,
}

fn read_cookies(args: &Args) -> Result<String> {
    if let Some(cookies) = &args.cookies {
        return Ok(cookies.trim().to_string());
    }
    let Some(path) = &args.cookie_file else {
        bail!("pass --cookies or --cookie-file");
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read cookie file {}", path.display()))?;
    Ok(raw.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let cookies = read_cookies(&args)?;
    let settings = load_settings_from(&args.settings);
    let (sink, mut events) = ChannelSink::new();
    let (client, outcome) = BridgeClient::login(settings, &cookies, Arc::new(sink))
        .await
        .context("login failed")?;
    info!(user_id = %outcome.user_id, name = %outcome.remote_name, "probe: logged in");
    if args.login_only {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    client.connect().await.context("connect failed")?;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if let DomainEvent::ConnectionClosed { reason } = &event {
                        warn!(?reason, "probe: connection closed");
                    }
                    println!("{}", serde_json::to_string(&event)?);
                }
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                info!("probe: interrupted, disconnecting");
                break;
            }
        }
    }

    client.disconnect().await.context("disconnect failed")?;
    Ok(())
}
