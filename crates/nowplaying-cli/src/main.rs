mod config;

use anyhow::bail;
use config::Config;
use nowplaying::{MetadataResolver, ResolverConfig};
use std::time::Duration;
use tracing::{info, warn};

const USAGE: &str = "usage: nowplaying [--watch] <stream-url>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries only resolved titles so the output
    // can be piped.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();

    let mut watch = false;
    let mut stream_url: Option<String> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--watch" | "-w" => watch = true,
            "--help" | "-h" => {
                eprintln!("{}", USAGE);
                return Ok(());
            }
            _ if arg.starts_with('-') => bail!("unknown flag {}\n{}", arg, USAGE),
            _ => stream_url = Some(arg),
        }
    }
    let stream_url = match stream_url {
        Some(u) => u,
        None => bail!("{}", USAGE),
    };

    let config = Config::load().unwrap_or_else(|e| {
        warn!("failed to load config, using defaults: {}", e);
        Config::default()
    });

    let resolver = MetadataResolver::with_config(ResolverConfig {
        relay_prefix: config.resolver.relay_url.clone(),
        probe_timeout: Duration::from_secs(config.resolver.probe_timeout_secs),
    });

    info!("resolving now-playing for {}", stream_url);

    let mut last: Option<String> = None;
    loop {
        match resolver.resolve(&stream_url).await {
            Some(title) => {
                if last.as_deref() != Some(title.as_str()) {
                    println!("{}", title);
                    last = Some(title);
                }
            }
            None => info!("no metadata available"),
        }

        if !watch {
            break;
        }
        tokio::time::sleep(Duration::from_secs(config.polling.poll_interval_secs)).await;
    }

    Ok(())
}
