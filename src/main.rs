mod config;
mod portal;
mod render;
mod soap;

pub const USER_AGENT: &str = concat!("portal/", env!("CARGO_PKG_VERSION"), " (search portal)");

use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing::info;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("portal=info".parse()?),
        )
        .init();

    let config = config::Args::parse().into_config()?;
    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(config.timeout)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()?;
    let app = portal::router(portal::Portal::new(http, &config));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .inspect_err(|e| tracing::error!("failed to bind {}: {e}", config.bind))?;
    info!(
        addr = %listener.local_addr()?,
        service = %config.service_url,
        index = %config.index,
        "starting portal"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    info!("server stopped");
    Ok(())
}
