use anyhow::Context;
use clap::Parser;
use fever::{Fever, FeverConfig, LocalStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "fever-server", about = "Serve compiled, pre-compressed bundles")]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configuration
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => FeverConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => FeverConfig::default(),
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let store = Arc::new(LocalStore::new(&config.root));
    let fever = Fever::new(config, store);

    let compiled = fever_server::compile(&fever).await;
    info!(bundles = compiled.len(), "bundles ready");

    let router = fever_server::app(fever.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Fever listening on {}", addr);

    axum::serve(listener, router).await?;
    fever.destroy();
    Ok(())
}
