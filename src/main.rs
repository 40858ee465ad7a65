use anyhow::{Context, Result};
use clap::Parser;
use docrag::{
    answering, api, config,
    files::InMemoryFileRegistry,
    logging,
    preload::preload_directory,
    processing::RagService,
    store::IndexedChunkStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "docrag",
    version,
    about = "Document ingestion and retrieval service"
)]
struct Cli {
    /// Port to listen on; overrides SERVER_PORT.
    #[arg(long)]
    port: Option<u16>,
    /// Ingest every supported file under this directory before serving.
    #[arg(long, value_name = "DIR")]
    preload: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing();
    let config = config::get_config();

    let store = IndexedChunkStore::new(config.index_heap_bytes)
        .context("failed to create chunk index")?;
    let answering =
        answering::get_answering_client(config).context("failed to build answering client")?;
    let service = Arc::new(RagService::new(
        Arc::new(store),
        Arc::new(InMemoryFileRegistry::new()),
        answering,
        config.clone(),
    ));

    if let Some(root) = cli.preload.as_deref() {
        preload_directory(service.as_ref(), root).await;
    }

    let app = api::create_router(service);
    let (listener, port) = bind_listener(cli.port.or(config.server_port))
        .await
        .context("failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn bind_listener(fixed_port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = fixed_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4300..=4399;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4300-4399",
    ))
}
