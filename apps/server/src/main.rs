use anyhow::Context;
use clap::{Parser, Subcommand};
use streamcast_config::load as load_config;
use streamcast_database::StreamRepository;
use streamcast_gateway::{create_router, GatewayState};
use streamcast_runtime::{telemetry, BackendServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "streamcast-server")]
#[command(about = "Streamcast backend (serves by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP/WebSocket server (default)
    Serve,
    /// Print stored stream records
    DumpStreams,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::DumpStreams => dump_streams().await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting Streamcast backend");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = GatewayState::new(services.db_pool.clone(), services.relay.clone());
    let app = create_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(streamcast_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn dump_streams() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let streams = StreamRepository::new(services.db_pool.clone());
    let live = streams
        .list_live()
        .await
        .map_err(|e| anyhow::anyhow!("failed to fetch streams: {e}"))?;

    if live.is_empty() {
        println!("No live streams recorded");
        return Ok(());
    }

    println!("Found {} live streams:", live.len());
    println!(
        "{:<28} {:<30} {:<12} {:<18} {:<8}",
        "Stream ID", "Title", "Category", "Streamer", "Viewers"
    );
    println!("{}", "-".repeat(100));

    for stream in live {
        println!(
            "{:<28} {:<30} {:<12} {:<18} {:<8}",
            stream.stream_id,
            stream.title,
            stream.category.as_str(),
            stream.streamer_name,
            stream.viewer_count
        );
    }

    Ok(())
}
