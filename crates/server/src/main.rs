use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use scorecard::{Catalog, QueryEngine, Store};
use scorecard_server::build_app;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Path to the SQLite store, opened read-only.
    #[arg(short, long, env = "SCORECARD_DB", default_value = "data/scorecard.sqlite")]
    db: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scorecard_server=info,scorecard=info,info".into()),
        )
        .init();

    let args = Args::parse();

    info!("Opening store at {}", args.db.display());
    let store = Store::open(&args.db);

    // Catalog construction is startup-fatal on failure: the process must not
    // accept a single request without the whitelist in place.
    let catalog = Arc::new(Catalog::build(&store)?);
    info!("Catalog built; starting server");

    let engine = QueryEngine::new(store, catalog);
    let app = build_app(engine);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for ctrl_c signal");
        })
        .await?;

    Ok(())
}
