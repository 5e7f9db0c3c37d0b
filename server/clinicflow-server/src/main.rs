use std::net::SocketAddr;

use clap::Parser;
use colored::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use clinicflow_server::{create_app, ClinicFlowServer};

/// ClinicFlow Engine HTTP Server
#[derive(Parser, Debug)]
#[command(name = "clinicflow-server")]
#[command(about = "Clinic operations HTTP API server")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(args.verbose);

    info!("🏥 {}", "Starting ClinicFlow Engine HTTP Server".bright_cyan());
    info!("📋 Version: {}", env!("CARGO_PKG_VERSION").bright_white());
    info!("🌐 Bind address: {}", format!("{}:{}", args.host, args.port).bright_yellow());

    let server = ClinicFlowServer::new().await?;
    info!(
        "💾 Database pool ready ({} connections max)",
        server.config.max_connections.to_string().bright_white()
    );

    let app = create_app(server);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("✅ {}", "ClinicFlow Engine listening".bright_green());

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "clinicflow_server=debug,tower_http=debug,info"
    } else {
        "clinicflow_server=info,info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
