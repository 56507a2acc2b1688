//! Vellum search service binary.
//!
//! Serves an in-memory project store over a Unix domain socket.

use std::path::PathBuf;

use tracing::info;
use vellum_server::{Store, VellumServer};

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vellum")
}

fn parse_args() -> (PathBuf, Option<String>) {
    let args: Vec<String> = std::env::args().collect();
    let mut socket_path: Option<PathBuf> = None;
    let mut log_filter: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--socket" => {
                i += 1;
                socket_path = Some(PathBuf::from(&args[i]));
            }
            "--log" => {
                i += 1;
                log_filter = Some(args[i].clone());
            }
            other => {
                eprintln!("unknown argument: {other}");
                eprintln!("usage: vellum-server [--socket PATH] [--log FILTER]");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let sock = socket_path.unwrap_or_else(|| default_data_dir().join("vellum.sock"));
    (sock, log_filter)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_path, log_filter) = parse_args();

    let env_filter = match log_filter {
        Some(filter) => tracing_subscriber::EnvFilter::new(filter),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Ensure the socket's parent directory exists.
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!(socket = %socket_path.display(), "starting");

    let server = VellumServer::new(Store::new(), socket_path);
    server.run().await?;

    Ok(())
}
