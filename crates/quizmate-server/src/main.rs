mod connection;
mod directory;
mod handler;
mod notify;
mod server;
mod service;
mod solo;
mod store;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::store::InMemoryQuestionStore;

/// Quizmate Server - multiplayer quiz game rooms
#[derive(Parser, Debug)]
#[command(name = "quizmate-server", version, about)]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:9876")]
    bind: String,

    /// Maximum simultaneous connections allowed
    #[arg(short, long, default_value_t = 100)]
    max_connections: usize,

    /// JSON file holding the question bank
    #[arg(short, long)]
    questions: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizmate_server=debug,quizmate_common=debug".into()),
        )
        .init();

    let args = Args::parse();

    let addr: SocketAddr = args.bind.parse()?;

    let store = match &args.questions {
        Some(path) => InMemoryQuestionStore::from_json_file(path)?,
        None => {
            tracing::warn!("no question file given, starting with an empty bank");
            InMemoryQuestionStore::new(Vec::new())
        }
    };

    tracing::info!(
        "Starting quizmate server on {} (max {} connections)",
        addr,
        args.max_connections
    );
    server::run(addr, args.max_connections, Arc::new(store)).await
}
