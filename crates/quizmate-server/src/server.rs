use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use tokio::net::TcpListener;
use uuid::Uuid;

use crate::connection::{self, ConnectionHandle};
use crate::directory::{InMemoryMemberDirectory, MemberDirectory};
use crate::notify::ClientBroadcaster;
use crate::service::GameService;
use crate::solo::SoloEngine;
use crate::store::QuestionStore;

pub struct ServerState {
    pub service: GameService,
    pub solo: SoloEngine,
    pub directory: Arc<dyn MemberDirectory>,
    pub broadcaster: Arc<ClientBroadcaster>,
    pub connections: RwLock<HashMap<Uuid, ConnectionHandle>>,
    pub max_connections: usize,
}

pub type SharedState = Arc<ServerState>;

pub async fn run(
    addr: SocketAddr,
    max_connections: usize,
    store: Arc<dyn QuestionStore>,
) -> anyhow::Result<()> {
    let broadcaster = Arc::new(ClientBroadcaster::new());
    let directory: Arc<dyn MemberDirectory> = Arc::new(InMemoryMemberDirectory::new());
    let state: SharedState = Arc::new(ServerState {
        service: GameService::new(store.clone(), broadcaster.clone()),
        solo: SoloEngine::new(store, directory.clone()),
        directory,
        broadcaster,
        connections: RwLock::new(HashMap::new()),
        max_connections,
    });

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    loop {
        let (stream, peer_addr) = listener.accept().await?;

        // Enforce max connections
        let conn_count = state.connections.read().unwrap().len();
        if conn_count >= state.max_connections {
            tracing::warn!(
                "Rejecting connection from {} (max {} reached)",
                peer_addr,
                state.max_connections
            );
            drop(stream);
            continue;
        }

        tracing::info!(
            "New connection from {} ({}/{})",
            peer_addr,
            conn_count + 1,
            state.max_connections
        );

        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = connection::handle_connection(stream, state).await {
                tracing::warn!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}
