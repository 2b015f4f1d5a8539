use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use uuid::Uuid;

use quizmate_common::protocol::{
    self, framed_transport, serialize_message, ClientMessage, ServerMessage,
};

use crate::handler;
use crate::server::SharedState;

pub struct ConnectionHandle {
    pub member_id: Uuid,
    pub member_name: String,
    pub tx: mpsc::Sender<ServerMessage>,
}

pub async fn handle_connection(stream: TcpStream, state: SharedState) -> anyhow::Result<()> {
    let mut transport = framed_transport(stream);

    // Step 1: Handshake -- expect Hello
    let hello: ClientMessage = match protocol::recv_message(&mut transport).await? {
        Some(msg) => msg,
        None => return Ok(()),
    };

    let (member_id, member_name) = match hello {
        ClientMessage::Hello {
            member_name,
            version,
        } => {
            tracing::info!(
                "Member '{}' connected (client version: {})",
                member_name,
                version
            );
            let member = state.directory.register(&member_name);
            protocol::send_message(
                &mut transport,
                &ServerMessage::Welcome {
                    member_id: member.id,
                    server_version: env!("CARGO_PKG_VERSION").to_string(),
                },
            )
            .await?;
            (member.id, member.name)
        }
        _ => {
            protocol::send_message(
                &mut transport,
                &ServerMessage::HandshakeError {
                    reason: "Expected Hello message".into(),
                },
            )
            .await?;
            return Ok(());
        }
    };

    // Step 2: Create mpsc channel for outbound messages
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(64);

    // Register connection
    {
        let handle = ConnectionHandle {
            member_id,
            member_name: member_name.clone(),
            tx: tx.clone(),
        };
        state.connections.write().unwrap().insert(member_id, handle);
    }
    state.broadcaster.register(member_id, tx);

    // Step 3: Split transport for independent read/write
    let (mut sink, mut stream) = transport.split();

    // Writer task: drains rx and writes to sink
    let write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serialize_message(&msg) {
                Ok(bytes) => {
                    if sink.send(bytes.into()).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize message: {}", e);
                }
            }
        }
    });

    // Step 4: Reader loop
    loop {
        match stream.next().await {
            Some(Ok(frame)) => {
                match protocol::deserialize_message::<ClientMessage>(&frame) {
                    Ok(msg) => {
                        if let Err(e) = handler::handle_message(member_id, msg, &state).await {
                            tracing::error!("Handler error for {}: {}", member_name, e);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse message from {}: {}", member_name, e);
                    }
                }
            }
            Some(Err(e)) => {
                tracing::warn!("Read error from {}: {}", member_name, e);
                break;
            }
            None => {
                tracing::info!("Member '{}' disconnected", member_name);
                break;
            }
        }
    }

    // Cleanup
    handler::handle_disconnect(member_id, &state).await;
    write_task.abort();
    Ok(())
}
