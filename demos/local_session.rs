//! Single-client walkthrough of the Jupiter protocol
//!
//! Shows the client state moving through synchronized, awaiting-ack and
//! buffered as local edits outpace server acknowledgements.
//!
//! Run with: cargo run --example local_session

use futures::StreamExt;
use ot_sync::client::ClientConfig;
use ot_sync::server::{ServerConfig, SharedServer};
use ot_sync::{Message, Operation};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("OT Local Session Example");
    println!("========================\n");

    let (server, mut inbox) = SharedServer::new(ServerConfig {
        initial_document: "Hello".into(),
        ..Default::default()
    });
    let mut alice = server.connect(ClientConfig {
        session_id: Some("alice".into()),
        ..Default::default()
    });

    println!("Connected as {}", alice.session_id());
    println!("  Document: {:?}", alice.document());
    println!("  State:    {:?}\n", alice.client().state());

    alice.edit(Operation::insert_at(5, 5, ",")?)?;
    alice.edit(Operation::insert_at(6, 6, " world")?)?;
    println!("Two local edits before any ack:");
    println!("  Document: {:?}", alice.document());
    println!("  State:    {:?}", alice.client().state());
    println!("  Buffered: {:?}\n", alice.client().buffered_operation());

    // First submission: commit it and deliver the ack, which releases the buffer.
    inbox.process_pending()?;
    if let Some(handled) = alice.next().await {
        report(&handled?);
    }
    println!("  State:    {:?}", alice.client().state());

    inbox.process_pending()?;
    if let Some(handled) = alice.next().await {
        report(&handled?);
    }

    println!("\nFinal:");
    println!("  Client: {:?} at revision {}", alice.document(), alice.client().revision());
    println!("  Server: {:?} at revision {}", server.document(), server.revision());
    for (revision, op) in server.operations_since(0)?.iter().enumerate() {
        println!("  history[{revision}] = {}", serde_json::to_string(op)?);
    }

    Ok(())
}

fn report(message: &Message) {
    match message {
        Message::Acknowledge { .. } => println!("Received acknowledgement"),
        Message::Operation { operation, .. } => println!("Received remote operation {operation:?}"),
    }
}
