//! Concurrent editors converging through one server
//!
//! Three sessions edit "0123" at the same time from separate tasks. The
//! server commits submissions in arrival order and every replica ends with
//! the same text.
//!
//! Run with: cargo run --example concurrent_edits

use ot_sync::client::{ClientConfig, Connection};
use ot_sync::server::{ServerConfig, SharedServer};
use ot_sync::Operation;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("OT Concurrent Edits Example");
    println!("===========================\n");

    let (server, inbox) = SharedServer::new(ServerConfig {
        initial_document: "0123".into(),
        ..Default::default()
    });
    let inbox_task = tokio::spawn(inbox.run());

    let edits = [
        ("alice", Operation::insert_at(4, 3, "456")?),
        ("bob", Operation::delete_at(4, 1, 3)?),
        ("carol", Operation::insert_at(4, 0, ">> ")?),
    ];

    // Connect everyone before anyone edits so all start from revision 0.
    let sessions = edits.len();
    let connections: Vec<(Connection, Operation)> = edits
        .into_iter()
        .map(|(name, edit)| {
            let conn = server.connect(ClientConfig {
                session_id: Some(name.into()),
                ..Default::default()
            });
            (conn, edit)
        })
        .collect();

    let tasks: Vec<_> = connections
        .into_iter()
        .map(|(conn, edit)| tokio::spawn(edit_and_settle(conn, edit, sessions)))
        .collect();

    for task in tasks {
        let (name, document) = task.await??;
        println!("  {name:<6} {document:?}");
    }
    println!("  server {:?} at revision {}", server.document(), server.revision());

    inbox_task.abort();
    Ok(())
}

/// Submit one edit, then handle messages until the ack and every other
/// session's broadcast have arrived.
async fn edit_and_settle(
    mut conn: Connection,
    edit: Operation,
    sessions: usize,
) -> anyhow::Result<(String, String)> {
    conn.edit(edit)?;
    for _ in 0..sessions {
        match timeout(Duration::from_secs(5), conn.recv()).await? {
            Some(handled) => {
                handled?;
            }
            None => anyhow::bail!("server closed {}", conn.session_id()),
        }
    }
    Ok((conn.session_id().to_string(), conn.document().to_owned()))
}
