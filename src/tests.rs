//! End-to-end client/server scenarios.
//!
//! Messages are queued by the transports and delivered by hand, one step at a
//! time, so each test pins down an exact interleaving of sends and deliveries.

use crate::client::{Client, ClientConfig, ClientStateKind, ClientTransport};
use crate::operation::Operation;
use crate::protocol::Message;
use crate::server::{Server, ServerConfig, ServerTransport, SharedServer};
use crate::types::{Revision, SessionId, Snapshot};
use std::collections::VecDeque;

#[derive(Debug, Default)]
struct ClientQueue {
    outgoing: VecDeque<(Operation, Revision)>,
}

impl ClientTransport for ClientQueue {
    fn send_operation(&mut self, operation: &Operation, revision: Revision) {
        self.outgoing.push_back((operation.clone(), revision));
    }
}

#[derive(Debug)]
enum Delivery {
    Ack,
    Operation(Operation),
}

#[derive(Debug, Default)]
struct ServerQueue {
    sessions: Vec<SessionId>,
    outgoing: Vec<(SessionId, Delivery)>,
}

impl ServerTransport for ServerQueue {
    fn send_ack(&mut self, session_id: &SessionId) {
        self.outgoing.push((session_id.clone(), Delivery::Ack));
    }

    fn send_operation_except(&mut self, operation: &Operation, session_id: &SessionId) {
        for peer in self.sessions.iter().filter(|peer| *peer != session_id) {
            self.outgoing
                .push((peer.clone(), Delivery::Operation(operation.clone())));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Peer {
    Alice,
    Bob,
}

impl Peer {
    fn id(self) -> SessionId {
        match self {
            Peer::Alice => SessionId::new("alice"),
            Peer::Bob => SessionId::new("bob"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Event {
    /// Local insert at a char position of the peer's current text
    Insert(Peer, usize, &'static str),
    /// Local delete of `count` chars at a position of the peer's current text
    Delete(Peer, usize, usize),
    /// The peer's oldest outgoing submission reaches the server
    Send(Peer),
    /// The server's oldest message addressed to the peer reaches it
    Deliver(Peer),
}

use Event::{Delete, Deliver, Insert, Send};
use Peer::{Alice, Bob};

struct Network {
    server: Server<ServerQueue>,
    alice: Client<ClientQueue>,
    bob: Client<ClientQueue>,
}

impl Network {
    fn new(document: &str) -> Self {
        let config = ServerConfig {
            initial_document: document.to_owned(),
            ..Default::default()
        };
        let transport = ServerQueue {
            sessions: vec![Alice.id(), Bob.id()],
            ..Default::default()
        };
        let server = Server::with_config(config, transport);
        let alice = Client::from_snapshot(server.snapshot(), ClientQueue::default());
        let bob = Client::from_snapshot(server.snapshot(), ClientQueue::default());
        Network { server, alice, bob }
    }

    fn client_mut(&mut self, peer: Peer) -> &mut Client<ClientQueue> {
        match peer {
            Alice => &mut self.alice,
            Bob => &mut self.bob,
        }
    }

    fn play(&mut self, event: Event) {
        match event {
            Insert(peer, pos, text) => {
                let client = self.client_mut(peer);
                let len = client.document().chars().count();
                let op = Operation::insert_at(len, pos, text).unwrap();
                client.apply_client(op).unwrap();
            }
            Delete(peer, pos, count) => {
                let client = self.client_mut(peer);
                let len = client.document().chars().count();
                let op = Operation::delete_at(len, pos, count).unwrap();
                client.apply_client(op).unwrap();
            }
            Send(peer) => {
                let (op, revision) = self
                    .client_mut(peer)
                    .transport_mut()
                    .outgoing
                    .pop_front()
                    .unwrap_or_else(|| panic!("{peer:?} has nothing to send"));

                // Round-trip through the wire format like a real socket would.
                let wire = Message::submit(op, revision).encode().unwrap();
                let Message::Operation {
                    operation,
                    revision: Some(revision),
                    ..
                } = Message::decode(&wire).unwrap()
                else {
                    panic!("submission lost its revision");
                };
                self.server
                    .receive_operation(operation, revision, &peer.id())
                    .unwrap();
            }
            Deliver(peer) => {
                let id = peer.id();
                let queue = &mut self.server.transport_mut().outgoing;
                let index = queue
                    .iter()
                    .position(|(to, _)| *to == id)
                    .unwrap_or_else(|| panic!("nothing addressed to {peer:?}"));
                let (_, delivery) = queue.remove(index);

                let client = self.client_mut(peer);
                match delivery {
                    Delivery::Ack => client.ack_operation().unwrap(),
                    Delivery::Operation(op) => client.apply_server(op).unwrap(),
                }
            }
        }
    }

    /// Every queue is empty and all three replicas agree; returns the text.
    fn settled(&self) -> String {
        assert!(self.alice.transport().outgoing.is_empty());
        assert!(self.bob.transport().outgoing.is_empty());
        assert!(self.server.transport().outgoing.is_empty());

        assert_eq!(self.alice.document(), self.bob.document());
        assert_eq!(self.alice.document(), self.server.document());
        assert_eq!(self.alice.revision(), self.server.revision());
        assert_eq!(self.bob.revision(), self.server.revision());
        assert_eq!(self.alice.state(), ClientStateKind::Synchronized);
        assert_eq!(self.bob.state(), ClientStateKind::Synchronized);
        self.server.document().to_owned()
    }
}

fn run(document: &str, events: impl IntoIterator<Item = Event>) -> String {
    let mut network = Network::new(document);
    for event in events {
        network.play(event);
    }
    network.settled()
}

/// Alice submits, then the server's ack and broadcast are delivered.
fn alice_round() -> [Event; 3] {
    [Send(Alice), Deliver(Alice), Deliver(Bob)]
}

fn alice_edits() -> [Event; 5] {
    [
        Insert(Alice, 0, "0123"), // 0123
        Insert(Alice, 2, "45"),   // 014523
        Delete(Alice, 3, 3),      // 014
        Insert(Alice, 3, "678"),  // 014678
        Delete(Alice, 0, 1),      // 14678
    ]
}

#[test]
fn test_insert_once() {
    let events = [Insert(Alice, 0, "01234")].into_iter().chain(alice_round());
    assert_eq!(run("", events), "01234");
}

#[test]
fn test_insert_then_delete() {
    let events = [Insert(Alice, 0, "012345"), Delete(Alice, 2, 2)]
        .into_iter()
        .chain(alice_round())
        .chain(alice_round());
    assert_eq!(run("", events), "0145");
}

#[test]
fn test_insert_twice_with_late_broadcasts() {
    let events = [
        Insert(Alice, 0, "0123"),
        Insert(Alice, 2, "456"),
        Send(Alice),
        Deliver(Alice),
        Send(Alice),
        Deliver(Alice),
        Deliver(Bob),
        Deliver(Bob),
    ];
    assert_eq!(run("", events), "0145623");
}

#[test]
fn test_many_edits_sent_after_all_local_work() {
    let events = alice_edits()
        .into_iter()
        .chain(alice_round())
        .chain(alice_round());
    assert_eq!(run("", events), "14678");
}

#[test]
fn test_many_edits_sent_after_each_edit() {
    let events = alice_edits()
        .into_iter()
        .flat_map(|edit| std::iter::once(edit).chain(alice_round()));
    assert_eq!(run("", events), "14678");
}

#[test]
fn test_many_edits_sent_in_pairs() {
    let edits = alice_edits();
    let events: Vec<Event> = edits
        .chunks(2)
        .flat_map(|chunk| {
            let rounds = (0..chunk.len()).flat_map(|_| alice_round());
            chunk.iter().copied().chain(rounds).collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(run("", events), "14678");
}

#[test]
fn test_concurrent_inserts_into_empty_document() {
    let events = [
        Insert(Alice, 0, "0123"),
        Insert(Bob, 0, "4567"),
        Send(Alice),
        Send(Bob),
        Deliver(Alice),
        Deliver(Bob),
        Deliver(Alice),
        Deliver(Bob),
    ];
    let doc = run("", events);
    assert!(doc == "01234567" || doc == "45670123", "unexpected {doc}");
}

#[test]
fn test_concurrent_edits_with_buffered_work() {
    let events = [
        Insert(Alice, 0, "0123"),
        Send(Alice),
        Deliver(Alice),
        Deliver(Bob),
        Insert(Alice, 3, "456"), // 0124563
        Delete(Alice, 2, 3),     // 0163
        Delete(Bob, 1, 3),       // 0
        Send(Bob),
        Send(Alice),
        Deliver(Alice),
        Deliver(Alice),
        Deliver(Bob),
        Send(Alice),
        Deliver(Bob),
        Deliver(Alice),
        Deliver(Bob),
    ];
    assert_eq!(run("", events), "06");
}

#[test]
fn test_insert_races_delete_in_either_order() {
    let alice_first = [
        Insert(Alice, 3, "456"),
        Delete(Bob, 1, 3),
        Send(Alice),
        Send(Bob),
        Deliver(Alice),
        Deliver(Bob),
        Deliver(Alice),
        Deliver(Bob),
    ];
    assert_eq!(run("0123", alice_first), "0456");

    let bob_first = [
        Insert(Alice, 3, "456"),
        Delete(Bob, 1, 3),
        Send(Bob),
        Send(Alice),
        Deliver(Bob),
        Deliver(Alice),
        Deliver(Bob),
        Deliver(Alice),
    ];
    assert_eq!(run("0123", bob_first), "0456");
}

#[test]
fn test_remote_edit_arrives_while_buffering() {
    let mut network = Network::new("abc");
    network.play(Insert(Alice, 3, "d"));
    network.play(Insert(Alice, 4, "e"));
    assert_eq!(network.alice.state(), ClientStateKind::AwaitingAckBuffered);

    network.play(Insert(Bob, 0, "X"));
    network.play(Send(Bob));
    network.play(Deliver(Alice));
    assert_eq!(network.alice.document(), "Xabcde");
    assert_eq!(network.alice.revision(), 3);

    for event in [Send(Alice), Deliver(Bob), Deliver(Bob), Deliver(Alice)] {
        network.play(event);
    }
    for event in alice_round() {
        network.play(event);
    }
    assert_eq!(network.settled(), "Xabcde");
}

#[test]
fn test_lagging_client_resyncs_from_snapshot() {
    let mut network = Network::new("");
    for event in [Insert(Alice, 0, "hello")].into_iter().chain(alice_round()) {
        network.play(event);
    }

    let mut carol = Client::new(ClientQueue::default());
    carol.reset(network.server.snapshot());
    assert_eq!(carol.document(), "hello");
    assert_eq!(carol.revision(), 1);

    let missed = network.server.operations_since(0).unwrap();
    let mut replayed = Client::from_snapshot(Snapshot::default(), ClientQueue::default());
    for op in missed {
        replayed.apply_server(op.clone()).unwrap();
    }
    assert_eq!(replayed.document(), carol.document());
    assert_eq!(replayed.revision(), carol.revision());
}

fn named(name: &str) -> ClientConfig {
    ClientConfig {
        session_id: Some(name.into()),
        ..Default::default()
    }
}

#[test]
fn test_three_channel_sessions_converge() {
    let (server, mut inbox) = SharedServer::new(ServerConfig {
        initial_document: "0123".into(),
        ..Default::default()
    });
    let mut alice = server.connect(named("alice"));
    let mut bob = server.connect(named("bob"));
    let mut carol = server.connect(named("carol"));

    alice.edit(Operation::insert_at(4, 3, "456").unwrap()).unwrap();
    bob.edit(Operation::delete_at(4, 1, 3).unwrap()).unwrap();
    carol.edit(Operation::insert_at(4, 0, "<").unwrap()).unwrap();
    carol.edit(Operation::insert_at(5, 5, ">").unwrap()).unwrap();

    loop {
        let moved = inbox.process_pending().unwrap()
            + alice.drain().unwrap()
            + bob.drain().unwrap()
            + carol.drain().unwrap();
        if moved == 0 {
            break;
        }
    }

    assert_eq!(server.document(), "<0456>");
    for conn in [&alice, &bob, &carol] {
        assert_eq!(conn.document(), server.document());
        assert_eq!(conn.client().revision(), server.revision());
        assert_eq!(conn.client().state(), ClientStateKind::Synchronized);
    }
    assert_eq!(server.revision(), 4);
}

#[tokio::test]
async fn test_background_inbox_converges() {
    let (server, inbox) = SharedServer::new(ServerConfig::default());
    let mut alice = server.connect(named("alice"));
    let mut bob = server.connect(named("bob"));
    let task = tokio::spawn(inbox.run());

    alice.edit(Operation::insert_at(0, 0, "ab").unwrap()).unwrap();
    bob.edit(Operation::insert_at(0, 0, "cd").unwrap()).unwrap();

    // Each side sees its own ack and the other's broadcast.
    for _ in 0..2 {
        alice.recv().await.unwrap().unwrap();
        bob.recv().await.unwrap().unwrap();
    }

    assert_eq!(alice.document(), bob.document());
    assert_eq!(alice.document(), server.document());
    assert_eq!(server.document().len(), 4);
    task.abort();
}
