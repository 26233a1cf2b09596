//! End-to-end tests driving the relay over real TCP sockets.
//!
//! Each test binds an ephemeral port, runs the full accept loop, and
//! speaks the wire protocol through plain buffered streams, exactly like
//! an external client would.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use chat_relay::serve;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_relay() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(serve(listener));
    addr
}

struct TestClient {
    reader: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .expect("write");
    }

    /// Send raw bytes without a terminating newline.
    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("write");
    }

    async fn recv(&mut self) -> String {
        timeout(READ_TIMEOUT, self.reader.next_line())
            .await
            .expect("timed out waiting for line")
            .expect("read failed")
            .expect("connection closed early")
    }

    async fn expect(&mut self, line: &str) {
        assert_eq!(self.recv().await, line);
    }

    async fn expect_closed(&mut self) {
        let line = timeout(READ_TIMEOUT, self.reader.next_line())
            .await
            .expect("timed out waiting for close")
            .expect("read failed");
        assert_eq!(line, None);
    }
}

/// Connect a client, register `name`, and join `room`, consuming replies.
async fn member(addr: SocketAddr, name: &str, room: &str) -> TestClient {
    let mut client = TestClient::connect(addr).await;
    client.send(&format!("/nick {}", name)).await;
    client.expect("OK").await;
    client.send(&format!("/join {}", room)).await;
    client.expect("OK").await;
    client
}

#[tokio::test]
async fn nickname_conflict_scenario() {
    let addr = start_relay().await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;

    a.send("/nick alice").await;
    a.expect("OK").await;

    b.send("/nick alice").await;
    b.expect("ERROR").await;

    b.send("/nick bob").await;
    b.expect("OK").await;
}

#[tokio::test]
async fn join_visibility_and_fanout() {
    let addr = start_relay().await;
    let mut a = member(addr, "alice", "lobby").await;
    let mut b = member(addr, "bob", "lobby").await;

    // the earlier member sees the join; the joiner hears nothing about
    // itself
    a.expect("JOINED bob").await;

    a.send("hello").await;
    b.expect("MESSAGE alice hello").await;

    // no echo back to alice: her next line is the reply to /leave
    a.send("/leave").await;
    a.expect("OK").await;
    b.expect("LEFT alice").await;
}

#[tokio::test]
async fn leave_twice_scenario() {
    let addr = start_relay().await;
    let mut a = member(addr, "alice", "lobby").await;
    let mut b = member(addr, "bob", "lobby").await;
    a.expect("JOINED bob").await;

    a.send("/leave").await;
    a.expect("OK").await;
    b.expect("LEFT alice").await;

    a.send("/leave").await;
    a.expect("ERROR").await;
}

#[tokio::test]
async fn private_messages_bypass_rooms() {
    let addr = start_relay().await;
    let mut a = member(addr, "alice", "lobby").await;
    let mut c = member(addr, "carol", "lobby").await;
    a.expect("JOINED carol").await;

    let mut b = TestClient::connect(addr).await;
    b.send("/nick bob").await;
    b.expect("OK").await;

    a.send("/priv bob hi there").await;
    a.expect("OK").await;
    b.expect("MESSAGE alice hi there").await;

    // carol shares alice's room but never sees the private line
    a.send("public").await;
    c.expect("MESSAGE alice public").await;

    // directed message errors
    a.send("/priv nobody hi").await;
    a.expect("ERROR").await;
    a.send("/priv alice hi").await;
    a.expect("ERROR").await;
}

#[tokio::test]
async fn bye_acknowledges_then_closes() {
    let addr = start_relay().await;
    let mut a = member(addr, "alice", "lobby").await;
    let mut b = member(addr, "bob", "lobby").await;
    a.expect("JOINED bob").await;

    a.send("/bye").await;
    a.expect("BYE").await;
    a.expect_closed().await;

    b.expect("LEFT alice").await;
}

#[tokio::test]
async fn dropped_connection_cleans_up() {
    let addr = start_relay().await;
    let a = member(addr, "alice", "lobby").await;
    let mut b = member(addr, "bob", "lobby").await;

    drop(a); // abrupt close, no /bye
    b.expect("LEFT alice").await;

    // the nickname is free again
    let mut c = TestClient::connect(addr).await;
    c.send("/nick alice").await;
    c.expect("OK").await;
}

#[tokio::test]
async fn escaped_slash_is_chat_text() {
    let addr = start_relay().await;
    let mut a = member(addr, "alice", "lobby").await;
    let mut b = member(addr, "bob", "lobby").await;
    a.expect("JOINED bob").await;

    // "//nick carol" is a literal message "/nick carol", not a command
    a.send("//nick carol").await;
    b.expect("MESSAGE alice /nick carol").await;

    // a single leading slash is still a command
    a.send("/nick carol").await;
    a.expect("OK").await;
    b.expect("NEWNICK alice carol").await;
}

#[tokio::test]
async fn malformed_commands_keep_connection_open() {
    let addr = start_relay().await;
    let mut a = TestClient::connect(addr).await;

    a.send("/frobnicate").await;
    a.expect("ERROR").await;
    a.send("/nick").await;
    a.expect("ERROR").await;

    // chat outside a room is silently dropped, not an error
    a.send("hello?").await;
    a.send("/nick alice").await;
    a.expect("OK").await;
}

#[tokio::test]
async fn switching_rooms_notifies_both_sides() {
    let addr = start_relay().await;
    let mut a = member(addr, "alice", "red").await;
    let mut b = member(addr, "bob", "red").await;
    a.expect("JOINED bob").await;
    let mut c = member(addr, "carol", "blue").await;

    // joining the current room again is an error
    a.send("/join red").await;
    a.expect("ERROR").await;

    a.send("/join blue").await;
    a.expect("OK").await;
    b.expect("LEFT alice").await;
    c.expect("JOINED alice").await;

    a.send("hi blue").await;
    c.expect("MESSAGE alice hi blue").await;
}

#[tokio::test]
async fn commands_split_across_writes_reassemble() {
    let addr = start_relay().await;
    let mut a = TestClient::connect(addr).await;

    a.send_raw(b"/nick al").await;
    a.send_raw(b"ice\r\n/join lo").await;
    a.expect("OK").await;
    a.send_raw(b"bby\n").await;
    a.expect("OK").await;

    let mut b = member(addr, "bob", "lobby").await;
    a.expect("JOINED bob").await;
    a.send("hello").await;
    b.expect("MESSAGE alice hello").await;
}

#[tokio::test]
async fn empty_room_is_recreated_transparently() {
    let addr = start_relay().await;
    let mut a = member(addr, "alice", "lobby").await;
    a.send("/leave").await;
    a.expect("OK").await;

    // the emptied room is gone; joining the name again behaves like a
    // brand-new room
    let mut b = member(addr, "bob", "lobby").await;
    a.send("/join lobby").await;
    a.expect("OK").await;
    b.expect("JOINED alice").await;
}
