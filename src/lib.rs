//! Line-based TCP Chat Relay Library
//!
//! A chat relay server speaking a newline-terminated text protocol:
//! clients register a nickname, join named rooms, and exchange lines the
//! server fans out to the other room members.
//!
//! # Features
//! - Line-oriented UTF-8 wire protocol with `//` escaping
//! - Nickname registration with server-wide uniqueness
//! - Named rooms, created lazily and removed when emptied
//! - Room broadcast without self-echo, plus directed private messages
//! - Bounded per-session outbound queues; slow peers are disconnected
//!   instead of stalling the server
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning all state (sessions, rooms,
//!   registries); one command channel serializes every mutation, so
//!   broadcasts observe a single global order
//! - Each connection has a read task and a write task communicating with
//!   the actor - no locks, no shared mutable state
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use chat_relay::serve;
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:9000").await.unwrap();
//!     serve(listener).await;
//! }
//! ```

pub mod codec;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod room;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use codec::LineDecoder;
pub use error::{AppError, CommandError, DecodeError, ParseError, SendError};
pub use handler::handle_connection;
pub use message::{ClientMessage, ServerMessage};
pub use registry::ClientRegistry;
pub use room::{Room, RoomRegistry};
pub use server::{serve, ChatServer, ServerCommand};
pub use session::{Session, SessionState};
pub use types::{ClientId, RoomId};
