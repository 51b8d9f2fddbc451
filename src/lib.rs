//! # quizwire
//!
//! Line-protocol quiz server: each connected participant is sequenced
//! through a shared, read-only question bank and scored as they go.
//!
//! ## Architecture
//!
//! - **Bank**: immutable [`QuestionBank`] loaded once, shared via `Arc`
//! - **Protocol**: `PREFIX:payload` text lines, one frame per line
//! - **Session**: one task per connection driving a [`session::SessionMachine`]
//! - **Server**: accept loop bounded by a session pool, cancellable as a whole
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quizwire::{QuestionBank, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bank = Arc::new(QuestionBank::load_file("questions.txt").await?);
//!     let server = Server::builder().address("0.0.0.0:12345").start(bank).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.stop();
//!     server.wait_for_shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod bank;
pub mod client;
pub mod control;
pub mod error;
pub mod events;
pub mod protocol;
pub mod session;
pub mod writer;

mod server;

pub use bank::{Question, QuestionBank};
pub use client::QuizClient;
pub use error::QuizError;
pub use server::{Server, ServerBuilder, ServerConfig, DEFAULT_ADDRESS, DEFAULT_MAX_SESSIONS};
pub use session::{Session, SessionConfig, SessionOutcome};
