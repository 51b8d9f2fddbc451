//! Server builder, accept loop, and lifecycle control.
//!
//! The [`ServerBuilder`] provides a fluent API for configuring the listener.
//! The [`Server`] manages the lifecycle:
//! 1. Validate the question bank and bind the address
//! 2. Accept connections, one permit from the session pool per connection
//! 3. Run each connection's [`Session`] on its own task
//! 4. On [`Server::stop`], stop accepting and cancel running sessions
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quizwire::{QuestionBank, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bank = Arc::new(QuestionBank::load_file("questions.txt").await?);
//!     let server = Server::builder()
//!         .address("127.0.0.1:12345")
//!         .max_sessions(64)
//!         .start(bank)
//!         .await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.stop();
//!     server.wait_for_shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::bank::QuestionBank;
use crate::control::{ServerStatus, StatusReport};
use crate::error::{QuizError, Result};
use crate::events::{EventSink, SessionEvent, TracingSink};
use crate::session::{Session, SessionConfig};
use crate::writer::WriterConfig;

/// Default listen address (all interfaces, port 12345).
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:12345";

/// Default maximum concurrent sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 256;

/// Pause after a failed accept before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `host:port` to bind.
    pub address: String,
    /// Upper bound on concurrently running sessions.
    pub max_sessions: usize,
    /// Settings applied to every session.
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            session: SessionConfig::default(),
        }
    }
}

/// Builder for configuring and starting a quiz server.
pub struct ServerBuilder {
    config: ServerConfig,
    sink: Arc<dyn EventSink>,
}

impl ServerBuilder {
    /// Create a new server builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the `host:port` to bind.
    ///
    /// Default: `0.0.0.0:12345`
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    /// Set the maximum number of concurrent sessions.
    ///
    /// When the limit is reached, new connections wait in the accept backlog
    /// until a running session ends. Values below 1 are treated as 1.
    /// Default: 256
    pub fn max_sessions(mut self, limit: usize) -> Self {
        self.config.max_sessions = limit;
        self
    }

    /// Whether a rejected answer is followed by the current question again.
    ///
    /// Default: true
    pub fn reprompt_on_error(mut self, reprompt: bool) -> Self {
        self.config.session.reprompt_on_error = reprompt;
        self
    }

    /// Set the maximum accepted inbound line length.
    pub fn max_line_length(mut self, limit: usize) -> Self {
        self.config.session.max_line_length = limit;
        self
    }

    /// Set the per-connection writer configuration.
    pub fn writer_config(mut self, config: WriterConfig) -> Self {
        self.config.session.writer = config;
        self
    }

    /// Set the sink that receives listener and session events.
    ///
    /// Default: [`TracingSink`]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Validate, bind, and start accepting.
    ///
    /// # Errors
    ///
    /// - [`QuizError::NoQuestions`] if the bank is empty (nothing is bound)
    /// - [`QuizError::Bind`] if the address is unavailable
    pub async fn start(self, bank: Arc<QuestionBank>) -> Result<Server> {
        Server::start(self.config, bank, self.sink).await
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running quiz server.
///
/// Use `stop()` to request shutdown and `wait_for_shutdown()` to wait until
/// the accept loop and every session have released their connections.
pub struct Server {
    local_addr: SocketAddr,
    bank: Arc<QuestionBank>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    accept_task: JoinHandle<()>,
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    async fn start(
        config: ServerConfig,
        bank: Arc<QuestionBank>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        if bank.is_empty() {
            return Err(QuizError::NoQuestions {
                source_name: "question bank".to_string(),
            });
        }

        let listener = TcpListener::bind(&config.address)
            .await
            .map_err(|source| QuizError::Bind {
                address: config.address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        Ok(Self::serve(listener, local_addr, config, bank, sink))
    }

    /// Run the accept loop over an already bound connection source.
    fn serve<L: Acceptor>(
        listener: L,
        local_addr: SocketAddr,
        config: ServerConfig,
        bank: Arc<QuestionBank>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let max_sessions = config.max_sessions.max(1);
        let sessions = Arc::new(Semaphore::new(max_sessions));
        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();

        sink.emit(&SessionEvent::ListenerStarted {
            address: local_addr.to_string(),
            questions: bank.len(),
        });

        let accept_loop = AcceptLoop {
            listener,
            bank: bank.clone(),
            session_config: config.session,
            sink,
            sessions,
            shutdown: shutdown.clone(),
            tracker: tracker.clone(),
        };
        let accept_task = tokio::spawn(accept_loop.run());

        Server {
            local_addr,
            bank,
            shutdown,
            tracker,
            accept_task,
        }
    }

    /// The bound address (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of questions served.
    pub fn question_count(&self) -> usize {
        self.bank.len()
    }

    /// Number of sessions currently running.
    pub fn active_sessions(&self) -> usize {
        self.tracker.len()
    }

    pub fn status(&self) -> ServerStatus {
        if self.shutdown.is_cancelled() || self.accept_task.is_finished() {
            ServerStatus::Stopped
        } else {
            ServerStatus::Running
        }
    }

    /// Snapshot for a presentation layer.
    pub fn status_report(&self) -> StatusReport {
        let status = self.status();
        StatusReport {
            status,
            address: (status == ServerStatus::Running).then(|| self.local_addr.to_string()),
            questions: self.question_count(),
            active_sessions: self.active_sessions(),
        }
    }

    /// Request shutdown without waiting.
    ///
    /// The accept loop exits promptly and running sessions are cancelled,
    /// dropping their connections.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Wait until the accept loop and all sessions have finished.
    ///
    /// Call `stop()` first unless the accept loop is expected to end on its own.
    pub async fn wait_for_shutdown(self) -> Result<()> {
        let joined = self.accept_task.await;
        self.tracker.close();
        self.tracker.wait().await;

        joined.map_err(|e| QuizError::Protocol(format!("accept loop failed: {}", e)))
    }
}

/// Source of incoming connections for the accept loop.
trait Acceptor: Send + Sync + 'static {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Acceptor for TcpListener {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// State owned by the accept loop task.
struct AcceptLoop<L> {
    listener: L,
    bank: Arc<QuestionBank>,
    session_config: SessionConfig,
    sink: Arc<dyn EventSink>,
    sessions: Arc<Semaphore>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl<L: Acceptor> AcceptLoop<L> {
    async fn run(self) {
        loop {
            let permit = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                permit = self.sessions.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => self.spawn_session(stream, peer, permit),
                Err(e) => {
                    drop(permit);
                    self.sink.emit(&SessionEvent::AcceptFailed {
                        error: e.to_string(),
                    });
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        drop(self.listener);
        self.tracker.close();
        self.sink.emit(&SessionEvent::ListenerStopped);
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr, permit: OwnedSemaphorePermit) {
        let peer = peer.to_string();
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%peer, "Could not set TCP_NODELAY: {}", e);
        }

        self.sink.emit(&SessionEvent::ClientConnected { peer: peer.clone() });

        let session = Session::new(
            self.bank.clone(),
            peer.clone(),
            self.session_config.clone(),
            self.sink.clone(),
        );
        let cancel = self.shutdown.child_token();
        let sink = self.sink.clone();

        self.tracker.spawn(async move {
            // Permit is held until this task completes
            let _permit = permit;
            let (reader, writer) = stream.into_split();

            tokio::select! {
                _ = cancel.cancelled() => {
                    sink.emit(&SessionEvent::SessionAborted {
                        peer,
                        reason: "server shutting down".to_string(),
                    });
                }
                _ = session.run(reader, writer) => {}
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::Question;
    use crate::client::QuizClient;
    use crate::events::RecordingSink;
    use crate::protocol::ServerFrame;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` accepts, then hands out real connections.
    struct FlakyListener {
        inner: TcpListener,
        failures: AtomicUsize,
    }

    impl Acceptor for FlakyListener {
        fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
            let fail = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            async move {
                if fail {
                    return Err(io::Error::new(io::ErrorKind::Other, "too many open files"));
                }
                self.inner.accept().await
            }
        }
    }

    fn bank() -> Arc<QuestionBank> {
        let q = Question::new("2+2=?", vec!["3".into(), "4".into()], 2).unwrap();
        Arc::new(QuestionBank::new(vec![q]))
    }

    #[test]
    fn test_builder_defaults() {
        let builder = ServerBuilder::default();
        assert_eq!(builder.config.address, DEFAULT_ADDRESS);
        assert_eq!(builder.config.max_sessions, DEFAULT_MAX_SESSIONS);
        assert!(builder.config.session.reprompt_on_error);
    }

    #[test]
    fn test_builder_configuration() {
        let builder = Server::builder()
            .address("127.0.0.1:0")
            .max_sessions(8)
            .reprompt_on_error(false)
            .max_line_length(128)
            .writer_config(WriterConfig {
                queue_capacity: 4,
                ..WriterConfig::default()
            });

        assert_eq!(builder.config.address, "127.0.0.1:0");
        assert_eq!(builder.config.max_sessions, 8);
        assert!(!builder.config.session.reprompt_on_error);
        assert_eq!(builder.config.session.max_line_length, 128);
        assert_eq!(builder.config.session.writer.queue_capacity, 4);
    }

    #[tokio::test]
    async fn test_start_rejects_empty_bank() {
        let result = Server::builder()
            .address("127.0.0.1:0")
            .start(Arc::new(QuestionBank::empty()))
            .await;
        assert!(matches!(result, Err(QuizError::NoQuestions { .. })));
    }

    #[tokio::test]
    async fn test_start_reports_bind_failure() {
        let first = Server::builder()
            .address("127.0.0.1:0")
            .event_sink(Arc::new(crate::events::NullSink))
            .start(bank())
            .await
            .unwrap();

        let taken = first.local_addr().to_string();
        let second = Server::builder().address(taken.clone()).start(bank()).await;
        assert!(matches!(second, Err(QuizError::Bind { ref address, .. }) if *address == taken));

        first.stop();
        first.wait_for_shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_accept_failure_keeps_listener_running() {
        let inner = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = inner.local_addr().unwrap();
        let listener = FlakyListener {
            inner,
            failures: AtomicUsize::new(1),
        };
        let sink = Arc::new(RecordingSink::new());
        let server = Server::serve(listener, addr, ServerConfig::default(), bank(), sink.clone());

        let mut client = QuizClient::connect(addr).await.unwrap();
        let first = tokio::time::timeout(Duration::from_secs(5), client.next_frame())
            .await
            .expect("connection was not served after the failed accept")
            .unwrap();
        assert_eq!(first, Some(ServerFrame::Total(1)));

        server.stop();
        server.wait_for_shutdown().await.unwrap();

        let events = sink.events();
        let failures = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::AcceptFailed { .. }))
            .count();
        assert_eq!(failures, 1);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::ClientConnected { .. })));
    }

    #[tokio::test]
    async fn test_stop_changes_status() {
        let sink = Arc::new(RecordingSink::new());
        let server = Server::builder()
            .address("127.0.0.1:0")
            .max_sessions(4)
            .event_sink(sink.clone())
            .start(bank())
            .await
            .unwrap();

        assert_eq!(server.status(), ServerStatus::Running);
        assert_eq!(server.question_count(), 1);
        assert_eq!(server.active_sessions(), 0);
        assert!(server.status_report().address.is_some());

        server.stop();
        assert_eq!(server.status(), ServerStatus::Stopped);
        assert!(server.status_report().address.is_none());
        server.wait_for_shutdown().await.unwrap();

        let events = sink.events();
        assert!(matches!(events.first(), Some(SessionEvent::ListenerStarted { questions: 1, .. })));
        assert_eq!(events.last(), Some(&SessionEvent::ListenerStopped));
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::AcceptFailed { .. })));
    }
}
