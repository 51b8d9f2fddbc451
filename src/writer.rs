//! Per-connection writer task.
//!
//! A session never writes to its socket directly. It queues encoded frames on
//! a bounded channel and one task per connection owns the write half, so each
//! frame lands whole and in queue order.
//!
//! ```text
//! Session ─► WriterHandle ─► mpsc (bounded) ─► writer_loop ─► write half
//! ```
//!
//! The bounded queue is the backpressure: when a slow peer lets it fill up,
//! [`WriterHandle::send`] waits, and gives up with
//! [`QuizError::BackpressureTimeout`] after the configured timeout.
//!
//! Frames produced by one answer (`RESULT`, `SCORE`, `QUESTION`, `OPTIONS`)
//! usually arrive together; the loop coalesces whatever is already queued into
//! one buffer and issues a single write per batch.
//!
//! Cancelling the task's token never interrupts a batch mid-write: the batch
//! in flight is finished (within the send timeout), anything still queued is
//! dropped, and the write half is released. The peer sees whole frames or
//! nothing.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{QuizError, Result};
use crate::protocol::ServerFrame;

/// Default number of frames that may wait in the queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Default time a send may wait for queue space.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on frames coalesced into one write.
const MAX_BATCH_FRAMES: usize = 32;

/// A frame ready to be written to the socket.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    /// Encoded frame bytes including the trailing newline.
    pub bytes: Bytes,
}

impl OutboundFrame {
    #[inline]
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// Encode a server frame.
    #[inline]
    pub fn from_frame(frame: &ServerFrame) -> Self {
        Self::new(frame.encode())
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Writer task settings.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Frames that may be queued before senders wait.
    pub queue_capacity: usize,
    /// How long a send may wait for queue space, and how long one batch
    /// may take to reach the socket.
    pub send_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

/// Sending side of a connection's writer task.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<OutboundFrame>,
    send_timeout: Duration,
}

impl WriterHandle {
    /// Queue a frame for writing.
    ///
    /// # Errors
    ///
    /// - [`QuizError::BackpressureTimeout`] if the queue stayed full
    /// - [`QuizError::ConnectionClosed`] once the writer task has stopped
    pub async fn send(&self, frame: OutboundFrame) -> Result<()> {
        if self.is_saturated() {
            tracing::debug!(queued = self.queued(), "Outbound queue full, waiting");
        }

        match tokio::time::timeout(self.send_timeout, self.tx.send(frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(QuizError::ConnectionClosed),
            Err(_) => {
                tracing::warn!(queued = self.queued(), "Peer stopped reading");
                Err(QuizError::BackpressureTimeout)
            }
        }
    }

    /// Encode and queue a server frame.
    pub async fn send_frame(&self, frame: &ServerFrame) -> Result<()> {
        self.send(OutboundFrame::from_frame(frame)).await
    }

    /// Frames queued but not yet picked up by the writer.
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// True when the next send would have to wait.
    pub fn is_saturated(&self) -> bool {
        self.tx.capacity() == 0
    }
}

/// Spawn the writer task for `writer`.
///
/// The task ends cleanly once every handle is dropped and the queue is
/// drained, shutting the write half down on the way out. Cancelling `stop`
/// ends it after the batch in flight, dropping queued frames. A write
/// failure or a batch stuck longer than the send timeout ends it with the
/// error, after which sends fail with [`QuizError::ConnectionClosed`].
pub fn spawn_writer_task<W>(
    writer: W,
    config: WriterConfig,
    stop: CancellationToken,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
    let handle = WriterHandle {
        tx,
        send_timeout: config.send_timeout,
    };

    let task = tokio::spawn(writer_loop(rx, writer, stop, config.send_timeout));
    (handle, task)
}

async fn writer_loop<W>(
    mut rx: mpsc::Receiver<OutboundFrame>,
    mut writer: W,
    stop: CancellationToken,
    write_timeout: Duration,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(4 * 1024);

    loop {
        let first = tokio::select! {
            biased;
            _ = stop.cancelled() => {
                tracing::debug!("Writer cancelled, dropping queued frames");
                return Ok(());
            }
            next = rx.recv() => match next {
                Some(frame) => frame,
                None => break,
            },
        };

        buf.clear();
        let frames = coalesce(&mut rx, first, &mut buf);

        // Not raced against `stop`: a batch is written whole or the peer is dropped
        tokio::time::timeout(write_timeout, write_batch(&mut writer, &buf))
            .await
            .map_err(|_| QuizError::BackpressureTimeout)??;
        tracing::trace!(frames, bytes = buf.len(), "Wrote batch");
    }

    writer.shutdown().await?;
    Ok(())
}

async fn write_batch<W>(writer: &mut W, batch: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(batch).await?;
    writer.flush().await
}

/// Append `first` and anything already queued (up to the batch limit) to `buf`.
///
/// Returns the number of frames appended.
fn coalesce(
    rx: &mut mpsc::Receiver<OutboundFrame>,
    first: OutboundFrame,
    buf: &mut BytesMut,
) -> usize {
    buf.extend_from_slice(&first.bytes);
    let mut count = 1;

    while count < MAX_BATCH_FRAMES {
        let Ok(next) = rx.try_recv() else { break };
        buf.extend_from_slice(&next.bytes);
        count += 1;
    }
    count
}
