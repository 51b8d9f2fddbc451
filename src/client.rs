//! Headless quiz client.
//!
//! [`QuizClient`] connects to a server, decodes its frames (including the
//! multi-line Options block) and sends answers. It carries no presentation
//! logic; callers decide what to do with each [`ServerFrame`].
//!
//! # Example
//!
//! ```ignore
//! use quizwire::client::QuizClient;
//! use quizwire::protocol::ServerFrame;
//!
//! let mut client = QuizClient::connect("127.0.0.1:12345").await?;
//! while let Some(frame) = client.next_frame().await? {
//!     match frame {
//!         ServerFrame::Options(_) => client.answer(1).await?,
//!         ServerFrame::Finished(summary) => println!("{summary}"),
//!         _ => {}
//!     }
//! }
//! ```

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{QuizError, Result};
use crate::protocol::{ClientFrame, LineReader, ServerFrame, ServerFrameDecoder};

/// A connected headless client.
pub struct QuizClient {
    lines: LineReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    decoder: ServerFrameDecoder,
    finished: bool,
}

impl QuizClient {
    /// Connect to a quiz server.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        Ok(Self {
            lines: LineReader::new(reader),
            writer,
            decoder: ServerFrameDecoder::new(),
            finished: false,
        })
    }

    /// Read the next server frame.
    ///
    /// Returns `Ok(None)` at end-of-stream. If the stream ends inside an
    /// Options block, the truncated block is returned first.
    pub async fn next_frame(&mut self) -> Result<Option<ServerFrame>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let Some(line) = self.lines.next_line().await? else {
                self.finished = true;
                return Ok(self.decoder.finish());
            };

            let decoded = self
                .decoder
                .push_line(&line)
                .map_err(|e| QuizError::Protocol(e.to_string()))?;

            if let Some(frame) = decoded {
                tracing::trace!(kind = frame.kind(), "Received frame");
                return Ok(Some(frame));
            }
        }
    }

    /// Send an answer (1-indexed option number).
    pub async fn answer(&mut self, option: i64) -> Result<()> {
        self.send(&ClientFrame::Answer(option)).await
    }

    /// Send an arbitrary raw line.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        self.send(&ClientFrame::Other(line.to_string())).await
    }

    async fn send(&mut self, frame: &ClientFrame) -> Result<()> {
        self.writer.write_all(&frame.encode()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Close the sending side; the server treats this as a disconnect.
    pub async fn close(mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
