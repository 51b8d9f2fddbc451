//! Per-connection quiz session.
//!
//! The session is split in two:
//! - [`SessionMachine`] is the I/O-free state machine. It consumes inbound
//!   lines and produces the [`ServerFrame`]s to send, in order.
//! - [`Session`] drives one machine over a byte stream: it reads lines,
//!   feeds them to the machine, queues the replies on a writer task, and
//!   reports activity to an [`EventSink`].
//!
//! # State machine
//!
//! ```text
//! Start ──TOTAL──► AwaitingAnswer(i) ──valid ANSWER──► Advancing ──► AwaitingAnswer(i+1)
//!   │                 │     ▲                              │
//!   │ (empty bank)    │     └── bad ANSWER: ERROR,         └──(last)──► Finished
//!   └─────────────────┼──────── re-prompt                                  ▲
//!                     └── EOF / I/O error ── abort (no frames) ────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use quizwire::bank::{Question, QuestionBank};
//! use quizwire::protocol::{ServerFrame, Verdict};
//! use quizwire::session::{Phase, SessionMachine};
//!
//! let q = Question::new("2+2=?", vec!["3".into(), "4".into(), "5".into()], 2).unwrap();
//! let bank = Arc::new(QuestionBank::new(vec![q]));
//!
//! let mut machine = SessionMachine::new(bank, true);
//! let opening = machine.start();
//! assert_eq!(opening[0], ServerFrame::Total(1));
//!
//! let reply = machine.handle_line("ANSWER:2");
//! assert_eq!(reply.frames[0], ServerFrame::Result(Verdict::Correct));
//! assert_eq!(machine.phase(), Phase::Finished);
//! ```

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::bank::{Question, QuestionBank};
use crate::error::{QuizError, Result};
use crate::events::{EventSink, SessionEvent};
use crate::protocol::{
    validate_answer, ClientFrame, FrameError, LineReader, ServerFrame, Verdict, MAX_LINE_LENGTH,
};
use crate::writer::{spawn_writer_task, WriterConfig, WriterHandle};

/// Current node of the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, nothing sent yet.
    Start,
    /// Current question sent, waiting for an answer.
    AwaitingAnswer,
    /// Answer accepted, moving to the next question.
    Advancing,
    /// Completion frame sent. Terminal.
    Finished,
}

/// A scored answer, reported for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnsweredQuestion {
    /// 1-indexed question number.
    pub question_number: usize,
    pub correct: bool,
}

/// Frames produced by one inbound line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// Frames to send, in order.
    pub frames: Vec<ServerFrame>,
    /// Set when the line was a scored answer.
    pub answered: Option<AnsweredQuestion>,
}

impl Reply {
    fn ignored() -> Self {
        Self::default()
    }
}

/// I/O-free quiz state machine for one participant.
#[derive(Debug)]
pub struct SessionMachine {
    bank: Arc<QuestionBank>,
    position: usize,
    score: usize,
    phase: Phase,
    reprompt_on_error: bool,
}

impl SessionMachine {
    /// Create a machine over a shared bank.
    ///
    /// With `reprompt_on_error`, a rejected answer is followed by the current
    /// question again; otherwise only the error frame is sent.
    pub fn new(bank: Arc<QuestionBank>, reprompt_on_error: bool) -> Self {
        Self {
            bank,
            position: 0,
            score: 0,
            phase: Phase::Start,
            reprompt_on_error,
        }
    }

    /// Produce the opening frames. Only effective once, in [`Phase::Start`].
    pub fn start(&mut self) -> Vec<ServerFrame> {
        if self.phase != Phase::Start {
            return Vec::new();
        }

        let mut frames = vec![ServerFrame::Total(self.bank.len())];
        match self.bank.get(0) {
            Some(question) => {
                push_prompt(&mut frames, question);
                self.phase = Phase::AwaitingAnswer;
            }
            None => self.finish(&mut frames),
        }
        frames
    }

    /// Consume one inbound line.
    ///
    /// Lines that are not `ANSWER` frames are ignored. Outside
    /// [`Phase::AwaitingAnswer`] every line is ignored.
    pub fn handle_line(&mut self, line: &str) -> Reply {
        if self.phase != Phase::AwaitingAnswer {
            return Reply::ignored();
        }
        let Some(question) = self.bank.get(self.position) else {
            return Reply::ignored();
        };

        let answer = match ClientFrame::decode(line) {
            Ok(ClientFrame::Answer(n)) => n,
            Ok(ClientFrame::Other(_)) => return Reply::ignored(),
            Err(e) => return self.reject(&e),
        };

        match validate_answer(answer, question.option_count()) {
            Ok(choice) => self.accept(choice),
            Err(e) => self.reject(&e),
        }
    }

    /// Index of the current question; also the number answered so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn score(&self) -> usize {
        self.score
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.bank.len()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    fn accept(&mut self, choice: usize) -> Reply {
        let bank = Arc::clone(&self.bank);
        let Some(question) = bank.get(self.position) else {
            return Reply::ignored();
        };

        self.phase = Phase::Advancing;

        let correct = question.is_correct(choice);
        let verdict = if correct {
            self.score += 1;
            Verdict::Correct
        } else {
            Verdict::Incorrect {
                correct_option: question.correct_option(),
            }
        };
        self.position += 1;

        let mut frames = vec![
            ServerFrame::Result(verdict),
            ServerFrame::Score {
                score: self.score,
                position: self.position,
            },
        ];

        match bank.get(self.position) {
            Some(next) => {
                push_prompt(&mut frames, next);
                self.phase = Phase::AwaitingAnswer;
            }
            None => self.finish(&mut frames),
        }

        Reply {
            frames,
            answered: Some(AnsweredQuestion {
                question_number: self.position,
                correct,
            }),
        }
    }

    fn reject(&self, err: &FrameError) -> Reply {
        let mut frames = vec![ServerFrame::error(err)];
        if self.reprompt_on_error {
            if let Some(question) = self.bank.get(self.position) {
                push_prompt(&mut frames, question);
            }
        }
        Reply {
            frames,
            answered: None,
        }
    }

    fn finish(&mut self, frames: &mut Vec<ServerFrame>) {
        frames.push(ServerFrame::finished(self.score, self.bank.len()));
        self.phase = Phase::Finished;
    }
}

fn push_prompt(frames: &mut Vec<ServerFrame>, question: &Question) {
    frames.push(ServerFrame::Question(question.text().to_string()));
    frames.push(ServerFrame::Options(question.options().to_vec()));
}

/// Per-session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Re-send the current question after an `ERROR` frame.
    pub reprompt_on_error: bool,
    /// Maximum accepted inbound line length.
    pub max_line_length: usize,
    /// Writer task settings.
    pub writer: WriterConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reprompt_on_error: true,
            max_line_length: MAX_LINE_LENGTH,
            writer: WriterConfig::default(),
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// All questions answered and the completion frame sent.
    Completed { score: usize, total: usize },
    /// Connection lost or failed before completion. No frames were sent
    /// after the failure was detected.
    Aborted {
        position: usize,
        score: usize,
        reason: String,
    },
}

/// Drives one [`SessionMachine`] over a connection.
pub struct Session {
    machine: SessionMachine,
    peer: String,
    config: SessionConfig,
    sink: Arc<dyn EventSink>,
}

impl Session {
    pub fn new(
        bank: Arc<QuestionBank>,
        peer: impl Into<String>,
        config: SessionConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            machine: SessionMachine::new(bank, config.reprompt_on_error),
            peer: peer.into(),
            config,
            sink,
        }
    }

    /// Run the quiz to completion or failure.
    ///
    /// The writer is shut down on every exit path. If this future is dropped
    /// early, the writer is cancelled: it finishes the batch it is writing,
    /// drops the rest, and releases the connection.
    pub async fn run<R, W>(mut self, reader: R, writer: W) -> SessionOutcome
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let stop = CancellationToken::new();
        let cancel_on_drop = stop.clone().drop_guard();
        let (handle, task) = spawn_writer_task(writer, self.config.writer.clone(), stop);

        let mut lines = LineReader::with_max_line_length(reader, self.config.max_line_length);
        let driven = self.drive(&mut lines, &handle).await;

        drop(handle);
        let flushed = match task.await {
            Ok(result) => result,
            Err(e) => Err(QuizError::Protocol(format!("writer task failed: {}", e))),
        };
        cancel_on_drop.disarm();

        let outcome = match driven.and(flushed) {
            Ok(()) => SessionOutcome::Completed {
                score: self.machine.score(),
                total: self.machine.total(),
            },
            Err(e) => SessionOutcome::Aborted {
                position: self.machine.position(),
                score: self.machine.score(),
                reason: abort_reason(&e),
            },
        };

        self.report(&outcome);
        outcome
    }

    async fn drive<R>(&mut self, lines: &mut LineReader<R>, writer: &WriterHandle) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        for frame in self.machine.start() {
            self.send(writer, &frame).await?;
        }

        while !self.machine.is_finished() {
            let line = lines.next_line().await?.ok_or(QuizError::ConnectionClosed)?;

            let reply = self.machine.handle_line(&line);
            if reply.frames.is_empty() {
                tracing::debug!(peer = %self.peer, "Ignoring line: {:?}", line);
                continue;
            }

            if let Some(answered) = reply.answered {
                self.sink.emit(&SessionEvent::AnswerRecorded {
                    peer: self.peer.clone(),
                    question_number: answered.question_number,
                    correct: answered.correct,
                });
            }

            for frame in &reply.frames {
                self.send(writer, frame).await?;
            }
        }

        Ok(())
    }

    async fn send(&self, writer: &WriterHandle, frame: &ServerFrame) -> Result<()> {
        tracing::trace!(peer = %self.peer, kind = frame.kind(), "Sending frame");
        writer.send_frame(frame).await
    }

    fn report(&self, outcome: &SessionOutcome) {
        let event = match outcome {
            SessionOutcome::Completed { score, total } => SessionEvent::SessionFinished {
                peer: self.peer.clone(),
                score: *score,
                total: *total,
            },
            SessionOutcome::Aborted { reason, .. } => SessionEvent::SessionAborted {
                peer: self.peer.clone(),
                reason: reason.clone(),
            },
        };
        self.sink.emit(&event);
    }
}

fn abort_reason(err: &QuizError) -> String {
    match err {
        QuizError::ConnectionClosed => "client disconnected".to_string(),
        other => other.to_string(),
    }
}
