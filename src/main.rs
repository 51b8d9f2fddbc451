//! `quizwire` server binary.
//!
//! Loads a question file, serves it over TCP until Ctrl-C, then shuts down.
//! Logs go to stderr (`RUST_LOG`, default `quizwire=info`); with
//! `--json-events`, status and session events are also printed to stdout as
//! JSON lines.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use quizwire::control::{build_status_message, write_stdout_line};
use quizwire::events::{EventSink, FanoutSink, JsonLinesSink, TracingSink};
use quizwire::{QuestionBank, Server, DEFAULT_MAX_SESSIONS};

/// Multiple-choice quiz server.
#[derive(Parser, Debug)]
#[command(name = "quizwire", about = "Serve a multiple-choice quiz over TCP")]
struct Cli {
    /// Question file (`Q:` / `1.` / `A:` format).
    #[arg(short, long)]
    questions: PathBuf,

    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(short, long, default_value = "12345")]
    port: u16,

    /// Maximum concurrent sessions.
    #[arg(long, default_value_t = DEFAULT_MAX_SESSIONS)]
    max_sessions: usize,

    /// Do not re-send the question after rejecting an answer.
    #[arg(long)]
    no_reprompt: bool,

    /// Print status and session events to stdout as JSON lines.
    #[arg(long)]
    json_events: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quizwire=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let bank = match QuestionBank::load_file(&cli.questions).await {
        Ok(bank) => Arc::new(bank),
        Err(e) => {
            tracing::error!("Failed to load questions: {}", e);
            return Err(e.into());
        }
    };

    let sink: Arc<dyn EventSink> = if cli.json_events {
        let tracing_sink: Arc<dyn EventSink> = Arc::new(TracingSink);
        let json_sink: Arc<dyn EventSink> = Arc::new(JsonLinesSink);
        Arc::new(FanoutSink::new(vec![tracing_sink, json_sink]))
    } else {
        Arc::new(TracingSink)
    };

    let server = Server::builder()
        .address(format!("{}:{}", cli.host, cli.port))
        .max_sessions(cli.max_sessions)
        .reprompt_on_error(!cli.no_reprompt)
        .event_sink(sink)
        .start(bank)
        .await?;

    if cli.json_events {
        write_stdout_line(&build_status_message(&server.status_report())?)?;
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    server.stop();

    if cli.json_events {
        write_stdout_line(&build_status_message(&server.status_report())?)?;
    }

    server.wait_for_shutdown().await?;
    Ok(())
}
