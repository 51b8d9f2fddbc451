//! Headless client - play a quiz from the terminal.
//!
//! This example demonstrates:
//! - Connecting with [`QuizClient`]
//! - Reacting to each decoded [`ServerFrame`]
//! - Reading answers from stdin
//!
//! # Running
//!
//! ```text
//! cargo run -- --questions demos/questions.txt --port 12345
//! cargo run --example headless_client -- 127.0.0.1:12345
//! ```

use std::io::Write;

use quizwire::protocol::{ServerFrame, Verdict};
use quizwire::QuizClient;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:12345".to_string());

    let mut client = QuizClient::connect(addr.as_str()).await?;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    while let Some(frame) = client.next_frame().await? {
        match frame {
            ServerFrame::Total(n) => println!("Quiz with {} questions\n", n),
            ServerFrame::Question(text) => println!("{}", text),
            ServerFrame::Options(options) => {
                for (i, option) in options.iter().enumerate() {
                    println!("  {}. {}", i + 1, option);
                }

                // Keep asking until the input parses; the server validates the range
                let answer = loop {
                    print!("Your answer: ");
                    std::io::stdout().flush()?;

                    let Some(line) = stdin.next_line().await? else {
                        client.close().await?;
                        return Ok(());
                    };
                    match line.trim().parse::<i64>() {
                        Ok(n) => break n,
                        Err(_) => println!("Please enter a number."),
                    }
                };
                client.answer(answer).await?;
            }
            ServerFrame::Result(Verdict::Correct) => println!("Correct!"),
            ServerFrame::Result(Verdict::Incorrect { correct_option }) => {
                println!("Incorrect. The correct answer was {}.", correct_option)
            }
            ServerFrame::Score { score, position } => println!("Score: {}/{}\n", score, position),
            ServerFrame::Finished(summary) => println!("{}", summary),
            ServerFrame::Error(message) => println!("Server: {}", message),
        }
    }

    Ok(())
}
