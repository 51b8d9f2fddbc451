//! Bank module - the shared, read-only question set.
//!
//! A [`QuestionBank`] is built once at startup and then shared behind an
//! `Arc` by every session. It exposes no mutation after construction.
//!
//! # Example
//!
//! ```
//! use quizwire::bank::QuestionBank;
//!
//! let bank = QuestionBank::parse("Q: 2+2=?\n1. 3\n2. 4\nA: 2\n", "inline").unwrap();
//! assert_eq!(bank.len(), 1);
//! assert_eq!(bank.get(0).unwrap().correct_option(), 2);
//! ```

mod loader;
mod question;

use std::path::Path;

pub use loader::parse_questions;
pub use question::Question;

use crate::error::{QuizError, Result};

/// Immutable ordered list of questions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Create a bank from already validated questions.
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Create an empty bank.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a bank from question text.
    ///
    /// `source_name` only appears in the error message.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::NoQuestions`] if no valid question was found.
    pub fn parse(source: &str, source_name: &str) -> Result<Self> {
        let questions = parse_questions(source);
        if questions.is_empty() {
            return Err(QuizError::NoQuestions {
                source_name: source_name.to_string(),
            });
        }
        Ok(Self::new(questions))
    }

    /// Load and parse a bank from a file.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Io`] if the file cannot be read and
    /// [`QuizError::NoQuestions`] if it holds no valid question.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path).await?;
        let bank = Self::parse(&source, &path.display().to_string())?;
        tracing::info!(path = %path.display(), questions = bank.len(), "Loaded question bank");
        Ok(bank)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Get the question at `index` (0-based).
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}
