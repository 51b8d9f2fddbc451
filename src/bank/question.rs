//! A single multiple-choice question.

use crate::error::{QuizError, Result};
use crate::protocol::{prefix, MAX_LINE_LENGTH, SEPARATOR};

/// An immutable, validated multiple-choice question.
///
/// Options are 1-indexed when referenced on the wire. A `Question` can only
/// be built through [`Question::new`], so every instance satisfies:
/// non-empty text, at least one option, `1 <= correct_option <= options.len()`,
/// and text that fits in a single protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    options: Vec<String>,
    correct_option: usize,
}

impl Question {
    /// Create a validated question.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidQuestion`] if the text is empty, there are
    /// no options, `correct_option` is outside `[1, options.len()]`, or the
    /// question or an option would not fit in [`MAX_LINE_LENGTH`] on the wire.
    pub fn new(
        text: impl Into<String>,
        options: Vec<String>,
        correct_option: usize,
    ) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuizError::InvalidQuestion("question text is empty".into()));
        }
        if options.is_empty() {
            return Err(QuizError::InvalidQuestion(format!(
                "question '{}' has no options",
                text
            )));
        }
        let question_line = prefix::QUESTION.len() + SEPARATOR.len_utf8() + text.len();
        if question_line > MAX_LINE_LENGTH {
            return Err(QuizError::InvalidQuestion(format!(
                "question text is {} bytes, limit is {}",
                text.len(),
                MAX_LINE_LENGTH - prefix::QUESTION.len() - SEPARATOR.len_utf8()
            )));
        }
        if let Some(n) = options.iter().position(|o| o.len() > MAX_LINE_LENGTH) {
            return Err(QuizError::InvalidQuestion(format!(
                "option {} of question '{}' exceeds {} bytes",
                n + 1,
                text,
                MAX_LINE_LENGTH
            )));
        }
        if !(1..=options.len()).contains(&correct_option) {
            return Err(QuizError::InvalidQuestion(format!(
                "question '{}' names option {} but has {} options",
                text,
                correct_option,
                options.len()
            )));
        }

        Ok(Self {
            text,
            options,
            correct_option,
        })
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[inline]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// The correct option number (1-indexed).
    #[inline]
    pub fn correct_option(&self) -> usize {
        self.correct_option
    }

    /// Whether `answer` (1-indexed) is the correct option.
    #[inline]
    pub fn is_correct(&self, answer: usize) -> bool {
        answer == self.correct_option
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_valid_question() {
        let q = Question::new("2+2=?", opts(&["3", "4", "5"]), 2).unwrap();
        assert_eq!(q.text(), "2+2=?");
        assert_eq!(q.option_count(), 3);
        assert_eq!(q.correct_option(), 2);
        assert!(q.is_correct(2));
        assert!(!q.is_correct(1));
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(Question::new("", opts(&["a"]), 1).is_err());
        assert!(Question::new("   ", opts(&["a"]), 1).is_err());
    }

    #[test]
    fn test_no_options_rejected() {
        let err = Question::new("q", vec![], 1).unwrap_err();
        assert!(matches!(err, QuizError::InvalidQuestion(_)));
    }

    #[test]
    fn test_correct_option_bounds() {
        assert!(Question::new("q", opts(&["a", "b"]), 0).is_err());
        assert!(Question::new("q", opts(&["a", "b"]), 3).is_err());
        assert!(Question::new("q", opts(&["a", "b"]), 1).is_ok());
        assert!(Question::new("q", opts(&["a", "b"]), 2).is_ok());
    }

    #[test]
    fn test_text_must_fit_one_line() {
        let room = MAX_LINE_LENGTH - "QUESTION:".len();
        assert!(Question::new("x".repeat(room), opts(&["a"]), 1).is_ok());
        assert!(matches!(
            Question::new("x".repeat(room + 1), opts(&["a"]), 1),
            Err(QuizError::InvalidQuestion(_))
        ));

        let long_option = "y".repeat(MAX_LINE_LENGTH + 1);
        assert!(Question::new("q", vec!["a".into(), long_option], 1).is_err());
    }

    #[test]
    fn test_longest_question_reaches_client_intact() {
        use crate::protocol::{LineBuffer, ServerFrame, ServerFrameDecoder};

        let text = "x".repeat(MAX_LINE_LENGTH - "QUESTION:".len());
        let option = "y".repeat(MAX_LINE_LENGTH);
        let q = Question::new(text.clone(), vec![option.clone()], 1).unwrap();

        let mut wire = ServerFrame::Question(q.text().to_string()).encode().to_vec();
        wire.extend_from_slice(&ServerFrame::Options(q.options().to_vec()).encode());

        let mut buffer = LineBuffer::new();
        let mut decoder = ServerFrameDecoder::new();
        let frames: Vec<_> = buffer
            .push(&wire)
            .unwrap()
            .iter()
            .filter_map(|line| decoder.push_line(line).unwrap())
            .collect();

        assert_eq!(
            frames,
            vec![ServerFrame::Question(text), ServerFrame::Options(vec![option])]
        );
    }
}
