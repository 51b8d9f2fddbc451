//! Text loader for question banks.
//!
//! Grammar (one item per line, surrounding whitespace ignored):
//!
//! ```text
//! Q: What is 2+2?
//! 1. 3
//! 2. 4
//! 3. 5
//! A: 2
//! ```
//!
//! - `Q:` starts a new question and closes the previous one
//! - `<digits>.` adds an option to the open question
//! - `A:` names the correct option; a non-integer is skipped with a warning
//!
//! Blank and unrecognised lines are ignored. Questions that end up invalid
//! (no options, missing or out-of-range answer) are dropped.

use super::question::Question;

const QUESTION_MARKER: &str = "Q:";
const ANSWER_MARKER: &str = "A:";

/// Question under construction.
#[derive(Debug, Default)]
struct Draft {
    text: String,
    options: Vec<String>,
    correct_option: Option<usize>,
}

impl Draft {
    fn finish(self) -> Option<Question> {
        let correct = self.correct_option?;
        match Question::new(self.text, self.options, correct) {
            Ok(q) => Some(q),
            Err(e) => {
                tracing::debug!("Dropping question: {}", e);
                None
            }
        }
    }
}

/// Parse all valid questions from `source`, in order.
pub fn parse_questions(source: &str) -> Vec<Question> {
    let mut questions = Vec::new();
    let mut current: Option<Draft> = None;

    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(text) = line.strip_prefix(QUESTION_MARKER) {
            if let Some(q) = current.take().and_then(Draft::finish) {
                questions.push(q);
            }
            current = Some(Draft {
                text: text.trim().to_string(),
                ..Draft::default()
            });
            continue;
        }

        let Some(draft) = current.as_mut() else {
            continue;
        };

        if let Some(option) = option_text(line) {
            draft.options.push(option.to_string());
        } else if let Some(answer) = line.strip_prefix(ANSWER_MARKER) {
            match answer.trim().parse::<usize>() {
                Ok(n) => draft.correct_option = Some(n),
                Err(_) => {
                    tracing::warn!(line = index + 1, "Invalid answer format: {}", line);
                }
            }
        }
    }

    if let Some(q) = current.and_then(Draft::finish) {
        questions.push(q);
    }

    questions
}

/// Extract option text from a `<digits>.<text>` line.
fn option_text(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix('.').map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_question() {
        let src = "Q: 2+2=?\n1. 3\n2. 4\n3. 5\nA: 2\n";
        let questions = parse_questions(src);

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text(), "2+2=?");
        assert_eq!(questions[0].options(), &["3", "4", "5"]);
        assert_eq!(questions[0].correct_option(), 2);
    }

    #[test]
    fn test_parse_multiple_with_blank_lines() {
        let src = "\
Q: First?
1. a
2. b
A: 1

   Q: Second?
   1. c
   2. d
   A: 2
";
        let questions = parse_questions(src);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].text(), "Second?");
        assert_eq!(questions[1].correct_option(), 2);
    }

    #[test]
    fn test_malformed_answer_skipped() {
        let src = "Q: q1\n1. a\nA: one\nQ: q2\n1. b\nA: 1\n";
        let questions = parse_questions(src);

        // q1 never gets a valid answer and is dropped
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text(), "q2");
    }

    #[test]
    fn test_malformed_answer_then_valid_answer() {
        let src = "Q: q\n1. a\n2. b\nA: x\nA: 2\n";
        let questions = parse_questions(src);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_option(), 2);
    }

    #[test]
    fn test_invalid_questions_dropped() {
        let src = "\
Q: no options
A: 1
Q: out of range
1. a
A: 2
Q: no answer
1. a
Q:
1. a
A: 1
Q: ok
1. a
A: 1
";
        let questions = parse_questions(src);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text(), "ok");
    }

    #[test]
    fn test_lines_before_first_question_ignored() {
        let src = "1. orphan\nA: 1\nnoise\nQ: q\n1. a\nA: 1\n";
        let questions = parse_questions(src);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].options(), &["a"]);
    }

    #[test]
    fn test_option_text() {
        assert_eq!(option_text("1. foo"), Some("foo"));
        assert_eq!(option_text("12.bar "), Some("bar"));
        assert_eq!(option_text("3."), Some(""));
        assert_eq!(option_text("x. foo"), None);
        assert_eq!(option_text("1 foo"), None);
    }

    #[test]
    fn test_empty_source() {
        assert!(parse_questions("").is_empty());
        assert!(parse_questions("\n\n  \n").is_empty());
    }
}
