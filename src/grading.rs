//! Answer checking for exercises.
//!
//! Choice exercises compare option indices. Text exercises compare the
//! trimmed, lowercased response against the canonical answer and each listed
//! alternative; nothing else (punctuation, umlauts, spacing inside the
//! answer) is normalized.

use serde::Serialize;

use crate::models::{AnswerKey, Exercise};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Choice(usize),
    Text(String),
}

impl Response {
    /// Interpret raw learner input for the given exercise. Choice exercises
    /// take a 1-based option number or the option text itself.
    pub fn parse_for(exercise: &Exercise, raw: &str) -> Self {
        let raw = raw.trim();
        if !exercise.answer.is_index_answer() {
            return Response::Text(raw.to_string());
        }

        let options = exercise.answer.options();
        if let Ok(n) = raw.parse::<usize>() {
            if (1..=options.len()).contains(&n) {
                return Response::Choice(n - 1);
            }
        }
        match options.iter().position(|o| matches_text(o, raw)) {
            Some(idx) => Response::Choice(idx),
            None => Response::Text(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub correct: bool,
    pub expected: String,
    pub explanation: Option<String>,
}

fn matches_text(expected: &str, given: &str) -> bool {
    expected.trim().to_lowercase() == given.trim().to_lowercase()
}

impl Exercise {
    pub fn check(&self, response: &Response) -> Verdict {
        let correct = match (&self.answer, response) {
            (
                AnswerKey::MultipleChoice { correct_answer, .. }
                | AnswerKey::TrueFalse { correct_answer, .. },
                Response::Choice(idx),
            ) => idx == correct_answer,
            (
                AnswerKey::TextInput {
                    correct_answer,
                    acceptable_answers,
                }
                | AnswerKey::FillBlank {
                    correct_answer,
                    acceptable_answers,
                }
                | AnswerKey::Ordering {
                    correct_answer,
                    acceptable_answers,
                    ..
                },
                Response::Text(text),
            ) => {
                matches_text(correct_answer, text)
                    || acceptable_answers.iter().any(|a| matches_text(a, text))
            }
            _ => false,
        };

        Verdict {
            correct,
            expected: self.expected_answer(),
            explanation: self.explanation.clone(),
        }
    }

    /// The canonical answer as shown to the learner.
    pub fn expected_answer(&self) -> String {
        match &self.answer {
            AnswerKey::MultipleChoice {
                options,
                correct_answer,
            }
            | AnswerKey::TrueFalse {
                options,
                correct_answer,
            } => options
                .get(*correct_answer)
                .cloned()
                .unwrap_or_else(|| format!("option {}", correct_answer.saturating_add(1))),
            AnswerKey::TextInput { correct_answer, .. }
            | AnswerKey::FillBlank { correct_answer, .. }
            | AnswerKey::Ordering { correct_answer, .. } => correct_answer.clone(),
        }
    }
}
