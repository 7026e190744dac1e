use crate::model::ids::{OptionId, QuestionId};
use crate::model::quiz::{Question, QuestionKind};

/// Derived, never stored: how far the candidate got with one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnswerStatus {
    NotVisited,
    Unanswered,
    Answered,
}

/// The candidate's current answer (or absence of one) for a single question.
///
/// Only the field matching the question kind is ever populated: a selected
/// option for choice questions, free text for short answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerEntry {
    question_id: QuestionId,
    kind: QuestionKind,
    selected_option: Option<OptionId>,
    text_answer: Option<String>,
    visited: bool,
}

impl AnswerEntry {
    /// A fresh, unvisited entry for the given question.
    #[must_use]
    pub fn for_question(question: &Question) -> Self {
        Self {
            question_id: question.id(),
            kind: question.kind(),
            selected_option: None,
            text_answer: None,
            visited: false,
        }
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<OptionId> {
        self.selected_option
    }

    #[must_use]
    pub fn text_answer(&self) -> Option<&str> {
        self.text_answer.as_deref()
    }

    #[must_use]
    pub fn visited(&self) -> bool {
        self.visited
    }

    /// True when the entry carries a selection or non-empty text.
    #[must_use]
    pub fn has_answer(&self) -> bool {
        self.selected_option.is_some() || self.text_answer.as_deref().is_some_and(|t| !t.is_empty())
    }

    #[must_use]
    pub fn status(&self) -> AnswerStatus {
        if self.has_answer() {
            AnswerStatus::Answered
        } else if self.visited {
            AnswerStatus::Unanswered
        } else {
            AnswerStatus::NotVisited
        }
    }

    pub fn select(&mut self, option: OptionId) {
        self.selected_option = Some(option);
        self.visited = true;
    }

    pub fn set_text(&mut self, text: String) {
        self.text_answer = Some(text);
        self.visited = true;
    }

    /// Drops the answer but remembers the question was seen.
    pub fn clear(&mut self) {
        self.selected_option = None;
        self.text_answer = None;
    }

    pub fn mark_visited(&mut self) {
        self.visited = true;
    }

    /// The wire-level answer for this entry, or `None` if it was never answered.
    #[must_use]
    pub fn to_submission(&self) -> Option<AnswerSubmission> {
        if !self.has_answer() {
            return None;
        }
        let submission = if self.kind.is_choice() {
            AnswerSubmission {
                question_id: self.question_id,
                selected_option_id: self.selected_option,
                text_answer: None,
            }
        } else {
            AnswerSubmission {
                question_id: self.question_id,
                selected_option_id: None,
                text_answer: self.text_answer.clone(),
            }
        };
        Some(submission)
    }
}

/// One answered question as sent to the scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub question_id: QuestionId,
    pub selected_option_id: Option<OptionId>,
    pub text_answer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuizOption;

    fn short_answer() -> Question {
        Question::new(QuestionId::new(3), "Why?", QuestionKind::ShortAnswer, 1, Vec::new()).unwrap()
    }

    fn true_false() -> Question {
        Question::new(
            QuestionId::new(1),
            "Sky is blue",
            QuestionKind::TrueFalse,
            1,
            vec![
                QuizOption::new(OptionId::new(10), "True"),
                QuizOption::new(OptionId::new(11), "False"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn status_walks_from_not_visited_to_answered() {
        let mut entry = AnswerEntry::for_question(&true_false());
        assert_eq!(entry.status(), AnswerStatus::NotVisited);

        entry.mark_visited();
        assert_eq!(entry.status(), AnswerStatus::Unanswered);

        entry.select(OptionId::new(11));
        assert_eq!(entry.status(), AnswerStatus::Answered);

        entry.clear();
        assert_eq!(entry.status(), AnswerStatus::Unanswered);
        assert!(entry.visited());
    }

    #[test]
    fn empty_text_is_not_an_answer() {
        let mut entry = AnswerEntry::for_question(&short_answer());
        entry.set_text(String::new());
        assert_eq!(entry.status(), AnswerStatus::Unanswered);
        assert!(entry.to_submission().is_none());

        entry.set_text("because".into());
        let submission = entry.to_submission().unwrap();
        assert_eq!(submission.text_answer.as_deref(), Some("because"));
        assert_eq!(submission.selected_option_id, None);
    }

    #[test]
    fn untouched_entry_has_no_submission() {
        let entry = AnswerEntry::for_question(&true_false());
        assert!(entry.to_submission().is_none());
    }
}
