use std::collections::HashMap;
use std::sync::Arc;

use quiz_core::model::{
    AnswerEntry, AnswerStatus, AnswerSubmission, OptionId, QuestionId, QuestionKind, Quiz,
};

use crate::error::BufferError;

/// One answer entry per question, in quiz order.
///
/// Status is derived from the entries on every read; nothing is cached.
#[derive(Debug, Clone)]
pub struct AnswerBuffer {
    entries: Vec<AnswerEntry>,
    index: HashMap<QuestionId, usize>,
}

impl AnswerBuffer {
    /// Fresh buffer with every question unvisited and unanswered.
    #[must_use]
    pub fn for_quiz(quiz: &Quiz) -> Self {
        let entries: Vec<AnswerEntry> = quiz.questions().iter().map(AnswerEntry::for_question).collect();
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.question_id(), position))
            .collect();
        Self { entries, index }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[AnswerEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, question: QuestionId) -> Option<&AnswerEntry> {
        self.index.get(&question).map(|&position| &self.entries[position])
    }

    #[must_use]
    pub fn status(&self, question: QuestionId) -> Option<AnswerStatus> {
        self.entry(question).map(AnswerEntry::status)
    }

    /// Replace any previous selection on a choice question.
    ///
    /// # Errors
    ///
    /// Returns `BufferError` for an unknown question or a short-answer question.
    pub fn select_option(&mut self, question: QuestionId, option: OptionId) -> Result<(), BufferError> {
        let entry = self.entry_mut(question)?;
        if !entry.kind().is_choice() {
            return Err(mismatch(entry, "an option"));
        }
        entry.select(option);
        Ok(())
    }

    /// Replace the free-text answer on a short-answer question.
    ///
    /// # Errors
    ///
    /// Returns `BufferError` for an unknown question or a choice question.
    pub fn set_text(&mut self, question: QuestionId, text: impl Into<String>) -> Result<(), BufferError> {
        let entry = self.entry_mut(question)?;
        if entry.kind() != QuestionKind::ShortAnswer {
            return Err(mismatch(entry, "free text"));
        }
        entry.set_text(text.into());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `BufferError::UnknownQuestion` for a question outside the quiz.
    pub fn clear(&mut self, question: QuestionId) -> Result<(), BufferError> {
        self.entry_mut(question)?.clear();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `BufferError::UnknownQuestion` for a question outside the quiz.
    pub fn mark_visited(&mut self, question: QuestionId) -> Result<(), BufferError> {
        self.entry_mut(question)?.mark_visited();
        Ok(())
    }

    /// Immutable copy of the current answers; later edits do not show through.
    #[must_use]
    pub fn snapshot(&self) -> AnswerSnapshot {
        AnswerSnapshot {
            entries: self.entries.clone().into(),
        }
    }

    fn entry_mut(&mut self, question: QuestionId) -> Result<&mut AnswerEntry, BufferError> {
        let position = *self
            .index
            .get(&question)
            .ok_or(BufferError::UnknownQuestion(question))?;
        Ok(&mut self.entries[position])
    }
}

fn mismatch(entry: &AnswerEntry, attempted: &'static str) -> BufferError {
    BufferError::KindMismatch {
        question: entry.question_id(),
        kind: entry.kind(),
        attempted,
    }
}

/// Frozen view of an `AnswerBuffer`, cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSnapshot {
    entries: Arc<[AnswerEntry]>,
}

impl AnswerSnapshot {
    #[must_use]
    pub fn entries(&self) -> &[AnswerEntry] {
        &self.entries
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.entries.iter().filter(|e| e.has_answer()).count()
    }

    /// Submission payload: touched questions only, in quiz order.
    #[must_use]
    pub fn submissions(&self) -> Vec<AnswerSubmission> {
        self.entries.iter().filter_map(AnswerEntry::to_submission).collect()
    }
}
