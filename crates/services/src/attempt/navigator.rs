use quiz_core::model::AnswerStatus;

use super::answer_buffer::AnswerBuffer;

/// Result of asking the navigator to move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(usize),
    /// Already on the last question; nothing further to do.
    AtEnd,
}

/// Answer counts for the progress sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSummary {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
    pub not_visited: usize,
}

/// 0-based cursor over a fixed number of questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionNavigator {
    cursor: usize,
    count: usize,
}

impl QuestionNavigator {
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self { cursor: 0, count }
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.cursor + 1 >= self.count
    }

    /// Jump to `index`. Out-of-range indices leave the cursor where it is.
    pub fn go_to(&mut self, index: usize) -> bool {
        if index >= self.count {
            return false;
        }
        self.cursor = index;
        true
    }

    pub fn advance(&mut self) -> Advance {
        if self.is_last() {
            return Advance::AtEnd;
        }
        self.cursor += 1;
        Advance::Moved(self.cursor)
    }

    /// Per-question status, in quiz order.
    #[must_use]
    pub fn statuses(&self, answers: &AnswerBuffer) -> Vec<AnswerStatus> {
        answers.entries().iter().map(|e| e.status()).collect()
    }

    #[must_use]
    pub fn progress(&self, answers: &AnswerBuffer) -> ProgressSummary {
        self.statuses(answers)
            .into_iter()
            .fold(
                ProgressSummary {
                    total: answers.len(),
                    ..ProgressSummary::default()
                },
                |mut summary, status| {
                    match status {
                        AnswerStatus::Answered => summary.answered += 1,
                        AnswerStatus::Unanswered => summary.unanswered += 1,
                        AnswerStatus::NotVisited => summary.not_visited += 1,
                    }
                    summary
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionId, QuestionKind, Question, Quiz, QuizId};

    #[test]
    fn advance_stops_at_the_last_question() {
        let mut nav = QuestionNavigator::new(3);
        assert_eq!(nav.advance(), Advance::Moved(1));
        assert_eq!(nav.advance(), Advance::Moved(2));
        assert_eq!(nav.advance(), Advance::AtEnd);
        assert_eq!(nav.cursor(), 2);
    }

    #[test]
    fn out_of_range_jump_is_ignored() {
        let mut nav = QuestionNavigator::new(3);
        assert!(nav.go_to(2));
        assert!(!nav.go_to(3));
        assert!(!nav.go_to(usize::MAX));
        assert_eq!(nav.cursor(), 2);
    }

    #[test]
    fn progress_counts_each_status() {
        let questions = (1..=3)
            .map(|id| {
                Question::new(QuestionId::new(id), "Why?", QuestionKind::ShortAnswer, 1, Vec::new())
                    .unwrap()
            })
            .collect();
        let quiz = Quiz::new(QuizId::new(1), "Quiz", None, 10, questions).unwrap();
        let mut answers = AnswerBuffer::for_quiz(&quiz);
        answers.set_text(QuestionId::new(1), "done").unwrap();
        answers.mark_visited(QuestionId::new(2)).unwrap();

        let nav = QuestionNavigator::new(quiz.question_count());
        assert_eq!(
            nav.progress(&answers),
            ProgressSummary {
                total: 3,
                answered: 1,
                unanswered: 1,
                not_visited: 1,
            }
        );
        assert_eq!(nav.statuses(&answers)[2], AnswerStatus::NotVisited);
    }
}
