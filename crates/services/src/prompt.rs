use std::fmt;

use async_trait::async_trait;

/// A question put to the candidate that needs a yes/no answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    ConfirmSubmit { unanswered: usize },
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::ConfirmSubmit { unanswered: 0 } => f.write_str(
                "Are you sure you want to submit the quiz? \
                 You cannot change your answers after submission.",
            ),
            Prompt::ConfirmSubmit { unanswered } => write!(
                f,
                "{unanswered} question(s) have no answer. Are you sure you want to \
                 submit the quiz? You cannot change your answers after submission."
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptReply {
    Accepted,
    Declined,
}

/// Asks the candidate to confirm something without blocking the session.
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn confirm(&self, prompt: Prompt) -> PromptReply;
}

/// Answers every prompt with a fixed reply.
#[derive(Debug, Clone, Copy)]
pub struct AutoReply(pub PromptReply);

impl AutoReply {
    #[must_use]
    pub fn accept() -> Self {
        Self(PromptReply::Accepted)
    }

    #[must_use]
    pub fn decline() -> Self {
        Self(PromptReply::Declined)
    }
}

#[async_trait]
impl Prompter for AutoReply {
    async fn confirm(&self, _prompt: Prompt) -> PromptReply {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_mentions_skipped_questions() {
        let text = Prompt::ConfirmSubmit { unanswered: 2 }.to_string();
        assert!(text.starts_with("2 question(s) have no answer."));
        let text = Prompt::ConfirmSubmit { unanswered: 0 }.to_string();
        assert!(text.starts_with("Are you sure"));
    }
}
