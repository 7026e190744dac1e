use std::sync::Arc;

use log::debug;

use quiz_core::model::QuizSummary;
use remote::QuizApi;

use crate::error::SessionError;

/// Quizzes the candidate can pick from before starting an attempt.
#[derive(Clone)]
pub struct QuizCatalog {
    api: Arc<dyn QuizApi>,
}

impl QuizCatalog {
    #[must_use]
    pub fn new(api: Arc<dyn QuizApi>) -> Self {
        Self { api }
    }

    /// Available quizzes, ordered by title.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Catalog` if the list cannot be fetched.
    pub async fn available(&self) -> Result<Vec<QuizSummary>, SessionError> {
        let mut quizzes = self.api.list_quizzes().await.map_err(SessionError::Catalog)?;
        quizzes.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        debug!("{} quizzes available", quizzes.len());
        Ok(quizzes)
    }
}
