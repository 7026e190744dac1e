use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use quiz_core::model::{Attempt, AttemptId, AttemptReview, Quiz, QuizId, QuizSummary};

use crate::api::{QuizApi, SubmitRequest};
use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::wire::{
    AttemptDto, DetailedAttemptDto, Envelope, ErrorEnvelope, QuizDto, QuizSummaryDto, SubmitBody,
};

/// `QuizApi` over the service's REST endpoints.
#[derive(Clone)]
pub struct HttpQuizApi {
    client: Client,
    base_url: Url,
    auth: AuthContext,
}

impl HttpQuizApi {
    /// Build a client rooted at `base_url` (for example `http://host/api`).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BaseUrl` for an unparsable URL, or `ApiError::Http`
    /// if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, auth: AuthContext, timeout: Duration) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.auth.bearer_token())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.authorized(request).send().await?;
        read_envelope(response).await
    }
}

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let reason = serde_json::from_slice::<ErrorEnvelope>(&body)
            .ok()
            .and_then(ErrorEnvelope::reason);
        return Err(match reason {
            Some(reason) => ApiError::Rejected(reason),
            None => ApiError::Status(status),
        });
    }

    let envelope: Envelope<T> = serde_json::from_slice(&body)?;
    envelope.into_result()
}

#[async_trait]
impl QuizApi for HttpQuizApi {
    async fn list_quizzes(&self) -> Result<Vec<QuizSummary>, ApiError> {
        let url = self.endpoint("candidate/quizzes")?;
        debug!("GET {url}");
        let rows: Vec<QuizSummaryDto> = self.send(self.client.get(url)).await?;
        Ok(rows.into_iter().filter_map(QuizSummaryDto::into_domain).collect())
    }

    async fn fetch_quiz(&self, quiz_id: QuizId) -> Result<Quiz, ApiError> {
        let url = self.endpoint(&format!("candidate/quizzes/{quiz_id}"))?;
        debug!("GET {url}");
        let dto: QuizDto = self.send(self.client.get(url)).await?;
        dto.into_domain()
    }

    async fn start_attempt(&self, quiz_id: QuizId) -> Result<Attempt, ApiError> {
        let url = self.endpoint(&format!("candidate/quizzes/{quiz_id}/start"))?;
        debug!("POST {url}");
        let dto: AttemptDto = self.send(self.client.post(url)).await?;
        dto.into_domain()
    }

    async fn submit_attempt(&self, request: &SubmitRequest) -> Result<Attempt, ApiError> {
        let url = self.endpoint("candidate/quizzes/submit")?;
        debug!(
            "POST {url} attempt={} answers={}",
            request.attempt_id,
            request.answers.len()
        );
        let body = SubmitBody::from(request);
        let dto: AttemptDto = self.send(self.client.post(url).json(&body)).await?;
        dto.into_domain()
    }

    async fn fetch_attempt(&self, attempt_id: AttemptId) -> Result<AttemptReview, ApiError> {
        let url = self.endpoint(&format!("candidate/quizzes/attempts/{attempt_id}"))?;
        debug!("GET {url}");
        let dto: DetailedAttemptDto = self.send(self.client.get(url)).await?;
        dto.into_domain()
    }

    async fn list_attempts(&self) -> Result<Vec<Attempt>, ApiError> {
        let url = self.endpoint("candidate/quizzes/my-attempts")?;
        debug!("GET {url}");
        let rows: Vec<AttemptDto> = self.send(self.client.get(url)).await?;
        rows.into_iter().map(AttemptDto::into_domain).collect()
    }
}
