#![forbid(unsafe_code)]

pub mod api;
pub mod auth;
pub mod error;
pub mod http;
pub mod in_memory;
mod wire;

pub use api::{QuizApi, SubmitRequest};
pub use auth::{AuthContext, Role};
pub use error::ApiError;
pub use http::HttpQuizApi;
pub use in_memory::InMemoryQuizApi;
