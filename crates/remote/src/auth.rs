use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};

/// Role of the logged-in user as issued by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Candidate,
    Admin,
    Other(String),
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "CANDIDATE" => Role::Candidate,
            "ADMIN" => Role::Admin,
            other => Role::Other(other.to_owned()),
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Candidate => f.write_str("CANDIDATE"),
            Role::Admin => f.write_str("ADMIN"),
            Role::Other(raw) => f.write_str(raw),
        }
    }
}

/// Who is taking the quiz, handed explicitly to everything that needs it.
#[derive(Clone)]
pub struct AuthContext {
    candidate: String,
    role: Role,
    token: SecretString,
}

impl AuthContext {
    #[must_use]
    pub fn new(candidate: impl Into<String>, role: Role, token: SecretString) -> Self {
        Self {
            candidate: candidate.into(),
            role,
            token,
        }
    }

    /// Convenience constructor for a candidate session.
    #[must_use]
    pub fn candidate(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(name, Role::Candidate, SecretString::from(token.into()))
    }

    #[must_use]
    pub fn candidate_name(&self) -> &str {
        &self.candidate
    }

    #[must_use]
    pub fn role(&self) -> &Role {
        &self.role
    }

    #[must_use]
    pub fn is_candidate(&self) -> bool {
        self.role == Role::Candidate
    }

    pub(crate) fn bearer_token(&self) -> &str {
        self.token.expose_secret()
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("candidate", &self.candidate)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
