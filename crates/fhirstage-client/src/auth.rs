use std::fmt;

use serde::{Deserialize, Serialize};

/// What [`FhirClient`](crate::FhirClient) needs to set the Authorization header.
///
/// The same credentials are attached to every request of a run, including
/// continuation links followed verbatim.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthHeader {
    Basic { username: String, password: String },
    Bearer { token: String },
}

impl AuthHeader {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
        }
    }

    pub(crate) fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Basic { username, password } => req.basic_auth(username, Some(password)),
            Self::Bearer { token } => req.bearer_auth(token),
        }
    }
}

// Secrets stay out of logs and error output.
impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"****")
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"****").finish(),
        }
    }
}
