//! Credential schemes for the GitHub API.
//!
//! Anonymous access works but gets the unauthenticated quota (a handful of
//! search calls per minute), so real runs want a personal access token or
//! account basic auth.

use std::fmt;

use reqwest::RequestBuilder;

/// How requests authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Anonymous,
    /// Personal access token, sent as `Authorization: token <value>`.
    Token(String),
    /// Account name and password, sent base64-encoded by reqwest.
    Basic { username: String, password: String },
}

impl Credentials {
    /// Attach this scheme's `Authorization` header, if any.
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::Anonymous => request,
            Credentials::Token(token) => {
                request.header("Authorization", format!("token {token}"))
            }
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        }
    }

    /// Anonymous clients skip the credential verification round-trip.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Credentials::Anonymous)
    }
}

/// Names the scheme without ever echoing a secret.
impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => write!(f, "anonymous"),
            Credentials::Token(_) => write!(f, "personal access token"),
            Credentials::Basic { username, .. } => write!(f, "basic auth as {username}"),
        }
    }
}
