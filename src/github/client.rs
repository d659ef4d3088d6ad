use std::fmt;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use super::auth::Credentials;
use super::error::GithubError;
use super::types::{
    ApiCommit, ApiRepo, ApiUser, RateLimitResponse, RateLimitSnapshot, RepoActivity, SearchKey,
    SearchUsersResponse, UserProfile, UserRecord,
};

const API_ROOT: &str = "https://api.github.com";
const ACCEPT_V3: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("devscout/", env!("CARGO_PKG_VERSION"));

// Window lengths are fixed by the API: core resets hourly, search every
// minute.
const CORE_WINDOW_SECS: u32 = 3600;
const SEARCH_WINDOW_SECS: u32 = 60;

/// The two independent quota buckets GitHub accounts calls against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaBucket {
    Core,
    Search,
}

impl fmt::Display for QuotaBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaBucket::Core => write!(f, "core"),
            QuotaBucket::Search => write!(f, "search"),
        }
    }
}

pub struct GithubClient {
    client: Client,
    credentials: Credentials,
    base_url: String,
}

impl GithubClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_base_url(credentials, API_ROOT.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(credentials: Credentials, base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            credentials,
            base_url,
        }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, GithubError> {
        let mut request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("Accept", ACCEPT_V3)
            .header("User-Agent", USER_AGENT);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = self.credentials.apply(request).send().await?;
        Ok(response)
    }

    /// Check the supplied credentials against the API.
    ///
    /// Anonymous clients skip the round-trip; there is nothing to reject.
    pub async fn verify_credentials(&self) -> Result<(), GithubError> {
        if self.credentials.is_anonymous() {
            return Ok(());
        }
        let response = self.get("/rate_limit", &[]).await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::UNAUTHORIZED => Err(GithubError::InvalidCredentials),
            status => Err(api_error(status, response).await),
        }
    }

    /// Resolve a search key to the best-matching login, if anyone matches.
    ///
    /// Search results come back ordered by match score, so the first item
    /// wins.
    pub async fn search_user(&self, key: &SearchKey) -> Result<Option<String>, GithubError> {
        let query = key.query();
        let response = self.get("/search/users", &[("q", query.as_str())]).await?;
        let status = response.status();
        if quota_exhausted(status) {
            return Err(GithubError::RateLimited {
                bucket: QuotaBucket::Search,
            });
        }
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }
        let body = response.json::<SearchUsersResponse>().await?;
        Ok(body.items.into_iter().next().map(|user| user.login))
    }

    /// Fetch a login's profile plus per-repository commit counts.
    ///
    /// Unknown logins resolve to `Ok(None)`. A spent quota on any of the
    /// nested calls surfaces as [`GithubError::RateLimited`] so the whole
    /// job can be retried after the reset.
    pub async fn fetch_user(&self, login: &str) -> Result<Option<UserRecord>, GithubError> {
        let response = self.get(&format!("/users/{login}"), &[]).await?;
        let status = response.status();
        if quota_exhausted(status) {
            return Err(GithubError::RateLimited {
                bucket: QuotaBucket::Core,
            });
        }
        if !status.is_success() {
            return Ok(None);
        }
        let user = response.json::<ApiUser>().await?;

        let response = self
            .get(&format!("/users/{login}/repos"), &[("type", "all")])
            .await?;
        let status = response.status();
        if quota_exhausted(status) {
            return Err(GithubError::RateLimited {
                bucket: QuotaBucket::Core,
            });
        }
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }
        let repos = response.json::<Vec<ApiRepo>>().await?;

        let mut activity = Vec::with_capacity(repos.len());
        for repo in repos {
            let path = format!("/repos/{}/{}/commits", repo.owner.login, repo.name);
            let response = self.get(&path, &[("author", login)]).await?;
            let status = response.status();
            if quota_exhausted(status) {
                return Err(GithubError::RateLimited {
                    bucket: QuotaBucket::Core,
                });
            }
            if !status.is_success() {
                // Empty and disabled repositories answer 409 here.
                debug!(repo = %repo.name, status = status.as_u16(), "skipping unreadable commit history");
                continue;
            }
            let commits = response.json::<Vec<ApiCommit>>().await?;
            activity.push(RepoActivity {
                name: repo.name,
                commits: commits.len() as u32,
            });
        }

        Ok(Some(UserRecord {
            profile: UserProfile::from(user),
            repos: activity,
        }))
    }

    /// Current remaining/reset numbers for both quota buckets.
    pub async fn rate_limits(&self) -> Result<RateLimitSnapshot, GithubError> {
        let response = self.get("/rate_limit", &[]).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }
        let body = response.json::<RateLimitResponse>().await?;
        Ok(RateLimitSnapshot {
            core: body.resources.core.into_status(CORE_WINDOW_SECS),
            search: body.resources.search.into_status(SEARCH_WINDOW_SECS),
        })
    }
}

/// GitHub signals a spent quota as 403 (classic) or 429 (newer limiter).
fn quota_exhausted(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS
}

async fn api_error(status: StatusCode, response: Response) -> GithubError {
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    GithubError::Api {
        status: status.as_u16(),
        message,
    }
}
