//! The canonical search pipeline: keys to logins to records.
//!
//! [`SearchProducer`], [`FetchProducer`], and [`GithubQuotaProbe`] adapt
//! [`GithubClient`] to the engine's traits, and [`search_developers`]
//! assembles the two stage queues and runs them to completion.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::engine::{
    DEFAULT_BACKOFF_FLOOR, Outcome, Pipeline, Produce, QuotaProbe, RateLimitStatus, Stage,
};

use super::client::{GithubClient, QuotaBucket};
use super::error::GithubError;
use super::types::{SearchKey, UserRecord};

/// Stage-one producer: search key to best-matching login.
pub struct SearchProducer {
    client: Arc<GithubClient>,
}

impl SearchProducer {
    pub fn new(client: Arc<GithubClient>) -> Self {
        Self { client }
    }
}

impl Produce for SearchProducer {
    type Input = SearchKey;
    type Output = String;

    async fn produce(&self, key: &SearchKey) -> Outcome<String> {
        match self.client.search_user(key).await {
            Ok(Some(login)) => Outcome::Success(login),
            Ok(None) => Outcome::NoMatch,
            Err(GithubError::RateLimited { .. }) => Outcome::RateLimited,
            Err(err) => Outcome::Error(err.into()),
        }
    }
}

/// Stage-two producer: login to profile and repository activity.
pub struct FetchProducer {
    client: Arc<GithubClient>,
}

impl FetchProducer {
    pub fn new(client: Arc<GithubClient>) -> Self {
        Self { client }
    }
}

impl Produce for FetchProducer {
    type Input = String;
    type Output = UserRecord;

    async fn produce(&self, login: &String) -> Outcome<UserRecord> {
        match self.client.fetch_user(login).await {
            Ok(Some(record)) => Outcome::Success(record),
            Ok(None) => Outcome::NoMatch,
            Err(GithubError::RateLimited { .. }) => Outcome::RateLimited,
            Err(err) => Outcome::Error(err.into()),
        }
    }
}

/// Probe for one quota bucket, backing a stage's backoff decisions.
pub struct GithubQuotaProbe {
    client: Arc<GithubClient>,
    bucket: QuotaBucket,
}

impl GithubQuotaProbe {
    pub fn new(client: Arc<GithubClient>, bucket: QuotaBucket) -> Self {
        Self { client, bucket }
    }
}

impl QuotaProbe for GithubQuotaProbe {
    async fn current_status(&self) -> anyhow::Result<RateLimitStatus> {
        let snapshot = self.client.rate_limits().await?;
        Ok(match self.bucket {
            QuotaBucket::Core => snapshot.core,
            QuotaBucket::Search => snapshot.search,
        })
    }
}

/// Knobs for [`search_developers`].
pub struct SearchOptions {
    /// Minimum backoff slept when a quota is exhausted.
    pub backoff_floor: Duration,
    /// Cancels the run early, keeping whatever already resolved.
    pub cancel: CancellationToken,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            backoff_floor: DEFAULT_BACKOFF_FLOOR,
            cancel: CancellationToken::new(),
        }
    }
}

/// Search for each key's developer and fetch the matching records.
///
/// Returns records keyed by each key's position in `keys` (0-based). Keys
/// that matched nobody, or whose jobs failed along the way, are absent.
pub async fn search_developers(
    client: Arc<GithubClient>,
    keys: Vec<SearchKey>,
    options: SearchOptions,
) -> HashMap<u64, UserRecord> {
    info!(keys = keys.len(), "starting developer search");
    let search = Stage::new(
        "search",
        SearchProducer::new(client.clone()),
        GithubQuotaProbe::new(client.clone(), QuotaBucket::Search),
    )
    .with_backoff_floor(options.backoff_floor);
    let fetch = Stage::new(
        "fetch",
        FetchProducer::new(client.clone()),
        GithubQuotaProbe::new(client, QuotaBucket::Core),
    )
    .with_backoff_floor(options.backoff_floor);

    Pipeline::new(search, fetch)
        .with_cancellation(options.cancel)
        .run(keys)
        .await
}
