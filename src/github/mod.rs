pub mod auth;
pub mod client;
pub mod error;
pub mod search;
pub mod types;

pub use auth::Credentials;
pub use client::{GithubClient, QuotaBucket};
pub use error::GithubError;
pub use search::{SearchOptions, search_developers};
pub use types::{RateLimitSnapshot, RepoActivity, SearchKey, UserProfile, UserRecord};
