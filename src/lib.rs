//! devscout: rate-limit-aware GitHub developer search.
//!
//! Resolves partial identities (name and location) to GitHub accounts in two
//! stages: a search stage that picks the best-matching login for each key,
//! and a fetch stage that collects the profile and per-repository commit
//! activity of every matched login. Each stage runs against its own API
//! quota bucket and waits out exhausted windows instead of failing.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod files;
pub mod github;
pub mod ui;

pub use config::DevscoutConfig;
pub use error::DevscoutError;
pub use github::{
    Credentials, GithubClient, SearchKey, SearchOptions, UserRecord, search_developers,
};
