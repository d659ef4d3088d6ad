mod pipeline;
mod queue;

pub use pipeline::{Pipeline, Stage};
pub use queue::{
    DEFAULT_BACKOFF_FLOOR, JobQueue, KeyedJob, Outcome, Produce, QueueClosed, QuotaProbe,
    RateLimitStatus,
};
