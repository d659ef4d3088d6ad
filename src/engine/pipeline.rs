//! Two-stage pipeline built from [`JobQueue`]s.
//!
//! Stage one resolves raw inputs to intermediate values; stage two expands
//! those into final outputs. Each stage sleeps on its own quota without
//! holding the other one up, and the final outputs land in a map keyed by
//! the input's position.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::queue::{DEFAULT_BACKOFF_FLOOR, JobQueue, KeyedJob, Produce, QuotaProbe};

/// One stage of a [`Pipeline`]: a producer, the probe for its quota bucket,
/// and the minimum backoff applied when that quota is exhausted.
pub struct Stage<P, Q> {
    name: &'static str,
    producer: P,
    probe: Q,
    backoff_floor: Duration,
}

impl<P: Produce, Q: QuotaProbe> Stage<P, Q> {
    pub fn new(name: &'static str, producer: P, probe: Q) -> Self {
        Self {
            name,
            producer,
            probe,
            backoff_floor: DEFAULT_BACKOFF_FLOOR,
        }
    }

    /// Override the minimum backoff for this stage.
    pub fn with_backoff_floor(mut self, floor: Duration) -> Self {
        self.backoff_floor = floor;
        self
    }
}

/// Chains two stage queues: every stage-one success is submitted to stage
/// two under the same id, and stage one finishing is stage two's end-of-jobs
/// signal.
pub struct Pipeline<P1, Q1, P2, Q2> {
    first: Stage<P1, Q1>,
    second: Stage<P2, Q2>,
    cancel: CancellationToken,
}

impl<P1, Q1, P2, Q2> Pipeline<P1, Q1, P2, Q2>
where
    P1: Produce,
    P2: Produce<Input = P1::Output>,
    Q1: QuotaProbe,
    Q2: QuotaProbe,
{
    pub fn new(first: Stage<P1, Q1>, second: Stage<P2, Q2>) -> Self {
        Self {
            first,
            second,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort the run early when `cancel` fires. Jobs already resolved stay
    /// in the result map.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run every input through both stages and collect the final outputs,
    /// keyed by each input's position (0-based, assigned here).
    ///
    /// Inputs dropped along the way, by either stage, are simply absent from
    /// the map.
    pub async fn run(self, inputs: Vec<P1::Input>) -> HashMap<u64, P2::Output> {
        let total = inputs.len();
        info!(
            first = self.first.name,
            second = self.second.name,
            jobs = total,
            "pipeline starting"
        );

        // Final-stage successes flow through this channel; `run` is the only
        // writer of the map, so no lock is involved.
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();

        let second = JobQueue::spawn(
            self.second.name,
            self.second.producer,
            self.second.probe,
            self.second.backoff_floor,
            self.cancel.clone(),
            move |id, output| {
                let _ = results_tx.send((id, output));
            },
            || {},
        );

        let feed = second.clone();
        let finish = second.clone();
        let first = JobQueue::spawn(
            self.first.name,
            self.first.producer,
            self.first.probe,
            self.first.backoff_floor,
            self.cancel.clone(),
            move |id, intermediate| {
                if feed.submit(KeyedJob::new(id, intermediate)).is_err() {
                    warn!(id, "second stage already terminated, dropping job");
                }
            },
            move || finish.signal_no_more_jobs(),
        );

        for (id, payload) in inputs.into_iter().enumerate() {
            if first.submit(KeyedJob::new(id as u64, payload)).is_err() {
                warn!(id, "first stage already terminated, dropping input");
            }
        }
        first.signal_no_more_jobs();

        // A stage-one worker that dies without completing never signals
        // stage two. Its drained wait returns even then, and the sentinel
        // is idempotent, so repeating it here covers both endings.
        first.wait_until_drained().await;
        second.signal_no_more_jobs();

        second.wait_until_drained().await;

        // Every send happened before the drained signal, so a non-blocking
        // sweep sees them all.
        let mut outputs = HashMap::new();
        while let Ok((id, output)) = results_rx.try_recv() {
            outputs.insert(id, output);
        }
        debug!(resolved = outputs.len(), total, "pipeline finished");
        outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::queue::{Outcome, RateLimitStatus};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn status_resetting_in(offset_secs: i64) -> RateLimitStatus {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        RateLimitStatus {
            reset_epoch_secs: (now + offset_secs).max(0) as u64,
            remaining: 0,
            limit: 30,
            window_secs: 60,
        }
    }

    struct FixedProbe(RateLimitStatus);

    impl QuotaProbe for FixedProbe {
        async fn current_status(&self) -> anyhow::Result<RateLimitStatus> {
            Ok(self.0)
        }
    }

    /// Stage one: "miss" finds nobody, "stuck" is forever rate-limited, the
    /// rest resolve to an id string.
    struct Resolve;

    impl Produce for Resolve {
        type Input = String;
        type Output = String;

        async fn produce(&self, input: &String) -> Outcome<String> {
            match input.as_str() {
                "miss" => Outcome::NoMatch,
                "stuck" => Outcome::RateLimited,
                other => Outcome::Success(format!("id-{other}")),
            }
        }
    }

    /// Stage two: "id-bad" blows up, the rest expand into a record string.
    struct Expand;

    impl Produce for Expand {
        type Input = String;
        type Output = String;

        async fn produce(&self, input: &String) -> Outcome<String> {
            match input.as_str() {
                "id-bad" => Outcome::Error(anyhow::anyhow!("record unavailable")),
                other => Outcome::Success(format!("{other}/record")),
            }
        }
    }

    /// Stage two that rate-limits its first attempt, then expands normally.
    struct ExpandFlaky {
        attempts: Arc<AtomicU32>,
    }

    impl Produce for ExpandFlaky {
        type Input = String;
        type Output = String;

        async fn produce(&self, input: &String) -> Outcome<String> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Outcome::RateLimited
            } else {
                Outcome::Success(format!("{input}/record"))
            }
        }
    }

    /// Stage one that dies outright on "kaboom", resolving the rest to an
    /// id string.
    struct Fragile;

    impl Produce for Fragile {
        type Input = String;
        type Output = String;

        async fn produce(&self, input: &String) -> Outcome<String> {
            if input == "kaboom" {
                panic!("resolver wedged");
            }
            Outcome::Success(format!("id-{input}"))
        }
    }

    fn fast_stage<P: Produce>(name: &'static str, producer: P) -> Stage<P, FixedProbe> {
        Stage::new(name, producer, FixedProbe(status_resetting_in(-120)))
            .with_backoff_floor(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn resolves_all_inputs_end_to_end() {
        let pipeline = Pipeline::new(fast_stage("resolve", Resolve), fast_stage("expand", Expand));
        let inputs = vec!["ada".to_string(), "brian".to_string(), "grace".to_string()];

        let outputs = pipeline.run(inputs).await;

        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[&0], "id-ada/record");
        assert_eq!(outputs[&1], "id-brian/record");
        assert_eq!(outputs[&2], "id-grace/record");
    }

    #[tokio::test]
    async fn dropped_jobs_are_absent_from_results() {
        let pipeline = Pipeline::new(fast_stage("resolve", Resolve), fast_stage("expand", Expand));
        let inputs = vec![
            "ada".to_string(),
            "miss".to_string(),
            "bad".to_string(),
            "grace".to_string(),
        ];

        let outputs = pipeline.run(inputs).await;

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[&0], "id-ada/record");
        assert_eq!(outputs[&3], "id-grace/record");
        assert!(!outputs.contains_key(&1), "no-match job leaked through");
        assert!(!outputs.contains_key(&2), "failed job leaked through");
    }

    #[tokio::test]
    async fn rate_limited_second_stage_recovers() {
        let attempts = Arc::new(AtomicU32::new(0));
        let flaky = ExpandFlaky {
            attempts: attempts.clone(),
        };
        let pipeline = Pipeline::new(fast_stage("resolve", Resolve), fast_stage("expand", flaky));
        let inputs = vec!["ada".to_string(), "brian".to_string()];

        let outputs = pipeline.run(inputs).await;

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[&0], "id-ada/record");
        assert_eq!(outputs[&1], "id-brian/record");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_input_completes_immediately() {
        let pipeline = Pipeline::new(fast_stage("resolve", Resolve), fast_stage("expand", Expand));
        let outputs = pipeline.run(Vec::new()).await;
        assert!(outputs.is_empty());
    }

    #[tokio::test]
    async fn cancellation_keeps_partial_results() {
        let cancel = CancellationToken::new();
        let slow_quota = Stage::new("resolve", Resolve, FixedProbe(status_resetting_in(3600)));
        let pipeline = Pipeline::new(slow_quota, fast_stage("expand", Expand))
            .with_cancellation(cancel.clone());
        let inputs = vec!["ada".to_string(), "stuck".to_string()];

        let task = tokio::spawn(pipeline.run(inputs));
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        let outputs = task.await.unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[&0], "id-ada/record");
    }

    #[tokio::test]
    async fn first_stage_panic_keeps_partial_results() {
        let pipeline = Pipeline::new(fast_stage("resolve", Fragile), fast_stage("expand", Expand));
        let inputs = vec!["ada".to_string(), "kaboom".to_string(), "grace".to_string()];

        let outputs = tokio::time::timeout(Duration::from_secs(5), pipeline.run(inputs))
            .await
            .expect("run must return after the first stage dies");

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[&0], "id-ada/record");
        assert!(!outputs.contains_key(&2), "input queued behind the crash leaked through");
    }
}
