//! Single-worker job queue with rate-limit aware backoff.
//!
//! A [`JobQueue`] owns one spawned worker task fed through an unbounded
//! channel. Producers push [`KeyedJob`]s with [`JobQueue::submit`] and
//! announce the end of input with [`JobQueue::signal_no_more_jobs`], which
//! enqueues a sentinel behind the last job. Each job resolves to an
//! [`Outcome`]: successes reach the queue's success callback, misses and
//! hard errors are dropped, and rate-limited jobs are requeued at the tail
//! while the worker sleeps until the quota reset reported by its
//! [`QuotaProbe`].
//!
//! The completion callback runs exactly once, on every exit path, so a
//! dependent downstream queue can never be left waiting.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Minimum backoff slept when a quota is exhausted. Matches the length of
/// the search quota window, so one backoff always reaches the next window.
pub const DEFAULT_BACKOFF_FLOOR: Duration = Duration::from_secs(60);

/// A unit of work tagged with the caller-assigned id it keeps for life.
///
/// The id carries no ordering meaning; it only keys the job's eventual
/// output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedJob<T> {
    pub id: u64,
    pub payload: T,
}

impl<T> KeyedJob<T> {
    pub fn new(id: u64, payload: T) -> Self {
        Self { id, payload }
    }
}

/// What became of one processing attempt.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The payload resolved to a value.
    Success(T),
    /// The lookup completed and found nothing. Terminal, the job is dropped.
    NoMatch,
    /// The stage's quota is spent. The job goes back to the queue tail and
    /// the worker sleeps until the quota resets.
    RateLimited,
    /// The lookup failed. Terminal, the job is dropped after logging.
    Error(anyhow::Error),
}

/// Point-in-time snapshot of one rate-limit bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Unix epoch second at which the quota window resets.
    pub reset_epoch_secs: u64,
    /// Calls still available in the current window.
    pub remaining: u32,
    /// Window capacity.
    pub limit: u32,
    /// Window length in seconds.
    pub window_secs: u32,
}

/// Turns one payload into an [`Outcome`].
pub trait Produce: Send + Sync + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn produce(&self, input: &Self::Input) -> impl Future<Output = Outcome<Self::Output>> + Send;
}

/// Reports the current state of the quota bucket governing a stage.
pub trait QuotaProbe: Send + Sync + 'static {
    fn current_status(&self) -> impl Future<Output = anyhow::Result<RateLimitStatus>> + Send;
}

/// Returned by [`JobQueue::submit`] once the worker has terminated.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("job queue is no longer accepting jobs")]
pub struct QueueClosed;

/// Handle to a spawned stage queue.
///
/// Cheap to clone; every clone feeds the same worker. The worker runs until
/// the queue drains after [`signal_no_more_jobs`](Self::signal_no_more_jobs),
/// the cancellation token fires, or the last handle is dropped.
pub struct JobQueue<In> {
    name: &'static str,
    tx: mpsc::UnboundedSender<Envelope<In>>,
    drained: watch::Receiver<bool>,
}

impl<In> Clone for JobQueue<In> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
            drained: self.drained.clone(),
        }
    }
}

enum Envelope<T> {
    Job(KeyedJob<T>),
    EndOfJobs,
}

impl<In: Send + 'static> JobQueue<In> {
    /// Spawn the worker task and return a handle to it.
    ///
    /// `on_success` runs on the worker for every successful job;
    /// `on_completion` runs exactly once when the worker stops, before
    /// [`wait_until_drained`](Self::wait_until_drained) callers resume.
    pub fn spawn<P, Q, S, C>(
        name: &'static str,
        producer: P,
        probe: Q,
        backoff_floor: Duration,
        cancel: CancellationToken,
        on_success: S,
        on_completion: C,
    ) -> Self
    where
        P: Produce<Input = In>,
        Q: QuotaProbe,
        S: FnMut(u64, P::Output) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (drained_tx, drained_rx) = watch::channel(false);
        let worker = Worker {
            name,
            rx,
            requeue: tx.downgrade(),
            producer,
            probe,
            backoff_floor,
            cancel,
            on_success,
        };
        tokio::spawn(async move {
            worker.run().await;
            on_completion();
            let _ = drained_tx.send(true);
            debug!(queue = name, "worker terminated");
        });
        Self {
            name,
            tx,
            drained: drained_rx,
        }
    }

    /// Enqueue a job. Never blocks.
    ///
    /// Fails only after the worker has terminated; a terminated queue stays
    /// terminated, late jobs are the caller's bug to fix.
    pub fn submit(&self, job: KeyedJob<In>) -> Result<(), QueueClosed> {
        self.tx.send(Envelope::Job(job)).map_err(|_| QueueClosed)
    }

    /// Announce that no further [`submit`](Self::submit) calls will happen.
    ///
    /// Enqueues a sentinel behind everything already submitted. Idempotent,
    /// never blocks, and harmless after termination.
    pub fn signal_no_more_jobs(&self) {
        let _ = self.tx.send(Envelope::EndOfJobs);
    }

    /// Wait until the completion callback has fired.
    ///
    /// Returns immediately when the queue already drained, and also returns
    /// (rather than hanging forever) if the worker died abnormally.
    pub async fn wait_until_drained(&self) {
        let mut drained = self.drained.clone();
        let _ = drained.wait_for(|done| *done).await;
    }
}

struct Worker<P, Q, S>
where
    P: Produce,
    Q: QuotaProbe,
    S: FnMut(u64, P::Output),
{
    name: &'static str,
    rx: mpsc::UnboundedReceiver<Envelope<P::Input>>,
    requeue: mpsc::WeakUnboundedSender<Envelope<P::Input>>,
    producer: P,
    probe: Q,
    backoff_floor: Duration,
    cancel: CancellationToken,
    on_success: S,
}

impl<P, Q, S> Worker<P, Q, S>
where
    P: Produce,
    Q: QuotaProbe,
    S: FnMut(u64, P::Output),
{
    /// Process envelopes until the queue drains, the token fires, or the
    /// last handle is gone.
    async fn run(mut self) {
        let mut draining = false;
        loop {
            let envelope = if draining {
                if self.cancel.is_cancelled() {
                    debug!(queue = self.name, "cancelled while draining");
                    return;
                }
                // After the sentinel only this worker may requeue, and it
                // does so before coming back here, so an empty channel means
                // the queue is truly drained.
                self.rx.try_recv().ok()
            } else {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        debug!(queue = self.name, "cancelled while idle");
                        return;
                    }
                    envelope = self.rx.recv() => envelope,
                }
            };
            let Some(envelope) = envelope else { return };
            match envelope {
                Envelope::EndOfJobs => draining = true,
                Envelope::Job(job) => {
                    if !self.handle(job).await {
                        return;
                    }
                }
            }
        }
    }

    /// Resolve one job. Returns false when the worker should stop
    /// (cancelled mid-backoff).
    async fn handle(&mut self, job: KeyedJob<P::Input>) -> bool {
        match self.producer.produce(&job.payload).await {
            Outcome::Success(value) => {
                debug!(queue = self.name, id = job.id, "job succeeded");
                (self.on_success)(job.id, value);
            }
            Outcome::NoMatch => {
                debug!(queue = self.name, id = job.id, "no match, dropping job");
            }
            Outcome::Error(error) => {
                warn!(queue = self.name, id = job.id, %error, "job failed, dropping");
            }
            Outcome::RateLimited => {
                let id = job.id;
                match self.requeue.upgrade() {
                    Some(tx) => {
                        let _ = tx.send(Envelope::Job(job));
                    }
                    None => {
                        warn!(queue = self.name, id, "queue abandoned, discarding rate-limited job");
                    }
                }
                let wait = Self::backoff_wait(&self.probe, self.backoff_floor, self.name).await;
                info!(
                    queue = self.name,
                    id,
                    wait_ms = wait.as_millis() as u64,
                    "quota exhausted, backing off"
                );
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        debug!(queue = self.name, "cancelled during backoff");
                        return false;
                    }
                    _ = sleep(wait) => {}
                }
            }
        }
        true
    }

    /// How long to sleep before retrying: until the reported quota reset,
    /// but never less than the floor.
    ///
    /// Borrows only the probe so the future stays `Send` without requiring
    /// `Sync` of the success callback.
    async fn backoff_wait(probe: &Q, backoff_floor: Duration, name: &'static str) -> Duration {
        match probe.current_status().await {
            Ok(status) => {
                let now_ms = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|elapsed| elapsed.as_millis() as u64)
                    .unwrap_or(0);
                let reset_ms = status.reset_epoch_secs.saturating_mul(1000);
                Duration::from_millis(reset_ms.saturating_sub(now_ms)).max(backoff_floor)
            }
            Err(error) => {
                warn!(queue = name, %error, "quota probe failed, sleeping the floor");
                backoff_floor
            }
        }
    }
}
