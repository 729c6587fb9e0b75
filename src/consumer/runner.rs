use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, Instrument, Span};

use crate::consumer::{
    backoff::{Backoff, RetryPolicy},
    config::ConsumerGroupConfig,
    error::{ConsumerError, Result},
    handler::ConsumerGroupHandler,
    session::{GroupSession, KafkaGroupSession},
};

/// Lifecycle of a running [`GroupRunner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Consuming; errors are logged and the loop re-enters
    Running,
    /// Cancellation observed; waiting for the in-flight consume call
    ShuttingDown,
    /// Terminal
    Stopped,
}

/// Keeps a consumer-group subscription alive until cancelled
///
/// Each pass through the loop calls [`GroupSession::consume`], which returns
/// whenever a generation ends (rebalance) or fails. The runner re-enters
/// immediately after a clean return and after a backoff delay after an
/// error. Only cancellation, or an exhausted
/// [`RetryPolicy::max_consecutive_failures`], ends the loop.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use delivery_gateway::consumer::{GroupRunner, ResultHandler};
/// use delivery_gateway::storage::InMemoryResults;
/// use tokio_util::sync::CancellationToken;
/// use tokio_util::task::TaskTracker;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handler = ResultHandler::new(Arc::new(InMemoryResults::new()));
///     let runner = GroupRunner::new(
///         vec!["b1:9092".to_string()],
///         "g1",
///         vec!["orders".to_string()],
///         Arc::new(handler),
///     )
///     .await?;
///
///     let cancel = CancellationToken::new();
///     let tracker = TaskTracker::new();
///     let handle = runner.run(cancel.clone(), &tracker);
///
///     // ... later
///     cancel.cancel();
///     tracker.close();
///     tracker.wait().await;
///     assert!(handle.join().await.is_ok());
///     Ok(())
/// }
/// ```
pub struct GroupRunner {
    session: Arc<dyn GroupSession>,
    topics: Vec<String>,
    handler: Arc<dyn ConsumerGroupHandler>,
    retry: RetryPolicy,
    span: Span,
}

impl GroupRunner {
    /// Open a Kafka group session with the default group policies
    ///
    /// Fails with [`ConsumerError::Connection`] when no broker is reachable.
    pub async fn new(
        brokers: Vec<String>,
        group_id: impl Into<String>,
        topics: Vec<String>,
        handler: Arc<dyn ConsumerGroupHandler>,
    ) -> Result<Self> {
        let config = ConsumerGroupConfig::new(brokers, group_id);
        Self::from_config(&config, topics, handler).await
    }

    /// Open a Kafka group session with explicit settings
    pub async fn from_config(
        config: &ConsumerGroupConfig,
        topics: Vec<String>,
        handler: Arc<dyn ConsumerGroupHandler>,
    ) -> Result<Self> {
        let session = KafkaGroupSession::connect(config).await?;
        let span = info_span!("consumer-group", group_id = %config.group_id, topics = ?topics);

        Ok(Self::with_session(Arc::new(session), topics, handler).with_span(span))
    }

    /// Wrap an existing group session
    pub fn with_session(
        session: Arc<dyn GroupSession>,
        topics: Vec<String>,
        handler: Arc<dyn ConsumerGroupHandler>,
    ) -> Self {
        let span = info_span!("consumer-group", topics = ?topics);
        Self {
            session,
            topics,
            handler,
            retry: RetryPolicy::default(),
            span,
        }
    }

    /// Set the retry policy (builder pattern)
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the span the loop logs under (builder pattern)
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Spawn the consume loop on `tracker`
    ///
    /// The spawned task counts as outstanding work on the tracker until the
    /// loop stops, so `tracker.wait()` doubles as the shutdown barrier.
    pub fn run(self, cancel: CancellationToken, tracker: &TaskTracker) -> RunnerHandle {
        let (state_tx, state_rx) = watch::channel(RunnerState::Running);
        let state_tx = Arc::new(state_tx);

        // Flag shutdown as soon as cancellation fires, even mid-call
        let watcher = {
            let cancel = cancel.clone();
            let state_tx = Arc::clone(&state_tx);
            tokio::spawn(async move {
                cancel.cancelled().await;
                state_tx.send_if_modified(|state| {
                    if *state == RunnerState::Running {
                        *state = RunnerState::ShuttingDown;
                        true
                    } else {
                        false
                    }
                });
            })
        };

        let span = self.span.clone();
        let join = tracker.spawn(
            async move {
                let result = self.run_loop(&cancel).await;
                watcher.abort();
                state_tx.send_replace(RunnerState::Stopped);
                result
            }
            .instrument(span),
        );

        RunnerHandle {
            state: state_rx,
            join,
        }
    }

    async fn run_loop(self, cancel: &CancellationToken) -> Result<()> {
        info!("run");

        let drain = self
            .session
            .errors()
            .map(|errors| tokio::spawn(drain_errors(errors, cancel.clone()).in_current_span()));

        let mut backoff = Backoff::new(self.retry.clone());
        let mut iteration: u64 = 0;

        let result = loop {
            iteration += 1;
            let started = Instant::now();

            let outcome = self
                .session
                .consume(&self.topics, Arc::clone(&self.handler), cancel)
                .await;

            if cancel.is_cancelled() {
                if let Err(e) = outcome {
                    debug!(error = %e, "consume returned an error during shutdown");
                }
                info!(iteration, "ctx closed, stopping");
                break Ok(());
            }

            match outcome {
                Ok(()) => {
                    backoff.reset();
                    info!(iteration, "generation ended, rejoining");
                }
                Err(e) => {
                    let failures = backoff.record_failure(started.elapsed());
                    error!(iteration, failures, error = %e, "Error from consume");

                    if backoff.exhausted() {
                        error!(failures, "consecutive failure limit reached, giving up");
                        break Err(ConsumerError::TooManyFailures {
                            failures,
                            last: e.to_string(),
                        });
                    }

                    let delay = backoff.delay();
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            info!(iteration, "ctx closed during backoff, stopping");
                            break Ok(());
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        };

        self.session.close();
        if let Some(drain) = drain {
            drain.abort();
        }

        result
    }
}

async fn drain_errors(mut errors: mpsc::Receiver<ConsumerError>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            err = errors.recv() => match err {
                Some(err) => error!(error = %err, "consumer group error"),
                None => return,
            },
        }
    }
}

/// Handle to a spawned [`GroupRunner`] loop
pub struct RunnerHandle {
    state: watch::Receiver<RunnerState>,
    join: JoinHandle<Result<()>>,
}

impl RunnerHandle {
    /// Current lifecycle state
    pub fn state(&self) -> RunnerState {
        *self.state.borrow()
    }

    /// Wait until the runner reaches `target`
    pub async fn wait_for_state(&mut self, target: RunnerState) -> RunnerState {
        match self.state.wait_for(|state| *state == target).await {
            Ok(state) => *state,
            // Sender dropped: the loop is gone
            Err(_) => RunnerState::Stopped,
        }
    }

    /// Wait for the loop to finish and return its outcome
    pub async fn join(self) -> Result<()> {
        self.join
            .await
            .map_err(|e| ConsumerError::Consume(format!("runner task failed: {}", e)))?
    }
}
