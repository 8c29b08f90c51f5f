//! Job-fire entry point.
//!
//! [`JobReceiver`] is what the transport calls when the remote scheduler
//! fires a job. It wires the pieces together:
//!
//! ```text
//! keyed message → HandleExtractor → (RemoteCallback, JobParameters)
//!              → JobService::run (worker thread) → RemoteCallback::report_result
//! ```
//!
//! ## Policy
//!
//! - No callback → the job is not run (nobody could hear its result)
//! - Undecodable parameters → `invalid_job_result` is reported right away
//! - Same tag already running → `duplicate_job_result` is reported right away
//! - A job that returns an error reports `FailRetry`
//!
//! Nothing is retried here; rescheduling is the remote scheduler's call.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{error, info, info_span, warn};

use jobbridge_core::{InvocationId, KeyedMessage, Parcel};

use crate::callback::RemoteCallback;
use crate::config::ReceiverConfig;
use crate::error::{CallbackError, ReceiverError};
use crate::extractor::HandleExtractor;
use crate::params::JobParameters;
use crate::protocol::ResultCode;

/// Application job logic.
pub trait JobService: Send + Sync + 'static {
    /// Run one job. An `Err` is reported to the scheduler as
    /// [`ResultCode::FailRetry`].
    fn run(&self, params: &JobParameters) -> anyhow::Result<ResultCode>;
}

impl<F> JobService for F
where
    F: Fn(&JobParameters) -> anyhow::Result<ResultCode> + Send + Sync + 'static,
{
    fn run(&self, params: &JobParameters) -> anyhow::Result<ResultCode> {
        self(params)
    }
}

/// What happened to a fired job.
#[derive(Debug)]
pub enum Dispatch {
    /// The message carried no usable callback; the job was not run.
    NoCallback,
    /// The job was refused and `ResultCode` was reported for it.
    Rejected(ResultCode),
    /// The job is running on a worker thread.
    Started(RunningJob),
}

/// A job running on a worker thread.
#[derive(Debug)]
pub struct RunningJob {
    tag: String,
    invocation_id: InvocationId,
    join: thread::JoinHandle<Result<ResultCode, CallbackError>>,
}

impl RunningJob {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    /// Wait for the job to finish and its result to be reported.
    pub fn join(self) -> Result<ResultCode, ReceiverError> {
        let reported = self
            .join
            .join()
            .map_err(|_| ReceiverError::WorkerPanicked(self.tag))?;
        Ok(reported?)
    }
}

type RunningTags = Arc<Mutex<HashSet<String>>>;

/// The set holds no invariant a panicking holder could break, so a poisoned
/// lock is recovered.
fn lock_running(running: &RunningTags) -> MutexGuard<'_, HashSet<String>> {
    running.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a tag as running; releases it on drop, including on worker panic.
struct RunningGuard {
    running: RunningTags,
    tag: String,
}

impl RunningGuard {
    fn acquire(running: &RunningTags, tag: &str) -> Option<Self> {
        let inserted = lock_running(running).insert(tag.to_string());

        inserted.then(|| Self {
            running: Arc::clone(running),
            tag: tag.to_string(),
        })
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        lock_running(&self.running).remove(&self.tag);
    }
}

/// Receives job-fire messages and runs them through a [`JobService`].
pub struct JobReceiver<S: JobService> {
    service: Arc<S>,
    extractor: HandleExtractor,
    config: ReceiverConfig,
    running: RunningTags,
}

impl<S: JobService> JobReceiver<S> {
    pub fn new(service: S) -> Self {
        Self::with_config(service, ReceiverConfig::default())
    }

    pub fn with_config(service: S, config: ReceiverConfig) -> Self {
        Self {
            service: Arc::new(service),
            extractor: HandleExtractor::new(),
            config,
            running: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Receiver configured from the environment (see [`ReceiverConfig::from_env`]).
    pub fn from_env(service: S) -> Self {
        Self::with_config(service, ReceiverConfig::from_env())
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Tags of jobs currently running, sorted.
    pub fn running_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = lock_running(&self.running).iter().cloned().collect();
        tags.sort();
        tags
    }

    /// Handle one job-fire event.
    pub fn on_job_fired(&self, message: Option<KeyedMessage>) -> Result<Dispatch, ReceiverError> {
        let Some(extraction) = self.extractor.extract(message) else {
            warn!("job fired without a usable callback; not running it");
            return Ok(Dispatch::NoCallback);
        };
        let (callback, remainder) = extraction.into_parts();

        let params = match JobParameters::from_message(remainder) {
            Ok(params) => params,
            Err(err) => {
                let code = self.config.invalid_job_result;
                warn!(error = %err, result = %code, "rejecting job with invalid parameters");
                callback.report_result(code)?;
                return Ok(Dispatch::Rejected(code));
            }
        };

        let Some(guard) = RunningGuard::acquire(&self.running, params.tag()) else {
            let code = self.config.duplicate_job_result;
            warn!(tag = params.tag(), result = %code, "job with this tag is already running");
            callback.report_result(code)?;
            return Ok(Dispatch::Rejected(code));
        };

        let tag = params.tag().to_string();
        let invocation_id = params.invocation_id();
        let service = Arc::clone(&self.service);

        let join = thread::Builder::new()
            .name(self.config.worker_name.clone())
            .spawn(move || {
                let _guard = guard;
                let span = info_span!(
                    "job",
                    tag = params.tag(),
                    invocation_id = %params.invocation_id()
                );
                let _enter = span.enter();
                run_job(service.as_ref(), &params, callback)
            })
            .map_err(ReceiverError::Spawn)?;

        info!(%tag, %invocation_id, "job started");

        Ok(Dispatch::Started(RunningJob {
            tag,
            invocation_id,
            join,
        }))
    }

    /// Handle a job-fire event straight off the wire.
    ///
    /// A message that does not decode is treated like one without a callback.
    pub fn on_job_fired_parcel(&self, parcel: &mut Parcel) -> Result<Dispatch, ReceiverError> {
        let message = KeyedMessage::read_from_parcel(parcel)
            .inspect_err(|err| warn!(error = %err, "discarding undecodable job message"))
            .ok();
        self.on_job_fired(message)
    }
}

fn run_job<S>(
    service: &S,
    params: &JobParameters,
    callback: RemoteCallback,
) -> Result<ResultCode, CallbackError>
where
    S: JobService + ?Sized,
{
    let code = match service.run(params) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "job failed");
            ResultCode::FailRetry
        }
    };

    callback.report_result(code)?;
    info!(result = %code, "job finished");
    Ok(code)
}
