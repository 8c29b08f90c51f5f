//! `jobbridge-dispatch` — the bridge between a remote job scheduler and
//! application job logic.
//!
//! ## Components
//!
//! - `HandleExtractor`: detaches the completion callback from a job-fire message
//! - `RemoteCallback`: reports a job result back in one framed transaction
//! - `JobReceiver`: job-fire entry point running `JobService`s on worker threads
//! - `CompletionEndpoint`: the scheduler-side parser of job-finished calls
//! - `protocol`: the wire contract (transaction code, token, result codes)

pub mod callback;
pub mod config;
pub mod error;
pub mod extractor;
pub mod params;
pub mod protocol;
pub mod receiver;
pub mod remote;

pub use callback::RemoteCallback;
pub use config::ReceiverConfig;
pub use error::{CallbackError, ParamsError, ReceiverError, RejectedCallback};
pub use extractor::{Extraction, HandleExtractor};
pub use params::JobParameters;
pub use protocol::{PendingCallback, ResultCode};
pub use receiver::{Dispatch, JobReceiver, JobService, RunningJob};
pub use remote::CompletionEndpoint;
