//! Completion callback back to the remote scheduler.

use tracing::{debug, warn};

use jobbridge_core::{FLAG_NONE, Handle, Parcel};

use crate::error::CallbackError;
use crate::protocol::{
    self, CALLBACK_INTERFACE_TOKEN, JOB_FINISHED_TRANSACTION, ResultCode, STRICT_MODE_HEADER,
};

/// Reports the result of one job execution to the remote scheduler.
///
/// Only the extractor creates these, so a `RemoteCallback` always wraps a
/// handle that arrived under the callback key with the expected type.
/// Reporting consumes the callback: the remote party expects a single report
/// per job invocation. Dropping it without reporting abandons the job; the
/// remote scheduler's own timeout takes over.
#[derive(Debug)]
pub struct RemoteCallback {
    handle: Handle,
}

impl RemoteCallback {
    pub(crate) fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Send `code` to the remote scheduler in one job-finished transaction.
    ///
    /// Returns once the substrate acknowledges the transaction. A dead
    /// endpoint or a rejection by the remote party is returned as an error;
    /// nothing is retried.
    pub fn report_result(self, code: ResultCode) -> Result<(), CallbackError> {
        let mut data = Parcel::new();
        data.write_i32(STRICT_MODE_HEADER);
        data.write_string(CALLBACK_INTERFACE_TOKEN);
        data.write_i32(code.code());

        debug!(result = %code, transaction = JOB_FINISHED_TRANSACTION, "reporting job result");

        let mut reply = self
            .handle
            .transact(JOB_FINISHED_TRANSACTION, data, FLAG_NONE)
            .inspect_err(|err| warn!(result = %code, error = %err, "job result not delivered"))?;

        protocol::read_exception(&mut reply)
            .inspect_err(|err| warn!(result = %code, error = %err, "job result rejected"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobbridge_core::{RecordingEndpoint, TransactError};

    use crate::protocol::{EX_SECURITY, write_exception, write_no_exception};

    #[test]
    fn success_is_framed_for_the_remote_parser() {
        let endpoint = RecordingEndpoint::shared();
        let callback = RemoteCallback::new(Handle::from(endpoint.clone()));

        callback.report_result(ResultCode::Success).unwrap();

        let transactions = endpoint.transactions();
        assert_eq!(transactions.len(), 1);

        let tx = &transactions[0];
        assert_eq!(tx.code, JOB_FINISHED_TRANSACTION);
        assert_eq!(tx.flags, FLAG_NONE);

        let mut data = tx.data.clone();
        assert_eq!(data.read_i32().unwrap(), STRICT_MODE_HEADER);
        assert_eq!(data.read_string().unwrap(), CALLBACK_INTERFACE_TOKEN);
        assert_eq!(data.read_i32().unwrap(), ResultCode::Success.code());
        assert_eq!(data.remaining(), 0);
    }

    #[test]
    fn failure_codes_are_forwarded_verbatim() {
        let endpoint = RecordingEndpoint::shared();
        RemoteCallback::new(Handle::from(endpoint.clone()))
            .report_result(ResultCode::FailNoRetry)
            .unwrap();

        let mut data = endpoint.transactions()[0].data.clone();
        data.read_i32().unwrap();
        data.read_string().unwrap();
        assert_eq!(data.read_i32().unwrap(), 2);
    }

    #[test]
    fn explicit_ack_is_accepted() {
        let endpoint = RecordingEndpoint::shared();
        let mut ack = Parcel::new();
        write_no_exception(&mut ack);
        endpoint.reply_with(ack);

        let callback = RemoteCallback::new(Handle::from(endpoint));
        assert!(callback.report_result(ResultCode::FailRetry).is_ok());
    }

    #[test]
    fn dead_endpoint_fails_the_report() {
        let endpoint = RecordingEndpoint::shared();
        endpoint.kill();

        let err = RemoteCallback::new(Handle::from(endpoint))
            .report_result(ResultCode::Success)
            .unwrap_err();
        assert_eq!(err, CallbackError::Transact(TransactError::DeadObject));
    }

    #[test]
    fn remote_rejection_is_surfaced() {
        let endpoint = RecordingEndpoint::shared();
        let mut reply = Parcel::new();
        write_exception(&mut reply, EX_SECURITY, "not my interface");
        endpoint.reply_with(reply);

        let err = RemoteCallback::new(Handle::from(endpoint.clone()))
            .report_result(ResultCode::Success)
            .unwrap_err();
        assert!(matches!(err, CallbackError::RemoteRejected { code: EX_SECURITY, .. }));
        // Not retried.
        assert_eq!(endpoint.transactions().len(), 1);
    }

    #[test]
    fn truncated_acknowledgement_is_malformed() {
        let endpoint = RecordingEndpoint::shared();
        endpoint.reply_with(Parcel::from_parts(vec![0, 0], Vec::new()));

        let err = RemoteCallback::new(Handle::from(endpoint))
            .report_result(ResultCode::Success)
            .unwrap_err();
        assert!(matches!(err, CallbackError::MalformedReply(_)));
    }

    #[test]
    fn exception_without_message_is_still_a_rejection() {
        let endpoint = RecordingEndpoint::shared();
        let mut reply = Parcel::new();
        reply.write_i32(-1);
        endpoint.reply_with(reply);

        let err = RemoteCallback::new(Handle::from(endpoint))
            .report_result(ResultCode::Success)
            .unwrap_err();
        assert_eq!(
            err,
            CallbackError::RemoteRejected {
                code: -1,
                message: String::new()
            }
        );
    }
}
