// self
use crate::obs::{OperationKind, OperationOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(kind: OperationKind, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"calendar_access_operation_total",
			"operation" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts an audit event the sink failed to accept.
pub(crate) fn count_audit_failure(action: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("calendar_access_audit_failures_total", "action" => action).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = action;
	}
}
