// self
use crate::{_prelude::*, obs::OperationKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// A span builder used by access operations.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OperationKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("calendar_access.operation", operation = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs and counts an audit event the sink rejected.
pub(crate) fn record_audit_failure(action: &'static str, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(action, error = %error, "audit event was dropped");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (action, error);
	}

	super::metrics::count_audit_failure(action);
}

/// Logs a usage counter update that could not be stored.
pub(crate) fn record_usage_failure(token: &dyn Display, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(token = %token, error = %error, "token usage was not recorded");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (token, error);
	}
}
