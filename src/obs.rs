//! Optional observability helpers for access operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit structured spans named `calendar_access.operation` with the
//!   `operation` and `stage` fields, and warnings for swallowed audit or usage failures.
//! - Enable `metrics` to increment the `calendar_access_operation_total` counter for every
//!   attempt/success/rejection/failure, labeled by `operation` + `outcome`, and
//!   `calendar_access_audit_failures_total` for failed audit deliveries.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Access operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Permission resolution.
	Resolve,
	/// Share create or update.
	Share,
	/// Share removal.
	RemoveShare,
	/// Share listing.
	ListShares,
	/// Token issuance.
	IssueToken,
	/// Token validation (including redemption).
	ValidateToken,
	/// Token hard delete.
	RevokeToken,
	/// Token activation toggle.
	SetTokenActive,
	/// Token listing.
	ListTokens,
	/// Calendar creation.
	CreateCalendar,
	/// Guest policy change.
	SetGuestPermission,
	/// Ownership transfer.
	TransferOwnership,
	/// Calendar deletion.
	DeleteCalendar,
	/// Account removal.
	RemoveAccount,
	/// Bulk export authorization.
	AuthorizeExport,
	/// Subscription bookkeeping.
	Subscription,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Resolve => "resolve",
			OperationKind::Share => "share",
			OperationKind::RemoveShare => "remove_share",
			OperationKind::ListShares => "list_shares",
			OperationKind::IssueToken => "issue_token",
			OperationKind::ValidateToken => "validate_token",
			OperationKind::RevokeToken => "revoke_token",
			OperationKind::SetTokenActive => "set_token_active",
			OperationKind::ListTokens => "list_tokens",
			OperationKind::CreateCalendar => "create_calendar",
			OperationKind::SetGuestPermission => "set_guest_permission",
			OperationKind::TransferOwnership => "transfer_ownership",
			OperationKind::DeleteCalendar => "delete_calendar",
			OperationKind::RemoveAccount => "remove_account",
			OperationKind::AuthorizeExport => "authorize_export",
			OperationKind::Subscription => "subscription",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Policy rejection returned to the caller.
	Rejected,
	/// Storage or configuration failure returned to the caller.
	Failure,
}
impl OperationOutcome {
	/// Classifies a finished operation.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => OperationOutcome::Success,
			Err(e) if e.is_policy_rejection() => OperationOutcome::Rejected,
			Err(_) => OperationOutcome::Failure,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Rejected => "rejected",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside an operation span, recording attempt and outcome counters around it.
pub(crate) async fn observe<T, Fut>(kind: OperationKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = OperationSpan::new(kind, stage);

	record_operation_outcome(kind, OperationOutcome::Attempt);

	let result = span.instrument(fut).await;

	record_operation_outcome(kind, OperationOutcome::of(&result));

	result
}
