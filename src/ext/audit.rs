//! Structured audit events and the fire-and-forget emitter in front of pluggable sinks.
//!
//! Sinks own persistence; the emitter only guarantees that a failing sink never fails or rolls
//! back the audited operation. Failures are surfaced through tracing and metrics instead.

// self
use crate::{
	_prelude::*,
	auth::{
		Actor, CalendarId, GuestPermission, PermissionLevel, ShareId, TokenId, TokenPermission,
		UserId,
	},
	obs,
};

/// Boxed future returned by [`AuditSink::record`].
pub type AuditFuture<'a> = Pin<Box<dyn Future<Output = Result<(), AuditError>> + 'a + Send>>;

/// Failure reported by an [`AuditSink`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Audit sink failed: {message}.")]
pub struct AuditError {
	/// Human-readable error payload.
	pub message: String,
}

/// Security-relevant state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuditAction {
	/// A calendar was created.
	CalendarCreated,
	/// A calendar and all its grants were deleted.
	CalendarDeleted,
	/// The owner account was removed; the calendar has no owner now.
	CalendarOrphaned {
		/// Account that used to own the calendar.
		previous_owner: UserId,
	},
	/// Ownership moved to another account.
	OwnershipTransferred {
		/// Previous owner, if any.
		from: Option<UserId>,
		/// New owner.
		to: UserId,
	},
	/// The guest policy changed.
	GuestPermissionChanged {
		/// Policy before the change.
		from: GuestPermission,
		/// Policy after the change.
		to: GuestPermission,
	},
	/// A share was created.
	ShareCreated {
		/// Share identifier.
		share_id: ShareId,
		/// Grantee.
		target: UserId,
		/// Granted level.
		level: PermissionLevel,
	},
	/// A share level changed.
	ShareUpdated {
		/// Share identifier.
		share_id: ShareId,
		/// Grantee.
		target: UserId,
		/// Level before the change.
		from: PermissionLevel,
		/// Level after the change.
		to: PermissionLevel,
	},
	/// A share was removed.
	ShareRemoved {
		/// Share identifier.
		share_id: ShareId,
		/// Former grantee.
		target: UserId,
		/// Level at removal.
		level: PermissionLevel,
		/// Whether the grantee removed their own share.
		self_removal: bool,
	},
	/// A bearer token was issued.
	TokenIssued {
		/// Token identifier.
		token_id: TokenId,
		/// Granted permission.
		permission: TokenPermission,
		/// Expiry, if any.
		expires_at: Option<OffsetDateTime>,
	},
	/// A token's kill-switch was flipped (reversible).
	TokenActivationChanged {
		/// Token identifier.
		token_id: TokenId,
		/// New state.
		active: bool,
	},
	/// A token was hard-deleted (permanent).
	TokenRevoked {
		/// Token identifier.
		token_id: TokenId,
	},
}
impl AuditAction {
	/// Returns a stable label suitable for log fields and metrics.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::CalendarCreated => "calendar_created",
			Self::CalendarDeleted => "calendar_deleted",
			Self::CalendarOrphaned { .. } => "calendar_orphaned",
			Self::OwnershipTransferred { .. } => "ownership_transferred",
			Self::GuestPermissionChanged { .. } => "guest_permission_changed",
			Self::ShareCreated { .. } => "share_created",
			Self::ShareUpdated { .. } => "share_updated",
			Self::ShareRemoved { .. } => "share_removed",
			Self::TokenIssued { .. } => "token_issued",
			Self::TokenActivationChanged { .. } => "token_activation_changed",
			Self::TokenRevoked { .. } => "token_revoked",
		}
	}

	/// Returns `true` when the change widens someone's access.
	pub fn is_escalation(&self) -> bool {
		match self {
			Self::ShareCreated { .. } | Self::OwnershipTransferred { .. } => true,
			Self::ShareUpdated { from, to, .. } => to > from,
			Self::GuestPermissionChanged { from, to } => to > from,
			Self::TokenIssued { .. } => true,
			Self::TokenActivationChanged { active, .. } => *active,
			_ => false,
		}
	}
}

/// One audit record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
	/// When the change happened.
	pub at: OffsetDateTime,
	/// Who made it.
	pub actor: Actor,
	/// Calendar it applies to.
	pub calendar_id: CalendarId,
	/// What changed.
	pub action: AuditAction,
}
impl AuditEvent {
	/// Creates an event.
	pub fn new(
		at: OffsetDateTime,
		actor: Actor,
		calendar_id: CalendarId,
		action: AuditAction,
	) -> Self {
		Self { at, actor, calendar_id, action }
	}
}

/// Destination for audit events.
pub trait AuditSink
where
	Self: Send + Sync,
{
	/// Persists or forwards one event.
	fn record(&self, event: AuditEvent) -> AuditFuture<'_>;
}

/// Fire-and-forget front of an [`AuditSink`].
#[derive(Clone)]
pub struct AuditEmitter {
	sink: Arc<dyn AuditSink>,
}
impl AuditEmitter {
	/// Wraps a sink.
	pub fn new(sink: Arc<dyn AuditSink>) -> Self {
		Self { sink }
	}

	/// Hands the event to the sink; failures are logged and counted, never returned.
	pub async fn emit(&self, event: AuditEvent) {
		let action = event.action.as_str();

		if let Err(err) = self.sink.record(event).await {
			obs::record_audit_failure(action, &err);
		}
	}
}
impl Default for AuditEmitter {
	fn default() -> Self {
		#[cfg(feature = "tracing")]
		{
			Self::new(Arc::new(TracingAuditSink))
		}
		#[cfg(not(feature = "tracing"))]
		{
			Self::new(Arc::new(NoopAuditSink))
		}
	}
}
impl Debug for AuditEmitter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("AuditEmitter(..)")
	}
}

/// Sink that drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;
impl AuditSink for NoopAuditSink {
	fn record(&self, event: AuditEvent) -> AuditFuture<'_> {
		let _ = event;

		Box::pin(async { Ok(()) })
	}
}

/// Sink that keeps events in memory; clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemoryAuditSink(Arc<Mutex<Vec<AuditEvent>>>);
impl MemoryAuditSink {
	/// Snapshot of recorded events in emission order.
	pub fn events(&self) -> Vec<AuditEvent> {
		self.0.lock().clone()
	}

	/// Drains recorded events.
	pub fn take(&self) -> Vec<AuditEvent> {
		std::mem::take(&mut *self.0.lock())
	}
}
impl AuditSink for MemoryAuditSink {
	fn record(&self, event: AuditEvent) -> AuditFuture<'_> {
		self.0.lock().push(event);

		Box::pin(async { Ok(()) })
	}
}

/// Sink that writes each event as a structured `tracing` record under the
/// `calendar_access::audit` target.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;
#[cfg(feature = "tracing")]
impl AuditSink for TracingAuditSink {
	fn record(&self, event: AuditEvent) -> AuditFuture<'_> {
		let payload = serde_json::to_string(&event.action)
			.map_err(|e| AuditError { message: format!("Failed to encode audit action: {e}") });

		Box::pin(async move {
			let payload = payload?;

			tracing::info!(
				target: "calendar_access::audit",
				action = event.action.as_str(),
				actor = %event.actor,
				calendar = %event.calendar_id,
				escalation = event.action.is_escalation(),
				%payload,
				"audit event"
			);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	struct FailingSink;
	impl AuditSink for FailingSink {
		fn record(&self, _: AuditEvent) -> AuditFuture<'_> {
			Box::pin(async { Err(AuditError { message: "disk full".into() }) })
		}
	}

	fn event(action: AuditAction) -> AuditEvent {
		AuditEvent::new(
			macros::datetime!(2025-07-01 00:00 UTC),
			Actor::Guest,
			CalendarId::new("cal").expect("Calendar fixture should be valid."),
			action,
		)
	}

	#[tokio::test]
	async fn failing_sinks_never_surface_errors() {
		let emitter = AuditEmitter::new(Arc::new(FailingSink));

		emitter.emit(event(AuditAction::CalendarDeleted)).await;
	}

	#[tokio::test]
	async fn memory_sink_preserves_order() {
		let sink = MemoryAuditSink::default();
		let emitter = AuditEmitter::new(Arc::new(sink.clone()));

		emitter.emit(event(AuditAction::CalendarCreated)).await;
		emitter.emit(event(AuditAction::CalendarDeleted)).await;

		let actions: Vec<_> = sink.take().into_iter().map(|e| e.action.as_str()).collect();

		assert_eq!(actions, ["calendar_created", "calendar_deleted"]);
		assert!(sink.events().is_empty());
	}

	#[test]
	fn escalations_are_flagged() {
		let promote = AuditAction::ShareUpdated {
			share_id: ShareId::generate(),
			target: UserId::new("bob").expect("User fixture should be valid."),
			from: PermissionLevel::Read,
			to: PermissionLevel::Admin,
		};
		let lock_down = AuditAction::GuestPermissionChanged {
			from: GuestPermission::Write,
			to: GuestPermission::None,
		};

		assert!(promote.is_escalation());
		assert!(!lock_down.is_escalation());
		assert!(!AuditAction::TokenRevoked { token_id: TokenId::generate() }.is_escalation());
	}

	#[test]
	fn actions_serialize_with_a_tag() {
		let json = serde_json::to_value(AuditAction::TokenActivationChanged {
			token_id: TokenId::new("tok-1").expect("Token fixture should be valid."),
			active: false,
		})
		.expect("Audit action should serialize.");

		assert_eq!(json["action"], "token_activation_changed");
		assert_eq!(json["active"], false);
	}
}
