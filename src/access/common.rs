//! Shared helpers for access operations (calendar lookup, level gates, throttling, auditing).

// self
use crate::{
	_prelude::*,
	access::{AccessControl, GrantSources},
	auth::{Actor, CalendarId, PermissionLevel, UserId},
	ext::{ActionKind, AuditAction, AuditEvent},
	model::Calendar,
};

impl AccessControl {
	/// Level the actor holds through ownership, shares, and guest policy alone.
	///
	/// Tokens never count here; every administrative gate goes through this method.
	pub async fn actor_level(
		&self,
		actor: &Actor,
		calendar_id: &CalendarId,
	) -> Result<PermissionLevel> {
		let calendar = self.load_calendar(calendar_id).await?;

		self.standing_level(&calendar, actor).await
	}

	pub(crate) async fn load_calendar(&self, calendar_id: &CalendarId) -> Result<Calendar> {
		self.store
			.fetch_calendar(calendar_id)
			.await?
			.ok_or_else(|| Error::not_found("Calendar", calendar_id))
	}

	pub(crate) async fn standing_sources(
		&self,
		calendar: &Calendar,
		actor: &Actor,
	) -> Result<GrantSources> {
		let mut sources = GrantSources {
			guest: calendar.guest_permission.grant(),
			..GrantSources::default()
		};

		if let Some(user) = actor.user_id() {
			if calendar.is_owned_by(user) {
				sources.ownership = Some(PermissionLevel::Owner);
			}

			sources.share = self
				.store
				.fetch_share(&calendar.id, user)
				.await?
				.map(|share| share.effective_level());
		}

		Ok(sources)
	}

	pub(crate) async fn standing_level(
		&self,
		calendar: &Calendar,
		actor: &Actor,
	) -> Result<PermissionLevel> {
		Ok(self.standing_sources(calendar, actor).await?.effective())
	}

	/// Loads the calendar and fails unless the actor's standing level reaches `required`.
	pub(crate) async fn require(
		&self,
		actor: &Actor,
		calendar_id: &CalendarId,
		required: PermissionLevel,
	) -> Result<(Calendar, PermissionLevel)> {
		let calendar = self.load_calendar(calendar_id).await?;
		let actual = self.standing_level(&calendar, actor).await?;

		ensure_level(required, actual)?;

		Ok((calendar, actual))
	}

	pub(crate) async fn throttle(
		&self,
		actor: &Actor,
		action: ActionKind,
		resource: &str,
	) -> Result<()> {
		self.limiter.check(actor, action, resource).await?.into_result()
	}

	pub(crate) async fn audit(
		&self,
		at: OffsetDateTime,
		actor: &Actor,
		calendar_id: &CalendarId,
		action: AuditAction,
	) {
		self.audit.emit(AuditEvent::new(at, actor.clone(), calendar_id.clone(), action)).await;
	}
}

pub(crate) fn ensure_level(required: PermissionLevel, actual: PermissionLevel) -> Result<()> {
	if actual.at_least(required) { Ok(()) } else { Err(Error::insufficient(required, actual)) }
}

/// Account behind a mutation; guests never pass a gate that needs one.
pub(crate) fn acting_user(
	actor: &Actor,
	required: PermissionLevel,
	actual: PermissionLevel,
) -> Result<&UserId> {
	actor.user_id().ok_or_else(|| Error::insufficient(required, actual))
}
