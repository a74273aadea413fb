//! Permission resolution: the maximum of ownership, share, guest policy, and a presented token.
//!
//! Every mechanism contributes independently and the result is their maximum, so adding a grant
//! can never lower the outcome. A presented secret that is unknown, inactive, expired, or bound to
//! another calendar contributes nothing instead of failing the call.

// self
use crate::{
	_prelude::*,
	access::AccessControl,
	auth::{Actor, CalendarId, PermissionLevel, TokenGrant},
	obs::{self, OperationKind},
};

/// Per-mechanism contributions behind one resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSources {
	/// `owner` when the actor owns the calendar.
	pub ownership: Option<PermissionLevel>,
	/// Level of the actor's share, capped at `admin`.
	pub share: Option<PermissionLevel>,
	/// Calendar-wide guest policy.
	pub guest: Option<PermissionLevel>,
	/// Level of a valid presented token.
	pub token: Option<PermissionLevel>,
}
impl GrantSources {
	/// Effective permission: the highest contribution, `none` without any.
	pub fn effective(&self) -> PermissionLevel {
		[self.ownership, self.share, self.guest, self.token]
			.into_iter()
			.flatten()
			.max()
			.unwrap_or_default()
	}
}

impl AccessControl {
	/// Resolves the actor's effective permission on a calendar.
	pub async fn resolve(
		&self,
		actor: &Actor,
		calendar_id: &CalendarId,
		token: Option<&str>,
	) -> Result<PermissionLevel> {
		self.resolve_at(actor, calendar_id, token, OffsetDateTime::now_utc()).await
	}

	/// Resolves the effective permission as of `now` (token expiry is evaluated at `now`).
	pub async fn resolve_at(
		&self,
		actor: &Actor,
		calendar_id: &CalendarId,
		token: Option<&str>,
		now: OffsetDateTime,
	) -> Result<PermissionLevel> {
		obs::observe(OperationKind::Resolve, "resolve", async move {
			Ok(self.sources_at(actor, calendar_id, token, now).await?.effective())
		})
		.await
	}

	/// Breaks a resolution down by mechanism.
	pub async fn explain(
		&self,
		actor: &Actor,
		calendar_id: &CalendarId,
		token: Option<&str>,
	) -> Result<GrantSources> {
		obs::observe(OperationKind::Resolve, "explain", async move {
			self.sources_at(actor, calendar_id, token, OffsetDateTime::now_utc()).await
		})
		.await
	}

	pub(crate) async fn sources_at(
		&self,
		actor: &Actor,
		calendar_id: &CalendarId,
		token: Option<&str>,
		now: OffsetDateTime,
	) -> Result<GrantSources> {
		let calendar = self.load_calendar(calendar_id).await?;
		let mut sources = self.standing_sources(&calendar, actor).await?;

		if let Some(secret) = token {
			sources.token = self.token_contribution(secret, calendar_id, now).await?;
		}

		Ok(sources)
	}

	async fn token_contribution(
		&self,
		secret: &str,
		calendar_id: &CalendarId,
		now: OffsetDateTime,
	) -> Result<Option<PermissionLevel>> {
		let Some(grant) = self.usable_token(secret, now).await?.map(|r| TokenGrant::from(&r)) else {
			return Ok(None);
		};
		let Some(level) = grant.level_for(calendar_id) else {
			return Ok(None);
		};

		self.record_usage(&grant.token_id, now).await;

		Ok(Some(level))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn effective_is_the_maximum_contribution() {
		let sources = GrantSources {
			share: Some(PermissionLevel::Read),
			guest: Some(PermissionLevel::Write),
			..GrantSources::default()
		};

		assert_eq!(sources.effective(), PermissionLevel::Write);
		assert_eq!(GrantSources::default().effective(), PermissionLevel::None);
		assert_eq!(
			GrantSources { ownership: Some(PermissionLevel::Owner), ..sources }.effective(),
			PermissionLevel::Owner
		);
	}
}
