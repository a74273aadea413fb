//! Share registry: per-user grants under the admin/owner hierarchy.
//!
//! Only an owner may create, promote to, demote from, or remove an `admin` share; admins manage
//! `read`/`write` shares; anyone may drop their own share. Ownership itself is never a share, so an
//! `owner` grant is refused and callers must transfer ownership instead.
//!
//! The read of the existing level and the write are joined by the store's compare-and-upsert: when
//! another writer changed the row in between, the gate is re-evaluated against the fresh level and
//! the write retried, up to [`AccessConfig::share_cas_retries`](crate::config::AccessConfig) times.

// self
use crate::{
	_prelude::*,
	access::{
		AccessControl,
		common::{self, ensure_level},
	},
	auth::{Actor, CalendarId, PermissionLevel, ShareId, UserId},
	ext::{ActionKind, AuditAction},
	model::{ShareGrant, ShareRecord, SubscriptionRecord, SubscriptionSource},
	obs::{self, OperationKind},
	store::{ShareWriteOutcome, StoreError},
};

/// How [`AccessControl::share`] treats an existing share for the same user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareMode {
	/// Update the existing share in place.
	#[default]
	Upsert,
	/// Fail with [`Error::DuplicateShare`] when a share exists.
	CreateOnly,
}

/// Grant request handled by [`AccessControl::share`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareRequest {
	/// Calendar to share.
	pub calendar_id: CalendarId,
	/// Grantee.
	pub target: UserId,
	/// Requested level (`read`, `write`, or `admin`).
	pub level: PermissionLevel,
	/// Existing-share handling.
	pub mode: ShareMode,
}
impl ShareRequest {
	/// Creates an upsert request.
	pub fn new(calendar_id: CalendarId, target: UserId, level: PermissionLevel) -> Self {
		Self { calendar_id, target, level, mode: ShareMode::Upsert }
	}

	/// Fails instead of updating an existing share.
	pub fn create_only(mut self) -> Self {
		self.mode = ShareMode::CreateOnly;

		self
	}
}

impl AccessControl {
	/// Creates or updates the target user's share.
	pub async fn share(&self, actor: &Actor, request: ShareRequest) -> Result<ShareRecord> {
		obs::observe(OperationKind::Share, "share", async move {
			let now = OffsetDateTime::now_utc();
			let calendar = self.load_calendar(&request.calendar_id).await?;
			let actual = self.standing_level(&calendar, actor).await?;

			match request.level {
				PermissionLevel::None => return Err(Error::InvalidShareLevel(request.level)),
				PermissionLevel::Owner =>
					return Err(Error::insufficient(PermissionLevel::Owner, actual)),
				_ => {},
			}

			let granter = common::acting_user(actor, PermissionLevel::Admin, actual)?.clone();
			let mut existing = self.store.fetch_share(&calendar.id, &request.target).await?;

			admit_share(&request, existing.as_ref(), actual)?;
			self.throttle(actor, ActionKind::ShareMutation, &calendar.id).await?;

			for _ in 0..=self.config.share_cas_retries {
				let grant = ShareGrant {
					calendar_id: calendar.id.clone(),
					user_id: request.target.clone(),
					permission: request.level,
					granted_by: granter.clone(),
					at: now,
				};
				let expected = existing.as_ref().map(|share| share.permission);

				match self.store.upsert_share(grant, expected).await? {
					ShareWriteOutcome::Created(share) => {
						self.store
							.upsert_subscription(SubscriptionRecord::subscribed(
								share.user_id.clone(),
								share.calendar_id.clone(),
								SubscriptionSource::Shared,
								now,
							))
							.await?;
						self.audit(
							now,
							actor,
							&share.calendar_id,
							AuditAction::ShareCreated {
								share_id: share.id.clone(),
								target: share.user_id.clone(),
								level: share.permission,
							},
						)
						.await;

						return Ok(share);
					},
					ShareWriteOutcome::Updated { previous, share } => {
						if previous != share.permission {
							self.audit(
								now,
								actor,
								&share.calendar_id,
								AuditAction::ShareUpdated {
									share_id: share.id.clone(),
									target: share.user_id.clone(),
									from: previous,
									to: share.permission,
								},
							)
							.await;
						}

						return Ok(share);
					},
					ShareWriteOutcome::Mismatch { .. } => {
						existing = self.store.fetch_share(&calendar.id, &request.target).await?;

						admit_share(&request, existing.as_ref(), actual)?;
					},
				}
			}

			Err(StoreError::Conflict {
				message: format!(
					"share for {} on {} kept changing concurrently",
					request.target, calendar.id
				),
			}
			.into())
		})
		.await
	}

	/// Removes a share by id.
	pub async fn remove_share(
		&self,
		actor: &Actor,
		calendar_id: &CalendarId,
		share_id: &ShareId,
	) -> Result<ShareRecord> {
		obs::observe(OperationKind::RemoveShare, "remove_share", async move {
			let now = OffsetDateTime::now_utc();
			let calendar = self.load_calendar(calendar_id).await?;
			let share = self
				.store
				.fetch_share_by_id(share_id)
				.await?
				.filter(|share| &share.calendar_id == calendar_id)
				.ok_or_else(|| Error::not_found("Share", share_id))?;
			let self_removal = actor.user_id() == Some(&share.user_id);

			if !self_removal {
				let actual = self.standing_level(&calendar, actor).await?;

				ensure_level(removal_gate(&share), actual)?;
			}

			self.throttle(actor, ActionKind::ShareMutation, calendar_id).await?;

			let removed = self
				.store
				.delete_share(share_id)
				.await?
				.ok_or_else(|| Error::not_found("Share", share_id))?;

			self.audit(
				now,
				actor,
				calendar_id,
				AuditAction::ShareRemoved {
					share_id: removed.id.clone(),
					target: removed.user_id.clone(),
					level: removed.permission,
					self_removal,
				},
			)
			.await;

			Ok(removed)
		})
		.await
	}

	/// Lists the calendar's shares; any caller who can read the calendar may see them.
	pub async fn list_shares(
		&self,
		actor: &Actor,
		calendar_id: &CalendarId,
	) -> Result<Vec<ShareRecord>> {
		obs::observe(OperationKind::ListShares, "list_shares", async move {
			self.require(actor, calendar_id, PermissionLevel::Read).await?;

			Ok(self.store.list_shares(calendar_id).await?)
		})
		.await
	}
}

/// Level an actor needs to move `existing` to `level`.
fn mutation_gate(level: PermissionLevel, existing: Option<&ShareRecord>) -> PermissionLevel {
	if level.at_least(PermissionLevel::Admin) || existing.is_some_and(ShareRecord::is_privileged) {
		PermissionLevel::Owner
	} else {
		PermissionLevel::Admin
	}
}

fn removal_gate(share: &ShareRecord) -> PermissionLevel {
	if share.is_privileged() { PermissionLevel::Owner } else { PermissionLevel::Admin }
}

fn admit_share(
	request: &ShareRequest,
	existing: Option<&ShareRecord>,
	actual: PermissionLevel,
) -> Result<()> {
	ensure_level(mutation_gate(request.level, existing), actual)?;

	if request.mode == ShareMode::CreateOnly && existing.is_some() {
		return Err(Error::DuplicateShare);
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn share(level: PermissionLevel) -> ShareRecord {
		ShareGrant {
			calendar_id: CalendarId::new("cal").expect("Calendar fixture should be valid."),
			user_id: UserId::new("bob").expect("User fixture should be valid."),
			permission: level,
			granted_by: UserId::new("olivia").expect("User fixture should be valid."),
			at: macros::datetime!(2025-03-01 09:00 UTC),
		}
		.into_record()
	}

	#[test]
	fn admin_shares_need_an_owner_both_ways() {
		let admin = share(PermissionLevel::Admin);
		let writer = share(PermissionLevel::Write);

		assert_eq!(mutation_gate(PermissionLevel::Admin, None), PermissionLevel::Owner);
		assert_eq!(mutation_gate(PermissionLevel::Read, Some(&admin)), PermissionLevel::Owner);
		assert_eq!(mutation_gate(PermissionLevel::Read, Some(&writer)), PermissionLevel::Admin);
		assert_eq!(removal_gate(&admin), PermissionLevel::Owner);
		assert_eq!(removal_gate(&writer), PermissionLevel::Admin);
	}

	#[test]
	fn create_only_refuses_existing_shares() {
		let request = ShareRequest::new(
			CalendarId::new("cal").expect("Calendar fixture should be valid."),
			UserId::new("bob").expect("User fixture should be valid."),
			PermissionLevel::Read,
		)
		.create_only();
		let existing = share(PermissionLevel::Read);

		assert!(admit_share(&request, None, PermissionLevel::Admin).is_ok());
		assert!(matches!(
			admit_share(&request, Some(&existing), PermissionLevel::Admin),
			Err(Error::DuplicateShare)
		));
	}
}
