//! Calendar administration: creation, guest policy, ownership, deletion, account removal, and
//! export authorization.

// self
use crate::{
	_prelude::*,
	access::{AccessControl, common},
	auth::{Actor, CalendarId, GuestPermission, PermissionLevel, UserId},
	ext::{ActionKind, AuditAction, RateLimitKey},
	model::{Calendar, CalendarDraft},
	obs::{self, OperationKind},
};

/// What [`AccessControl::remove_account`] changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRemoval {
	/// Calendars the account owned; they are ownerless now.
	pub orphaned: Vec<CalendarId>,
	/// Shares the account held.
	pub shares_removed: usize,
	/// Subscription rows deleted.
	pub subscriptions_removed: usize,
}

impl AccessControl {
	/// Creates a calendar owned by the acting user.
	pub async fn create_calendar(&self, actor: &Actor, draft: CalendarDraft) -> Result<Calendar> {
		obs::observe(OperationKind::CreateCalendar, "create_calendar", async move {
			let now = OffsetDateTime::now_utc();
			let owner =
				common::acting_user(actor, PermissionLevel::Owner, PermissionLevel::None)?.clone();

			self.throttle(actor, ActionKind::CalendarCreation, RateLimitKey::GLOBAL).await?;

			let calendar = Calendar::from_draft(draft, owner, now);

			self.store.insert_calendar(calendar.clone()).await?;
			self.audit(now, actor, &calendar.id, AuditAction::CalendarCreated).await;

			Ok(calendar)
		})
		.await
	}

	/// Changes the calendar-wide guest policy. Requires `admin`.
	pub async fn set_guest_permission(
		&self,
		actor: &Actor,
		calendar_id: &CalendarId,
		policy: GuestPermission,
	) -> Result<Calendar> {
		obs::observe(OperationKind::SetGuestPermission, "set_guest_permission", async move {
			let now = OffsetDateTime::now_utc();
			let (calendar, _) = self.require(actor, calendar_id, PermissionLevel::Admin).await?;
			let updated = self
				.store
				.set_guest_permission(calendar_id, policy)
				.await?
				.ok_or_else(|| Error::not_found("Calendar", calendar_id))?;

			if calendar.guest_permission != policy {
				self.audit(
					now,
					actor,
					calendar_id,
					AuditAction::GuestPermissionChanged {
						from: calendar.guest_permission,
						to: policy,
					},
				)
				.await;
			}

			Ok(updated)
		})
		.await
	}

	/// Hands ownership to another user. Requires `owner`.
	///
	/// A share the new owner held is dropped because ownership supersedes it.
	pub async fn transfer_ownership(
		&self,
		actor: &Actor,
		calendar_id: &CalendarId,
		new_owner: &UserId,
	) -> Result<Calendar> {
		obs::observe(OperationKind::TransferOwnership, "transfer_ownership", async move {
			let now = OffsetDateTime::now_utc();
			let (calendar, _) = self.require(actor, calendar_id, PermissionLevel::Owner).await?;
			let updated = self
				.store
				.transfer_ownership(calendar_id, new_owner)
				.await?
				.ok_or_else(|| Error::not_found("Calendar", calendar_id))?;

			self.audit(
				now,
				actor,
				calendar_id,
				AuditAction::OwnershipTransferred { from: calendar.owner, to: new_owner.clone() },
			)
			.await;

			Ok(updated)
		})
		.await
	}

	/// Deletes the calendar with its shares, tokens, and subscriptions. Requires `owner`.
	pub async fn delete_calendar(&self, actor: &Actor, calendar_id: &CalendarId) -> Result<()> {
		obs::observe(OperationKind::DeleteCalendar, "delete_calendar", async move {
			let now = OffsetDateTime::now_utc();

			self.require(actor, calendar_id, PermissionLevel::Owner).await?;
			self.store
				.delete_calendar(calendar_id)
				.await?
				.ok_or_else(|| Error::not_found("Calendar", calendar_id))?;
			self.audit(now, actor, calendar_id, AuditAction::CalendarDeleted).await;

			Ok(())
		})
		.await
	}

	/// Detaches a deleted account: owned calendars become orphaned and the account's shares and
	/// subscriptions are dropped.
	///
	/// Called by the identity layer once the account is gone; there is no permission check.
	pub async fn remove_account(&self, user: &UserId) -> Result<AccountRemoval> {
		obs::observe(OperationKind::RemoveAccount, "remove_account", async move {
			let now = OffsetDateTime::now_utc();
			let actor = Actor::User(user.clone());
			let orphaned = self.store.orphan_calendars(user).await?;
			let shares = self.store.delete_user_shares(user).await?;
			let subscriptions_removed = self.store.delete_user_subscriptions(user).await?;

			for calendar_id in &orphaned {
				self.audit(
					now,
					&actor,
					calendar_id,
					AuditAction::CalendarOrphaned { previous_owner: user.clone() },
				)
				.await;
			}
			for share in &shares {
				self.audit(
					now,
					&actor,
					&share.calendar_id,
					AuditAction::ShareRemoved {
						share_id: share.id.clone(),
						target: share.user_id.clone(),
						level: share.permission,
						self_removal: true,
					},
				)
				.await;
			}

			Ok(AccountRemoval { orphaned, shares_removed: shares.len(), subscriptions_removed })
		})
		.await
	}

	/// Authorizes a bulk export. Needs `read` from any mechanism, tokens included, and counts
	/// against the per-calendar export limit.
	pub async fn authorize_export(
		&self,
		actor: &Actor,
		calendar_id: &CalendarId,
		token: Option<&str>,
	) -> Result<PermissionLevel> {
		obs::observe(OperationKind::AuthorizeExport, "authorize_export", async move {
			let now = OffsetDateTime::now_utc();
			let level = self.sources_at(actor, calendar_id, token, now).await?.effective();

			common::ensure_level(PermissionLevel::Read, level)?;
			self.throttle(actor, ActionKind::BulkExport, calendar_id).await?;

			Ok(level)
		})
		.await
	}
}
