//! Subscription bookkeeping: which calendars a user lists and how they got there.
//!
//! Rows never grant anything; resolution ignores them.

// self
use crate::{
	_prelude::*,
	access::{AccessControl, common},
	auth::{Actor, CalendarId, PermissionLevel, UserId},
	model::{SubscriptionRecord, SubscriptionSource, SubscriptionStatus},
	obs::{self, OperationKind},
};

impl AccessControl {
	/// Lists the calendar for the user, who must be able to read it.
	///
	/// The source reflects the strongest mechanism behind that access: ownership or a share, then
	/// a presented token, then guest policy. Re-subscribing clears an earlier dismissal.
	pub async fn subscribe(
		&self,
		user: &UserId,
		calendar_id: &CalendarId,
		token: Option<&str>,
	) -> Result<SubscriptionRecord> {
		obs::observe(OperationKind::Subscription, "subscribe", async move {
			let now = OffsetDateTime::now_utc();
			let actor = Actor::User(user.clone());
			let sources = self.sources_at(&actor, calendar_id, token, now).await?;

			common::ensure_level(PermissionLevel::Read, sources.effective())?;

			let source = if sources.ownership.is_some() || sources.share.is_some() {
				SubscriptionSource::Shared
			} else if sources.token > sources.guest {
				SubscriptionSource::Token
			} else {
				SubscriptionSource::Guest
			};
			let record =
				SubscriptionRecord::subscribed(user.clone(), calendar_id.clone(), source, now);

			self.store.upsert_subscription(record.clone()).await?;

			Ok(record)
		})
		.await
	}

	/// Hides the calendar from the user's list.
	pub async fn dismiss(
		&self,
		user: &UserId,
		calendar_id: &CalendarId,
	) -> Result<SubscriptionRecord> {
		obs::observe(OperationKind::Subscription, "dismiss", async move {
			self.store
				.set_subscription_status(
					user,
					calendar_id,
					SubscriptionStatus::Dismissed,
					OffsetDateTime::now_utc(),
				)
				.await?
				.ok_or_else(|| Error::not_found("Subscription", format!("{user}/{calendar_id}")))
		})
		.await
	}

	/// The user's subscription rows, dismissed ones included.
	pub async fn subscriptions(&self, user: &UserId) -> Result<Vec<SubscriptionRecord>> {
		obs::observe(OperationKind::Subscription, "subscriptions", async move {
			Ok(self.store.list_subscriptions(user).await?)
		})
		.await
	}
}
