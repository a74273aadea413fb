//! Visibility bookkeeping: how a user came to see a calendar and whether they dismissed it.

// self
use crate::{
	_prelude::*,
	auth::{CalendarId, UserId},
};

/// Mechanism through which the calendar first became visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionSource {
	/// Calendar guest policy.
	Guest,
	/// Explicit share.
	Shared,
	/// Bearer token link.
	Token,
}

/// Whether the calendar is listed for the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
	/// Listed.
	Subscribed,
	/// Hidden by the user.
	Dismissed,
}

/// Per-(user, calendar) visibility row. Carries no authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
	/// Subscriber.
	pub user_id: UserId,
	/// Subscribed calendar.
	pub calendar_id: CalendarId,
	/// How the user got here.
	pub source: SubscriptionSource,
	/// Listing state.
	pub status: SubscriptionStatus,
	/// Last change.
	pub updated_at: OffsetDateTime,
}
impl SubscriptionRecord {
	/// Creates a `subscribed` row.
	pub fn subscribed(
		user_id: UserId,
		calendar_id: CalendarId,
		source: SubscriptionSource,
		at: OffsetDateTime,
	) -> Self {
		Self {
			user_id,
			calendar_id,
			source,
			status: SubscriptionStatus::Subscribed,
			updated_at: at,
		}
	}

	/// Returns `true` when the calendar is listed.
	pub fn is_subscribed(&self) -> bool {
		matches!(self.status, SubscriptionStatus::Subscribed)
	}
}
