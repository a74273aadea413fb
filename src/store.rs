//! Storage contracts and built-in store implementations for access metadata.
//!
//! The contracts are split per table so a deployment can back tokens and shares by different
//! engines; [`AccessStore`] is the umbrella every in-crate consumer takes.

pub mod file;
pub mod memory;

mod tables;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{
		AccessTokenRecord, CalendarId, GuestPermission, PermissionLevel, SecretDigest, ShareId,
		TokenId, UserId,
	},
	model::{Calendar, ShareGrant, ShareRecord, SubscriptionRecord, SubscriptionStatus},
};

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Calendar metadata persistence.
pub trait CalendarStore
where
	Self: Send + Sync,
{
	/// Inserts a new calendar; fails with [`StoreError::Conflict`] if the id exists.
	fn insert_calendar(&self, calendar: Calendar) -> StoreFuture<'_, ()>;

	/// Fetches a calendar by id.
	fn fetch_calendar<'a>(&'a self, id: &'a CalendarId) -> StoreFuture<'a, Option<Calendar>>;

	/// Replaces the guest policy, returning the updated calendar.
	fn set_guest_permission<'a>(
		&'a self,
		id: &'a CalendarId,
		policy: GuestPermission,
	) -> StoreFuture<'a, Option<Calendar>>;

	/// Makes `new_owner` the owner and drops any share they held on the calendar, atomically.
	fn transfer_ownership<'a>(
		&'a self,
		id: &'a CalendarId,
		new_owner: &'a UserId,
	) -> StoreFuture<'a, Option<Calendar>>;

	/// Clears the owner of every calendar owned by `owner`, returning the affected ids.
	fn orphan_calendars<'a>(&'a self, owner: &'a UserId) -> StoreFuture<'a, Vec<CalendarId>>;

	/// Deletes a calendar together with its shares, tokens, and subscriptions.
	fn delete_calendar<'a>(&'a self, id: &'a CalendarId) -> StoreFuture<'a, Option<Calendar>>;
}

/// Share persistence; at most one row per (calendar, user).
pub trait ShareStore
where
	Self: Send + Sync,
{
	/// Fetches the share for a (calendar, user) pair.
	fn fetch_share<'a>(
		&'a self,
		calendar_id: &'a CalendarId,
		user_id: &'a UserId,
	) -> StoreFuture<'a, Option<ShareRecord>>;

	/// Fetches a share by id.
	fn fetch_share_by_id<'a>(&'a self, id: &'a ShareId) -> StoreFuture<'a, Option<ShareRecord>>;

	/// Lists every share on a calendar.
	fn list_shares<'a>(&'a self, calendar_id: &'a CalendarId)
	-> StoreFuture<'a, Vec<ShareRecord>>;

	/// Atomically creates or updates the pair's share if its current level equals `expected`
	/// (`None` meaning "no share yet").
	fn upsert_share(
		&self,
		grant: ShareGrant,
		expected: Option<PermissionLevel>,
	) -> StoreFuture<'_, ShareWriteOutcome>;

	/// Deletes a share by id, returning the removed row.
	fn delete_share<'a>(&'a self, id: &'a ShareId) -> StoreFuture<'a, Option<ShareRecord>>;

	/// Deletes every share granted to `user_id`.
	fn delete_user_shares<'a>(&'a self, user_id: &'a UserId)
	-> StoreFuture<'a, Vec<ShareRecord>>;
}

/// Access-token persistence; digests are unique.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Inserts a new token record; fails with [`StoreError::Conflict`] on a duplicate id or digest.
	fn insert_token(&self, record: AccessTokenRecord) -> StoreFuture<'_, ()>;

	/// Fetches a token by id.
	fn fetch_token<'a>(&'a self, id: &'a TokenId) -> StoreFuture<'a, Option<AccessTokenRecord>>;

	/// Looks a token up through the digest index.
	fn find_token_by_digest<'a>(
		&'a self,
		digest: &'a SecretDigest,
	) -> StoreFuture<'a, Option<AccessTokenRecord>>;

	/// Lists every token on a calendar.
	fn list_tokens<'a>(
		&'a self,
		calendar_id: &'a CalendarId,
	) -> StoreFuture<'a, Vec<AccessTokenRecord>>;

	/// Flips the kill-switch, returning the updated record.
	fn set_token_active<'a>(
		&'a self,
		id: &'a TokenId,
		active: bool,
	) -> StoreFuture<'a, Option<AccessTokenRecord>>;

	/// Increments usage telemetry, returning the updated record.
	fn record_token_usage<'a>(
		&'a self,
		id: &'a TokenId,
		at: OffsetDateTime,
	) -> StoreFuture<'a, Option<AccessTokenRecord>>;

	/// Hard-deletes a token, returning the removed row.
	fn delete_token<'a>(&'a self, id: &'a TokenId) -> StoreFuture<'a, Option<AccessTokenRecord>>;
}

/// Subscription bookkeeping persistence, keyed by (user, calendar).
pub trait SubscriptionStore
where
	Self: Send + Sync,
{
	/// Inserts or replaces the pair's subscription.
	fn upsert_subscription(&self, record: SubscriptionRecord) -> StoreFuture<'_, ()>;

	/// Inserts the subscription only when the pair has none; returns whether it was inserted.
	fn insert_subscription_if_absent(&self, record: SubscriptionRecord) -> StoreFuture<'_, bool>;

	/// Fetches the pair's subscription.
	fn fetch_subscription<'a>(
		&'a self,
		user_id: &'a UserId,
		calendar_id: &'a CalendarId,
	) -> StoreFuture<'a, Option<SubscriptionRecord>>;

	/// Lists a user's subscriptions.
	fn list_subscriptions<'a>(
		&'a self,
		user_id: &'a UserId,
	) -> StoreFuture<'a, Vec<SubscriptionRecord>>;

	/// Changes the listing state, returning the updated row.
	fn set_subscription_status<'a>(
		&'a self,
		user_id: &'a UserId,
		calendar_id: &'a CalendarId,
		status: SubscriptionStatus,
		at: OffsetDateTime,
	) -> StoreFuture<'a, Option<SubscriptionRecord>>;

	/// Deletes every subscription of `user_id`, returning how many were removed.
	fn delete_user_subscriptions<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, usize>;
}

/// Umbrella contract implemented by complete backends.
pub trait AccessStore: CalendarStore + ShareStore + TokenStore + SubscriptionStore {}
impl<T> AccessStore for T where T: CalendarStore + ShareStore + TokenStore + SubscriptionStore {}

/// Result of a share compare-and-upsert attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShareWriteOutcome {
	/// No share existed and one was created.
	Created(ShareRecord),
	/// The existing share matched the expected level and was updated.
	Updated {
		/// Level before the update.
		previous: PermissionLevel,
		/// Updated row.
		share: ShareRecord,
	},
	/// The stored level differed from the expected one; nothing was written.
	Mismatch {
		/// Level currently stored, if any.
		current: Option<PermissionLevel>,
	},
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// A uniqueness constraint rejected the write.
	#[error("Uniqueness conflict: {message}.")]
	Conflict {
		/// Human-readable error payload.
		message: String,
	},
}
