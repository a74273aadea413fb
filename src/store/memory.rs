//! Thread-safe in-memory [`AccessStore`](crate::store::AccessStore) for single-instance
//! deployments and tests.

// self
use crate::{
	_prelude::*,
	auth::{
		AccessTokenRecord, CalendarId, GuestPermission, PermissionLevel, SecretDigest, ShareId,
		TokenId, UserId,
	},
	model::{Calendar, ShareGrant, ShareRecord, SubscriptionRecord, SubscriptionStatus},
	store::{
		CalendarStore, ShareStore, ShareWriteOutcome, StoreError, StoreFuture, SubscriptionStore,
		TokenStore, tables::Tables,
	},
};

type TableLock = Arc<RwLock<Tables>>;

/// Storage backend that keeps every table in-process; clones share the same tables.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(TableLock);
impl MemoryStore {
	fn read<T>(&self, op: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
		Ok(op(&self.0.read()))
	}

	fn write<T>(&self, op: impl FnOnce(&mut Tables) -> T) -> Result<T, StoreError> {
		Ok(op(&mut self.0.write()))
	}
}
impl CalendarStore for MemoryStore {
	fn insert_calendar(&self, calendar: Calendar) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.0.write().insert_calendar(calendar) })
	}

	fn fetch_calendar<'a>(&'a self, id: &'a CalendarId) -> StoreFuture<'a, Option<Calendar>> {
		Box::pin(async move { self.read(|t| t.fetch_calendar(id)) })
	}

	fn set_guest_permission<'a>(
		&'a self,
		id: &'a CalendarId,
		policy: GuestPermission,
	) -> StoreFuture<'a, Option<Calendar>> {
		Box::pin(async move { self.write(|t| t.set_guest_permission(id, policy)) })
	}

	fn transfer_ownership<'a>(
		&'a self,
		id: &'a CalendarId,
		new_owner: &'a UserId,
	) -> StoreFuture<'a, Option<Calendar>> {
		Box::pin(async move { self.write(|t| t.transfer_ownership(id, new_owner)) })
	}

	fn orphan_calendars<'a>(&'a self, owner: &'a UserId) -> StoreFuture<'a, Vec<CalendarId>> {
		Box::pin(async move { self.write(|t| t.orphan_calendars(owner)) })
	}

	fn delete_calendar<'a>(&'a self, id: &'a CalendarId) -> StoreFuture<'a, Option<Calendar>> {
		Box::pin(async move { self.write(|t| t.delete_calendar(id)) })
	}
}
impl ShareStore for MemoryStore {
	fn fetch_share<'a>(
		&'a self,
		calendar_id: &'a CalendarId,
		user_id: &'a UserId,
	) -> StoreFuture<'a, Option<ShareRecord>> {
		Box::pin(async move { self.read(|t| t.fetch_share(calendar_id, user_id)) })
	}

	fn fetch_share_by_id<'a>(&'a self, id: &'a ShareId) -> StoreFuture<'a, Option<ShareRecord>> {
		Box::pin(async move { self.read(|t| t.fetch_share_by_id(id)) })
	}

	fn list_shares<'a>(
		&'a self,
		calendar_id: &'a CalendarId,
	) -> StoreFuture<'a, Vec<ShareRecord>> {
		Box::pin(async move { self.read(|t| t.list_shares(calendar_id)) })
	}

	fn upsert_share(
		&self,
		grant: ShareGrant,
		expected: Option<PermissionLevel>,
	) -> StoreFuture<'_, ShareWriteOutcome> {
		Box::pin(async move { self.write(|t| t.upsert_share(grant, expected)) })
	}

	fn delete_share<'a>(&'a self, id: &'a ShareId) -> StoreFuture<'a, Option<ShareRecord>> {
		Box::pin(async move { self.write(|t| t.delete_share(id)) })
	}

	fn delete_user_shares<'a>(
		&'a self,
		user_id: &'a UserId,
	) -> StoreFuture<'a, Vec<ShareRecord>> {
		Box::pin(async move { self.write(|t| t.delete_user_shares(user_id)) })
	}
}
impl TokenStore for MemoryStore {
	fn insert_token(&self, record: AccessTokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.0.write().insert_token(record) })
	}

	fn fetch_token<'a>(&'a self, id: &'a TokenId) -> StoreFuture<'a, Option<AccessTokenRecord>> {
		Box::pin(async move { self.read(|t| t.fetch_token(id)) })
	}

	fn find_token_by_digest<'a>(
		&'a self,
		digest: &'a SecretDigest,
	) -> StoreFuture<'a, Option<AccessTokenRecord>> {
		Box::pin(async move { self.read(|t| t.find_token_by_digest(digest)) })
	}

	fn list_tokens<'a>(
		&'a self,
		calendar_id: &'a CalendarId,
	) -> StoreFuture<'a, Vec<AccessTokenRecord>> {
		Box::pin(async move { self.read(|t| t.list_tokens(calendar_id)) })
	}

	fn set_token_active<'a>(
		&'a self,
		id: &'a TokenId,
		active: bool,
	) -> StoreFuture<'a, Option<AccessTokenRecord>> {
		Box::pin(async move { self.write(|t| t.set_token_active(id, active)) })
	}

	fn record_token_usage<'a>(
		&'a self,
		id: &'a TokenId,
		at: OffsetDateTime,
	) -> StoreFuture<'a, Option<AccessTokenRecord>> {
		Box::pin(async move { self.write(|t| t.record_token_usage(id, at)) })
	}

	fn delete_token<'a>(&'a self, id: &'a TokenId) -> StoreFuture<'a, Option<AccessTokenRecord>> {
		Box::pin(async move { self.write(|t| t.delete_token(id)) })
	}
}
impl SubscriptionStore for MemoryStore {
	fn upsert_subscription(&self, record: SubscriptionRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.write(|t| t.upsert_subscription(record)) })
	}

	fn insert_subscription_if_absent(&self, record: SubscriptionRecord) -> StoreFuture<'_, bool> {
		Box::pin(async move { self.write(|t| t.insert_subscription_if_absent(record)) })
	}

	fn fetch_subscription<'a>(
		&'a self,
		user_id: &'a UserId,
		calendar_id: &'a CalendarId,
	) -> StoreFuture<'a, Option<SubscriptionRecord>> {
		Box::pin(async move { self.read(|t| t.fetch_subscription(user_id, calendar_id)) })
	}

	fn list_subscriptions<'a>(
		&'a self,
		user_id: &'a UserId,
	) -> StoreFuture<'a, Vec<SubscriptionRecord>> {
		Box::pin(async move { self.read(|t| t.list_subscriptions(user_id)) })
	}

	fn set_subscription_status<'a>(
		&'a self,
		user_id: &'a UserId,
		calendar_id: &'a CalendarId,
		status: SubscriptionStatus,
		at: OffsetDateTime,
	) -> StoreFuture<'a, Option<SubscriptionRecord>> {
		Box::pin(async move {
			self.write(|t| t.set_subscription_status(user_id, calendar_id, status, at))
		})
	}

	fn delete_user_subscriptions<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, usize> {
		Box::pin(async move { self.write(|t| t.delete_user_subscriptions(user_id)) })
	}
}
