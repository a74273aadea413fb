//! Simple file-backed [`AccessStore`](crate::store::AccessStore) for lightweight deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
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
		TokenStore,
		tables::{Snapshot, Tables},
	},
};

/// Persists every table to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Tables>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let tables = Tables::from_snapshot(Self::load_snapshot(&path)?)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(tables)) })
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
		if !path.exists() {
			return Ok(Snapshot::default());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(Snapshot::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, tables: &Tables) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(&tables.snapshot()).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn read<T>(&self, op: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
		Ok(op(&self.inner.read()))
	}

	/// Applies `op` to a staged copy and swaps it in only once the snapshot is on disk, all under
	/// the write lock; a failed persist leaves memory and file on the previous state.
	fn mutate<T>(
		&self,
		op: impl FnOnce(&mut Tables) -> Result<T, StoreError>,
	) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let mut staged = guard.clone();
		let output = op(&mut staged)?;

		self.persist_locked(&staged)?;
		*guard = staged;

		Ok(output)
	}

	fn write<T>(&self, op: impl FnOnce(&mut Tables) -> T) -> Result<T, StoreError> {
		self.mutate(|tables| Ok(op(tables)))
	}
}
impl CalendarStore for FileStore {
	fn insert_calendar(&self, calendar: Calendar) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|t| t.insert_calendar(calendar)) })
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
impl ShareStore for FileStore {
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
impl TokenStore for FileStore {
	fn insert_token(&self, record: AccessTokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|t| t.insert_token(record)) })
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
impl SubscriptionStore for FileStore {
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

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::{auth::TokenPermission, auth::TokenSecret, model::CalendarDraft};

	fn temp_path() -> PathBuf {
		let unique = format!(
			"calendar_access_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let owner = UserId::new("owner").expect("Failed to build owner fixture.");
		let calendar = Calendar::from_draft(
			CalendarDraft::new("Night shifts"),
			owner.clone(),
			OffsetDateTime::now_utc(),
		);
		let secret = TokenSecret::generate(32);
		let token =
			AccessTokenRecord::builder(calendar.id.clone(), owner, TokenPermission::Read)
				.secret(&secret, 8)
				.build()
				.expect("Failed to build token fixture.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.insert_calendar(calendar.clone()))
			.expect("Failed to save calendar fixture to file store.");
		rt.block_on(store.insert_token(token.clone()))
			.expect("Failed to save token fixture to file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.fetch_calendar(&calendar.id))
			.expect("Failed to fetch calendar from file store.")
			.expect("File store lost calendar after reopen.");
		let found = rt
			.block_on(reopened.find_token_by_digest(&secret.digest()))
			.expect("Failed to look up token digest.")
			.expect("File store lost digest index after reopen.");

		assert_eq!(fetched, calendar);
		assert_eq!(found, token);
		assert!(
			!fs::read_to_string(&path)
				.expect("Snapshot file should be readable.")
				.contains(secret.expose()),
			"Snapshots must never contain full secrets."
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn failed_writes_are_not_persisted() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let owner = UserId::new("owner").expect("Failed to build owner fixture.");
		let calendar =
			Calendar::from_draft(CalendarDraft::new("Rota"), owner, OffsetDateTime::now_utc());
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.insert_calendar(calendar.clone()))
			.expect("First insert should succeed.");

		let err = rt
			.block_on(store.insert_calendar(calendar))
			.expect_err("Duplicate calendar ids must conflict.");

		assert!(matches!(err, StoreError::Conflict { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn failed_persists_leave_memory_and_file_unchanged() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let owner = UserId::new("owner").expect("Failed to build owner fixture.");
		let calendar = Calendar::from_draft(
			CalendarDraft::new("Rota"),
			owner.clone(),
			OffsetDateTime::now_utc(),
		);
		let grant = ShareGrant {
			calendar_id: calendar.id.clone(),
			user_id: UserId::new("bob").expect("Failed to build grantee fixture."),
			permission: PermissionLevel::Write,
			granted_by: owner,
			at: OffsetDateTime::now_utc(),
		};
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.insert_calendar(calendar.clone()))
			.expect("Calendar insert should succeed.");

		let ShareWriteOutcome::Created(share) = rt
			.block_on(store.upsert_share(grant, None))
			.expect("Share insert should succeed.")
		else {
			panic!("First grant should create a share.");
		};
		let mut tmp_path = path.clone();

		tmp_path.set_extension("tmp");
		fs::create_dir(&tmp_path).expect("Failed to block the staging file with a directory.");

		let err = rt
			.block_on(store.delete_share(&share.id))
			.expect_err("Removal must fail when the snapshot cannot be written.");

		assert!(matches!(err, StoreError::Backend { .. }));
		assert_eq!(
			rt.block_on(store.fetch_share_by_id(&share.id)).expect("Fetch should succeed."),
			Some(share.clone()),
			"A failed removal must keep the share in memory."
		);

		fs::remove_dir(&tmp_path).expect("Failed to unblock the staging file.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert_eq!(
			rt.block_on(reopened.fetch_share_by_id(&share.id)).expect("Fetch should succeed."),
			Some(share.clone())
		);

		let removed = rt
			.block_on(reopened.delete_share(&share.id))
			.expect("Retried removal should succeed.");

		assert_eq!(removed, Some(share));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
