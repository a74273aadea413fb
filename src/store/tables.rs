//! In-process tables and their synchronous operations, shared by [`super::MemoryStore`] and
//! [`super::FileStore`].
//!
//! Every mutating method runs under the caller's write lock, which is what makes upserts,
//! compare-and-swap, and usage increments atomic.

// self
use crate::{
	_prelude::*,
	auth::{
		AccessTokenRecord, CalendarId, GuestPermission, PermissionLevel, SecretDigest, ShareId,
		TokenId, UserId,
	},
	model::{Calendar, ShareGrant, ShareRecord, SubscriptionRecord, SubscriptionStatus},
	store::{ShareWriteOutcome, StoreError},
};

/// Serializable flat form of [`Tables`]; indices are rebuilt on load.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
	calendars: Vec<Calendar>,
	shares: Vec<ShareRecord>,
	tokens: Vec<AccessTokenRecord>,
	subscriptions: Vec<SubscriptionRecord>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Tables {
	calendars: HashMap<CalendarId, Calendar>,
	shares: HashMap<ShareId, ShareRecord>,
	share_pairs: HashMap<(CalendarId, UserId), ShareId>,
	tokens: HashMap<TokenId, AccessTokenRecord>,
	token_digests: HashMap<SecretDigest, TokenId>,
	subscriptions: HashMap<(UserId, CalendarId), SubscriptionRecord>,
}
impl Tables {
	pub(crate) fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
		let mut tables = Self::default();

		for calendar in snapshot.calendars {
			tables.insert_calendar(calendar)?;
		}
		for share in snapshot.shares {
			let pair = (share.calendar_id.clone(), share.user_id.clone());

			if tables.share_pairs.insert(pair, share.id.clone()).is_some() {
				return Err(StoreError::Conflict {
					message: format!(
						"duplicate share for {} on {}",
						share.user_id, share.calendar_id
					),
				});
			}

			tables.shares.insert(share.id.clone(), share);
		}
		for token in snapshot.tokens {
			tables.insert_token(token)?;
		}
		for subscription in snapshot.subscriptions {
			tables.upsert_subscription(subscription);
		}

		Ok(tables)
	}

	pub(crate) fn snapshot(&self) -> Snapshot {
		Snapshot {
			calendars: self.calendars.values().cloned().collect(),
			shares: self.shares.values().cloned().collect(),
			tokens: self.tokens.values().cloned().collect(),
			subscriptions: self.subscriptions.values().cloned().collect(),
		}
	}

	pub(crate) fn insert_calendar(&mut self, calendar: Calendar) -> Result<(), StoreError> {
		if self.calendars.contains_key(&calendar.id) {
			return Err(StoreError::Conflict {
				message: format!("calendar {} exists", calendar.id),
			});
		}

		self.calendars.insert(calendar.id.clone(), calendar);

		Ok(())
	}

	pub(crate) fn fetch_calendar(&self, id: &CalendarId) -> Option<Calendar> {
		self.calendars.get(id).cloned()
	}

	pub(crate) fn set_guest_permission(
		&mut self,
		id: &CalendarId,
		policy: GuestPermission,
	) -> Option<Calendar> {
		let calendar = self.calendars.get_mut(id)?;

		calendar.guest_permission = policy;

		Some(calendar.clone())
	}

	pub(crate) fn transfer_ownership(
		&mut self,
		id: &CalendarId,
		new_owner: &UserId,
	) -> Option<Calendar> {
		let calendar = self.calendars.get_mut(id)?;

		calendar.owner = Some(new_owner.clone());

		let updated = calendar.clone();

		if let Some(share_id) = self.share_pairs.remove(&(id.clone(), new_owner.clone())) {
			self.shares.remove(&share_id);
		}

		Some(updated)
	}

	pub(crate) fn orphan_calendars(&mut self, owner: &UserId) -> Vec<CalendarId> {
		let mut orphaned = Vec::new();

		for calendar in self.calendars.values_mut().filter(|c| c.is_owned_by(owner)) {
			calendar.owner = None;
			orphaned.push(calendar.id.clone());
		}

		orphaned.sort();

		orphaned
	}

	pub(crate) fn delete_calendar(&mut self, id: &CalendarId) -> Option<Calendar> {
		let calendar = self.calendars.remove(id)?;

		self.shares.retain(|_, share| &share.calendar_id != id);
		self.share_pairs.retain(|(calendar_id, _), _| calendar_id != id);
		self.tokens.retain(|_, token| &token.calendar_id != id);
		self.token_digests.retain(|_, token_id| self.tokens.contains_key(token_id));
		self.subscriptions.retain(|(_, calendar_id), _| calendar_id != id);

		Some(calendar)
	}

	pub(crate) fn fetch_share(
		&self,
		calendar_id: &CalendarId,
		user_id: &UserId,
	) -> Option<ShareRecord> {
		self.share_pairs
			.get(&(calendar_id.clone(), user_id.clone()))
			.and_then(|id| self.shares.get(id))
			.cloned()
	}

	pub(crate) fn fetch_share_by_id(&self, id: &ShareId) -> Option<ShareRecord> {
		self.shares.get(id).cloned()
	}

	pub(crate) fn list_shares(&self, calendar_id: &CalendarId) -> Vec<ShareRecord> {
		let mut shares: Vec<_> =
			self.shares.values().filter(|s| &s.calendar_id == calendar_id).cloned().collect();

		shares.sort_by(|a, b| {
			a.created_at.cmp(&b.created_at).then_with(|| a.user_id.cmp(&b.user_id))
		});

		shares
	}

	pub(crate) fn upsert_share(
		&mut self,
		grant: ShareGrant,
		expected: Option<PermissionLevel>,
	) -> ShareWriteOutcome {
		let pair = (grant.calendar_id.clone(), grant.user_id.clone());
		let existing = self.share_pairs.get(&pair).and_then(|id| self.shares.get_mut(id));
		let current = existing.as_ref().map(|share| share.permission);

		if current != expected {
			return ShareWriteOutcome::Mismatch { current };
		}

		match existing {
			Some(share) => {
				let previous = share.permission;

				grant.apply_to(share);

				ShareWriteOutcome::Updated { previous, share: share.clone() }
			},
			None => {
				let share = grant.into_record();

				self.share_pairs.insert(pair, share.id.clone());
				self.shares.insert(share.id.clone(), share.clone());

				ShareWriteOutcome::Created(share)
			},
		}
	}

	pub(crate) fn delete_share(&mut self, id: &ShareId) -> Option<ShareRecord> {
		let share = self.shares.remove(id)?;

		self.share_pairs.remove(&(share.calendar_id.clone(), share.user_id.clone()));

		Some(share)
	}

	pub(crate) fn delete_user_shares(&mut self, user_id: &UserId) -> Vec<ShareRecord> {
		let ids: Vec<_> = self
			.shares
			.values()
			.filter(|share| &share.user_id == user_id)
			.map(|share| share.id.clone())
			.collect();

		ids.iter().filter_map(|id| self.delete_share(id)).collect()
	}

	pub(crate) fn insert_token(&mut self, record: AccessTokenRecord) -> Result<(), StoreError> {
		if self.tokens.contains_key(&record.id) {
			return Err(StoreError::Conflict { message: format!("token {} exists", record.id) });
		}
		if self.token_digests.contains_key(&record.digest) {
			return Err(StoreError::Conflict { message: "token digest already indexed".into() });
		}

		self.token_digests.insert(record.digest.clone(), record.id.clone());
		self.tokens.insert(record.id.clone(), record);

		Ok(())
	}

	pub(crate) fn fetch_token(&self, id: &TokenId) -> Option<AccessTokenRecord> {
		self.tokens.get(id).cloned()
	}

	pub(crate) fn find_token_by_digest(&self, digest: &SecretDigest) -> Option<AccessTokenRecord> {
		self.token_digests.get(digest).and_then(|id| self.tokens.get(id)).cloned()
	}

	pub(crate) fn list_tokens(&self, calendar_id: &CalendarId) -> Vec<AccessTokenRecord> {
		let mut tokens: Vec<_> =
			self.tokens.values().filter(|t| &t.calendar_id == calendar_id).cloned().collect();

		tokens.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

		tokens
	}

	pub(crate) fn set_token_active(
		&mut self,
		id: &TokenId,
		active: bool,
	) -> Option<AccessTokenRecord> {
		let token = self.tokens.get_mut(id)?;

		token.is_active = active;

		Some(token.clone())
	}

	pub(crate) fn record_token_usage(
		&mut self,
		id: &TokenId,
		at: OffsetDateTime,
	) -> Option<AccessTokenRecord> {
		let token = self.tokens.get_mut(id)?;

		token.record_usage(at);

		Some(token.clone())
	}

	pub(crate) fn delete_token(&mut self, id: &TokenId) -> Option<AccessTokenRecord> {
		let token = self.tokens.remove(id)?;

		self.token_digests.remove(&token.digest);

		Some(token)
	}

	pub(crate) fn upsert_subscription(&mut self, record: SubscriptionRecord) {
		self.subscriptions.insert((record.user_id.clone(), record.calendar_id.clone()), record);
	}

	pub(crate) fn insert_subscription_if_absent(&mut self, record: SubscriptionRecord) -> bool {
		let key = (record.user_id.clone(), record.calendar_id.clone());

		if self.subscriptions.contains_key(&key) {
			return false;
		}

		self.subscriptions.insert(key, record);

		true
	}

	pub(crate) fn fetch_subscription(
		&self,
		user_id: &UserId,
		calendar_id: &CalendarId,
	) -> Option<SubscriptionRecord> {
		self.subscriptions.get(&(user_id.clone(), calendar_id.clone())).cloned()
	}

	pub(crate) fn list_subscriptions(&self, user_id: &UserId) -> Vec<SubscriptionRecord> {
		let mut subscriptions: Vec<_> =
			self.subscriptions.values().filter(|s| &s.user_id == user_id).cloned().collect();

		subscriptions.sort_by(|a, b| a.calendar_id.cmp(&b.calendar_id));

		subscriptions
	}

	pub(crate) fn set_subscription_status(
		&mut self,
		user_id: &UserId,
		calendar_id: &CalendarId,
		status: SubscriptionStatus,
		at: OffsetDateTime,
	) -> Option<SubscriptionRecord> {
		let record = self.subscriptions.get_mut(&(user_id.clone(), calendar_id.clone()))?;

		record.status = status;
		record.updated_at = at;

		Some(record.clone())
	}

	pub(crate) fn delete_user_subscriptions(&mut self, user_id: &UserId) -> usize {
		let before = self.subscriptions.len();

		self.subscriptions.retain(|(owner, _), _| owner != user_id);

		before - self.subscriptions.len()
	}
}
