//! Per-user share grants.

// self
use crate::{
	_prelude::*,
	auth::{CalendarId, PermissionLevel, ShareId, UserId},
};

/// Grant of a permission level to one user on one calendar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
	/// Share identifier.
	pub id: ShareId,
	/// Calendar the share applies to.
	pub calendar_id: CalendarId,
	/// Grantee.
	pub user_id: UserId,
	/// Granted level.
	pub permission: PermissionLevel,
	/// Account that last granted or changed the level.
	pub granted_by: UserId,
	/// Creation instant.
	pub created_at: OffsetDateTime,
	/// Last level change.
	pub updated_at: OffsetDateTime,
}
impl ShareRecord {
	/// Level this share contributes to resolution.
	///
	/// Ownership is structural, so a stored `owner` share resolves as `admin`.
	pub fn effective_level(&self) -> PermissionLevel {
		self.permission.min(PermissionLevel::Admin)
	}

	/// Returns `true` when changing or removing this share needs the calendar owner.
	pub fn is_privileged(&self) -> bool {
		self.permission.at_least(PermissionLevel::Admin)
	}
}

/// Write request handed to the store's upsert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareGrant {
	/// Calendar the share applies to.
	pub calendar_id: CalendarId,
	/// Grantee.
	pub user_id: UserId,
	/// Requested level.
	pub permission: PermissionLevel,
	/// Acting account.
	pub granted_by: UserId,
	/// Instant of the write.
	pub at: OffsetDateTime,
}
impl ShareGrant {
	/// Builds a fresh record for the first grant on a (calendar, user) pair.
	pub fn into_record(self) -> ShareRecord {
		ShareRecord {
			id: ShareId::generate(),
			calendar_id: self.calendar_id,
			user_id: self.user_id,
			permission: self.permission,
			granted_by: self.granted_by,
			created_at: self.at,
			updated_at: self.at,
		}
	}

	/// Applies the grant to an existing record, keeping its identity.
	pub fn apply_to(self, record: &mut ShareRecord) {
		record.permission = self.permission;
		record.granted_by = self.granted_by;
		record.updated_at = self.at;
	}
}
