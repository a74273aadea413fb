//! Access-relevant calendar metadata.

// self
use crate::{
	_prelude::*,
	auth::{CalendarId, GuestPermission, UserId},
};

/// A shareable scheduling resource, reduced to what access control needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
	/// Calendar identifier.
	pub id: CalendarId,
	/// Display name.
	pub name: String,
	/// Display color.
	pub color: String,
	/// Structural owner; `None` once the owner account is gone.
	pub owner: Option<UserId>,
	/// Default permission for callers without a more specific grant.
	pub guest_permission: GuestPermission,
	/// Creation instant.
	pub created_at: OffsetDateTime,
}
impl Calendar {
	/// Materializes a draft owned by `owner`.
	pub fn from_draft(draft: CalendarDraft, owner: UserId, created_at: OffsetDateTime) -> Self {
		Self {
			id: CalendarId::generate(),
			name: draft.name,
			color: draft.color,
			owner: Some(owner),
			guest_permission: draft.guest_permission,
			created_at,
		}
	}

	/// Returns `true` when no account owns the calendar.
	pub fn is_orphaned(&self) -> bool {
		self.owner.is_none()
	}

	/// Returns `true` when `user` is the current owner.
	pub fn is_owned_by(&self, user: &UserId) -> bool {
		self.owner.as_ref() == Some(user)
	}
}

/// Input for creating a calendar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDraft {
	/// Display name.
	pub name: String,
	/// Display color.
	pub color: String,
	/// Initial guest policy.
	pub guest_permission: GuestPermission,
}
impl CalendarDraft {
	const DEFAULT_COLOR: &str = "#3b82f6";

	/// Creates a private draft with the default color.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			color: Self::DEFAULT_COLOR.into(),
			guest_permission: GuestPermission::None,
		}
	}

	/// Overrides the display color.
	pub fn color(mut self, color: impl Into<String>) -> Self {
		self.color = color.into();

		self
	}

	/// Overrides the initial guest policy.
	pub fn guest_permission(mut self, policy: GuestPermission) -> Self {
		self.guest_permission = policy;

		self
	}
}
