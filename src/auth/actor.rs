//! Caller identity as seen by the access core.

// self
use crate::{_prelude::*, auth::UserId};

/// Already-authenticated caller, or an anonymous guest.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Actor {
	/// Authenticated account.
	User(UserId),
	/// Caller without an identity.
	Guest,
}
impl Actor {
	/// Authenticated user id, if any.
	pub fn user_id(&self) -> Option<&UserId> {
		match self {
			Self::User(id) => Some(id),
			Self::Guest => None,
		}
	}
}
impl From<UserId> for Actor {
	fn from(value: UserId) -> Self {
		Self::User(value)
	}
}
impl Display for Actor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::User(id) => write!(f, "user:{id}"),
			Self::Guest => f.write_str("guest"),
		}
	}
}
