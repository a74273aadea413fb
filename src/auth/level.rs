//! Ordered permission levels and the narrower level sets used by guest policies and tokens.

// self
use crate::_prelude::*;

/// Error returned when a level label cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown {kind} level: {value}.")]
pub struct LevelParseError {
	/// Which level family was being parsed.
	pub kind: &'static str,
	/// The rejected label.
	pub value: String,
}

/// Effective permission an actor holds on a calendar.
///
/// Variants are declared in ascending order so the derived [`Ord`] gives the total order
/// `none < read < write < admin < owner`; combining grant sources is a plain `max`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
	/// No access; the calendar is invisible to the actor.
	#[default]
	None,
	/// May view the calendar.
	Read,
	/// May edit calendar content.
	Write,
	/// May manage non-admin shares, tokens, and calendar settings.
	Admin,
	/// Structural owner of the calendar.
	Owner,
}
impl PermissionLevel {
	/// Returns `true` when `self` grants at least `required`.
	pub fn at_least(self, required: Self) -> bool {
		self >= required
	}

	/// Returns a stable lowercase label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Read => "read",
			Self::Write => "write",
			Self::Admin => "admin",
			Self::Owner => "owner",
		}
	}
}
impl Display for PermissionLevel {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for PermissionLevel {
	type Err = LevelParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"none" => Ok(Self::None),
			"read" => Ok(Self::Read),
			"write" => Ok(Self::Write),
			"admin" => Ok(Self::Admin),
			"owner" => Ok(Self::Owner),
			_ => Err(LevelParseError { kind: "permission", value: s.to_owned() }),
		}
	}
}

/// Calendar-wide default applied to every caller without a more specific grant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestPermission {
	/// Guests see nothing.
	#[default]
	None,
	/// Guests may view.
	Read,
	/// Guests may edit.
	Write,
}
impl GuestPermission {
	/// Contribution to resolution, `None` when the policy grants nothing.
	pub fn grant(self) -> Option<PermissionLevel> {
		match self {
			Self::None => None,
			Self::Read => Some(PermissionLevel::Read),
			Self::Write => Some(PermissionLevel::Write),
		}
	}

	/// Returns a stable lowercase label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Read => "read",
			Self::Write => "write",
		}
	}
}
impl Display for GuestPermission {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for GuestPermission {
	type Err = LevelParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"none" => Ok(Self::None),
			"read" => Ok(Self::Read),
			"write" => Ok(Self::Write),
			_ => Err(LevelParseError { kind: "guest", value: s.to_owned() }),
		}
	}
}

/// Permission carried by a bearer access token; tokens never reach `admin` or `owner`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPermission {
	/// Read-only link.
	Read,
	/// Editing link.
	Write,
}
impl TokenPermission {
	/// Equivalent permission level.
	pub fn level(self) -> PermissionLevel {
		match self {
			Self::Read => PermissionLevel::Read,
			Self::Write => PermissionLevel::Write,
		}
	}

	/// Returns a stable lowercase label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Read => "read",
			Self::Write => "write",
		}
	}
}
impl Display for TokenPermission {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for TokenPermission {
	type Err = LevelParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"read" => Ok(Self::Read),
			"write" => Ok(Self::Write),
			_ => Err(LevelParseError { kind: "token", value: s.to_owned() }),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn levels_are_totally_ordered() {
		use PermissionLevel::*;

		let ladder = [None, Read, Write, Admin, Owner];

		for window in ladder.windows(2) {
			assert!(window[0] < window[1]);
		}

		assert!(Owner.at_least(Admin));
		assert!(Write.at_least(Write));
		assert!(!Read.at_least(Write));
		assert_eq!([Read, Owner, None].into_iter().max(), Some(Owner));
	}

	#[test]
	fn guest_none_contributes_nothing() {
		assert_eq!(GuestPermission::None.grant(), Option::None);
		assert_eq!(GuestPermission::Write.grant(), Some(PermissionLevel::Write));
	}

	#[test]
	fn labels_parse_and_serialize_lowercase() {
		assert_eq!("admin".parse::<PermissionLevel>(), Ok(PermissionLevel::Admin));
		assert!("admin".parse::<TokenPermission>().is_err());
		assert!("Owner".parse::<PermissionLevel>().is_err());
		assert_eq!(
			serde_json::to_string(&GuestPermission::Read).expect("Guest level should serialize."),
			"\"read\""
		);
	}
}
