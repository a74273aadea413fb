//! Strongly typed identifiers for users, calendars, shares, and access tokens.

// std
use std::{borrow::Borrow, ops::Deref};
// crates.io
use uuid::Uuid;
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
	($name:ident, $doc:literal, $kind:literal, generated) => {
		def_id! { $name, $doc, $kind }

		impl $name {
			/// Mints a fresh random (UUID v4) identifier.
			pub fn generate() -> Self {
				Self(Uuid::new_v4().to_string())
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (user, calendar, share, token).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (user, calendar, share, token).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (user, calendar, share, token).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { UserId, "Identifier of an authenticated account, issued by the identity layer.", "User" }
def_id! { CalendarId, "Identifier of a shareable calendar.", "Calendar", generated }
def_id! { ShareId, "Identifier of a per-user share grant.", "Share", generated }
def_id! { TokenId, "Identifier of a bearer access token record.", "Token", generated }

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_whitespace_and_empty_values() {
		assert!(UserId::new(" user-1").is_err(), "Leading whitespace must be rejected.");
		assert!(UserId::new("user-1 ").is_err(), "Trailing whitespace must be rejected.");
		assert!(CalendarId::new("").is_err());
		assert!(ShareId::new("with space").is_err());

		let user = UserId::new("user-1").expect("User fixture should be considered valid.");

		assert_eq!(user.as_ref(), "user-1");
		assert_eq!(format!("{user:?}"), "User(user-1)");
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let calendar: CalendarId =
			serde_json::from_str("\"cal-42\"").expect("Calendar should deserialize successfully.");

		assert_eq!(calendar.as_ref(), "cal-42");
		assert!(serde_json::from_str::<CalendarId>("\"with space\"").is_err());
		assert!(serde_json::from_str::<TokenId>("\"\"").is_err());
	}

	#[test]
	fn length_limit_is_inclusive() {
		let exact = "a".repeat(IDENTIFIER_MAX_LEN);

		UserId::new(&exact).expect("Exact length should succeed.");

		let too_long = "a".repeat(IDENTIFIER_MAX_LEN + 1);

		assert!(matches!(
			UserId::new(&too_long),
			Err(IdentifierError::TooLong { kind: "User", max: IDENTIFIER_MAX_LEN })
		));
	}

	#[test]
	fn generated_identifiers_are_unique_and_valid() {
		let a = TokenId::generate();
		let b = TokenId::generate();

		assert_ne!(a, b);
		TokenId::new(a.as_ref()).expect("Generated identifiers should pass validation.");
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<UserId, u8> = HashMap::from_iter([(
			UserId::new("user-123").expect("User used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("user-123"), Some(&7));
	}
}
