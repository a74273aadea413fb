//! Access-core error types shared by the resolver, registries, and stores.

// self
use crate::{_prelude::*, auth::PermissionLevel, ext::RetryDirective};

/// Access-core result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
///
/// Every variant except [`Error::Unavailable`] and [`Error::Config`] is a policy rejection the
/// caller can recover from by retrying with other credentials, waiting, or requesting access.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure; the decision could not be made.
	#[error("Access data is unavailable: {0}")]
	Unavailable(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The actor's own resolved level is too low for the mutation.
	#[error("Requires {required} permission, actor holds {actual}.")]
	InsufficientPermission {
		/// Level the operation needs.
		required: PermissionLevel,
		/// Level the actor resolved to.
		actual: PermissionLevel,
	},
	/// The calendar, share, token, or subscription does not exist (or not on the stated calendar).
	#[error("{entity} `{id}` was not found.")]
	NotFound {
		/// Kind of entity.
		entity: &'static str,
		/// Identifier that was looked up.
		id: String,
	},
	/// The level cannot be held through a share.
	#[error("Level {0} cannot be granted through a share.")]
	InvalidShareLevel(PermissionLevel),
	/// The target user already holds a share on the calendar.
	#[error("User already holds a share on this calendar.")]
	DuplicateShare,
	/// The requested expiry is not strictly in the future.
	#[error("Token expiry must be in the future.")]
	InvalidExpiration,
	/// The action exceeded its rate-limit window.
	#[error("Rate limit exceeded; retry after {}s.", .0.retry_after_secs())]
	RateLimited(RetryDirective),
	/// The presented secret is unknown, inactive, or expired.
	#[error("Access token is invalid.")]
	InvalidToken,
}
impl Error {
	/// Returns `true` for "you may not" outcomes, `false` for "we could not check".
	pub fn is_policy_rejection(&self) -> bool {
		!matches!(self, Self::Unavailable(_) | Self::Config(_))
	}

	pub(crate) fn insufficient(required: PermissionLevel, actual: PermissionLevel) -> Self {
		Self::InsufficientPermission { required, actual }
	}

	pub(crate) fn not_found(entity: &'static str, id: impl Display) -> Self {
		Self::NotFound { entity, id: id.to_string() }
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration document could not be parsed.
	#[error("Access configuration is malformed.")]
	Parse {
		/// Structured parsing failure, including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Secrets would fall below the minimum entropy.
	#[error("Token secrets need at least {min} random bytes, got {actual}.")]
	WeakSecret {
		/// Minimum accepted byte count.
		min: usize,
		/// Configured byte count.
		actual: usize,
	},
	/// Preview length is outside the accepted range.
	#[error("Token preview length must be within {min}..={max}, got {actual}.")]
	PreviewLength {
		/// Smallest accepted length.
		min: usize,
		/// Largest accepted length.
		max: usize,
		/// Configured length.
		actual: usize,
	},
	/// A rate-limit rule can never admit a request or has no window.
	#[error("Rate-limit rule for {action} must allow at least one request per non-empty window.")]
	InvalidRateLimit {
		/// Action label the rule belongs to.
		action: &'static str,
	},
	/// Token record construction failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::auth::TokenRecordBuilderError),
}
