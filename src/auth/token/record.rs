//! Persisted access-token records, lifecycle helpers, and builders.

// self
use crate::{
	_prelude::*,
	auth::{
		CalendarId, TokenId, TokenPermission, UserId,
		token::secret::{SecretDigest, TokenSecret},
	},
};

/// Current lifecycle status for a token record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token authorizes access.
	Active,
	/// Token was switched off via the kill-switch; reversible.
	Inactive,
	/// Token reached its expiry instant.
	Expired,
}

/// Errors produced by [`AccessTokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no secret was attached.
	#[error("Token secret is required.")]
	MissingSecret,
	/// Issued when the expiry is not strictly after the creation instant.
	#[error("Token expiry must be after its creation instant.")]
	ExpiryNotInFuture {
		/// Requested expiry.
		expires_at: OffsetDateTime,
		/// Creation instant the expiry was compared against.
		created_at: OffsetDateTime,
	},
}

/// Stored view of a bearer token; the secret itself is never part of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenRecord {
	/// Record identifier.
	pub id: TokenId,
	/// Calendar the token grants access to.
	pub calendar_id: CalendarId,
	/// Digest of the secret; unique across all tokens.
	pub digest: SecretDigest,
	/// Fixed-length prefix of the secret for identification.
	pub preview: String,
	/// Optional human label.
	pub name: Option<String>,
	/// Permission granted to bearers.
	pub permission: TokenPermission,
	/// Exclusive expiry instant; `None` never expires.
	pub expires_at: Option<OffsetDateTime>,
	/// Account that issued the token.
	pub created_by: UserId,
	/// Issuance instant.
	pub created_at: OffsetDateTime,
	/// Last successful validation.
	pub last_used_at: Option<OffsetDateTime>,
	/// Number of successful validations.
	pub usage_count: u64,
	/// Kill-switch; `false` blocks all access.
	pub is_active: bool,
}
impl AccessTokenRecord {
	/// Returns a builder for a new record.
	pub fn builder(
		calendar_id: CalendarId,
		created_by: UserId,
		permission: TokenPermission,
	) -> AccessTokenRecordBuilder {
		AccessTokenRecordBuilder::new(calendar_id, created_by, permission)
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if !self.is_active {
			return TokenStatus::Inactive;
		}
		if self.expires_at.is_some_and(|expires_at| instant >= expires_at) {
			return TokenStatus::Expired;
		}

		TokenStatus::Active
	}

	/// Returns `true` if the token authorizes access at the provided instant.
	pub fn is_usable_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Active)
	}

	/// Bumps usage telemetry.
	pub fn record_usage(&mut self, instant: OffsetDateTime) {
		self.usage_count = self.usage_count.saturating_add(1);
		self.last_used_at = Some(instant);
	}
}

/// Builder for [`AccessTokenRecord`].
#[derive(Clone, Debug)]
pub struct AccessTokenRecordBuilder {
	calendar_id: CalendarId,
	created_by: UserId,
	permission: TokenPermission,
	secret: Option<(SecretDigest, String)>,
	name: Option<String>,
	created_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
}
impl AccessTokenRecordBuilder {
	fn new(calendar_id: CalendarId, created_by: UserId, permission: TokenPermission) -> Self {
		Self {
			calendar_id,
			created_by,
			permission,
			secret: None,
			name: None,
			created_at: None,
			expires_at: None,
		}
	}

	/// Attaches the secret, keeping only its digest and a `preview_len` prefix.
	pub fn secret(mut self, secret: &TokenSecret, preview_len: usize) -> Self {
		self.secret = Some((secret.digest(), secret.preview(preview_len)));

		self
	}

	/// Sets the display label.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());

		self
	}

	/// Sets the creation instant.
	pub fn created_at(mut self, instant: OffsetDateTime) -> Self {
		self.created_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Consumes the builder and produces an active [`AccessTokenRecord`].
	pub fn build(self) -> Result<AccessTokenRecord, TokenRecordBuilderError> {
		let (digest, preview) = self.secret.ok_or(TokenRecordBuilderError::MissingSecret)?;
		let created_at = self.created_at.unwrap_or_else(OffsetDateTime::now_utc);

		if let Some(expires_at) = self.expires_at.filter(|expires_at| *expires_at <= created_at) {
			return Err(TokenRecordBuilderError::ExpiryNotInFuture { expires_at, created_at });
		}

		Ok(AccessTokenRecord {
			id: TokenId::generate(),
			calendar_id: self.calendar_id,
			digest,
			preview,
			name: self.name,
			permission: self.permission,
			expires_at: self.expires_at,
			created_by: self.created_by,
			created_at,
			last_used_at: None,
			usage_count: 0,
			is_active: true,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn builder() -> AccessTokenRecordBuilder {
		let calendar = CalendarId::new("cal-1").expect("Calendar fixture should be valid.");
		let user = UserId::new("owner-1").expect("User fixture should be valid.");

		AccessTokenRecord::builder(calendar, user, TokenPermission::Write)
			.secret(&TokenSecret::new("0123456789abcdef"), 8)
	}

	#[test]
	fn status_transitions_cover_all_states() {
		let created = macros::datetime!(2025-01-01 00:00 UTC);
		let expires = macros::datetime!(2025-01-01 01:00 UTC);
		let mut record = builder()
			.created_at(created)
			.expires_at(expires)
			.build()
			.expect("Token record builder should succeed for status transitions.");

		assert_eq!(record.status_at(macros::datetime!(2025-01-01 00:30 UTC)), TokenStatus::Active);
		assert_eq!(record.status_at(expires), TokenStatus::Expired);

		record.is_active = false;

		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 00:30 UTC)),
			TokenStatus::Inactive
		);
	}

	#[test]
	fn expiry_boundary_is_exclusive() {
		let created = macros::datetime!(2025-01-01 00:00 UTC);
		let expires = macros::datetime!(2025-01-01 12:00 UTC);
		let record = builder()
			.created_at(created)
			.expires_at(expires)
			.build()
			.expect("Token record fixture should build.");

		assert!(record.is_usable_at(expires - Duration::microseconds(1)));
		assert!(!record.is_usable_at(expires));
		assert!(!record.is_usable_at(expires + Duration::microseconds(1)));
	}

	#[test]
	fn builder_keeps_only_digest_and_preview() {
		let record = builder().build().expect("Non-expiring record should build.");

		assert_eq!(record.preview, "01234567");
		assert_eq!(record.digest, SecretDigest::of("0123456789abcdef"));
		assert_eq!(record.expires_at, None);
		assert_eq!(record.usage_count, 0);
		assert!(record.is_active);

		let serialized = serde_json::to_string(&record).expect("Record should serialize.");

		assert!(!serialized.contains("0123456789abcdef"));
	}

	#[test]
	fn builder_rejects_non_future_expiry() {
		let created = macros::datetime!(2025-01-01 00:00 UTC);
		let err = builder()
			.created_at(created)
			.expires_at(created)
			.build()
			.expect_err("Expiry equal to creation must be rejected.");

		assert!(matches!(err, TokenRecordBuilderError::ExpiryNotInFuture { .. }));

		let calendar = CalendarId::new("cal-1").expect("Calendar fixture should be valid.");
		let user = UserId::new("owner-1").expect("User fixture should be valid.");
		let missing = AccessTokenRecord::builder(calendar, user, TokenPermission::Read).build();

		assert_eq!(missing, Err(TokenRecordBuilderError::MissingSecret));
	}

	#[test]
	fn usage_is_monotonic() {
		let mut record = builder().build().expect("Record fixture should build.");
		let first = macros::datetime!(2025-02-01 00:00 UTC);
		let second = macros::datetime!(2025-02-02 00:00 UTC);

		record.record_usage(first);
		record.record_usage(second);

		assert_eq!(record.usage_count, 2);
		assert_eq!(record.last_used_at, Some(second));
	}
}
