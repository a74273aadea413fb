//! Tunables for the access core: per-action rate limits and token secret shape.

// self
use crate::{_prelude::*, error::ConfigError, ext::ActionKind};

/// Top-level configuration consumed by [`AccessControl`](crate::access::AccessControl).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
	/// Per-action fixed-window limits.
	pub rate_limits: RateLimits,
	/// Random bytes per token secret.
	pub secret_bytes: usize,
	/// Characters of the secret kept as a display preview.
	pub preview_len: usize,
	/// Compare-and-swap attempts for a share write before giving up.
	pub share_cas_retries: u8,
}
impl AccessConfig {
	/// Smallest accepted secret size.
	pub const MIN_SECRET_BYTES: usize = 16;
	/// Smallest accepted preview length.
	pub const MIN_PREVIEW_LEN: usize = 4;
	/// Largest accepted preview length.
	pub const MAX_PREVIEW_LEN: usize = 16;

	/// Parses a JSON document and validates the result.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::Parse { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Rejects weak secrets, odd preview lengths, and unusable rate-limit rules.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.secret_bytes < Self::MIN_SECRET_BYTES {
			return Err(ConfigError::WeakSecret {
				min: Self::MIN_SECRET_BYTES,
				actual: self.secret_bytes,
			});
		}
		if !(Self::MIN_PREVIEW_LEN..=Self::MAX_PREVIEW_LEN).contains(&self.preview_len) {
			return Err(ConfigError::PreviewLength {
				min: Self::MIN_PREVIEW_LEN,
				max: Self::MAX_PREVIEW_LEN,
				actual: self.preview_len,
			});
		}

		self.rate_limits.validate()
	}
}
impl Default for AccessConfig {
	fn default() -> Self {
		Self {
			rate_limits: RateLimits::default(),
			secret_bytes: 32,
			preview_len: 8,
			share_cas_retries: 3,
		}
	}
}

/// Limits per [`ActionKind`]; `None` disables throttling for that action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimits {
	/// Token issuance, per calendar.
	pub token_creation: Option<RateLimitRule>,
	/// Share mutations, per calendar.
	pub share_mutation: Option<RateLimitRule>,
	/// Calendar creation, per actor.
	pub calendar_creation: Option<RateLimitRule>,
	/// Bulk exports, per calendar.
	pub bulk_export: Option<RateLimitRule>,
}
impl RateLimits {
	/// Rule applied to `action`, if any.
	pub fn rule(&self, action: ActionKind) -> Option<RateLimitRule> {
		match action {
			ActionKind::TokenCreation => self.token_creation,
			ActionKind::ShareMutation => self.share_mutation,
			ActionKind::CalendarCreation => self.calendar_creation,
			ActionKind::BulkExport => self.bulk_export,
		}
	}

	fn validate(&self) -> Result<(), ConfigError> {
		for action in [
			ActionKind::TokenCreation,
			ActionKind::ShareMutation,
			ActionKind::CalendarCreation,
			ActionKind::BulkExport,
		] {
			let unusable = self.rule(action).is_some_and(|rule| {
				rule.max_requests == 0
					|| !(1..=RateLimitRule::MAX_WINDOW_SECS).contains(&rule.window_secs)
			});

			if unusable {
				return Err(ConfigError::InvalidRateLimit { action: action.as_str() });
			}
		}

		Ok(())
	}
}
impl Default for RateLimits {
	fn default() -> Self {
		Self {
			token_creation: Some(RateLimitRule::per_hour(10)),
			share_mutation: Some(RateLimitRule::per_hour(60)),
			calendar_creation: Some(RateLimitRule::per_hour(20)),
			bulk_export: Some(RateLimitRule::per_hour(30)),
		}
	}
}

/// `max_requests` per fixed window of `window_secs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
	/// Requests admitted per window.
	pub max_requests: u32,
	/// Window length in seconds.
	pub window_secs: u64,
}
impl RateLimitRule {
	/// Longest accepted window: one leap year.
	pub const MAX_WINDOW_SECS: u64 = 366 * 24 * 3_600;

	/// Hourly rule.
	pub const fn per_hour(max_requests: u32) -> Self {
		Self { max_requests, window_secs: 3_600 }
	}

	/// Window length as a [`Duration`].
	pub fn window(&self) -> Duration {
		Duration::seconds(i64::try_from(self.window_secs).unwrap_or(i64::MAX))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_documented_values() {
		let config = AccessConfig::default();

		assert_eq!(config.secret_bytes, 32);
		assert_eq!(config.preview_len, 8);
		let limits = &config.rate_limits;

		assert_eq!(limits.rule(ActionKind::TokenCreation), Some(RateLimitRule::per_hour(10)));
		assert_eq!(limits.rule(ActionKind::BulkExport), Some(RateLimitRule::per_hour(30)));
		assert!(config.validate().is_ok());
	}

	#[test]
	fn partial_documents_fill_in_defaults() {
		let config = AccessConfig::from_json_str(
			r#"{"preview_len": 6, "rate_limits": {"bulk_export": null}}"#,
		)
		.expect("Partial configuration should parse.");

		assert_eq!(config.preview_len, 6);
		assert_eq!(config.rate_limits.bulk_export, None);
		assert_eq!(config.rate_limits.share_mutation, Some(RateLimitRule::per_hour(60)));
	}

	#[test]
	fn parse_errors_report_the_offending_path() {
		let err = AccessConfig::from_json_str(
			r#"{"rate_limits": {"token_creation": {"max_requests": "ten", "window_secs": 60}}}"#,
		)
		.expect_err("String counts must be rejected.");
		let ConfigError::Parse { source } = err else {
			panic!("Expected a parse error, got {err:?}.");
		};

		assert_eq!(source.path().to_string(), "rate_limits.token_creation.max_requests");
	}

	#[test]
	fn validation_rejects_unsafe_values() {
		assert!(matches!(
			AccessConfig::from_json_str(r#"{"secret_bytes": 8}"#),
			Err(ConfigError::WeakSecret { min: 16, actual: 8 })
		));
		assert!(matches!(
			AccessConfig::from_json_str(r#"{"preview_len": 32}"#),
			Err(ConfigError::PreviewLength { actual: 32, .. })
		));
		assert!(matches!(
			AccessConfig::from_json_str(
				r#"{"rate_limits": {"share_mutation": {"max_requests": 0, "window_secs": 60}}}"#
			),
			Err(ConfigError::InvalidRateLimit { action: "share-mutation" })
		));
	}

	#[test]
	fn windows_longer_than_a_year_are_rejected() {
		let longest =
			RateLimitRule { max_requests: 1, window_secs: RateLimitRule::MAX_WINDOW_SECS };
		let limits = RateLimits { bulk_export: Some(longest), ..RateLimits::default() };

		assert!(AccessConfig { rate_limits: limits, ..AccessConfig::default() }.validate().is_ok());
		assert!(matches!(
			AccessConfig::from_json_str(
				r#"{"rate_limits":{"bulk_export":{"max_requests":5,"window_secs":1000000000000000}}}"#
			),
			Err(ConfigError::InvalidRateLimit { action: "bulk-export" })
		));
	}
}
