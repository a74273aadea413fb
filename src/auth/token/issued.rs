//! Caller-facing token views: the one-time issuance result, list summaries, and validation grants.

// self
use crate::{
	_prelude::*,
	auth::{
		AccessTokenRecord, CalendarId, PermissionLevel, TokenId, TokenPermission,
		token::secret::TokenSecret,
	},
};

/// Query parameter carrying the secret in distributable links.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Result of a successful issuance.
///
/// This is the only value that ever holds the full secret. It is built in memory from the freshly
/// generated secret and never re-read from storage, so later reads can only produce
/// [`TokenSummary`] values.
pub struct IssuedToken {
	/// Summary of the stored record.
	pub summary: TokenSummary,
	secret: TokenSecret,
}
impl IssuedToken {
	pub(crate) fn new(record: &AccessTokenRecord, secret: TokenSecret) -> Self {
		Self { summary: TokenSummary::from(record), secret }
	}

	/// Token record identifier.
	pub fn id(&self) -> &TokenId {
		&self.summary.id
	}

	/// The full secret; shown to the issuer exactly once.
	pub fn secret(&self) -> &TokenSecret {
		&self.secret
	}

	/// Consumes the result, handing out the secret.
	pub fn into_secret(self) -> TokenSecret {
		self.secret
	}

	/// Builds a distributable link by appending the secret as the `token` query parameter.
	pub fn share_link(&self, base: &Url) -> Url {
		let mut url = base.clone();

		url.query_pairs_mut().append_pair(TOKEN_QUERY_PARAM, self.secret.expose());

		url
	}
}
impl Debug for IssuedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuedToken")
			.field("summary", &self.summary)
			.field("secret", &"<redacted>")
			.finish()
	}
}

/// Listing view of a token; exposes the preview, never the secret.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSummary {
	/// Record identifier.
	pub id: TokenId,
	/// Calendar the token grants access to.
	pub calendar_id: CalendarId,
	/// Fixed-length secret prefix.
	pub token_preview: String,
	/// Optional human label.
	pub name: Option<String>,
	/// Permission granted to bearers.
	pub permission: TokenPermission,
	/// Exclusive expiry instant.
	pub expires_at: Option<OffsetDateTime>,
	/// Number of successful validations.
	pub usage_count: u64,
	/// Last successful validation.
	pub last_used_at: Option<OffsetDateTime>,
	/// Kill-switch state.
	pub is_active: bool,
}
impl From<&AccessTokenRecord> for TokenSummary {
	fn from(record: &AccessTokenRecord) -> Self {
		Self {
			id: record.id.clone(),
			calendar_id: record.calendar_id.clone(),
			token_preview: record.preview.clone(),
			name: record.name.clone(),
			permission: record.permission,
			expires_at: record.expires_at,
			usage_count: record.usage_count,
			last_used_at: record.last_used_at,
			is_active: record.is_active,
		}
	}
}

/// What a valid bearer secret proves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
	/// Token record identifier.
	pub token_id: TokenId,
	/// Calendar the secret is valid for.
	pub calendar_id: CalendarId,
	/// Granted permission.
	pub permission: TokenPermission,
}
impl TokenGrant {
	/// Contribution to resolution for `calendar_id`; foreign calendars contribute nothing.
	pub fn level_for(&self, calendar_id: &CalendarId) -> Option<PermissionLevel> {
		(&self.calendar_id == calendar_id).then(|| self.permission.level())
	}
}
impl From<&AccessTokenRecord> for TokenGrant {
	fn from(record: &AccessTokenRecord) -> Self {
		Self {
			token_id: record.id.clone(),
			calendar_id: record.calendar_id.clone(),
			permission: record.permission,
		}
	}
}
