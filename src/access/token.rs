//! Bearer-token lifecycle: issue, validate, deactivate, revoke, and list link tokens.
//!
//! The store only ever sees a token's SHA-256 digest and a short preview. The full secret lives in
//! the [`IssuedToken`] handed back from [`AccessControl::issue_token`] and nowhere else, so it
//! cannot be shown twice.

// self
use crate::{
	_prelude::*,
	access::{AccessControl, common},
	auth::{
		AccessTokenRecord, Actor, CalendarId, IssuedToken, PermissionLevel, SecretDigest,
		TokenGrant, TokenId, TokenPermission, TokenRecordBuilderError, TokenSecret, TokenSummary,
		UserId,
	},
	error::ConfigError,
	ext::{ActionKind, AuditAction},
	model::{SubscriptionRecord, SubscriptionSource},
	obs::{self, OperationKind},
};

/// Issuance parameters for [`AccessControl::issue_token`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRequest {
	/// Access granted to bearers.
	pub permission: TokenPermission,
	/// Optional human label.
	pub name: Option<String>,
	/// Exclusive expiry; must lie strictly after issuance.
	pub expires_at: Option<OffsetDateTime>,
}
impl TokenRequest {
	/// Request for a non-expiring, unnamed token.
	pub fn new(permission: TokenPermission) -> Self {
		Self { permission, name: None, expires_at: None }
	}

	/// Sets the display label.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());

		self
	}

	/// Sets the expiry instant.
	pub fn with_expiry(mut self, expires_at: OffsetDateTime) -> Self {
		self.expires_at = Some(expires_at);

		self
	}
}

impl AccessControl {
	/// Issues a bearer token for the calendar. Requires `admin`.
	pub async fn issue_token(
		&self,
		actor: &Actor,
		calendar_id: &CalendarId,
		request: TokenRequest,
	) -> Result<IssuedToken> {
		obs::observe(OperationKind::IssueToken, "issue_token", async move {
			let now = OffsetDateTime::now_utc();
			let (calendar, actual) =
				self.require(actor, calendar_id, PermissionLevel::Admin).await?;
			let creator = common::acting_user(actor, PermissionLevel::Admin, actual)?.clone();

			if request.expires_at.is_some_and(|expires_at| expires_at <= now) {
				return Err(Error::InvalidExpiration);
			}

			self.throttle(actor, ActionKind::TokenCreation, &calendar.id).await?;

			let secret = TokenSecret::generate(self.config.secret_bytes);
			let mut builder =
				AccessTokenRecord::builder(calendar.id.clone(), creator, request.permission)
					.secret(&secret, self.config.preview_len)
					.created_at(now);

			if let Some(name) = request.name {
				builder = builder.name(name);
			}
			if let Some(expires_at) = request.expires_at {
				builder = builder.expires_at(expires_at);
			}

			let record = builder.build().map_err(map_token_builder_error)?;

			self.store.insert_token(record.clone()).await?;
			self.audit(
				now,
				actor,
				&record.calendar_id,
				AuditAction::TokenIssued {
					token_id: record.id.clone(),
					permission: record.permission,
					expires_at: record.expires_at,
				},
			)
			.await;

			Ok(IssuedToken::new(&record, secret))
		})
		.await
	}

	/// Validates a presented secret against the clock.
	pub async fn validate_token(&self, secret: &str) -> Result<TokenGrant> {
		self.validate_token_at(secret, OffsetDateTime::now_utc()).await
	}

	/// Validates a presented secret as of `now`.
	///
	/// Unknown, deactivated, and expired secrets all yield [`Error::InvalidToken`]. A successful
	/// validation bumps the usage counters; failing to store them never fails the call.
	pub async fn validate_token_at(&self, secret: &str, now: OffsetDateTime) -> Result<TokenGrant> {
		obs::observe(OperationKind::ValidateToken, "validate_token", async move {
			self.grant_for(secret, now).await
		})
		.await
	}

	/// Validates a secret for a signed-in user and records the calendar in their list on first
	/// access.
	pub async fn redeem_token(&self, user: &UserId, secret: &str) -> Result<TokenGrant> {
		obs::observe(OperationKind::ValidateToken, "redeem_token", async move {
			let now = OffsetDateTime::now_utc();
			let grant = self.grant_for(secret, now).await?;

			self.store
				.insert_subscription_if_absent(SubscriptionRecord::subscribed(
					user.clone(),
					grant.calendar_id.clone(),
					SubscriptionSource::Token,
					now,
				))
				.await?;

			Ok(grant)
		})
		.await
	}

	/// Permanently deletes a token. Requires `admin` on the token's calendar.
	pub async fn revoke_token(&self, actor: &Actor, token_id: &TokenId) -> Result<()> {
		obs::observe(OperationKind::RevokeToken, "revoke_token", async move {
			let now = OffsetDateTime::now_utc();
			let record = self.load_token(token_id).await?;

			self.require(actor, &record.calendar_id, PermissionLevel::Admin).await?;
			self.store
				.delete_token(token_id)
				.await?
				.ok_or_else(|| Error::not_found("Token", token_id))?;
			self.audit(
				now,
				actor,
				&record.calendar_id,
				AuditAction::TokenRevoked { token_id: record.id.clone() },
			)
			.await;

			Ok(())
		})
		.await
	}

	/// Flips a token's kill-switch. Requires `admin` on the token's calendar.
	pub async fn set_token_active(
		&self,
		actor: &Actor,
		token_id: &TokenId,
		active: bool,
	) -> Result<TokenSummary> {
		obs::observe(OperationKind::SetTokenActive, "set_token_active", async move {
			let now = OffsetDateTime::now_utc();
			let record = self.load_token(token_id).await?;

			self.require(actor, &record.calendar_id, PermissionLevel::Admin).await?;

			let updated = self
				.store
				.set_token_active(token_id, active)
				.await?
				.ok_or_else(|| Error::not_found("Token", token_id))?;

			if record.is_active != active {
				self.audit(
					now,
					actor,
					&updated.calendar_id,
					AuditAction::TokenActivationChanged { token_id: updated.id.clone(), active },
				)
				.await;
			}

			Ok(TokenSummary::from(&updated))
		})
		.await
	}

	/// Lists the calendar's tokens by preview. Requires `admin`.
	pub async fn list_tokens(
		&self,
		actor: &Actor,
		calendar_id: &CalendarId,
	) -> Result<Vec<TokenSummary>> {
		obs::observe(OperationKind::ListTokens, "list_tokens", async move {
			self.require(actor, calendar_id, PermissionLevel::Admin).await?;

			let records = self.store.list_tokens(calendar_id).await?;

			Ok(records.iter().map(TokenSummary::from).collect())
		})
		.await
	}

	/// Looks a secret up by digest and keeps it only when it authorizes access at `now`.
	pub(crate) async fn usable_token(
		&self,
		secret: &str,
		now: OffsetDateTime,
	) -> Result<Option<AccessTokenRecord>> {
		let digest = SecretDigest::of(secret);
		let record = self.store.find_token_by_digest(&digest).await?;

		Ok(record.filter(|record| record.is_usable_at(now)))
	}

	/// Best-effort usage telemetry.
	pub(crate) async fn record_usage(&self, token_id: &TokenId, now: OffsetDateTime) {
		if let Err(e) = self.store.record_token_usage(token_id, now).await {
			obs::record_usage_failure(token_id, &e);
		}
	}

	async fn grant_for(&self, secret: &str, now: OffsetDateTime) -> Result<TokenGrant> {
		let record = self.usable_token(secret, now).await?.ok_or(Error::InvalidToken)?;

		self.record_usage(&record.id, now).await;

		Ok(TokenGrant::from(&record))
	}

	async fn load_token(&self, token_id: &TokenId) -> Result<AccessTokenRecord> {
		self.store.fetch_token(token_id).await?.ok_or_else(|| Error::not_found("Token", token_id))
	}
}

fn map_token_builder_error(err: TokenRecordBuilderError) -> Error {
	match err {
		TokenRecordBuilderError::ExpiryNotInFuture { .. } => Error::InvalidExpiration,
		other => ConfigError::from(other).into(),
	}
}
