//! Access-control facade: resolution, share grants, token lifecycle, calendar administration, and
//! subscription bookkeeping.

pub mod calendar;
pub mod resolve;
pub mod share;
pub mod subscription;
pub mod token;

mod common;

pub use calendar::*;
pub use resolve::*;
pub use share::*;
pub use token::*;

// self
use crate::{
	_prelude::*,
	config::AccessConfig,
	ext::{AuditEmitter, AuditSink, CounterStore, RateLimiter},
	store::AccessStore,
};

/// Evaluates and mutates calendar access against a single store.
///
/// The facade owns the store, the action throttle, the audit emitter, and the configuration so the
/// individual operations only carry their own policy. Mutating operations accept an [`Actor`] and
/// never a bearer secret, which keeps link tokens out of every administrative decision.
///
/// [`Actor`]: crate::auth::Actor
#[derive(Clone)]
pub struct AccessControl {
	/// Backend holding calendars, shares, tokens, and subscriptions.
	pub store: Arc<dyn AccessStore>,
	limiter: RateLimiter,
	audit: AuditEmitter,
	config: AccessConfig,
}
impl AccessControl {
	/// Creates a facade with default configuration, in-process rate-limit counters, and the default
	/// audit sink.
	pub fn new(store: Arc<dyn AccessStore>) -> Self {
		Self {
			store,
			limiter: RateLimiter::default(),
			audit: AuditEmitter::default(),
			config: AccessConfig::default(),
		}
	}

	/// Validates and applies `config`.
	pub fn with_config(mut self, config: AccessConfig) -> Result<Self> {
		config.validate()?;

		self.limiter = self.limiter.with_limits(config.rate_limits.clone());
		self.config = config;

		Ok(self)
	}

	/// Moves rate-limit counters to a shared backend.
	pub fn with_counter_store(mut self, counters: Arc<dyn CounterStore>) -> Self {
		self.limiter = self.limiter.with_counters(counters);

		self
	}

	/// Routes audit events to `sink`.
	pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
		self.audit = AuditEmitter::new(sink);

		self
	}

	/// Active configuration.
	pub fn config(&self) -> &AccessConfig {
		&self.config
	}

	/// Action throttle shared by every operation of this facade.
	pub fn limiter(&self) -> &RateLimiter {
		&self.limiter
	}
}
impl Debug for AccessControl {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessControl")
			.field("limiter", &self.limiter)
			.field("config", &self.config)
			.finish()
	}
}
