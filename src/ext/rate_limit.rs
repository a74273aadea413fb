//! Fixed-window action throttle consulted before abuse-prone mutations.
//!
//! Policy lives in [`RateLimiter`]; counters live behind [`CounterStore`] so a single instance can
//! use [`MemoryCounterStore`] while multi-worker deployments plug in a shared, atomically updated
//! backend without touching the policy.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::{
	_prelude::*,
	auth::Actor,
	config::{RateLimitRule, RateLimits},
	store::StoreError,
};

/// Boxed future returned by [`CounterStore::increment`].
pub type CounterFuture<'a> =
	Pin<Box<dyn Future<Output = Result<WindowCount, StoreError>> + 'a + Send>>;

/// Abuse-prone operations subject to throttling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
	/// Issuing bearer tokens, scoped per calendar.
	TokenCreation,
	/// Creating, changing, or removing shares, scoped per calendar.
	ShareMutation,
	/// Creating calendars, scoped per actor.
	CalendarCreation,
	/// Bulk exports, scoped per calendar.
	BulkExport,
}
impl ActionKind {
	/// Returns a stable label suitable for keys, spans, and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::TokenCreation => "token-creation",
			Self::ShareMutation => "share-mutation",
			Self::CalendarCreation => "calendar-creation",
			Self::BulkExport => "bulk-export",
		}
	}
}
impl Display for ActionKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Counter key: who did what to which resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
	/// Actor label (`user:<id>` or `guest`).
	pub actor: String,
	/// Throttled action.
	pub action: ActionKind,
	/// Resource scope, e.g. a calendar id; `*` for actor-global limits.
	pub resource: String,
}
impl RateLimitKey {
	/// Resource label used for limits that are global to the actor.
	pub const GLOBAL: &str = "*";

	/// Builds a key for the given actor, action, and resource.
	pub fn new(actor: &Actor, action: ActionKind, resource: impl Into<String>) -> Self {
		Self { actor: actor.to_string(), action, resource: resource.into() }
	}
}
impl Display for RateLimitKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}/{}/{}", self.actor, self.action, self.resource)
	}
}

/// Counter state for one key after an increment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowCount {
	/// Requests seen in the current window, including this one.
	pub count: u32,
	/// Exclusive end of the current window.
	pub window_ends_at: OffsetDateTime,
}

/// Counter backend contract.
pub trait CounterStore
where
	Self: Send + Sync,
{
	/// Atomically increments `key` within the fixed window containing `now`, opening a fresh
	/// window of length `window` when none is open.
	fn increment<'a>(
		&'a self,
		key: &'a RateLimitKey,
		window: Duration,
		now: OffsetDateTime,
	) -> CounterFuture<'a>;
}

/// In-process counter store; clones share the same counters.
#[derive(Clone, Debug, Default)]
pub struct MemoryCounterStore(Arc<Mutex<HashMap<RateLimitKey, WindowCount>>>);
impl MemoryCounterStore {
	const PRUNE_THRESHOLD: usize = 4_096;

	fn increment_now(
		&self,
		key: &RateLimitKey,
		window: Duration,
		now: OffsetDateTime,
	) -> WindowCount {
		let mut counters = self.0.lock();

		if counters.len() >= Self::PRUNE_THRESHOLD {
			counters.retain(|_, entry| entry.window_ends_at > now);
		}

		let window_ends_at = window_end(now, window);
		let entry = counters.entry(key.clone()).or_insert(WindowCount { count: 0, window_ends_at });

		if entry.window_ends_at <= now {
			*entry = WindowCount { count: 0, window_ends_at };
		}

		entry.count = entry.count.saturating_add(1);

		*entry
	}
}
impl CounterStore for MemoryCounterStore {
	fn increment<'a>(
		&'a self,
		key: &'a RateLimitKey,
		window: Duration,
		now: OffsetDateTime,
	) -> CounterFuture<'a> {
		Box::pin(async move { Ok(self.increment_now(key, window, now)) })
	}
}

/// Result emitted by [`RateLimiter::check`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed immediately.
	Allow,
	/// The request must wait.
	Deny(RetryDirective),
}
impl RateLimitDecision {
	/// Converts a denial into [`Error::RateLimited`].
	pub fn into_result(self) -> Result<()> {
		match self {
			Self::Allow => Ok(()),
			Self::Deny(directive) => Err(Error::RateLimited(directive)),
		}
	}
}

/// Advises callers when to retry after a [`RateLimitDecision::Deny`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when it is safe to retry.
	pub earliest_retry_at: OffsetDateTime,
	/// Delay from the observed instant until `earliest_retry_at`.
	pub retry_after: Duration,
	/// Optional descriptive string.
	pub reason: Option<String>,
}
impl RetryDirective {
	/// Creates a new directive with the provided timing metadata.
	pub fn new(earliest_retry_at: OffsetDateTime, retry_after: Duration) -> Self {
		Self { earliest_retry_at, retry_after, reason: None }
	}

	/// Whole seconds to wait, rounded up so a sub-second delay never reads as zero.
	pub fn retry_after_secs(&self) -> i64 {
		let secs = self.retry_after.whole_seconds();

		if self.retry_after.subsec_nanoseconds() > 0 { secs + 1 } else { secs }
	}

	/// Adds a human-readable reason.
	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());

		self
	}
}

/// End of a window opened at `now`, saturating at the latest representable instant.
pub fn window_end(now: OffsetDateTime, window: Duration) -> OffsetDateTime {
	now.checked_add(window).unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc())
}

/// Fixed-window policy over an injected [`CounterStore`].
#[derive(Clone)]
pub struct RateLimiter {
	counters: Arc<dyn CounterStore>,
	limits: RateLimits,
}
impl RateLimiter {
	/// Creates a limiter applying `limits` over `counters`.
	pub fn new(counters: Arc<dyn CounterStore>, limits: RateLimits) -> Self {
		Self { counters, limits }
	}

	/// Replaces the active limits, keeping the counters.
	pub fn with_limits(mut self, limits: RateLimits) -> Self {
		self.limits = limits;

		self
	}

	/// Replaces the counter backend, keeping the limits.
	pub fn with_counters(mut self, counters: Arc<dyn CounterStore>) -> Self {
		self.counters = counters;

		self
	}

	/// Active limits.
	pub fn limits(&self) -> &RateLimits {
		&self.limits
	}

	/// Checks (and counts) one request against the clock.
	pub async fn check(
		&self,
		actor: &Actor,
		action: ActionKind,
		resource: &str,
	) -> Result<RateLimitDecision> {
		self.check_at(actor, action, resource, OffsetDateTime::now_utc()).await
	}

	/// Checks (and counts) one request observed at `now`.
	pub async fn check_at(
		&self,
		actor: &Actor,
		action: ActionKind,
		resource: &str,
		now: OffsetDateTime,
	) -> Result<RateLimitDecision> {
		let Some(rule) = self.limits.rule(action) else {
			return Ok(RateLimitDecision::Allow);
		};
		let key = RateLimitKey::new(actor, action, resource);
		let window = self.counters.increment(&key, rule.window(), now).await?;

		Ok(Self::decide(&key, rule, window, now))
	}

	fn decide(
		key: &RateLimitKey,
		rule: RateLimitRule,
		window: WindowCount,
		now: OffsetDateTime,
	) -> RateLimitDecision {
		if window.count <= rule.max_requests {
			return RateLimitDecision::Allow;
		}

		let retry_after = (window.window_ends_at - now).max(Duration::ZERO);

		let reason = format!("{} allows {} per window for {key}", key.action, rule.max_requests);

		RateLimitDecision::Deny(
			RetryDirective::new(window.window_ends_at, retry_after).with_reason(reason),
		)
	}
}
impl Default for RateLimiter {
	fn default() -> Self {
		Self::new(Arc::new(MemoryCounterStore::default()), RateLimits::default())
	}
}
impl Debug for RateLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimiter").field("limits", &self.limits).finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::UserId;

	fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
		let limits = RateLimits {
			token_creation: Some(RateLimitRule { max_requests, window_secs }),
			..RateLimits::default()
		};

		RateLimiter::new(Arc::new(MemoryCounterStore::default()), limits)
	}

	fn actor(id: &str) -> Actor {
		Actor::User(UserId::new(id).expect("User fixture should be valid."))
	}

	#[tokio::test]
	async fn oversized_windows_saturate_instead_of_overflowing() {
		let limiter = limiter(1, u64::MAX);
		let now = macros::datetime!(2025-06-01 10:00 UTC);
		let alice = actor("alice");

		assert_eq!(
			limiter
				.check_at(&alice, ActionKind::TokenCreation, "cal-1", now)
				.await
				.expect("Memory counters should not fail."),
			RateLimitDecision::Allow
		);

		let denied = limiter
			.check_at(&alice, ActionKind::TokenCreation, "cal-1", now)
			.await
			.expect("Memory counters should not fail.");
		let RateLimitDecision::Deny(directive) = denied else {
			panic!("The second request in the window must be denied.");
		};

		assert!(directive.earliest_retry_at > now);
		assert_eq!(window_end(now, Duration::ZERO), now);
	}

	#[tokio::test]
	async fn denies_the_request_after_the_limit_with_retry_hint() {
		let limiter = limiter(2, 60);
		let start = macros::datetime!(2025-06-01 10:00 UTC);
		let alice = actor("alice");

		for offset in 0..2 {
			let now = start + Duration::seconds(offset);
			let decision = limiter
				.check_at(&alice, ActionKind::TokenCreation, "cal-1", now)
				.await
				.expect("Memory counters should not fail.");

			assert_eq!(decision, RateLimitDecision::Allow);
		}

		let denied = limiter
			.check_at(&alice, ActionKind::TokenCreation, "cal-1", start + Duration::seconds(20))
			.await
			.expect("Memory counters should not fail.");
		let RateLimitDecision::Deny(directive) = denied else {
			panic!("Third request inside the window must be denied.");
		};

		assert_eq!(directive.earliest_retry_at, start + Duration::seconds(60));
		assert_eq!(directive.retry_after, Duration::seconds(40));
		assert!(matches!(
			RateLimitDecision::Deny(directive).into_result(),
			Err(Error::RateLimited(_))
		));
	}

	#[tokio::test]
	async fn windows_reset_and_scopes_are_independent() {
		let limiter = limiter(1, 60);
		let start = macros::datetime!(2025-06-01 10:00 UTC);
		let alice = actor("alice");
		let check = |resource: &'static str, at: OffsetDateTime| {
			let limiter = limiter.clone();
			let alice = alice.clone();

			async move {
				limiter
					.check_at(&alice, ActionKind::TokenCreation, resource, at)
					.await
					.expect("Memory counters should not fail.")
			}
		};

		assert_eq!(check("cal-1", start).await, RateLimitDecision::Allow);
		assert_eq!(check("cal-2", start).await, RateLimitDecision::Allow);
		assert!(matches!(check("cal-1", start).await, RateLimitDecision::Deny(_)));
		assert_eq!(check("cal-1", start + Duration::seconds(60)).await, RateLimitDecision::Allow);
	}

	#[tokio::test]
	async fn unlimited_actions_always_pass() {
		let limits = RateLimits { bulk_export: None, ..RateLimits::default() };
		let limiter = RateLimiter::new(Arc::new(MemoryCounterStore::default()), limits);

		for _ in 0..100 {
			let decision = limiter
				.check(&Actor::Guest, ActionKind::BulkExport, "cal-1")
				.await
				.expect("Memory counters should not fail.");

			assert_eq!(decision, RateLimitDecision::Allow);
		}
	}
}
