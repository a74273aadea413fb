//! Access-control resolution and bearer-token lifecycle for shared, multi-owner scheduling
//! calendars: ownership, per-user shares, guest policy, and link tokens folded into one effective
//! permission.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod ext;
pub mod model;
pub mod obs;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		access::AccessControl,
		auth::{Actor, UserId},
		config::AccessConfig,
		ext::MemoryAuditSink,
		store::MemoryStore,
	};

	/// Builds a user id fixture.
	pub fn user(id: &str) -> UserId {
		UserId::new(id).expect("Failed to build user identifier for tests.")
	}

	/// Builds an authenticated actor fixture.
	pub fn actor(id: &str) -> Actor {
		Actor::User(user(id))
	}

	/// Constructs an [`AccessControl`] over a fresh [`MemoryStore`] whose audit events land in the
	/// returned sink.
	pub fn build_test_access(config: AccessConfig) -> (AccessControl, MemoryAuditSink) {
		let audit = MemoryAuditSink::default();
		let access = AccessControl::new(Arc::new(MemoryStore::default()))
			.with_config(config)
			.expect("Failed to apply access configuration for tests.")
			.with_audit_sink(Arc::new(audit.clone()));

		(access, audit)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
#[cfg(test)] use color_eyre as _;
