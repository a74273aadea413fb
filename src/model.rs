//! Persisted access metadata: calendars, shares, and subscriptions.

pub mod calendar;
pub mod share;
pub mod subscription;

pub use calendar::*;
pub use share::*;
pub use subscription::*;
