//! Optional observability helpers for token acquisition.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `token_depot.acquire` with the `stage`
//!   (call site) field, plus a warning whenever the depot degrades to a stale token or loses
//!   its durable mirror.
//! - Enable `metrics` to increment the `token_depot_acquire_total`, `token_depot_source_total`,
//!   and `token_depot_degraded_total` counters labeled by outcome, source, and event.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquireOutcome {
	/// Entry to [`acquire_token`](crate::manager::TokenManager::acquire_token).
	Attempt,
	/// A usable token was handed back.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl AcquireOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AcquireOutcome::Attempt => "attempt",
			AcquireOutcome::Success => "success",
			AcquireOutcome::Failure => "failure",
		}
	}
}
impl Display for AcquireOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Where a served token came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenSource {
	/// Reused from the in-process cache slot.
	LocalCache,
	/// Promoted from the durable store.
	DurableStore,
	/// Fetched from the issuer's token endpoint.
	RemoteFetch,
	/// Served stale within the grace window after a failed fetch.
	StaleFallback,
}
impl TokenSource {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenSource::LocalCache => "local_cache",
			TokenSource::DurableStore => "durable_store",
			TokenSource::RemoteFetch => "remote_fetch",
			TokenSource::StaleFallback => "stale_fallback",
		}
	}
}
impl Display for TokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Degradations the depot absorbs instead of surfacing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DegradedEvent {
	/// A durable store read failed and was treated as a miss.
	StoreReadFailed,
	/// Mirroring a fresh token to the durable store failed.
	StoreWriteFailed,
	/// A stale token was served because the fetch failed.
	StaleServed,
}
impl DegradedEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			DegradedEvent::StoreReadFailed => "store_read_failed",
			DegradedEvent::StoreWriteFailed => "store_write_failed",
			DegradedEvent::StaleServed => "stale_served",
		}
	}
}
impl Display for DegradedEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

pub(crate) fn record_degraded(event: DegradedEvent, detail: &dyn Display) {
	warn_degraded(event, detail);
	record_degraded_event(event);
}
