//! Freshness and retry policies steering the manager's refresh decisions.

// self
use crate::_prelude::*;

// Caps the shift in [`RetryPolicy::backoff_for`] so the exponent stays within `i64`.
const MAX_BACKOFF_EXPONENT: u32 = 32;

/// Freshness windows applied to cached token records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreshnessPolicy {
	/// Safety margin before nominal expiry; a record inside it no longer counts as fresh.
	pub refresh_margin: Duration,
	/// Window past nominal expiry during which a record may still serve as a last resort.
	pub stale_grace: Duration,
}
impl FreshnessPolicy {
	/// Default safety margin subtracted from the issuer-declared expiry.
	pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::minutes(5);
	/// Default fallback window past the issuer-declared expiry.
	pub const DEFAULT_STALE_GRACE: Duration = Duration::hours(1);

	/// Creates a policy, clamping negative windows to zero.
	pub fn new(refresh_margin: Duration, stale_grace: Duration) -> Self {
		Self {
			refresh_margin: clamp_non_negative(refresh_margin),
			stale_grace: clamp_non_negative(stale_grace),
		}
	}
}
impl Default for FreshnessPolicy {
	fn default() -> Self {
		Self {
			refresh_margin: Self::DEFAULT_REFRESH_MARGIN,
			stale_grace: Self::DEFAULT_STALE_GRACE,
		}
	}
}

/// Bounded retry schedule applied to rate-limited token fetches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Maximum number of retries after the initial attempt.
	pub max_retries: u32,
}
impl RetryPolicy {
	/// Default retry budget for sustained throttling.
	pub const DEFAULT_MAX_RETRIES: u32 = 3;

	/// Creates a policy with the provided retry budget.
	pub fn new(max_retries: u32) -> Self {
		Self { max_retries }
	}

	/// Exponential backoff for the zero-based `attempt`: `2^(attempt + 1)` seconds.
	pub fn backoff_for(&self, attempt: u32) -> Duration {
		let exponent = attempt.saturating_add(1).min(MAX_BACKOFF_EXPONENT);

		Duration::seconds(1_i64 << exponent)
	}

	/// Wait before the next attempt, preferring the issuer's Retry-After hint when present.
	pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
		retry_after.filter(|hint| hint.is_positive()).unwrap_or_else(|| self.backoff_for(attempt))
	}

	/// Returns `true` once the zero-based `attempt` has no retries left behind it.
	pub fn exhausted(&self, attempt: u32) -> bool {
		attempt >= self.max_retries
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { max_retries: Self::DEFAULT_MAX_RETRIES }
	}
}

fn clamp_non_negative(duration: Duration) -> Duration {
	if duration.is_negative() { Duration::ZERO } else { duration }
}
