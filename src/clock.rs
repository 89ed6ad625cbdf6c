//! Injectable time source backing expiry math and retry delays.

// self
use crate::_prelude::*;

/// Boxed future returned by [`Clock::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Abstraction over wall-clock reads and timer waits.
///
/// The manager never touches `OffsetDateTime::now_utc` or `tokio::time::sleep` directly; every
/// read and delay goes through this trait so freshness windows and backoff schedules stay
/// testable without real waiting.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;

	/// Suspends the current task for `duration`.
	fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// Live clock delegating to the system time and the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}

	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		let duration = std::time::Duration::try_from(duration).unwrap_or(std::time::Duration::ZERO);

		Box::pin(tokio::time::sleep(duration))
	}
}

/// Deterministic clock for tests.
///
/// `now` returns a pinned instant that moves only through [`ManualClock::advance`] or a
/// [`Clock::sleep`] call, and every requested wait is recorded so tests can assert the exact
/// backoff schedule without waiting for it.
#[derive(Clone, Debug)]
pub struct ManualClock {
	now: Arc<Mutex<OffsetDateTime>>,
	waits: Arc<Mutex<Vec<Duration>>>,
}
impl ManualClock {
	/// Creates a clock pinned at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self { now: Arc::new(Mutex::new(start)), waits: Arc::new(Mutex::new(Vec::new())) }
	}

	/// Moves the clock forward by `delta`.
	pub fn advance(&self, delta: Duration) {
		*self.now.lock() += delta;
	}

	/// Returns every wait requested through [`Clock::sleep`], in order.
	pub fn waits(&self) -> Vec<Duration> {
		self.waits.lock().clone()
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.now.lock()
	}

	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		self.waits.lock().push(duration);
		self.advance(duration);

		Box::pin(async {})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[tokio::test]
	async fn manual_clock_advances_and_records_waits() {
		let clock = ManualClock::new(datetime!(2025-01-01 00:00 UTC));

		clock.advance(Duration::minutes(10));

		assert_eq!(clock.now(), datetime!(2025-01-01 00:10 UTC));

		clock.sleep(Duration::seconds(2)).await;
		clock.sleep(Duration::seconds(4)).await;

		assert_eq!(clock.now(), datetime!(2025-01-01 00:10:06 UTC));
		assert_eq!(clock.waits(), vec![Duration::seconds(2), Duration::seconds(4)]);
	}
}
