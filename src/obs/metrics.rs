// self
use crate::obs::{AcquireOutcome, DegradedEvent, TokenSource};

/// Records an acquisition outcome via the global metrics recorder (when enabled).
pub fn record_acquire_outcome(outcome: AcquireOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("token_depot_acquire_total", "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Records which tier served a token via the global metrics recorder (when enabled).
pub fn record_token_source(source: TokenSource) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("token_depot_source_total", "source" => source.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = source;
	}
}

/// Records an absorbed degradation via the global metrics recorder (when enabled).
pub fn record_degraded_event(event: DegradedEvent) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("token_depot_degraded_total", "event" => event.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = event;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_helpers_noop_without_metrics() {
		record_acquire_outcome(AcquireOutcome::Failure);
		record_token_source(TokenSource::StaleFallback);
		record_degraded_event(DegradedEvent::StoreWriteFailed);
	}
}
