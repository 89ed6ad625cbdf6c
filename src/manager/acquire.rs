//! Tiered token acquisition with singleflight guards and stale fallback.
//!
//! The manager exposes [`TokenManager::acquire_token`] so callers can reuse cached bearer
//! tokens for a service-to-service credential pair. Each call walks the tiers in cost order:
//! the in-process slot answers without I/O, a durable store hit is promoted into the slot, and
//! only a miss everywhere triggers a `grant_type=client_credentials` call with bounded retry on
//! throttling. A singleflight guard ensures concurrent callers piggy-back on the same in-flight
//! fetch instead of stampeding the token endpoint, and a failed fetch can still be answered by
//! a stale record inside the grace window.

// self
use crate::{
	_prelude::*,
	error::FetchError,
	http::TokenHttpClient,
	manager::TokenManager,
	oauth::{CredentialsFacade, ExchangeFailure, TransportErrorMapper},
	obs::{self, AcquireOutcome, AcquireSpan, DegradedEvent, TokenSource},
	token::TokenRecord,
};

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a usable bearer token, fetching from the issuer only when every tier misses.
	pub async fn acquire_token(&self) -> Result<TokenRecord> {
		let span = AcquireSpan::new("acquire_token");

		obs::record_acquire_outcome(AcquireOutcome::Attempt);
		self.metrics.record_attempt();

		let result = span
			.instrument(async move {
				if let Some(record) = self.fresh_local_token() {
					obs::record_token_source(TokenSource::LocalCache);

					return Ok(record);
				}

				let _singleflight = self.refresh_guard.lock().await;

				// A concurrent caller may have landed a token while this one waited on the
				// guard.
				if let Some(record) = self.fresh_local_token() {
					obs::record_token_source(TokenSource::LocalCache);

					return Ok(record);
				}

				let durable_candidate = self.durable_token().await;

				if let Some(record) = durable_candidate
					.clone()
					.filter(|record| record.is_fresh_at(&self.freshness, self.clock.now()))
				{
					self.store_local(record.clone());
					obs::record_token_source(TokenSource::DurableStore);

					return Ok(record);
				}

				match self.fetch_with_retries().await {
					Ok(record) => {
						self.store_local(record.clone());
						self.mirror_durable(&record).await;
						obs::record_token_source(TokenSource::RemoteFetch);

						Ok(record)
					},
					Err(error) => self.stale_fallback(durable_candidate, error),
				}
			})
			.await;

		match &result {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_acquire_outcome(AcquireOutcome::Success);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_acquire_outcome(AcquireOutcome::Failure);
			},
		}

		result
	}

	fn fresh_local_token(&self) -> Option<TokenRecord> {
		let now = self.clock.now();

		self.slot
			.read()
			.as_ref()
			.filter(|record| record.is_fresh_at(&self.freshness, now))
			.cloned()
	}

	fn store_local(&self, record: TokenRecord) {
		*self.slot.write() = Some(record);
	}

	async fn durable_token(&self) -> Option<TokenRecord> {
		let store = self.store.as_ref()?;

		match store.fetch(&self.store_key).await {
			Ok(record) => record,
			Err(error) => {
				obs::record_degraded(DegradedEvent::StoreReadFailed, &error);

				None
			},
		}
	}

	async fn fetch_with_retries(&self) -> Result<TokenRecord> {
		let facade = CredentialsFacade::<C, M>::from_descriptor(
			&self.issuer,
			&self.client_id,
			&self.client_secret,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)?;
		let mut attempt = 0;

		loop {
			match facade.exchange(self.clock.now()).await {
				Ok(record) => return Ok(record),
				Err(ExchangeFailure::Throttled { retry_after }) => {
					if self.retry.exhausted(attempt) {
						return Err(FetchError::RateLimited {
							attempts: attempt + 1,
							retry_after,
						}
						.into());
					}

					self.metrics.record_retry();
					self.clock.sleep(self.retry.delay_for(attempt, retry_after)).await;

					attempt += 1;
				},
				Err(ExchangeFailure::Fatal(error)) => return Err(error),
			}
		}
	}

	async fn mirror_durable(&self, record: &TokenRecord) {
		if let Some(store) = self.store.as_ref() {
			let remaining = record.expires_at + self.freshness.stale_grace - self.clock.now();
			let ttl = if remaining.is_positive() { Some(remaining) } else { None };

			if let Err(error) = store.put(&self.store_key, record.clone(), ttl).await {
				obs::record_degraded(DegradedEvent::StoreWriteFailed, &error);
			}
		}
	}

	fn stale_fallback(
		&self,
		durable_candidate: Option<TokenRecord>,
		error: Error,
	) -> Result<TokenRecord> {
		let now = self.clock.now();
		let candidate = [self.slot.read().clone(), durable_candidate]
			.into_iter()
			.flatten()
			.filter(|record| record.is_usable_at(&self.freshness, now))
			.max_by_key(|record| record.expires_at);

		match candidate {
			Some(record) => {
				obs::record_degraded(DegradedEvent::StaleServed, &error);
				obs::record_token_source(TokenSource::StaleFallback);
				self.store_local(record.clone());

				Ok(record)
			},
			None => Err(error),
		}
	}
}
