//! Token lifecycle management: tiered lookups, singleflight fetches, and stale fallback.

mod acquire;
mod metrics;

pub use metrics::AcquireMetrics;

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	http::TokenHttpClient,
	issuer::IssuerDescriptor,
	oauth::TransportErrorMapper,
	policy::{FreshnessPolicy, RetryPolicy},
	store::{DurableStore, StoreKey},
	token::TokenRecord,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Manager specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Owns the cached token for a single issuer/credential pair and refreshes it on demand.
///
/// The manager holds the in-process cache slot, the optional durable store handle, and the
/// freshness/retry policies so [`acquire_token`](TokenManager::acquire_token) can answer from
/// the cheapest tier available. Clones share the cache slot, singleflight guard, and metrics,
/// so handing copies to tasks keeps a single token live per credential pair.
pub struct TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound token request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Issuer descriptor that defines the token endpoint, scope, and client-auth method.
	pub issuer: IssuerDescriptor,
	/// OAuth 2.0 client identifier presented on every fetch.
	pub client_id: String,
	client_secret: String,
	store: Option<Arc<dyn DurableStore>>,
	freshness: FreshnessPolicy,
	retry: RetryPolicy,
	clock: Arc<dyn Clock>,
	slot: Arc<RwLock<Option<TokenRecord>>>,
	refresh_guard: Arc<AsyncMutex<()>>,
	metrics: Arc<AcquireMetrics>,
	store_key: StoreKey,
}
impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		issuer: IssuerDescriptor,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		let client_id = client_id.into();
		let store_key = StoreKey::new(&issuer.id, &client_id, &issuer.scope);

		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			issuer,
			client_id,
			client_secret: client_secret.into(),
			store: None,
			freshness: FreshnessPolicy::default(),
			retry: RetryPolicy::default(),
			clock: Arc::new(SystemClock),
			slot: Default::default(),
			refresh_guard: Default::default(),
			metrics: Default::default(),
			store_key,
		}
	}

	/// Attaches a durable store that mirrors fetched tokens across restarts.
	pub fn with_store(mut self, store: Arc<dyn DurableStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Replaces the freshness policy that decides when cached tokens are reusable.
	pub fn with_freshness_policy(mut self, policy: FreshnessPolicy) -> Self {
		self.freshness = policy;

		self
	}

	/// Replaces the retry policy applied to throttled endpoint calls.
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry = policy;

		self
	}

	/// Replaces the clock used for freshness checks and backoff waits.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Returns the shared acquisition counters.
	pub fn metrics(&self) -> &AcquireMetrics {
		&self.metrics
	}

	/// Returns a copy of the currently cached record, regardless of freshness.
	pub fn cached_token(&self) -> Option<TokenRecord> {
		self.slot.read().clone()
	}

	/// Returns the store key under which this manager mirrors its token.
	pub fn store_key(&self) -> &StoreKey {
		&self.store_key
	}
}
#[cfg(feature = "reqwest")]
impl TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a new manager for the provided issuer and credential pair.
	///
	/// The manager provisions its own reqwest-backed transport so callers do not need to pass
	/// HTTP handles explicitly. No durable store is attached by default: the depot runs
	/// local-cache-only until [`TokenManager::with_store`] hands it a mirror backend.
	pub fn new(
		issuer: IssuerDescriptor,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		Self::with_http_client(
			issuer,
			client_id,
			client_secret,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Clone for TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			issuer: self.issuer.clone(),
			client_id: self.client_id.clone(),
			client_secret: self.client_secret.clone(),
			store: self.store.clone(),
			freshness: self.freshness,
			retry: self.retry,
			clock: self.clock.clone(),
			slot: self.slot.clone(),
			refresh_guard: self.refresh_guard.clone(),
			metrics: self.metrics.clone(),
			store_key: self.store_key.clone(),
		}
	}
}
impl<C, M> Debug for TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("issuer", &self.issuer)
			.field("client_id", &self.client_id)
			.field("store_configured", &self.store.is_some())
			.finish()
	}
}
