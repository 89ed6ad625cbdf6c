// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime, macros::datetime};
// self
use token_depot::{
	clock::{Clock, ManualClock},
	issuer::{ClientAuthMethod, IssuerDescriptor, IssuerId, ScopeSet},
	manager::ReqwestTokenManager,
	store::{DurableStore, MemoryStore, StoreError, StoreFuture, StoreKey},
	token::TokenRecord,
	url::Url,
};

const CLIENT_ID: &str = "booking-service";
const CLIENT_SECRET: &str = "booking-secret";

struct FailingStore;
impl DurableStore for FailingStore {
	fn fetch<'a>(&'a self, _key: &'a StoreKey) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async { Err(StoreError::Backend { message: "Store offline.".into() }) })
	}

	fn put<'a>(
		&'a self,
		_key: &'a StoreKey,
		_record: TokenRecord,
		_ttl: Option<Duration>,
	) -> StoreFuture<'a, ()> {
		Box::pin(async { Err(StoreError::Backend { message: "Store offline.".into() }) })
	}
}

fn build_descriptor(server: &MockServer) -> IssuerDescriptor {
	let issuer_id = IssuerId::new("mock-booking")
		.expect("Issuer identifier should be valid for store fallback tests.");

	IssuerDescriptor::builder(issuer_id)
		.token_endpoint(
			Url::parse(&server.url("/oauth/token"))
				.expect("Mock token endpoint should parse successfully."),
		)
		.scope(
			ScopeSet::new(["bookings.read"])
				.expect("Scope set should be valid for store fallback tests."),
		)
		.client_auth_method(ClientAuthMethod::ClientSecretPost)
		.build()
		.expect("Issuer descriptor should build successfully.")
}

#[tokio::test]
async fn durable_hit_skips_endpoint() {
	let server = MockServer::start_async().await;
	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn DurableStore> = store_backend.clone();
	let manager = ReqwestTokenManager::new(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET)
		.with_store(store);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"endpoint-token\",\"token_type\":\"bearer\",\"expires_in\":600}",
			);
		})
		.await;
	let warm = TokenRecord::new("warm-token", OffsetDateTime::now_utc() + Duration::hours(1));

	store_backend
		.put(manager.store_key(), warm, None)
		.await
		.expect("Seeding the memory store should succeed.");

	let record = manager.acquire_token().await.expect("A durable hit should satisfy the call.");

	assert_eq!(record.access_token.expose(), "warm-token");
	assert!(manager.cached_token().is_some());

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn store_read_failure_degrades_to_fetch() {
	let server = MockServer::start_async().await;
	let manager = ReqwestTokenManager::new(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET)
		.with_store(Arc::new(FailingStore));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"fetched-anyway\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let record = manager
		.acquire_token()
		.await
		.expect("Store failures must not block a reachable endpoint.");

	assert_eq!(record.access_token.expose(), "fetched-anyway");

	mock.assert_async().await;

	assert_eq!(manager.metrics().successes(), 1);
}

#[tokio::test]
async fn fetched_token_mirrors_to_store() {
	let server = MockServer::start_async().await;
	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn DurableStore> = store_backend.clone();
	let manager = ReqwestTokenManager::new(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET)
		.with_store(store);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"mirrored-token\",\"token_type\":\"bearer\",\"expires_in\":1800}",
			);
		})
		.await;
	let record = manager.acquire_token().await.expect("Initial acquisition should succeed.");
	let mirrored = store_backend
		.fetch(manager.store_key())
		.await
		.expect("Reading the mirror should succeed.")
		.expect("The fetched token should have been mirrored.");

	assert_eq!(mirrored.access_token.expose(), "mirrored-token");
	assert_eq!(mirrored.expires_at, record.expires_at);

	mock.assert_async().await;
}

#[tokio::test]
async fn stale_durable_record_backstops_failed_fetch() {
	let server = MockServer::start_async().await;
	let clock = ManualClock::new(datetime!(2025-01-01 00:00 UTC));
	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn DurableStore> = store_backend.clone();
	let manager = ReqwestTokenManager::new(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET)
		.with_store(store)
		.with_clock(Arc::new(clock.clone()));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(500).body("upstream exploded");
		})
		.await;
	let aging = TokenRecord::new("aging-token", clock.now() + Duration::minutes(2));

	store_backend
		.put(manager.store_key(), aging, None)
		.await
		.expect("Seeding the memory store should succeed.");

	let record = manager
		.acquire_token()
		.await
		.expect("A stale durable record should backstop the failed fetch.");

	assert_eq!(record.access_token.expose(), "aging-token");

	mock.assert_async().await;
}
