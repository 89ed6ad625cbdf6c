// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::{Duration, macros::datetime};
// self
use token_depot::{
	clock::ManualClock,
	issuer::{ClientAuthMethod, IssuerDescriptor, IssuerId, ScopeSet},
	manager::ReqwestTokenManager,
	store::{DurableStore, HttpBlobStore, HttpKvStore, StoreError, StoreKey},
	token::TokenRecord,
	url::Url,
};

fn sample_key() -> StoreKey {
	let issuer_id =
		IssuerId::new("mock-booking").expect("Issuer identifier should be valid for store tests.");
	let scope =
		ScopeSet::new(["bookings.read"]).expect("Scope set should be valid for store tests.");

	StoreKey::new(&issuer_id, "booking-service", &scope)
}

fn base_url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Mock store base URL should parse successfully.")
}

#[tokio::test]
async fn http_kv_round_trip_with_ttl() {
	let server = MockServer::start_async().await;
	let key = sample_key();
	let record = TokenRecord::new("kv-token", datetime!(2025-06-01 12:00 UTC));
	let document = serde_json::to_string(&record).expect("Token record should serialize.");
	let store = HttpKvStore::new(base_url(&server, "/cache"));
	let put_mock = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path(format!("/cache/{}", key.storage_key()))
				.query_param("ttl", "600")
				.header("content-type", "application/json");
			then.status(204);
		})
		.await;

	store
		.put(&key, record.clone(), Some(Duration::seconds(600)))
		.await
		.expect("Writing through the kv adapter should succeed.");
	put_mock.assert_async().await;

	let get_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("/cache/{}", key.storage_key()));
			then.status(200).header("content-type", "application/json").body(&document);
		})
		.await;
	let fetched = store
		.fetch(&key)
		.await
		.expect("Reading through the kv adapter should succeed.")
		.expect("The stored document should be found.");

	assert_eq!(fetched.access_token.expose(), "kv-token");
	assert_eq!(fetched.expires_at, record.expires_at);

	get_mock.assert_async().await;
}

#[tokio::test]
async fn http_kv_missing_key_reads_none() {
	let server = MockServer::start_async().await;
	let key = sample_key();
	let store = HttpKvStore::new(base_url(&server, "/cache"));
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("/cache/{}", key.storage_key()));
			then.status(404);
		})
		.await;
	let fetched =
		store.fetch(&key).await.expect("A missing key should read as an ordinary miss.");

	assert!(fetched.is_none());

	mock.assert_async().await;
}

#[tokio::test]
async fn http_kv_backend_rejection_surfaces() {
	let server = MockServer::start_async().await;
	let key = sample_key();
	let store = HttpKvStore::new(base_url(&server, "/cache"));
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("/cache/{}", key.storage_key()));
			then.status(500);
		})
		.await;
	let err = store.fetch(&key).await.expect_err("Gateway failures should surface to the manager.");

	assert!(matches!(err, StoreError::Backend { .. }));

	mock.assert_async().await;
}

#[tokio::test]
async fn http_blob_authenticates_and_appends_json_suffix() {
	let server = MockServer::start_async().await;
	let key = sample_key();
	let record = TokenRecord::new("blob-token", datetime!(2025-06-01 12:00 UTC));
	let document = serde_json::to_string(&record).expect("Token record should serialize.");
	let store = HttpBlobStore::new(base_url(&server, "/objects"))
		.with_auth_token("depot-store-secret");
	let object_path = format!("/objects/{}.json", key.storage_key());
	let put_mock = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path(&object_path)
				.header("authorization", "Bearer depot-store-secret");
			then.status(200);
		})
		.await;

	store
		.put(&key, record.clone(), Some(Duration::seconds(600)))
		.await
		.expect("Writing through the blob adapter should succeed.");
	put_mock.assert_async().await;

	let get_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(&object_path).header("authorization", "Bearer depot-store-secret");
			then.status(200).header("content-type", "application/json").body(&document);
		})
		.await;
	let fetched = store
		.fetch(&key)
		.await
		.expect("Reading through the blob adapter should succeed.")
		.expect("The stored document should be found.");

	assert_eq!(fetched.access_token.expose(), "blob-token");

	get_mock.assert_async().await;
}

#[tokio::test]
async fn manager_mirrors_through_http_store() {
	let server = MockServer::start_async().await;
	let clock = ManualClock::new(datetime!(2025-01-01 00:00 UTC));
	let issuer_id = IssuerId::new("mock-booking")
		.expect("Issuer identifier should be valid for store tests.");
	let descriptor = IssuerDescriptor::builder(issuer_id)
		.token_endpoint(
			Url::parse(&server.url("/oauth/token"))
				.expect("Mock token endpoint should parse successfully."),
		)
		.scope(ScopeSet::new(["bookings.read"]).expect("Scope set should be valid for store tests."))
		.client_auth_method(ClientAuthMethod::ClientSecretPost)
		.build()
		.expect("Issuer descriptor should build successfully.");
	let store: Arc<dyn DurableStore> = Arc::new(HttpKvStore::new(base_url(&server, "/cache")));
	let manager = ReqwestTokenManager::new(descriptor, "booking-service", "booking-secret")
		.with_store(store)
		.with_clock(Arc::new(clock));
	let storage_key = manager.store_key().storage_key();
	let miss_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("/cache/{storage_key}"));
			then.status(404);
		})
		.await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"e2e-token\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let put_mock = server
		.mock_async(|when, then| {
			when.method(PUT).path(format!("/cache/{storage_key}")).query_param("ttl", "7200");
			then.status(204);
		})
		.await;
	let record = manager.acquire_token().await.expect("End-to-end acquisition should succeed.");

	assert_eq!(record.access_token.expose(), "e2e-token");

	miss_mock.assert_async().await;
	token_mock.assert_async().await;
	put_mock.assert_async().await;
}
