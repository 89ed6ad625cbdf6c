//! Demonstrates mirroring fetched tokens into a durable store so a restarted process reuses
//! them instead of contacting the issuer again.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use token_depot::{
	issuer::{IssuerDescriptor, IssuerId, ScopeSet},
	manager::ReqwestTokenManager,
	store::{DurableStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"mirrored-access\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::default());
	let descriptor = IssuerDescriptor::builder(IssuerId::new("demo-issuer")?)
		.token_endpoint(Url::parse(&server.url("/oauth/token"))?)
		.scope(ScopeSet::new(["bookings.read"])?)
		.build()?;
	let first_boot = ReqwestTokenManager::new(descriptor.clone(), "demo-client", "demo-secret")
		.with_store(store.clone());
	let record = first_boot.acquire_token().await?;

	println!("First boot fetched: {}.", record.access_token.expose());

	// A second manager simulates a process restart; its local slot starts empty.
	let second_boot =
		ReqwestTokenManager::new(descriptor, "demo-client", "demo-secret").with_store(store);
	let reused = second_boot.acquire_token().await?;

	println!("Second boot promoted from the durable mirror: {}.", reused.access_token.expose());

	token_mock.assert_calls_async(1).await;

	Ok(())
}
