//! Demonstrates acquiring a bearer token with the default reqwest transport and reusing the
//! cached record on subsequent calls.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use token_depot::{
	issuer::{IssuerDescriptor, IssuerId, ScopeSet},
	manager::ReqwestTokenManager,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let descriptor = IssuerDescriptor::builder(IssuerId::new("demo-issuer")?)
		.token_endpoint(Url::parse(&server.url("/oauth/token"))?)
		.scope(ScopeSet::new(["bookings.read", "bookings.write"])?)
		.build()?;
	let manager = ReqwestTokenManager::new(descriptor, "demo-client", "demo-secret");
	let first = manager.acquire_token().await?;
	let second = manager.acquire_token().await?;

	println!("Issued bearer token: {}.", first.access_token.expose());
	println!("Reused bearer token: {}.", second.access_token.expose());
	println!("Acquisitions served: {}, issuer contacted once.", manager.metrics().successes());

	token_mock.assert_calls_async(1).await;

	Ok(())
}
