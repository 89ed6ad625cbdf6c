//! Key-value-over-HTTP [`DurableStore`] adapter.
//!
//! Speaks the plain REST dialect exposed by hosted key-value gateways: each record lives as a
//! JSON document at `{base}/{storage key}`, `GET` returns it (404 when absent), `PUT` replaces
//! it, and an optional `ttl` query parameter (whole seconds) requests server-side expiry.
//! Requests may carry a bearer token authenticating against the store itself.

// self
use crate::{
	_prelude::*,
	store::{self, DurableStore, StoreError, StoreFuture, StoreKey},
	token::{TokenRecord, TokenSecret},
};

/// Durable adapter for key-value stores exposed over HTTP.
#[derive(Clone, Debug)]
pub struct HttpKvStore {
	client: ReqwestClient,
	base: Url,
	auth_token: Option<TokenSecret>,
}
impl HttpKvStore {
	/// Creates an adapter rooted at `base` with a default reqwest client.
	pub fn new(base: Url) -> Self {
		Self { client: ReqwestClient::default(), base, auth_token: None }
	}

	/// Replaces the underlying reqwest client.
	pub fn with_client(mut self, client: ReqwestClient) -> Self {
		self.client = client;

		self
	}

	/// Attaches a bearer token sent with every request to the store.
	pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
		self.auth_token = Some(TokenSecret::new(token));

		self
	}

	fn entry_url(&self, key: &StoreKey) -> Result<Url, StoreError> {
		entry_url(&self.base, &key.storage_key())
	}

	fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		match &self.auth_token {
			Some(token) => request.bearer_auth(token.expose()),
			None => request,
		}
	}
}
impl DurableStore for HttpKvStore {
	fn fetch<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move {
			let url = self.entry_url(key)?;
			let response = self.apply_auth(self.client.get(url)).send().await.map_err(|e| {
				StoreError::Backend { message: format!("Failed to query the kv gateway: {e}") }
			})?;

			if response.status() == reqwest::StatusCode::NOT_FOUND {
				return Ok(None);
			}

			let response = response.error_for_status().map_err(|e| StoreError::Backend {
				message: format!("Kv gateway rejected the read: {e}"),
			})?;
			let bytes = response.bytes().await.map_err(|e| StoreError::Backend {
				message: format!("Failed to read the kv gateway response: {e}"),
			})?;

			Ok(Some(store::decode_record(&bytes)?))
		})
	}

	fn put<'a>(
		&'a self,
		key: &'a StoreKey,
		record: TokenRecord,
		ttl: Option<Duration>,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut url = self.entry_url(key)?;

			if let Some(ttl) = ttl.filter(|value| value.is_positive()) {
				url.query_pairs_mut().append_pair("ttl", &ttl.whole_seconds().to_string());
			}

			let payload = store::encode_record(&record)?;

			self.apply_auth(self.client.put(url))
				.header(reqwest::header::CONTENT_TYPE, "application/json")
				.body(payload)
				.send()
				.await
				.map_err(|e| StoreError::Backend {
					message: format!("Failed to reach the kv gateway: {e}"),
				})?
				.error_for_status()
				.map_err(|e| StoreError::Backend {
					message: format!("Kv gateway rejected the write: {e}"),
				})?;

			Ok(())
		})
	}
}

pub(super) fn entry_url(base: &Url, segment: &str) -> Result<Url, StoreError> {
	let mut url = base.clone();

	url.path_segments_mut()
		.map_err(|_| StoreError::Backend {
			message: format!("Store base URL cannot carry key segments: {base}"),
		})?
		.pop_if_empty()
		.push(segment);

	Ok(url)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn entry_urls_tolerate_trailing_slashes() {
		let with_slash = Url::parse("http://127.0.0.1:8080/cache/").expect("URL should parse.");
		let without_slash = Url::parse("http://127.0.0.1:8080/cache").expect("URL should parse.");

		assert_eq!(
			entry_url(&with_slash, "booking.abc").expect("Entry URL should build.").as_str(),
			"http://127.0.0.1:8080/cache/booking.abc",
		);
		assert_eq!(
			entry_url(&without_slash, "booking.abc").expect("Entry URL should build.").as_str(),
			"http://127.0.0.1:8080/cache/booking.abc",
		);
	}
}
