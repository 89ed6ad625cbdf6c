//! Blob-storage [`DurableStore`] adapter.
//!
//! Targets object storages fronted by an HTTP endpoint: each record is a JSON document at
//! `{base}/{storage key}.json`, fetched with `GET` (404 when absent) and replaced with `PUT`.
//! Object storages cannot carry a server-side TTL, so the hint is ignored; a stale document is
//! harmless because every record embeds its own expiry.

// self
use crate::{
	_prelude::*,
	store::{self, DurableStore, StoreError, StoreFuture, StoreKey, http_kv},
	token::{TokenRecord, TokenSecret},
};

/// Durable adapter for HTTP-fronted blob storage.
#[derive(Clone, Debug)]
pub struct HttpBlobStore {
	client: ReqwestClient,
	base: Url,
	auth_token: Option<TokenSecret>,
}
impl HttpBlobStore {
	/// Creates an adapter rooted at `base` with a default reqwest client.
	pub fn new(base: Url) -> Self {
		Self { client: ReqwestClient::default(), base, auth_token: None }
	}

	/// Replaces the underlying reqwest client.
	pub fn with_client(mut self, client: ReqwestClient) -> Self {
		self.client = client;

		self
	}

	/// Attaches a bearer token sent with every request to the storage endpoint.
	pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
		self.auth_token = Some(TokenSecret::new(token));

		self
	}

	fn object_url(&self, key: &StoreKey) -> Result<Url, StoreError> {
		http_kv::entry_url(&self.base, &format!("{}.json", key.storage_key()))
	}

	fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		match &self.auth_token {
			Some(token) => request.bearer_auth(token.expose()),
			None => request,
		}
	}
}
impl DurableStore for HttpBlobStore {
	fn fetch<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move {
			let url = self.object_url(key)?;
			let response = self.apply_auth(self.client.get(url)).send().await.map_err(|e| {
				StoreError::Backend { message: format!("Failed to query the blob storage: {e}") }
			})?;

			if response.status() == reqwest::StatusCode::NOT_FOUND {
				return Ok(None);
			}

			let response = response.error_for_status().map_err(|e| StoreError::Backend {
				message: format!("Blob storage rejected the read: {e}"),
			})?;
			let bytes = response.bytes().await.map_err(|e| StoreError::Backend {
				message: format!("Failed to read the blob storage response: {e}"),
			})?;

			Ok(Some(store::decode_record(&bytes)?))
		})
	}

	fn put<'a>(
		&'a self,
		key: &'a StoreKey,
		record: TokenRecord,
		_ttl: Option<Duration>,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let url = self.object_url(key)?;
			let payload = store::encode_record(&record)?;

			self.apply_auth(self.client.put(url))
				.header(reqwest::header::CONTENT_TYPE, "application/json")
				.body(payload)
				.send()
				.await
				.map_err(|e| StoreError::Backend {
					message: format!("Failed to reach the blob storage: {e}"),
				})?
				.error_for_status()
				.map_err(|e| StoreError::Backend {
					message: format!("Blob storage rejected the write: {e}"),
				})?;

			Ok(())
		})
	}
}
