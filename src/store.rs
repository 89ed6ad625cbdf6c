//! Storage contracts and built-in durable-store adapters for cached token records.

#[cfg(feature = "reqwest")] pub mod http_blob;
#[cfg(feature = "reqwest")] pub mod http_kv;
pub mod memory;

#[cfg(feature = "reqwest")] pub use http_blob::HttpBlobStore;
#[cfg(feature = "reqwest")] pub use http_kv::HttpKvStore;
pub use memory::MemoryStore;

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	issuer::{IssuerId, ScopeSet},
	token::TokenRecord,
};

/// Boxed future returned by [`DurableStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the durable token tier.
///
/// Implementations report failures honestly through [`StoreError`]; the manager is the layer
/// that downgrades every store failure to a cache miss, so adapters never need their own
/// swallow-and-continue logic.
pub trait DurableStore
where
	Self: Send + Sync,
{
	/// Fetches the record stored under `key`, if present.
	fn fetch<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Persists or replaces the record stored under `key`.
	///
	/// `ttl` is advisory. Backends without native expiry may ignore it, because records carry
	/// their own expiry instant and readers re-validate freshness anyway.
	fn put<'a>(
		&'a self,
		key: &'a StoreKey,
		record: TokenRecord,
		ttl: Option<Duration>,
	) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`DurableStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Key identifying the depot's cached record on a shared backend.
///
/// A manager always reads and writes exactly one key, derived from its issuer plus a fingerprint
/// of the credential identity, so depots for different credentials can share one backend without
/// colliding.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreKey {
	/// Issuer component.
	pub issuer: IssuerId,
	/// Fingerprint of the client identifier and requested scope.
	pub credential_fingerprint: String,
}
impl StoreKey {
	/// Derives the key for a client identifier and scope pair under the given issuer.
	pub fn new(issuer: &IssuerId, client_id: &str, scope: &ScopeSet) -> Self {
		Self { issuer: issuer.clone(), credential_fingerprint: fingerprint(client_id, scope) }
	}

	/// Renders the flat key used by path- or name-addressed backends.
	pub fn storage_key(&self) -> String {
		format!("{}.{}", self.issuer, self.credential_fingerprint)
	}
}

/// Encodes a record into the canonical `{token, expiry}` JSON document shared by adapters.
///
/// Custom [`DurableStore`] implementations should persist this exact document so deployments
/// can switch backends without invalidating cached tokens.
pub fn encode_record(record: &TokenRecord) -> Result<Vec<u8>, StoreError> {
	serde_json::to_vec(record).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize the token document: {e}"),
	})
}

/// Decodes the canonical `{token, expiry}` JSON document produced by [`encode_record`].
pub fn decode_record(bytes: &[u8]) -> Result<TokenRecord, StoreError> {
	serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization {
		message: format!("Failed to parse the stored token document: {e}"),
	})
}

// URL-safe base64 so the fingerprint can embed in URL paths and object names verbatim.
fn fingerprint(client_id: &str, scope: &ScopeSet) -> String {
	let mut hasher = Sha256::new();

	hasher.update(client_id.as_bytes());
	hasher.update(b"\n");
	hasher.update(scope.normalized().as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_depot_error_with_source() {
		let store_error = StoreError::Backend { message: "kv gateway unreachable".into() };
		let depot_error: Error = store_error.clone().into();

		assert!(matches!(depot_error, Error::Storage(_)));
		assert!(depot_error.to_string().contains("kv gateway unreachable"));

		let source = StdError::source(&depot_error)
			.expect("Depot error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn store_key_is_stable_across_scope_orderings() {
		let issuer = IssuerId::new("booking-core").expect("Issuer fixture should be valid.");
		let scope_a = ScopeSet::new(["rental.read", "availability"])
			.expect("First scope fixture should be valid.");
		let scope_b = ScopeSet::new(["availability", "rental.read"])
			.expect("Second scope fixture should be valid.");
		let key_a = StoreKey::new(&issuer, "client-1", &scope_a);
		let key_b = StoreKey::new(&issuer, "client-1", &scope_b);

		assert_eq!(key_a, key_b);
	}

	#[test]
	fn store_key_partitions_by_credential_identity() {
		let issuer = IssuerId::new("booking-core").expect("Issuer fixture should be valid.");
		let scope = ScopeSet::new(["availability"]).expect("Scope fixture should be valid.");
		let key_a = StoreKey::new(&issuer, "client-1", &scope);
		let key_b = StoreKey::new(&issuer, "client-2", &scope);

		assert_ne!(key_a.credential_fingerprint, key_b.credential_fingerprint);
	}

	#[test]
	fn storage_key_is_path_safe() {
		let issuer = IssuerId::new("booking-core").expect("Issuer fixture should be valid.");
		let scope = ScopeSet::new(["availability"]).expect("Scope fixture should be valid.");
		let key = StoreKey::new(&issuer, "client-1", &scope).storage_key();

		assert!(key.starts_with("booking-core."));
		assert!(key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
	}

	#[test]
	fn malformed_documents_decode_as_serialization_errors() {
		let err = decode_record(b"{\"token\":\"abc\"}")
			.expect_err("A document without an expiry should fail to decode.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		let err = decode_record(b"not json")
			.expect_err("A non-JSON document should fail to decode.");

		assert!(matches!(err, StoreError::Serialization { .. }));
	}
}
