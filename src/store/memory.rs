//! Thread-safe in-memory [`DurableStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{DurableStore, StoreFuture, StoreKey},
	token::TokenRecord,
};

type StoreMap = Arc<RwLock<HashMap<String, StoredEntry>>>;

#[derive(Clone, Debug)]
struct StoredEntry {
	record: TokenRecord,
	evict_at: Option<OffsetDateTime>,
}

/// Thread-safe storage backend that keeps records in-process for tests and demos.
///
/// The optional `ttl` handed to [`DurableStore::put`] is honored against the system clock, the
/// same way an external key-value backend would apply it.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	fn fetch_now(map: StoreMap, key: String) -> Option<TokenRecord> {
		let now = OffsetDateTime::now_utc();

		map.read()
			.get(&key)
			.filter(|entry| entry.evict_at.is_none_or(|evict_at| now < evict_at))
			.map(|entry| entry.record.clone())
	}

	fn put_now(map: StoreMap, key: String, record: TokenRecord, ttl: Option<Duration>) {
		let evict_at = ttl.map(|ttl| OffsetDateTime::now_utc() + ttl);

		map.write().insert(key, StoredEntry { record, evict_at });
	}
}
impl DurableStore for MemoryStore {
	fn fetch<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<TokenRecord>> {
		let map = self.0.clone();
		let key = key.storage_key();

		Box::pin(async move { Ok(Self::fetch_now(map, key)) })
	}

	fn put<'a>(
		&'a self,
		key: &'a StoreKey,
		record: TokenRecord,
		ttl: Option<Duration>,
	) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.storage_key();

		Box::pin(async move {
			Self::put_now(map, key, record, ttl);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::issuer::{IssuerId, ScopeSet};

	fn key() -> StoreKey {
		let issuer = IssuerId::new("booking-core").expect("Issuer fixture should be valid.");
		let scope = ScopeSet::new(["availability"]).expect("Scope fixture should be valid.");

		StoreKey::new(&issuer, "client-1", &scope)
	}

	#[tokio::test]
	async fn records_round_trip() {
		let store = MemoryStore::default();
		let key = key();
		let record = TokenRecord::new("cached", macros::datetime!(2030-01-01 00:00 UTC));

		assert_eq!(store.fetch(&key).await.expect("Fetch should succeed."), None);

		store.put(&key, record.clone(), None).await.expect("Put should succeed.");

		assert_eq!(store.fetch(&key).await.expect("Fetch should succeed."), Some(record));
	}

	#[tokio::test]
	async fn expired_ttl_entries_read_as_missing() {
		let store = MemoryStore::default();
		let key = key();
		let record = TokenRecord::new("cached", macros::datetime!(2030-01-01 00:00 UTC));

		store
			.put(&key, record.clone(), Some(Duration::seconds(-1)))
			.await
			.expect("Put should succeed.");

		assert_eq!(store.fetch(&key).await.expect("Fetch should succeed."), None);

		store
			.put(&key, record.clone(), Some(Duration::hours(1)))
			.await
			.expect("Put should succeed.");

		assert_eq!(store.fetch(&key).await.expect("Fetch should succeed."), Some(record));
	}
}
