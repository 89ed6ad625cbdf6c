//! Cached token record, freshness states, and the secret wrapper.

// self
use crate::{_prelude::*, policy::FreshnessPolicy};

/// Redacted bearer-token wrapper keeping secret material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Freshness classification for a token record at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenState {
	/// Record is ahead of the safety margin and safe to hand out.
	Fresh,
	/// Record passed the safety margin but may still serve as a last resort.
	StaleGrace,
	/// Record passed the grace window and must not be served.
	Expired,
}

/// Cached bearer token paired with the issuer-declared expiry instant.
///
/// The serialized form is the `{token, expiry}` document persisted by durable stores, with
/// `expiry` in epoch milliseconds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Opaque bearer credential; never parsed, never logged.
	#[serde(rename = "token")]
	pub access_token: TokenSecret,
	/// Absolute expiry instant declared by the issuer.
	#[serde(rename = "expiry", with = "epoch_millisecond")]
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Creates a record from a token value and an absolute expiry instant.
	pub fn new(access_token: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { access_token: TokenSecret::new(access_token), expires_at }
	}

	/// Creates a record expiring `lifetime` after `issued_at`.
	pub fn with_lifetime(
		access_token: impl Into<String>,
		issued_at: OffsetDateTime,
		lifetime: Duration,
	) -> Self {
		Self::new(access_token, issued_at + lifetime)
	}

	/// Computes the freshness state at a given instant under the provided policy.
	pub fn state_at(&self, policy: &FreshnessPolicy, instant: OffsetDateTime) -> TokenState {
		if instant < self.expires_at - policy.refresh_margin {
			return TokenState::Fresh;
		}
		if instant < self.expires_at + policy.stale_grace {
			return TokenState::StaleGrace;
		}

		TokenState::Expired
	}

	/// Returns `true` while the record is ahead of the safety margin.
	pub fn is_fresh_at(&self, policy: &FreshnessPolicy, instant: OffsetDateTime) -> bool {
		matches!(self.state_at(policy, instant), TokenState::Fresh)
	}

	/// Returns `true` while the record may still be served, fresh or stale.
	pub fn is_usable_at(&self, policy: &FreshnessPolicy, instant: OffsetDateTime) -> bool {
		!matches!(self.state_at(policy, instant), TokenState::Expired)
	}

	/// Renders the `Authorization` header value for downstream requests.
	pub fn authorization_value(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Epoch-millisecond (de)serialization for the persisted `expiry` field.
mod epoch_millisecond {
	// crates.io
	use serde::{Deserialize, Deserializer, Serializer, de, ser};
	use time::OffsetDateTime;

	pub fn serialize<S>(instant: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let millisecond = i64::try_from(instant.unix_timestamp_nanos() / 1_000_000)
			.map_err(ser::Error::custom)?;

		serializer.serialize_i64(millisecond)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
	where
		D: Deserializer<'de>,
	{
		let millisecond = i64::deserialize(deserializer)?;

		OffsetDateTime::from_unix_timestamp_nanos(i128::from(millisecond) * 1_000_000)
			.map_err(de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn record_debug_redacts_token() {
		let record = TokenRecord::new("access", macros::datetime!(2025-01-01 01:00 UTC));

		assert!(!format!("{record:?}").contains("access"));
	}

	#[test]
	fn state_transitions_cover_all_windows() {
		let policy = FreshnessPolicy::default();
		let record = TokenRecord::new("access", macros::datetime!(2025-01-01 01:00 UTC));

		assert_eq!(
			record.state_at(&policy, macros::datetime!(2025-01-01 00:30 UTC)),
			TokenState::Fresh,
		);
		// The five-minute margin retires the record ahead of its nominal expiry.
		assert_eq!(
			record.state_at(&policy, macros::datetime!(2025-01-01 00:55 UTC)),
			TokenState::StaleGrace,
		);
		assert_eq!(
			record.state_at(&policy, macros::datetime!(2025-01-01 01:30 UTC)),
			TokenState::StaleGrace,
		);
		assert_eq!(
			record.state_at(&policy, macros::datetime!(2025-01-01 02:00 UTC)),
			TokenState::Expired,
		);
	}

	#[test]
	fn usability_helpers_match_states() {
		let policy = FreshnessPolicy::default();
		let record = TokenRecord::with_lifetime(
			"access",
			macros::datetime!(2025-01-01 00:00 UTC),
			Duration::hours(1),
		);

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 01:00 UTC));
		assert!(record.is_fresh_at(&policy, macros::datetime!(2025-01-01 00:54 UTC)));
		assert!(!record.is_fresh_at(&policy, macros::datetime!(2025-01-01 00:56 UTC)));
		assert!(record.is_usable_at(&policy, macros::datetime!(2025-01-01 01:59 UTC)));
		assert!(!record.is_usable_at(&policy, macros::datetime!(2025-01-01 02:00 UTC)));
	}

	#[test]
	fn wire_form_uses_token_and_epoch_millisecond_expiry() {
		let record = TokenRecord::new("access", macros::datetime!(2025-01-01 01:00 UTC));
		let json = serde_json::to_value(&record).expect("Token record should serialize.");

		assert_eq!(json["token"], "access");
		assert_eq!(json["expiry"], 1_735_693_200_000_i64);

		let parsed: TokenRecord = serde_json::from_value(json)
			.expect("Persisted token document should deserialize back into a record.");

		assert_eq!(parsed, record);
	}

	#[test]
	fn authorization_value_uses_bearer_scheme() {
		let record = TokenRecord::new("access", macros::datetime!(2025-01-01 01:00 UTC));

		assert_eq!(record.authorization_value(), "Bearer access");
	}
}
