//! Issuer endpoint description, scope configuration, and identifier validation.

/// Scope modeling for the fixed per-issuer scope request.
pub mod scope;
pub use scope::*;

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const ISSUER_ID_MAX_LEN: usize = 128;

/// Error returned when issuer identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IssuerIdError {
	/// The identifier was empty.
	#[error("Issuer identifier cannot be empty.")]
	Empty,
	/// The identifier contains a character outside the label-safe set.
	#[error("Issuer identifier contains an unsupported character: {character:?}.")]
	InvalidCharacter {
		/// The offending character.
		character: char,
	},
	/// The identifier exceeded the allowed character count.
	#[error("Issuer identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Validated identifier naming the remote credential issuer.
///
/// The identifier flows into store keys, log fields, and metrics labels, so it is restricted to
/// ASCII alphanumerics plus `.`, `_`, and `-`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IssuerId(String);
impl IssuerId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IssuerIdError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for IssuerId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for IssuerId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<IssuerId> for String {
	fn from(value: IssuerId) -> Self {
		value.0
	}
}
impl TryFrom<String> for IssuerId {
	type Error = IssuerIdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Borrow<str> for IssuerId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for IssuerId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Issuer({})", self.0)
	}
}
impl Display for IssuerId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for IssuerId {
	type Err = IssuerIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), IssuerIdError> {
	if view.is_empty() {
		return Err(IssuerIdError::Empty);
	}
	if view.len() > ISSUER_ID_MAX_LEN {
		return Err(IssuerIdError::TooLong { max: ISSUER_ID_MAX_LEN });
	}
	if let Some(character) =
		view.chars().find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '_' | '-'))
	{
		return Err(IssuerIdError::InvalidCharacter { character });
	}

	Ok(())
}

/// Client authentication modes for the token endpoint call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}

/// Errors raised while constructing or validating issuer descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum IssuerDescriptorError {
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Non-loopback endpoints must use HTTPS.
	#[error("The token endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Immutable description of the remote credential issuer consumed by the manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerDescriptor {
	/// Issuer identifier.
	pub id: IssuerId,
	/// Token endpoint receiving the client-credentials request.
	pub token_endpoint: Url,
	/// Fixed scope requested on every fetch.
	pub scope: ScopeSet,
	/// Client authentication placement for the credential pair.
	pub client_auth_method: ClientAuthMethod,
}
impl IssuerDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: IssuerId) -> IssuerDescriptorBuilder {
		IssuerDescriptorBuilder::new(id)
	}
}

/// Builder for [`IssuerDescriptor`] values.
#[derive(Debug)]
pub struct IssuerDescriptorBuilder {
	/// Identifier for the descriptor being constructed.
	pub id: IssuerId,
	/// Token endpoint receiving the client-credentials request.
	pub token_endpoint: Option<Url>,
	/// Fixed scope requested on every fetch.
	pub scope: ScopeSet,
	/// Client authentication placement for the credential pair.
	pub client_auth_method: ClientAuthMethod,
}
impl IssuerDescriptorBuilder {
	/// Creates a new builder seeded with the provided identifier.
	pub fn new(id: IssuerId) -> Self {
		Self {
			id,
			token_endpoint: None,
			scope: ScopeSet::default(),
			client_auth_method: ClientAuthMethod::default(),
		}
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the fixed scope requested on every fetch.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<IssuerDescriptor, IssuerDescriptorError> {
		let token_endpoint =
			self.token_endpoint.ok_or(IssuerDescriptorError::MissingTokenEndpoint)?;

		validate_endpoint(&token_endpoint)?;

		Ok(IssuerDescriptor {
			id: self.id,
			token_endpoint,
			scope: self.scope,
			client_auth_method: self.client_auth_method,
		})
	}
}

fn validate_endpoint(url: &Url) -> Result<(), IssuerDescriptorError> {
	// Plain HTTP is tolerated for loopback hosts only, so local issuer stubs stay reachable.
	if url.scheme() == "https" || (url.scheme() == "http" && is_loopback(url)) {
		Ok(())
	} else {
		Err(IssuerDescriptorError::InsecureEndpoint { url: url.to_string() })
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Ipv4(address)) => address.is_loopback(),
		Some(url::Host::Ipv6(address)) => address.is_loopback(),
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		None => false,
	}
}
