//! Internal OAuth client facade for the client-credentials exchange.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, FetchError, TransportError},
	http::{self, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	issuer::{ClientAuthMethod, IssuerDescriptor, ScopeSet},
	token::TokenRecord,
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeTokenResponse = oauth2::basic::BasicTokenResponse;
type ExchangeFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TokenRecord, ExchangeFailure>> + 'a + Send>>;

/// Maps HTTP transport failures into depot [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a depot error.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(meta, message),
			_ => map_unknown_transport_error(meta),
		}
	}
}

/// Retryable-versus-fatal split for a single exchange attempt.
///
/// The retry loop only ever replays throttled attempts; everything else surfaces to the caller
/// unchanged.
#[derive(Debug)]
pub(crate) enum ExchangeFailure {
	/// Issuer throttled the attempt.
	Throttled { retry_after: Option<Duration> },
	/// Terminal failure for this acquire call.
	Fatal(Error),
}
impl From<FetchError> for ExchangeFailure {
	fn from(e: FetchError) -> Self {
		Self::Fatal(e.into())
	}
}

pub(crate) struct CredentialsFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	scope: ScopeSet,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> CredentialsFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &IssuerDescriptor,
		client_id: &str,
		client_secret: &str,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(descriptor.token_endpoint.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let mut oauth_client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_client_secret(ClientSecret::new(client_secret.to_owned()))
			.set_token_uri(token_url);

		if matches!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self {
			oauth_client,
			scope: descriptor.scope.clone(),
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
		})
	}

	/// Executes one client-credentials exchange, anchoring the expiry at `issued_at`.
	pub(crate) fn exchange(&self, issued_at: OffsetDateTime) -> ExchangeFuture<'_> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let mut request = self.oauth_client.exchange_client_credentials();

			for scope in self.scope.iter() {
				request = request.add_scope(Scope::new(scope.to_owned()));
			}

			let response = request.request_async(&instrumented).await.map_err(|err| {
				classify_exchange_error(meta.take(), err, self.error_mapper.as_ref())
			})?;

			map_token_response(issued_at, response)
		})
	}
}

fn classify_exchange_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> ExchangeFailure
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	// Throttling is keyed off the observed status, not the response shape; issuers send 429
	// bodies in every imaginable dialect.
	if meta_status(meta_ref) == Some(429) {
		return ExchangeFailure::Throttled { retry_after: meta_retry_after(meta_ref) };
	}

	match err {
		RequestTokenError::ServerResponse(response) =>
			ExchangeFailure::Fatal(map_server_rejection(response, meta_ref)),
		RequestTokenError::Request(error) =>
			ExchangeFailure::Fatal(mapper.map_transport_error(meta_ref, error)),
		RequestTokenError::Parse(error, body) =>
			ExchangeFailure::Fatal(map_parse_failure(error, &body, meta_ref)),
		RequestTokenError::Other(message) => FetchError::Unexpected {
			message,
			status: meta_status(meta_ref),
		}
		.into(),
	}
}

fn map_server_rejection(response: BasicErrorResponse, meta: Option<&ResponseMetadata>) -> Error {
	match meta_status(meta) {
		Some(status) => FetchError::Rejected {
			status,
			body: meta
				.and_then(|value| value.body_preview.clone())
				.unwrap_or_else(|| oauth_error_text(&response)),
		}
		.into(),
		None =>
			FetchError::Unexpected { message: oauth_error_text(&response), status: None }.into(),
	}
}

fn map_parse_failure(
	error: serde_path_to_error::Error<serde_json::error::Error>,
	body: &[u8],
	meta: Option<&ResponseMetadata>,
) -> Error {
	match meta_status(meta) {
		// An undecodable success payload means the issuer broke the token contract; any other
		// status is a plain rejection whose body just is not OAuth-shaped.
		Some(status) if (200..300).contains(&status) =>
			FetchError::MalformedResponse { source: error, status: Some(status) }.into(),
		Some(status) => FetchError::Rejected { status, body: http::preview_text(body) }.into(),
		None => FetchError::MalformedResponse { source: error, status: None }.into(),
	}
}

fn map_token_response(
	issued_at: OffsetDateTime,
	response: FacadeTokenResponse,
) -> Result<TokenRecord, ExchangeFailure> {
	let expires_in = response.expires_in().ok_or(FetchError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| FetchError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(FetchError::NonPositiveExpiresIn.into());
	}

	Ok(TokenRecord::with_lifetime(
		response.access_token().secret().to_owned(),
		issued_at,
		Duration::seconds(expires_in),
	))
}

fn oauth_error_text(response: &BasicErrorResponse) -> String {
	match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return FetchError::Unexpected {
			message: "Request timed out while calling the token endpoint.".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
		}
		.into();
	}

	TransportError::from(err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(meta: Option<&ResponseMetadata>, message: impl Display) -> Error {
	FetchError::Unexpected {
		message: format!("HTTP client error occurred while calling the token endpoint: {message}"),
		status: meta_status(meta),
	}
	.into()
}

#[cfg(feature = "reqwest")]
fn map_unknown_transport_error(meta: Option<&ResponseMetadata>) -> Error {
	FetchError::Unexpected {
		message: "HTTP client error occurred while calling the token endpoint.".into(),
		status: meta_status(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
