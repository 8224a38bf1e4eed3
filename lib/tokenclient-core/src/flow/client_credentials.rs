use std::time::Duration;

use tracing::debug;
use url::Url;

use super::exchange::exchange_token;
use super::parse_service_uri;
use crate::error::FlowError;
use crate::grant::{ClientCredentialsGrant, StandardClientCredentials};
use crate::identity::FlowIdentity;
use crate::jwt::JwtToken;
use crate::parameters::{ClientCredentials, Parameters, RequestParameters};
use crate::token::{CachedToken, DEFAULT_REFRESH_MARGIN, TokenCache};
use crate::transport::{ReqwestTransport, Transport};

/// OAuth2 client-credentials flow.
///
/// The client authenticates as itself; there is no user interaction. The first
/// call to [`token`](Self::token) performs the exchange, later calls reuse the
/// cached token until it comes within the refresh margin of its expiration.
///
/// The flow can be shared (for instance behind an `Arc`): concurrent callers
/// wait for the exchange in progress instead of starting their own.
///
/// ```rust,no_run
/// use tokenclient_core::{ClientCredentials, ClientCredentialsFlow, RequestParameters};
///
/// # async fn example() -> Result<(), tokenclient_core::FlowError> {
/// let flow = ClientCredentialsFlow::new(
///     "https://login.example.com/oauth2/",
///     ClientCredentials::new("daemon", "s3cr3t"),
///     RequestParameters::new().with_scope("orders.read"),
/// )?;
///
/// let token = flow.token().await?;
/// println!("{} expires in {:?}", token.token_type(), token.time_until_expiry());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ClientCredentialsFlow<G = StandardClientCredentials, T = ReqwestTransport> {
    identity: FlowIdentity,
    service_uri: Url,
    credentials: ClientCredentials,
    request: RequestParameters,
    grant: G,
    transport: T,
    refresh_margin: Duration,
    cache: TokenCache,
}

impl ClientCredentialsFlow {
    /// Creates a standard flow using the default HTTP transport.
    pub fn new(
        service_uri: &str,
        credentials: ClientCredentials,
        request: RequestParameters,
    ) -> Result<Self, FlowError> {
        let transport = ReqwestTransport::new().map_err(|err| FlowError::Configuration {
            reason: err.to_string(),
        })?;
        Self::with_grant(service_uri, credentials, request, StandardClientCredentials, transport)
    }
}

impl<T> ClientCredentialsFlow<StandardClientCredentials, T>
where
    T: Transport,
{
    /// Creates a standard flow using the given transport.
    pub fn with_transport(
        service_uri: &str,
        credentials: ClientCredentials,
        request: RequestParameters,
        transport: T,
    ) -> Result<Self, FlowError> {
        Self::with_grant(service_uri, credentials, request, StandardClientCredentials, transport)
    }
}

impl<G, T> ClientCredentialsFlow<G, T>
where
    G: ClientCredentialsGrant,
    T: Transport,
{
    /// Creates a flow with a provider-specific grant strategy.
    pub fn with_grant(
        service_uri: &str,
        credentials: ClientCredentials,
        request: RequestParameters,
        grant: G,
        transport: T,
    ) -> Result<Self, FlowError> {
        let service_uri = parse_service_uri(service_uri)?;
        let identity = FlowIdentity::generate();
        debug!(flow_id = %identity, %service_uri, client_id = credentials.client_id(), "client-credentials flow created");

        Ok(Self {
            identity,
            service_uri,
            credentials,
            request,
            grant,
            transport,
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            cache: TokenCache::default(),
        })
    }

    /// Sets how long before its expiration a cached token is replaced.
    ///
    /// Any token cached so far is dropped.
    #[must_use]
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self.cache = TokenCache::new(margin);
        self
    }

    /// The flow identity, used to correlate log events.
    pub fn flow_id(&self) -> &FlowIdentity {
        &self.identity
    }

    /// The normalized service URI.
    pub fn service_uri(&self) -> &Url {
        &self.service_uri
    }

    /// The client credentials.
    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    /// What the token is requested for.
    pub fn request_parameters(&self) -> &RequestParameters {
        &self.request
    }

    /// The refresh margin in effect.
    pub fn refresh_margin(&self) -> Duration {
        self.refresh_margin
    }

    /// The grant strategy.
    pub fn grant(&self) -> &G {
        &self.grant
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The token endpoint the requests are sent to.
    pub fn token_endpoint(&self) -> Result<Url, FlowError> {
        self.grant.token_endpoint(&self.service_uri)
    }

    /// The form parameters of the token request.
    pub fn token_request_parameters(&self) -> Parameters {
        self.grant.token_parameters(&self.credentials, &self.request)
    }

    /// Returns a fresh token, exchanging the credentials when the cache is empty or stale.
    ///
    /// # Errors
    ///
    /// [`FlowError::TokenExchange`] when the exchange fails; the previous token,
    /// if any, stays cached and the next call tries again.
    pub async fn token(&self) -> Result<CachedToken, FlowError> {
        self.cache
            .get_or_exchange(|| async {
                let endpoint = self.token_endpoint()?;
                exchange_token(
                    &self.transport,
                    endpoint,
                    self.token_request_parameters(),
                    |response| self.grant.extract_token(response),
                )
                .await
            })
            .await
    }

    /// Returns the access token decoded as a JWT.
    pub async fn access_token(&self) -> Result<JwtToken, FlowError> {
        let token = self.token().await?;
        Ok(JwtToken::decode(token.access_token())?)
    }

    /// Returns the raw access token, without decoding it.
    pub async fn access_token_string(&self) -> Result<String, FlowError> {
        let token = self.token().await?;
        Ok(token.access_token().to_string())
    }
}
