use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use super::exchange::exchange_token;
use super::{FlowState, StatePolicy, parse_service_uri};
use crate::error::FlowError;
use crate::grant::{AuthorizationCodeGrant, StandardAuthorizationCode};
use crate::identity::{AuthorizationCode, FlowIdentity};
use crate::jwt::JwtToken;
use crate::parameters::TokenRequestParameters;
use crate::token::{CachedToken, DEFAULT_REFRESH_MARGIN, TokenCache};
use crate::transport::{ReqwestTransport, Transport};
use crate::url_parts::UrlParts;

/// OAuth2 authorization-code flow.
///
/// One instance serves one user authorization:
///
/// 1. send the user agent to [`authorization_uri`](Self::authorization_uri),
/// 2. hand the redirect the server sends back to [`accept_callback`](Self::accept_callback),
/// 3. call [`token`](Self::token) (or [`access_token`](Self::access_token)) whenever a token is needed.
///
/// The flow identity doubles as the OAuth2 `state`, so a callback produced for
/// another flow is rejected. Tokens are cached until they come within the refresh
/// margin of their expiration; the exchange is then replayed with the stored code.
///
/// ```rust,no_run
/// use tokenclient_core::{AuthorizationCodeFlow, TokenRequestParameters};
///
/// # async fn example(callback: String) -> Result<(), tokenclient_core::FlowError> {
/// let parameters = TokenRequestParameters::builder("web-app")
///     .with_client_secret("s3cr3t")
///     .with_redirect_uri("https://app.example.com/callback")
///     .with_scope("openid profile")
///     .build()?;
/// let mut flow = AuthorizationCodeFlow::new("https://login.example.com/oauth2/", parameters)?;
///
/// let redirect_to = flow.authorization_uri()?;
/// // ... the user signs in, the server redirects to `callback` ...
/// flow.accept_callback(&callback)?;
///
/// let bearer = flow.access_token_string().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AuthorizationCodeFlow<G = StandardAuthorizationCode, T = ReqwestTransport> {
    identity: FlowIdentity,
    service_uri: Url,
    parameters: TokenRequestParameters,
    grant: G,
    transport: T,
    state_policy: StatePolicy,
    refresh_margin: Duration,
    code: Option<AuthorizationCode>,
    cache: TokenCache,
}

impl AuthorizationCodeFlow {
    /// Creates a standard flow using the default HTTP transport.
    pub fn new(service_uri: &str, parameters: TokenRequestParameters) -> Result<Self, FlowError> {
        let transport = ReqwestTransport::new().map_err(|err| FlowError::Configuration {
            reason: err.to_string(),
        })?;
        Self::with_grant(service_uri, parameters, StandardAuthorizationCode, transport)
    }
}

impl<T> AuthorizationCodeFlow<StandardAuthorizationCode, T>
where
    T: Transport,
{
    /// Creates a standard flow using the given transport.
    pub fn with_transport(
        service_uri: &str,
        parameters: TokenRequestParameters,
        transport: T,
    ) -> Result<Self, FlowError> {
        Self::with_grant(service_uri, parameters, StandardAuthorizationCode, transport)
    }
}

impl<G, T> AuthorizationCodeFlow<G, T>
where
    G: AuthorizationCodeGrant,
    T: Transport,
{
    /// Creates a flow with a provider-specific grant strategy.
    ///
    /// # Errors
    ///
    /// Fails when the service URI is unusable or when no redirect URI is configured.
    pub fn with_grant(
        service_uri: &str,
        parameters: TokenRequestParameters,
        grant: G,
        transport: T,
    ) -> Result<Self, FlowError> {
        let service_uri = parse_service_uri(service_uri)?;
        if parameters.redirect_uri().is_none() {
            return Err(FlowError::Configuration {
                reason: "the authorization-code flow requires a redirect URI".to_string(),
            });
        }

        let identity = FlowIdentity::generate();
        debug!(flow_id = %identity, %service_uri, client_id = parameters.client_id(), "authorization-code flow created");

        Ok(Self {
            identity,
            service_uri,
            parameters,
            grant,
            transport,
            state_policy: StatePolicy::default(),
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            code: None,
            cache: TokenCache::default(),
        })
    }

    /// Sets how callbacks without a `state` parameter are handled.
    #[must_use]
    pub fn with_state_policy(mut self, policy: StatePolicy) -> Self {
        self.state_policy = policy;
        self
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

    /// The flow identity, also sent as the `state` parameter.
    pub fn flow_id(&self) -> &FlowIdentity {
        &self.identity
    }

    /// The normalized service URI.
    pub fn service_uri(&self) -> &Url {
        &self.service_uri
    }

    /// The client configuration.
    pub fn parameters(&self) -> &TokenRequestParameters {
        &self.parameters
    }

    /// The state policy in effect.
    pub fn state_policy(&self) -> StatePolicy {
        self.state_policy
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

    /// Builds the URI the user agent must visit to authorize this client.
    pub fn authorization_uri(&self) -> Result<Url, FlowError> {
        let endpoint = self.grant.authorization_endpoint(&self.service_uri)?;
        let query = self
            .grant
            .authorization_parameters(&self.parameters, &self.identity);
        Ok(UrlParts::compose(endpoint, query))
    }

    /// Accepts the redirect sent back by the authorization server.
    ///
    /// The `state` is checked first, then the code is extracted and stored.
    ///
    /// # Errors
    ///
    /// - [`FlowError::InvalidCallbackUri`] if the URI cannot be parsed,
    /// - [`FlowError::InvalidState`] if the `state` belongs to another flow,
    /// - [`FlowError::MissingState`] if `state` is absent and required,
    /// - [`FlowError::CallbackAlreadyAccepted`] if a code is already stored,
    /// - [`FlowError::MissingAuthorizationCode`] if there is no `code`.
    pub fn accept_callback(&mut self, callback_uri: impl AsRef<str>) -> Result<(), FlowError> {
        let parts = UrlParts::parse(callback_uri.as_ref())
            .map_err(|err| FlowError::InvalidCallbackUri {
                reason: err.to_string(),
            })?;
        let query = parts.parameters();

        match self.grant.state_from_parameters(query) {
            Some(state) if self.identity.matches(state) => {}
            Some(state) => {
                warn!(flow_id = %self.identity, received = state, "callback state does not match this flow");
                return Err(FlowError::InvalidState {
                    received: state.to_string(),
                });
            }
            None if self.state_policy == StatePolicy::Required => {
                warn!(flow_id = %self.identity, "callback has no state");
                return Err(FlowError::MissingState);
            }
            None => {
                warn!(flow_id = %self.identity, "callback has no state, skipping verification");
            }
        }

        if self.code.is_some() {
            return Err(FlowError::CallbackAlreadyAccepted);
        }

        let code = self
            .grant
            .code_from_parameters(query)
            .ok_or(FlowError::MissingAuthorizationCode)?;
        self.code = Some(AuthorizationCode::new(code));
        debug!(flow_id = %self.identity, "authorization code accepted");

        Ok(())
    }

    /// Returns where this flow stands.
    pub async fn state(&self) -> FlowState {
        if self.cache.is_populated().await {
            FlowState::TokenCached
        } else if self.code.is_some() {
            FlowState::CodeReceived
        } else {
            FlowState::Created
        }
    }

    /// Returns a fresh token, exchanging the stored code when the cache is empty or stale.
    ///
    /// # Errors
    ///
    /// [`FlowError::AuthorizationCodeRequired`] before a callback was accepted,
    /// [`FlowError::TokenExchange`] when the exchange fails.
    pub async fn token(&self) -> Result<CachedToken, FlowError> {
        let code = self
            .code
            .as_ref()
            .ok_or(FlowError::AuthorizationCodeRequired)?;

        self.cache
            .get_or_exchange(|| async {
                let endpoint = self.grant.token_endpoint(&self.service_uri)?;
                let form = self.grant.token_parameters(&self.parameters, code);
                exchange_token(&self.transport, endpoint, form, |response| {
                    self.grant.extract_token(response)
                })
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
