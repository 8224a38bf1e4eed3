//! Grant strategies: the customizable steps of each flow.
//!
//! A flow runs a fixed algorithm (compose, verify, exchange, cache) and asks its
//! grant strategy for everything a provider may want to change: endpoints,
//! parameter sets and the interpretation of responses. Every method has a default
//! body implementing plain OAuth2, so a provider only overrides what differs.
//!
//! ```rust
//! use tokenclient_core::{
//!     ClientCredentials, ClientCredentialsGrant, Parameters, RequestParameters,
//!     StandardClientCredentials,
//! };
//!
//! /// A provider that wants an `audience` instead of a `scope`.
//! struct AudienceGrant;
//!
//! impl ClientCredentialsGrant for AudienceGrant {
//!     fn token_parameters(
//!         &self,
//!         credentials: &ClientCredentials,
//!         parameters: &RequestParameters,
//!     ) -> Parameters {
//!         let mut form = StandardClientCredentials.token_parameters(credentials, parameters);
//!         if let Some(scope) = form.remove("scope") {
//!             form.insert("audience", scope);
//!         }
//!         form
//!     }
//! }
//! ```

use std::time::Duration;

use url::Url;

use crate::error::FlowError;
use crate::identity::{AuthorizationCode, FlowIdentity};
use crate::parameters::{ClientCredentials, Parameters, RequestParameters, TokenRequestParameters};
use crate::token::CachedToken;
use crate::transport::ProtocolResponse;

/// Customizable steps of the authorization-code flow.
pub trait AuthorizationCodeGrant: Send + Sync {
    /// The authorization endpoint, `authorize` relative to the service URI by default.
    fn authorization_endpoint(&self, service_uri: &Url) -> Result<Url, FlowError> {
        resolve_endpoint(service_uri, "authorize")
    }

    /// The token endpoint, `token` relative to the service URI by default.
    fn token_endpoint(&self, service_uri: &Url) -> Result<Url, FlowError> {
        resolve_endpoint(service_uri, "token")
    }

    /// Query parameters of the authorization request.
    fn authorization_parameters(
        &self,
        parameters: &TokenRequestParameters,
        state: &FlowIdentity,
    ) -> Parameters {
        let mut query = Parameters::new()
            .with("response_type", "code")
            .with("client_id", parameters.client_id());
        if let Some(redirect_uri) = parameters.redirect_uri() {
            query.insert("redirect_uri", redirect_uri.as_str());
        }
        query.insert("state", state.as_str());
        if let Some(scope) = parameters.scope() {
            query.insert("scope", scope);
        }
        query
    }

    /// Form parameters of the code-for-token request.
    fn token_parameters(
        &self,
        parameters: &TokenRequestParameters,
        code: &AuthorizationCode,
    ) -> Parameters {
        let mut form = Parameters::new()
            .with("grant_type", "authorization_code")
            .with("client_id", parameters.client_id());
        if !parameters.client_secret().is_empty() {
            form.insert("client_secret", parameters.client_secret().as_str());
        }
        if let Some(redirect_uri) = parameters.redirect_uri() {
            form.insert("redirect_uri", redirect_uri.as_str());
        }
        form.insert("code", code.as_str());
        form
    }

    /// Reads the `state` echoed on the callback.
    fn state_from_parameters<'a>(&self, query: &'a Parameters) -> Option<&'a str> {
        query.get("state")
    }

    /// Reads the authorization code from the callback; empty values count as missing.
    fn code_from_parameters<'a>(&self, query: &'a Parameters) -> Option<&'a str> {
        query.get("code").filter(|code| !code.is_empty())
    }

    /// Turns a successful token response into a cached token.
    fn extract_token(&self, response: &ProtocolResponse) -> Result<CachedToken, FlowError> {
        extract_bearer_token(response)
    }
}

/// Customizable steps of the client-credentials flow.
pub trait ClientCredentialsGrant: Send + Sync {
    /// The token endpoint, `token` relative to the service URI by default.
    fn token_endpoint(&self, service_uri: &Url) -> Result<Url, FlowError> {
        resolve_endpoint(service_uri, "token")
    }

    /// Form parameters of the token request.
    fn token_parameters(
        &self,
        credentials: &ClientCredentials,
        parameters: &RequestParameters,
    ) -> Parameters {
        let mut form = Parameters::new()
            .with("grant_type", "client_credentials")
            .with("client_id", credentials.client_id());
        if !credentials.client_secret().is_empty() {
            form.insert("client_secret", credentials.client_secret().as_str());
        }
        if let Some(scope) = parameters.scope() {
            form.insert("scope", scope);
        }
        form
    }

    /// Turns a successful token response into a cached token.
    fn extract_token(&self, response: &ProtocolResponse) -> Result<CachedToken, FlowError> {
        extract_bearer_token(response)
    }
}

/// Plain OAuth2 authorization-code grant.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAuthorizationCode;

impl AuthorizationCodeGrant for StandardAuthorizationCode {}

/// Plain OAuth2 client-credentials grant.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardClientCredentials;

impl ClientCredentialsGrant for StandardClientCredentials {}

/// Resolves `path` relative to the service URI.
pub fn resolve_endpoint(service_uri: &Url, path: &str) -> Result<Url, FlowError> {
    service_uri
        .join(path)
        .map_err(|err| FlowError::InvalidServiceUri {
            url: service_uri.to_string(),
            reason: format!("cannot resolve '{path}': {err}"),
        })
}

/// Reads `token_type`, `access_token` and `expires_in` from a token response.
///
/// The token expires `expires_in` seconds after this call.
pub fn extract_bearer_token(response: &ProtocolResponse) -> Result<CachedToken, FlowError> {
    let token_type = required_field(response, "token_type")?;
    let access_token = required_field(response, "access_token")?;
    let expires_in = required_field(response, "expires_in")?;
    let lifetime = expires_in
        .trim()
        .parse::<u64>()
        .map_err(|err| FlowError::TokenExchange {
            reason: format!("invalid 'expires_in' value '{expires_in}': {err}"),
        })?;

    CachedToken::with_lifetime(access_token, token_type, Duration::from_secs(lifetime)).ok_or_else(|| {
        FlowError::TokenExchange {
            reason: format!("'expires_in' out of range: {lifetime}"),
        }
    })
}

fn required_field<'a>(response: &'a ProtocolResponse, name: &str) -> Result<&'a str, FlowError> {
    response
        .parameter(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| FlowError::TokenExchange {
            reason: format!("token response is missing '{name}'"),
        })
}
