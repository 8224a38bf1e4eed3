//! Token acquisition flows.
//!
//! - [`AuthorizationCodeFlow`]: redirect the user, accept the callback, exchange
//!   the code, cache the token.
//! - [`ClientCredentialsFlow`]: exchange the client's own credentials, cache the token.
//!
//! Both flows cache at most one token and refresh it through a new exchange once
//! it is within the refresh margin of its expiration.

use url::Url;

use crate::error::FlowError;

mod exchange;

mod authorization_code;
pub use self::authorization_code::AuthorizationCodeFlow;

mod client_credentials;
pub use self::client_credentials::ClientCredentialsFlow;

/// Lifecycle of an authorization-code flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum FlowState {
    /// Waiting for the authorization callback.
    #[display("created")]
    Created,
    /// A code was accepted, no token obtained yet.
    #[display("code received")]
    CodeReceived,
    /// A token was obtained and cached.
    #[display("token cached")]
    TokenCached,
}

/// How a callback without a `state` parameter is handled.
///
/// A present `state` is always checked against the flow identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatePolicy {
    /// Accept callbacks without `state`, logging a warning.
    #[default]
    VerifyIfPresent,
    /// Reject callbacks without `state` with [`FlowError::MissingState`].
    Required,
}

/// Parses a service URI, the base from which provider endpoints are resolved.
///
/// A trailing `/` is added to the path when missing, so that relative endpoints
/// are resolved below the last path segment instead of replacing it.
///
/// ```rust
/// # use tokenclient_core::parse_service_uri;
/// let uri = parse_service_uri("https://login.example.com/tenant")?;
/// assert_eq!(uri.join("token")?.as_str(), "https://login.example.com/tenant/token");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_service_uri(service_uri: &str) -> Result<Url, FlowError> {
    let invalid = |reason: String| FlowError::InvalidServiceUri {
        url: service_uri.to_string(),
        reason,
    };

    let mut url = Url::parse(service_uri).map_err(|err| invalid(err.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("cannot be used as a base URL".to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
