//! # Tokenclient Core
//!
//! Acquire OAuth2 access tokens on behalf of an application.
//!
//! This crate provides two flows:
//! - **[`AuthorizationCodeFlow`]** - a user authorizes the client in a browser, the
//!   client exchanges the code it receives on its redirect URI
//! - **[`ClientCredentialsFlow`]** - the client authenticates as itself
//!
//! Both flows cache the token they obtain and transparently exchange a new one
//! when it gets close to its expiration (see [`DEFAULT_REFRESH_MARGIN`]).
//!
//! ## Quick Start
//!
//! ### Client credentials
//!
//! ```rust,no_run
//! use tokenclient_core::{ClientCredentials, ClientCredentialsFlow, RequestParameters};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let flow = ClientCredentialsFlow::new(
//!     "https://login.example.com/oauth2/",
//!     ClientCredentials::new("daemon", "s3cr3t"),
//!     RequestParameters::new().with_scope("orders.read"),
//! )?;
//!
//! // First call exchanges the credentials, next ones reuse the cached token
//! let bearer = flow.access_token_string().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Authorization code
//!
//! ```rust,no_run
//! use tokenclient_core::{AuthorizationCodeFlow, StatePolicy, TokenRequestParameters};
//!
//! # async fn example(callback_uri: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let parameters = TokenRequestParameters::builder("web-app")
//!     .with_client_secret("s3cr3t")
//!     .with_redirect_uri("https://app.example.com/callback")
//!     .add_scopes(["openid", "profile"])
//!     .build()?;
//!
//! let mut flow = AuthorizationCodeFlow::new("https://login.example.com/oauth2/", parameters)?
//!     .with_state_policy(StatePolicy::Required);
//!
//! // Redirect the user agent here
//! let authorize = flow.authorization_uri()?;
//!
//! // Then feed the redirect back to the flow
//! flow.accept_callback(callback_uri)?;
//! let jwt = flow.access_token().await?;
//! println!("signed in as {:?}", jwt.subject());
//! # Ok(())
//! # }
//! ```
//!
//! ## Providers
//!
//! Providers that deviate from plain OAuth2 implement [`AuthorizationCodeGrant`] or
//! [`ClientCredentialsGrant`], overriding only the steps that differ, and build
//! flows with `with_grant`.
//!
//! ## Transport
//!
//! HTTP goes through the [`Transport`] trait. [`ReqwestTransport`] is the default;
//! [`InMemoryTransport`] serves canned responses for tests.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: `debug` for the flow lifecycle and
//! exchanges, `warn` for rejected callbacks and failed exchanges. Secrets, codes
//! and tokens are never logged.

mod error;
mod grant;
mod identity;
mod jwt;
mod parameters;
mod secure;
mod token;
mod url_parts;

pub mod flow;
pub mod transport;

pub use self::error::FlowError;
pub use self::flow::{AuthorizationCodeFlow, ClientCredentialsFlow, FlowState, StatePolicy, parse_service_uri};
pub use self::grant::{
    AuthorizationCodeGrant, ClientCredentialsGrant, StandardAuthorizationCode, StandardClientCredentials,
    extract_bearer_token, resolve_endpoint,
};
pub use self::identity::{AuthorizationCode, FlowIdentity};
pub use self::jwt::{JwtToken, TokenDecodeError};
pub use self::parameters::{
    ClientCredentials, Parameters, RequestParameters, TokenRequestParameters, TokenRequestParametersBuilder,
};
pub use self::secure::SecureString;
pub use self::token::{CachedToken, DEFAULT_REFRESH_MARGIN};
pub use self::transport::{
    InMemoryTransport, ProtocolRequest, ProtocolResponse, ReqwestTransport, Transport, TransportError,
};
pub use self::url_parts::UrlParts;
