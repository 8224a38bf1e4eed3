//! # Tokenclient Azure
//!
//! Azure AD (v1 endpoints) flavor of the client-credentials flow.
//!
//! Azure AD deviates from plain OAuth2 in two ways:
//! - the token endpoint is `{service uri}/oauth2/token`, where the service URI
//!   already names the tenant (`https://login.microsoftonline.com/contoso.onmicrosoft.com`),
//! - the token is requested for a `resource` instead of a `scope`.
//!
//! ```rust,no_run
//! use tokenclient_azure::AzureAdClientCredentialsFlow;
//! use tokenclient_core::{ClientCredentials, RequestParameters};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let flow = AzureAdClientCredentialsFlow::new(
//!     "https://login.microsoftonline.com/contoso.onmicrosoft.com",
//!     ClientCredentials::new("daemon", "s3cr3t"),
//!     RequestParameters::new().with_resource("https://graph.windows.net"),
//! )?;
//!
//! // All `ClientCredentialsFlow` methods are available through `Deref`
//! let bearer = flow.access_token_string().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tokenclient_core::{
    ClientCredentials, ClientCredentialsFlow, ClientCredentialsGrant, FlowError, Parameters,
    ReqwestTransport, RequestParameters, StandardClientCredentials, Transport,
};
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// Path of the token endpoint, relative to the tenant-scoped service URI.
pub const AZURE_AD_TOKEN_PATH: &str = "oauth2/token";

/// Azure AD client-credentials grant: tenant-relative endpoint, `resource` instead of `scope`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureAdClientCredentials {
    resource: String,
}

impl AzureAdClientCredentials {
    /// Creates the grant for the given resource identifier.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }

    /// The resource the tokens are requested for.
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl ClientCredentialsGrant for AzureAdClientCredentials {
    fn token_endpoint(&self, service_uri: &Url) -> Result<Url, FlowError> {
        let path = format!("{}/{AZURE_AD_TOKEN_PATH}", service_uri.path().trim_end_matches('/'));
        service_uri
            .join(&path)
            .map_err(|err| FlowError::InvalidServiceUri {
                url: service_uri.to_string(),
                reason: err.to_string(),
            })
    }

    fn token_parameters(
        &self,
        credentials: &ClientCredentials,
        parameters: &RequestParameters,
    ) -> Parameters {
        let mut form = StandardClientCredentials.token_parameters(credentials, parameters);
        form.remove("scope");
        form.insert("resource", self.resource.as_str());
        form
    }
}

/// Client-credentials flow against Azure AD.
///
/// Derefs to the underlying [`ClientCredentialsFlow`].
#[derive(Debug, derive_more::Deref)]
pub struct AzureAdClientCredentialsFlow<T = ReqwestTransport> {
    inner: ClientCredentialsFlow<AzureAdClientCredentials, T>,
}

impl AzureAdClientCredentialsFlow {
    /// Creates a flow using the default HTTP transport.
    ///
    /// # Errors
    ///
    /// - [`FlowError::MalformedServiceUri`] if the service URI ends with a tenant GUID,
    /// - [`FlowError::Configuration`] if `request` has no resource.
    pub fn new(
        service_uri: &str,
        credentials: ClientCredentials,
        request: RequestParameters,
    ) -> Result<Self, FlowError> {
        let transport = ReqwestTransport::new().map_err(|err| FlowError::Configuration {
            reason: err.to_string(),
        })?;
        Self::with_transport(service_uri, credentials, request, transport)
    }
}

impl<T> AzureAdClientCredentialsFlow<T>
where
    T: Transport,
{
    /// Creates a flow using the given transport.
    pub fn with_transport(
        service_uri: &str,
        credentials: ClientCredentials,
        request: RequestParameters,
        transport: T,
    ) -> Result<Self, FlowError> {
        let service_uri = tokenclient_core::parse_service_uri(service_uri)?;
        check_not_guid_terminated(&service_uri)?;

        let resource = request
            .resource()
            .filter(|resource| !resource.trim().is_empty())
            .ok_or_else(|| FlowError::Configuration {
                reason: "Azure AD client credentials require a resource".to_string(),
            })?;
        let grant = AzureAdClientCredentials::new(resource);
        debug!(%service_uri, resource = grant.resource(), "Azure AD flow configured");

        let inner = ClientCredentialsFlow::with_grant(service_uri.as_str(), credentials, request, grant, transport)?;
        Ok(Self { inner })
    }

    /// Sets how long before its expiration a cached token is replaced.
    #[must_use]
    pub fn with_refresh_margin(self, margin: Duration) -> Self {
        Self {
            inner: self.inner.with_refresh_margin(margin),
        }
    }

    /// Returns the underlying flow.
    pub fn into_inner(self) -> ClientCredentialsFlow<AzureAdClientCredentials, T> {
        self.inner
    }
}

/// Rejects service URIs whose last path segment is a GUID.
fn check_not_guid_terminated(service_uri: &Url) -> Result<(), FlowError> {
    let last_segment = service_uri
        .path_segments()
        .and_then(|segments| segments.filter(|segment| !segment.is_empty()).next_back());

    match last_segment {
        Some(segment) if Uuid::try_parse(segment).is_ok() => Err(FlowError::MalformedServiceUri {
            url: service_uri.to_string(),
            reason: format!("the path already ends with the GUID '{segment}'"),
        }),
        _ => Ok(()),
    }
}
