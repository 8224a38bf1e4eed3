//! Protocol parameter sets and the client configuration they are built from.

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;
use url::Url;

use crate::error::FlowError;
use crate::secure::SecureString;

/// Parameter names whose values are never printed.
const SENSITIVE_PARAMETERS: &[&str] = &[
    "client_secret",
    "code",
    "access_token",
    "refresh_token",
    "id_token",
];

/// An ordered set of string-keyed protocol parameters.
///
/// Used for authorization query strings, token request bodies, callback query
/// parameters and token responses alike. Insertion order is kept so that the
/// wire representation is stable.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Parameters(IndexMap<String, String>);

impl Parameters {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, returning the builder for chaining.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces a parameter, returning the previous value.
    ///
    /// A replaced parameter keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    /// Removes a parameter, keeping the order of the remaining ones.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.shift_remove(name)
    }

    /// Returns the value of a parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns `true` if the parameter is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the parameter names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encodes the parameters as `application/x-www-form-urlencoded`.
    pub fn to_form(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut parameters = Self::new();
        for (name, value) in iter {
            parameters.insert(name, value);
        }
        parameters
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.iter() {
            if SENSITIVE_PARAMETERS.contains(&name) {
                map.entry(&name, &"[REDACTED]");
            } else {
                map.entry(&name, &value);
            }
        }
        map.finish()
    }
}

/// Client configuration for the authorization-code flow.
///
/// Use [`TokenRequestParameters::builder`] to create instances. The struct can also
/// be deserialized from an application's own configuration file.
#[derive(Clone, Deserialize)]
pub struct TokenRequestParameters {
    client_id: String,
    #[serde(default)]
    client_secret: SecureString,
    #[serde(default)]
    redirect_uri: Option<Url>,
    #[serde(default)]
    scopes: Vec<String>,
}

impl TokenRequestParameters {
    /// Creates a builder for the given client id.
    pub fn builder(client_id: impl Into<String>) -> TokenRequestParametersBuilder {
        TokenRequestParametersBuilder::new(client_id)
    }

    /// The client identifier.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The client secret, empty for public clients.
    pub fn client_secret(&self) -> &SecureString {
        &self.client_secret
    }

    /// The redirect URI registered for this client.
    pub fn redirect_uri(&self) -> Option<&Url> {
        self.redirect_uri.as_ref()
    }

    /// The requested scopes.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// The space-delimited `scope` value, if any scope was requested.
    pub fn scope(&self) -> Option<String> {
        join_scopes(&self.scopes)
    }
}

impl fmt::Debug for TokenRequestParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequestParameters")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Builder for [`TokenRequestParameters`].
#[derive(Debug, Clone)]
pub struct TokenRequestParametersBuilder {
    client_id: String,
    client_secret: SecureString,
    redirect_uri: Option<String>,
    scopes: Vec<String>,
}

impl TokenRequestParametersBuilder {
    fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecureString::default(),
            redirect_uri: None,
            scopes: Vec::new(),
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<SecureString>) -> Self {
        self.client_secret = secret.into();
        self
    }

    /// Sets the redirect URI. It is validated by [`build`](Self::build).
    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Replaces the requested scopes with a single scope value.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes = vec![scope.into()];
        self
    }

    /// Adds a scope.
    #[must_use]
    pub fn add_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Adds multiple scopes.
    #[must_use]
    pub fn add_scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scopes.extend(scopes.into_iter().map(Into::into));
        self
    }

    /// Builds the parameters, validating the redirect URI.
    pub fn build(self) -> Result<TokenRequestParameters, FlowError> {
        let redirect_uri = self
            .redirect_uri
            .map(|uri| {
                Url::parse(&uri).map_err(|err| FlowError::InvalidRedirectUri {
                    url: uri.clone(),
                    reason: err.to_string(),
                })
            })
            .transpose()?;

        Ok(TokenRequestParameters {
            client_id: self.client_id,
            client_secret: self.client_secret,
            redirect_uri,
            scopes: self.scopes,
        })
    }
}

/// Client identity for the client-credentials flow.
#[derive(Clone, Deserialize)]
pub struct ClientCredentials {
    client_id: String,
    #[serde(default)]
    client_secret: SecureString,
}

impl ClientCredentials {
    /// Creates client credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<SecureString>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// The client identifier.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The client secret.
    pub fn client_secret(&self) -> &SecureString {
        &self.client_secret
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// What a client-credentials token is requested for.
///
/// Standard servers read the `scope`; some providers expect a `resource`
/// identifier instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RequestParameters {
    #[serde(default)]
    scopes: Vec<String>,
    #[serde(default)]
    resource: Option<String>,
}

impl RequestParameters {
    /// Creates empty request parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the requested scopes with a single scope value.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes = vec![scope.into()];
        self
    }

    /// Adds a scope.
    #[must_use]
    pub fn add_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Sets the target resource identifier.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// The requested scopes.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// The space-delimited `scope` value, if any scope was requested.
    pub fn scope(&self) -> Option<String> {
        join_scopes(&self.scopes)
    }

    /// The target resource identifier.
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }
}

fn join_scopes(scopes: &[String]) -> Option<String> {
    (!scopes.is_empty()).then(|| scopes.join(" "))
}
