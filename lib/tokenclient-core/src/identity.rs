use std::fmt;

use uuid::Uuid;

use crate::secure::SecureString;

/// Opaque per-flow random value used as the OAuth2 `state` parameter.
///
/// 128 random bits rendered as 32 lowercase hex characters. It is generated once
/// when a flow is created and never changes. It protects the callback against
/// CSRF; it is not a secret credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub struct FlowIdentity(String);

impl FlowIdentity {
    /// Generates a fresh random identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// The identity as sent in the `state` parameter.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks a `state` value echoed by the authorization server.
    ///
    /// The comparison ignores ASCII case.
    pub fn matches(&self, state: &str) -> bool {
        self.0.eq_ignore_ascii_case(state)
    }
}

impl AsRef<str> for FlowIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The one-time code returned by the authorization server.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationCode(SecureString);

impl AuthorizationCode {
    /// Wraps a code received on the callback.
    pub fn new(code: impl Into<String>) -> Self {
        Self(SecureString::new(code))
    }

    /// The code as sent to the token endpoint.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthorizationCode([REDACTED])")
    }
}
