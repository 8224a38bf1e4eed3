//! Flow error types.

use crate::jwt::TokenDecodeError;
use crate::transport::TransportError;

/// Errors returned by the token acquisition flows.
///
/// Every error is surfaced to the caller of the operation that detected it.
/// Nothing is retried: a failed exchange leaves the token cache untouched and the
/// next call starts a fresh exchange.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum FlowError {
    /// The callback carried a `state` that does not match this flow's identity.
    ///
    /// Signals a possible CSRF attack or a response meant for another flow.
    #[display("Response does not belong to this flow: unexpected state '{received}'")]
    InvalidState {
        /// The `state` value found in the callback.
        received: String,
    },

    /// The callback has no `state` while [`StatePolicy::Required`](crate::StatePolicy::Required) is in effect.
    #[display("Callback has no 'state' parameter and this flow requires one")]
    MissingState,

    /// The callback has no `code` parameter.
    #[display("No authorization code found in callback")]
    MissingAuthorizationCode,

    /// A second callback was offered to a flow that already holds a code.
    #[display("An authorization code was already accepted by this flow")]
    CallbackAlreadyAccepted,

    /// A token was requested from an authorization-code flow before its callback.
    #[display("No authorization code available: accept the callback first")]
    AuthorizationCodeRequired,

    /// The service URI is already scoped in a way the provider does not expect.
    #[display("Malformed service URI '{url}': {reason}")]
    MalformedServiceUri {
        /// The rejected service URI.
        url: String,
        /// Why the URI was rejected.
        reason: String,
    },

    /// The service URI cannot be parsed or used as a base URL.
    #[display("Invalid service URI '{url}': {reason}")]
    InvalidServiceUri {
        /// The invalid URI that was provided.
        url: String,
        /// Description of why the URI is invalid.
        reason: String,
    },

    /// The redirect URI cannot be parsed.
    #[display("Invalid redirect URI '{url}': {reason}")]
    InvalidRedirectUri {
        /// The invalid URI that was provided.
        url: String,
        /// Description of why the URI is invalid.
        reason: String,
    },

    /// The callback URI cannot be parsed.
    #[display("Invalid callback URI: {reason}")]
    InvalidCallbackUri {
        /// Description of why the URI is invalid.
        reason: String,
    },

    /// The token endpoint exchange failed.
    ///
    /// Covers transport failures, error statuses and incomplete or malformed
    /// token responses.
    #[display("Token exchange failed: {reason}")]
    TokenExchange {
        /// Description of the failure.
        reason: String,
    },

    /// The access token could not be decoded as a JWT.
    #[display("Cannot decode access token: {_0}")]
    TokenDecode(TokenDecodeError),

    /// Flow configuration error.
    #[display("Flow configuration error: {reason}")]
    Configuration {
        /// Description of the configuration issue.
        reason: String,
    },
}

impl From<TransportError> for FlowError {
    fn from(error: TransportError) -> Self {
        Self::TokenExchange {
            reason: error.to_string(),
        }
    }
}

impl From<TokenDecodeError> for FlowError {
    fn from(error: TokenDecodeError) -> Self {
        Self::TokenDecode(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_invalid_state() {
        let error = FlowError::InvalidState {
            received: "WRONG".to_string(),
        };
        insta::assert_snapshot!(error, @"Response does not belong to this flow: unexpected state 'WRONG'");
    }

    #[test]
    fn should_display_malformed_service_uri() {
        let error = FlowError::MalformedServiceUri {
            url: "https://login.example.com/x".to_string(),
            reason: "ends with a tenant id".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Malformed service URI 'https://login.example.com/x': ends with a tenant id"
        );
    }

    #[test]
    fn should_convert_transport_error_into_token_exchange() {
        let error = FlowError::from(TransportError::Other {
            reason: "connection refused".to_string(),
        });
        assert_eq!(
            error,
            FlowError::TokenExchange {
                reason: "Transport failure: connection refused".to_string()
            }
        );
    }
}
