//! Transport boundary: protocol request/response values and the [`Transport`] trait.
//!
//! The flows never talk HTTP directly. They build a [`ProtocolRequest`], hand it to
//! a [`Transport`] and read the flattened body parameters of the
//! [`ProtocolResponse`]. Timeouts, TLS and proxies are transport concerns.

use std::future::Future;

use http::{Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::parameters::Parameters;

mod memory;
pub use self::memory::InMemoryTransport;

mod client;
pub use self::client::ReqwestTransport;

/// Errors raised by a [`Transport`].
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum TransportError {
    /// HTTP client error from the underlying reqwest library.
    #[display("HTTP request failed: {_0}")]
    Reqwest(reqwest::Error),

    /// The response body is neither a JSON object nor a form-encoded body.
    #[display("Cannot decode response body ({content_type}): {reason}")]
    #[from(skip)]
    InvalidBody {
        /// The response content type, or `unknown`.
        content_type: String,
        /// Description of the decoding failure.
        reason: String,
    },

    /// Any other transport failure.
    #[display("Transport failure: {reason}")]
    #[from(skip)]
    Other {
        /// Description of the failure.
        reason: String,
    },
}

/// Sends protocol requests. Implementations do not retry and do not cache.
pub trait Transport: Send + Sync {
    /// Sends a request and waits for the response.
    fn send(
        &self,
        request: ProtocolRequest,
    ) -> impl Future<Output = Result<ProtocolResponse, TransportError>> + Send;
}

/// A request to an OAuth2 endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolRequest {
    method: Method,
    url: Url,
    body: Parameters,
}

impl ProtocolRequest {
    /// A `POST` with a form-encoded body, as used for token requests.
    pub fn post_form(url: Url, body: Parameters) -> Self {
        Self {
            method: Method::POST,
            url,
            body,
        }
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The body parameters.
    pub fn body_parameters(&self) -> &Parameters {
        &self.body
    }

    /// The `application/x-www-form-urlencoded` body.
    pub fn form_body(&self) -> String {
        self.body.to_form()
    }
}

/// A response from an OAuth2 endpoint, with its body flattened to string parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolResponse {
    status: StatusCode,
    body: Parameters,
}

impl ProtocolResponse {
    /// Creates a response.
    pub fn new(status: StatusCode, body: Parameters) -> Self {
        Self { status, body }
    }

    /// A `200 OK` response with the given body parameters.
    pub fn ok(body: Parameters) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Decodes a raw body, JSON or form-encoded.
    ///
    /// JSON is used when the content type says so, or when no content type is
    /// given and the body looks like an object. Scalar JSON values are rendered as
    /// strings, `null` is dropped, nested values are kept as JSON text.
    pub fn decode(status: StatusCode, content_type: Option<&str>, body: &str) -> Result<Self, TransportError> {
        let trimmed = body.trim();
        let is_json = match content_type {
            Some(content_type) => content_type.contains("json"),
            None => trimmed.starts_with('{'),
        };

        let parameters = if trimmed.is_empty() {
            Parameters::new()
        } else if is_json {
            decode_json(content_type, trimmed)?
        } else {
            decode_form(content_type, trimmed)?
        };

        Ok(Self::new(status, parameters))
    }

    /// The HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The body parameters.
    pub fn body_parameters(&self) -> &Parameters {
        &self.body
    }

    /// Returns a body parameter.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.body.get(name)
    }
}

fn decode_json(content_type: Option<&str>, body: &str) -> Result<Parameters, TransportError> {
    let invalid = |reason: String| TransportError::InvalidBody {
        content_type: content_type.unwrap_or("unknown").to_string(),
        reason,
    };

    let value = serde_json::from_str::<Value>(body).map_err(|err| invalid(err.to_string()))?;
    let Value::Object(object) = value else {
        return Err(invalid("expected a JSON object".to_string()));
    };

    Ok(object
        .into_iter()
        .filter_map(|(name, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(text) => text,
                Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => value.to_string(),
            };
            Some((name, value))
        })
        .collect())
}

fn decode_form(content_type: Option<&str>, body: &str) -> Result<Parameters, TransportError> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(body)
        .map(|pairs| pairs.into_iter().collect())
        .map_err(|err| TransportError::InvalidBody {
            content_type: content_type.unwrap_or("unknown").to_string(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::json(
        Some("application/json; charset=utf-8"),
        r#"{"token_type":"Bearer","access_token":"T1","expires_in":3600}"#
    )]
    #[case::json_string_lifetime(
        Some("application/json"),
        r#"{"token_type":"Bearer","access_token":"T1","expires_in":"3600"}"#
    )]
    #[case::form(
        Some("application/x-www-form-urlencoded"),
        "token_type=Bearer&access_token=T1&expires_in=3600"
    )]
    #[case::sniffed_json(None, r#" {"token_type":"Bearer","access_token":"T1","expires_in":3600}"#)]
    #[case::sniffed_form(None, "token_type=Bearer&access_token=T1&expires_in=3600")]
    fn should_flatten_token_response(#[case] content_type: Option<&str>, #[case] body: &str) {
        let response =
            ProtocolResponse::decode(StatusCode::OK, content_type, body).expect("should decode");

        check!(response.parameter("token_type") == Some("Bearer"));
        check!(response.parameter("access_token") == Some("T1"));
        check!(response.parameter("expires_in") == Some("3600"));
    }

    #[test]
    fn should_drop_nulls_and_keep_nested_values_as_json() {
        let body = r#"{"error":"invalid_client","error_uri":null,"details":{"code":7},"ok":false}"#;
        let response = ProtocolResponse::decode(StatusCode::UNAUTHORIZED, Some("application/json"), body)
            .expect("should decode");

        check!(!response.is_success());
        check!(response.parameter("error") == Some("invalid_client"));
        check!(response.parameter("error_uri").is_none());
        check!(response.parameter("details") == Some(r#"{"code":7}"#));
        check!(response.parameter("ok") == Some("false"));
    }

    #[test]
    fn should_reject_non_object_json() {
        let result = ProtocolResponse::decode(StatusCode::OK, Some("application/json"), "[1,2]");
        let_assert!(Err(TransportError::InvalidBody { reason, .. }) = result);
        check!(reason == "expected a JSON object");
    }

    #[test]
    fn should_accept_empty_body() {
        let response = ProtocolResponse::decode(StatusCode::NO_CONTENT, None, "").expect("should decode");
        check!(response.body_parameters().is_empty());
    }

    #[test]
    fn should_build_form_request() {
        let url = Url::parse("https://login.example.com/token").expect("valid url");
        let request = ProtocolRequest::post_form(
            url,
            Parameters::new()
                .with("grant_type", "client_credentials")
                .with("client_id", "app"),
        );

        check!(request.method() == &Method::POST);
        insta::assert_snapshot!(request.form_body(), @"grant_type=client_credentials&client_id=app");
    }
}
