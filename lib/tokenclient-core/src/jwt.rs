//! Structured view over JWT access tokens.
//!
//! Decoding here is purely structural: the header and claims are base64url-decoded
//! and parsed, the signature is neither checked nor interpreted. The flows hand
//! out a [`JwtToken`] for callers that want to inspect issuer, subject or claims;
//! validating the token is the resource server's business.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};

use crate::secure::SecureString;

/// Errors raised while decoding a JWT.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum TokenDecodeError {
    /// The token is not made of three dot-separated segments.
    #[display("Malformed JWT: expected 3 segments, found {segments}")]
    MalformedStructure {
        /// Number of segments found.
        segments: usize,
    },

    /// A segment is not valid base64url.
    #[display("Invalid base64 in JWT {part}: {reason}")]
    InvalidEncoding {
        /// Which segment failed (`header` or `claims`).
        part: &'static str,
        /// Decoder error message.
        reason: String,
    },

    /// A segment is not a JSON object.
    #[display("Invalid JSON in JWT {part}: {reason}")]
    InvalidJson {
        /// Which segment failed (`header` or `claims`).
        part: &'static str,
        /// Parser error message.
        reason: String,
    },
}

/// A decoded (unverified) JSON Web Token.
#[derive(Clone)]
pub struct JwtToken {
    raw: SecureString,
    header: Map<String, Value>,
    claims: Map<String, Value>,
}

impl JwtToken {
    /// Decodes the compact serialization `header.claims.signature`.
    pub fn decode(raw: &str) -> Result<Self, TokenDecodeError> {
        let segments = raw.split('.').collect::<Vec<_>>();
        let [header, claims, _signature] = segments.as_slice() else {
            return Err(TokenDecodeError::MalformedStructure {
                segments: segments.len(),
            });
        };

        Ok(Self {
            raw: SecureString::new(raw),
            header: decode_segment("header", header)?,
            claims: decode_segment("claims", claims)?,
        })
    }

    /// The raw compact token, as sent in an `Authorization: Bearer` header.
    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }

    /// The signing algorithm declared in the header (`alg`).
    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    /// The key identifier declared in the header (`kid`).
    pub fn key_id(&self) -> Option<&str> {
        self.header.get("kid").and_then(Value::as_str)
    }

    /// The `iss` claim.
    pub fn issuer(&self) -> Option<&str> {
        self.claims.get("iss").and_then(Value::as_str)
    }

    /// The `sub` claim.
    pub fn subject(&self) -> Option<&str> {
        self.claims.get("sub").and_then(Value::as_str)
    }

    /// The `aud` claim, which may be a single string or an array.
    pub fn audiences(&self) -> Vec<&str> {
        match self.claims.get("aud") {
            Some(Value::String(audience)) => vec![audience.as_str()],
            Some(Value::Array(audiences)) => audiences.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// The `exp` claim, in seconds since the Unix epoch.
    pub fn expiration(&self) -> Option<i64> {
        self.claims.get("exp").and_then(Value::as_i64)
    }

    /// The `nbf` claim, in seconds since the Unix epoch.
    pub fn not_before(&self) -> Option<i64> {
        self.claims.get("nbf").and_then(Value::as_i64)
    }

    /// The `iat` claim, in seconds since the Unix epoch.
    pub fn issued_at(&self) -> Option<i64> {
        self.claims.get("iat").and_then(Value::as_i64)
    }

    /// Looks up any claim by name.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// All claims.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// All header fields.
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }
}

impl fmt::Debug for JwtToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtToken")
            .field("raw", &"[REDACTED]")
            .field("header", &self.header)
            .field("claims", &self.claims)
            .finish()
    }
}

fn decode_segment(part: &'static str, segment: &str) -> Result<Map<String, Value>, TokenDecodeError> {
    // some issuers keep the base64 padding
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|err| TokenDecodeError::InvalidEncoding {
            part,
            reason: err.to_string(),
        })?;

    serde_json::from_slice(&bytes).map_err(|err| TokenDecodeError::InvalidJson {
        part,
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use serde_json::json;

    use super::*;

    fn encode(value: &Value) -> String {
        URL_SAFE_NO_PAD.encode(value.to_string())
    }

    fn sample_token() -> String {
        let header = json!({ "alg": "RS256", "typ": "JWT", "kid": "key-1" });
        let claims = json!({
            "iss": "https://sts.example.com/",
            "sub": "service-principal",
            "aud": ["api://orders", "api://billing"],
            "exp": 1_700_003_600,
            "iat": 1_700_000_000,
            "roles": ["reader"]
        });
        format!("{}.{}.c2lnbmF0dXJl", encode(&header), encode(&claims))
    }

    #[test]
    fn should_decode_header_and_claims() {
        let token = JwtToken::decode(&sample_token()).expect("should decode");

        check!(token.algorithm() == Some("RS256"));
        check!(token.key_id() == Some("key-1"));
        check!(token.issuer() == Some("https://sts.example.com/"));
        check!(token.subject() == Some("service-principal"));
        check!(token.audiences() == vec!["api://orders", "api://billing"]);
        check!(token.expiration() == Some(1_700_003_600));
        check!(token.issued_at() == Some(1_700_000_000));
        check!(token.not_before().is_none());
        check!(token.claim("roles") == Some(&json!(["reader"])));
    }

    #[test]
    fn should_accept_single_audience_and_unsigned_tokens() {
        let raw = format!(
            "{}.{}.",
            encode(&json!({ "alg": "none" })),
            encode(&json!({ "aud": "api://orders" }))
        );
        let token = JwtToken::decode(&raw).expect("should decode");
        check!(token.audiences() == vec!["api://orders"]);
        check!(token.as_str() == raw);
    }

    #[test]
    fn should_reject_opaque_tokens() {
        let_assert!(Err(TokenDecodeError::MalformedStructure { segments }) = JwtToken::decode("T1"));
        check!(segments == 1);
    }

    #[test]
    fn should_reject_invalid_base64() {
        let_assert!(
            Err(TokenDecodeError::InvalidEncoding { part, .. }) = JwtToken::decode("!!!.e30.sig")
        );
        check!(part == "header");
    }

    #[test]
    fn should_reject_non_object_claims() {
        let raw = format!("{}.{}.sig", encode(&json!({})), encode(&json!([1, 2])));
        let_assert!(Err(TokenDecodeError::InvalidJson { part, .. }) = JwtToken::decode(&raw));
        check!(part == "claims");
    }

    #[test]
    fn should_redact_raw_token_in_debug() {
        let raw = sample_token();
        let token = JwtToken::decode(&raw).expect("should decode");
        let debug_str = format!("{token:?}");
        check!(debug_str.contains("[REDACTED]"));
        check!(!debug_str.contains(&raw));
    }
}
