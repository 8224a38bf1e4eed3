use http::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use tracing::debug;

use super::{ProtocolRequest, ProtocolResponse, Transport, TransportError};

/// [`Transport`] backed by a [`reqwest::Client`].
///
/// Token requests are sent as `application/x-www-form-urlencoded` `POST`s; the
/// response body is decoded as JSON or form data depending on its content type.
/// The default client does not follow redirects: a token endpoint answering with a
/// redirection is an error, not something to chase with credentials attached.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a client that does not follow redirects.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().redirect(Policy::none()).build()?;
        Ok(Self { client })
    }

    /// Uses a preconfigured client (timeouts, proxies, TLS roots...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: ProtocolRequest) -> Result<ProtocolResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .header(ACCEPT, "application/json");
        if request.method() == Method::POST {
            builder = builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(request.form_body());
        }

        debug!(method = %request.method(), url = %request.url(), "sending...");
        let response = builder.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        debug!(%status, ?content_type, "...receiving");

        ProtocolResponse::decode(status, content_type.as_deref(), &body)
    }
}
