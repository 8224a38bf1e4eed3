use tracing::{debug, warn};
use url::Url;

use crate::error::FlowError;
use crate::parameters::Parameters;
use crate::token::CachedToken;
use crate::transport::{ProtocolRequest, ProtocolResponse, Transport};

/// Posts a token request and extracts the token from a successful response.
pub(super) async fn exchange_token<T, E>(
    transport: &T,
    endpoint: Url,
    form: Parameters,
    extract: E,
) -> Result<CachedToken, FlowError>
where
    T: Transport,
    E: FnOnce(&ProtocolResponse) -> Result<CachedToken, FlowError>,
{
    let grant_type = form.get("grant_type").unwrap_or("unknown").to_string();
    debug!(%endpoint, %grant_type, "requesting token");

    let response = transport
        .send(ProtocolRequest::post_form(endpoint, form))
        .await
        .inspect_err(|err| warn!(%grant_type, %err, "token request failed"))?;

    if !response.is_success() {
        let reason = error_reason(&response);
        warn!(%grant_type, status = %response.status(), %reason, "token endpoint rejected the request");
        return Err(FlowError::TokenExchange { reason });
    }

    let token = extract(&response)?;
    debug!(%grant_type, token_type = token.token_type(), expires_in = ?token.time_until_expiry(), "token obtained");
    Ok(token)
}

/// Describes an error response with its status and OAuth2 `error` fields.
fn error_reason(response: &ProtocolResponse) -> String {
    let status = response.status();
    match (response.parameter("error"), response.parameter("error_description")) {
        (Some(error), Some(description)) => format!("{status}: {error} ({description})"),
        (Some(error), None) => format!("{status}: {error}"),
        (None, _) => format!("token endpoint answered {status}"),
    }
}
