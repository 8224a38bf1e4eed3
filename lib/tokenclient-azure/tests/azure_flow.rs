#![allow(missing_docs, clippy::expect_used)]

use std::time::Duration;

use assert2::{check, let_assert};
use rstest::{fixture, rstest};
use tracing::info;

use tokenclient_azure::{AZURE_AD_TOKEN_PATH, AzureAdClientCredentialsFlow};
use tokenclient_core::{ClientCredentials, FlowError, InMemoryTransport, RequestParameters};

const TENANT_URI: &str = "https://login.microsoftonline.com/contoso.onmicrosoft.com";
const RESOURCE: &str = "https://management.core.windows.net/";

fn init_tracing() {
    // should be run once, fail otherwise, we skip that error
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    info!("Tracing initialized");
}

#[fixture]
fn transport() -> InMemoryTransport {
    init_tracing();
    InMemoryTransport::with_token("azure-token", 3599)
}

fn flow(service_uri: &str, transport: &InMemoryTransport) -> Result<AzureAdClientCredentialsFlow<InMemoryTransport>, FlowError> {
    AzureAdClientCredentialsFlow::with_transport(
        service_uri,
        ClientCredentials::new("daemon", "s3cr3t"),
        RequestParameters::new()
            .add_scope("user_impersonation")
            .with_resource(RESOURCE),
        transport.clone(),
    )
}

#[rstest]
#[tokio::test]
async fn should_request_token_for_resource(transport: InMemoryTransport) -> anyhow::Result<()> {
    let flow = flow(TENANT_URI, &transport)?;

    let token = flow.access_token_string().await?;

    check!(token == "azure-token");
    let_assert!(Some(request) = transport.last_request());
    check!(request.url().as_str() == format!("{TENANT_URI}/{AZURE_AD_TOKEN_PATH}"));

    let form = request.body_parameters();
    check!(form.get("grant_type") == Some("client_credentials"));
    check!(form.get("client_id") == Some("daemon"));
    check!(form.get("client_secret") == Some("s3cr3t"));
    check!(form.get("resource") == Some(RESOURCE));
    check!(!form.contains("scope"));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn should_fail_before_any_request_on_guid_terminated_uri(transport: InMemoryTransport) {
    let result = flow(
        "https://login.microsoftonline.com/72f988bf-86f1-41af-91ab-2d7cd011db47",
        &transport,
    );

    let_assert!(Err(error @ FlowError::MalformedServiceUri { .. }) = result);
    insta::assert_snapshot!(
        error,
        @"Malformed service URI 'https://login.microsoftonline.com/72f988bf-86f1-41af-91ab-2d7cd011db47/': the path already ends with the GUID '72f988bf-86f1-41af-91ab-2d7cd011db47'"
    );
    check!(transport.request_count() == 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn should_cache_until_refresh_margin(transport: InMemoryTransport) -> anyhow::Result<()> {
    let flow = flow(TENANT_URI, &transport)?.with_refresh_margin(Duration::from_secs(300));

    flow.token().await?;
    tokio::time::advance(Duration::from_secs(3000)).await;
    flow.token().await?;
    check!(transport.request_count() == 1);

    tokio::time::advance(Duration::from_secs(300)).await;
    flow.token().await?;
    check!(transport.request_count() == 2);
    Ok(())
}
