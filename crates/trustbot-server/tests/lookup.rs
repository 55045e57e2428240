mod common;

use common::{default_upstream, spawn_upstream};
use trustbot_kernel::LookupError;
use trustbot_server::TrustClient;

#[tokio::test]
async fn status_lookup_uppercases_and_resolves() {
    let base = default_upstream().await;
    let client = TrustClient::new(&base, None).unwrap();

    let status = client.instance_status("na1").await.unwrap();
    assert_eq!(status.key.as_deref(), Some("NA1"));
    assert_eq!(status.environment.as_deref(), Some("production"));
    assert_eq!(status.release_version.as_deref(), Some("222"));
    assert_eq!(status.incident_count(), 0);
}

#[tokio::test]
async fn status_lookup_rejects_mismatched_key() {
    let base = default_upstream().await;
    let client = TrustClient::new(&base, None).unwrap();

    assert_eq!(
        client.instance_status("badid").await.unwrap_err(),
        LookupError::UnknownInstance("BADID".to_string())
    );
}

#[tokio::test]
async fn status_lookup_rejects_missing_key() {
    let base = default_upstream().await;
    let client = TrustClient::new(&base, None).unwrap();

    assert!(matches!(
        client.instance_status("nokey").await,
        Err(LookupError::UnknownInstance(_))
    ));
}

#[tokio::test]
async fn non_success_status_fails_before_decoding() {
    let base = default_upstream().await;
    let client = TrustClient::new(&base, None).unwrap();

    // GONE answers 404 with a body that would otherwise validate.
    assert_eq!(
        client.instance_status("gone").await.unwrap_err(),
        LookupError::Http(404)
    );
    assert_eq!(
        client.instance_status("DOWN").await.unwrap_err(),
        LookupError::Http(503)
    );
    assert_eq!(
        client.instance_alias("unlisted").await.unwrap_err(),
        LookupError::Http(404)
    );
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let base = default_upstream().await;
    let client = TrustClient::new(&base, None).unwrap();

    assert!(matches!(
        client.instance_status("broken").await,
        Err(LookupError::Parse(_))
    ));
    assert!(matches!(
        client.instance_alias("garbled").await,
        Err(LookupError::Parse(_))
    ));
}

#[tokio::test]
async fn alias_lookup_returns_payload_without_key_check() {
    let base = default_upstream().await;
    let client = TrustClient::new(&base, None).unwrap();

    let resolved = client.instance_alias("my-org.lightning").await.unwrap();
    assert_eq!(resolved.instance_key, "NA99");
    assert_eq!(resolved.alias.as_deref(), Some("something-else"));
    assert_eq!(resolved.alias_type.as_deref(), Some("mydomain"));
}

#[tokio::test]
async fn alias_is_sent_as_typed() {
    let base = spawn_upstream(&[("/v1/instanceAliases/EU11", 200, r#"{"instanceKey":"EU11"}"#)])
        .await;
    let client = TrustClient::new(&base, None).unwrap();

    assert!(client.instance_alias("EU11").await.is_ok());
    assert_eq!(
        client.instance_alias("eu11").await.unwrap_err(),
        LookupError::Http(404)
    );
}

#[tokio::test]
async fn unreachable_upstream_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = TrustClient::new(&format!("http://{addr}/v1"), None).unwrap();
    assert!(matches!(
        client.instance_status("na1").await,
        Err(LookupError::Network(_))
    ));
}
