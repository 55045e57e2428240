#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use trustbot_config::{Announce, Bot, Config, Server, Trust};

pub const HEALTHY_IMAGE: &str = "https://img.example/healthy.png";

/// Serves canned trust API responses keyed by request path on an ephemeral
/// port and returns the `/v1` base URL. Unlisted paths answer 404.
pub async fn spawn_upstream(routes: &[(&str, u16, &str)]) -> String {
    let routes: Arc<HashMap<String, (u16, String)>> = Arc::new(
        routes
            .iter()
            .map(|(path, code, body)| (path.to_string(), (*code, body.to_string())))
            .collect(),
    );
    let app = Router::new().fallback(move |uri: Uri| {
        let routes = routes.clone();
        async move {
            match routes.get(uri.path()) {
                Some((code, body)) => (
                    StatusCode::from_u16(*code).unwrap(),
                    [("content-type", "application/json")],
                    body.clone(),
                )
                    .into_response(),
                None => StatusCode::NOT_FOUND.into_response(),
            }
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1")
}

pub fn test_config(api_base_url: &str) -> Config {
    Config {
        server: Server {
            listen_addr: "127.0.0.1:0".to_string(),
        },
        trust: Trust {
            api_base_url: api_base_url.to_string(),
            status_site_url: "https://status.salesforce.com/status".to_string(),
            healthy_image_url: HEALTHY_IMAGE.to_string(),
            timeout_ms: Some(5_000),
        },
        bot: Bot {
            name: "trustbot".to_string(),
        },
        announce: Announce {
            channels: vec!["ops".to_string()],
        },
    }
}

pub async fn default_upstream() -> String {
    spawn_upstream(&[
        (
            "/v1/instances/NA1/status",
            200,
            r#"{"key":"NA1","environment":"production","releaseVersion":"222","Incidents":[]}"#,
        ),
        (
            "/v1/instances/NA2/status",
            200,
            r#"{"key":"NA2","releaseVersion":"222.5"}"#,
        ),
        (
            "/v1/instances/CS9/status",
            200,
            r#"{"key":"CS9","releaseVersion":"222","Incidents":[{"id":41},{"id":42}]}"#,
        ),
        (
            "/v1/instances/BADID/status",
            200,
            r#"{"key":"OTHERID","releaseVersion":"222"}"#,
        ),
        (
            "/v1/instances/NOKEY/status",
            200,
            r#"{"environment":"sandbox","releaseVersion":"222"}"#,
        ),
        ("/v1/instances/BROKEN/status", 200, "<html>maintenance</html>"),
        ("/v1/instances/GONE/status", 404, r#"{"key":"GONE"}"#),
        ("/v1/instances/DOWN/status", 503, "not json"),
        ("/v1/instanceAliases/eu11", 200, r#"{"instanceKey":"EU11"}"#),
        (
            "/v1/instanceAliases/my-org.lightning",
            200,
            r#"{"alias":"something-else","instanceKey":"NA99","type":"mydomain"}"#,
        ),
        ("/v1/instanceAliases/garbled", 200, r#"{"alias":"garbled"}"#),
    ])
    .await
}
