//! Round trips through a real listener and HTTP client

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use common::{CONTENT_TYPE_METHODS, demo_dispatcher};
use rpcgate::content_type;
use rpcgate_http::HttpRpcServer;
use serde_json::{Value, json};
use tokio::net::TcpListener;

async fn start_server(max_body_size: usize) -> SocketAddr {
    let server = HttpRpcServer::builder()
        .dispatcher(Arc::new(demo_dispatcher()))
        .max_body_size(max_body_size)
        .build()
        .expect("server builds");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Err(err) = server.serve(listener).await {
            tracing::error!("test server stopped: {}", err);
        }
    });
    addr
}

fn header(response: &reqwest::Response, name: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_handler_content_types_over_http() {
    let addr = start_server(1024 * 1024).await;
    let client = reqwest::Client::new();

    for (method, expected) in CONTENT_TYPE_METHODS {
        let response = client
            .post(format!("http://{addr}/api/demo.{method}"))
            .header("Content-Type", "application/json")
            .body(r#"{"id":"onomnomnom"}"#)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200, "{method}");
        assert_eq!(header(&response, "content-type"), expected, "{method}");
        assert_eq!(response.text().await.unwrap(), "ok");
    }
}

#[tokio::test]
async fn test_default_error_handler_over_http() {
    let addr = start_server(1024 * 1024).await;
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/demo.ErrorTest"))
        .body(r#"{"ID":"onomnomnom"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(header(&response, "content-type"), content_type::HTML);
    assert_eq!(response.text().await.unwrap(), "rpcgate: error test error");
}

#[tokio::test]
async fn test_structured_error_over_http() {
    let addr = start_server(1024 * 1024).await;
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/demoerr.ErrorTest"))
        .header("Content-Type", "application/json")
        .body(r#"{"id":"onomnomnom"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 424);
    assert_eq!(
        response.text().await.unwrap(),
        r#"{"error":{"error_code":606,"error_msg":"Test Wrong answer","data":null}}"#
    );
}

#[tokio::test]
async fn test_get_and_form_requests() {
    let addr = start_server(1024 * 1024).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{addr}/api/demoerr.Echo?id=from-query"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert_eq!(body, json!({"response": {"id": "from-query"}}));

    let response = client
        .post(format!("http://{addr}/api/demoerr.Echo"))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("id=from-form&ttt=t")
        .send()
        .await
        .unwrap();
    let body: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert_eq!(body, json!({"response": {"id": "from-form", "ttt": "t"}}));

    let response = client
        .get(format!("http://{addr}/api/demoerr.Echo?id=x&bogus=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 444);
}

#[tokio::test]
async fn test_xml_accept_header_selects_xml_codec() {
    let addr = start_server(1024 * 1024).await;
    let response = reqwest::Client::new()
        .get(format!("http://{addr}/api/demoerr.Echo?id=x"))
        .header("Accept", "application/xml")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(header(&response, "content-type"), content_type::XML);
    assert!(
        response
            .text()
            .await
            .unwrap()
            .ends_with("<response><result><id>x</id></result></response>")
    );
}

#[tokio::test]
async fn test_transport_level_rejections() {
    let addr = start_server(16).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/api/demoerr.Echo"))
        .header("Content-Type", "application/json")
        .body(r#"{"id":"this body is longer than sixteen bytes"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 413);

    let response = client
        .get(format!("http://{addr}/elsewhere"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(header(&response, "content-type"), content_type::PLAIN);

    let response = client
        .get(format!("http://{addr}/api/nobody.Echo"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(header(&response, "content-type"), content_type::JSON);
}
