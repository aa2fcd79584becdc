use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use genai_ready::Client;

#[tokio::test]
async fn api_key_header_is_inserted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/files"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .build()
        .unwrap();
    let _ = client.files().list().await.unwrap();
}

#[tokio::test]
async fn api_key_header_respects_custom_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/files"))
        .and(header("x-goog-api-key", "custom-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .api_key("test-key")
        .header("x-goog-api-key", "custom-key")
        .base_url(server.uri())
        .build()
        .unwrap();
    let _ = client.files().list().await.unwrap();
}

#[tokio::test]
async fn custom_api_version_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/files/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "files/abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .api_version("v1")
        .build()
        .unwrap();
    let file = client.files().get("abc").await.unwrap();
    assert_eq!(file.name.as_deref(), Some("files/abc"));
}
