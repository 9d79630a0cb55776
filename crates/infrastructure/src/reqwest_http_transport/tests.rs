use listkit_application::{HttpMethod, HttpTransport, RequestBody, TransportRequest};
use listkit_core::AppError;
use listkit_domain::{Attachment, FormValues, SubmissionPayload};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_json, body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::ReqwestHttpTransport;

fn transport(server: &MockServer, token: Option<&str>) -> ReqwestHttpTransport {
    let base_url = Url::parse(format!("{}/api", server.uri()).as_str())
        .unwrap_or_else(|_| unreachable!());
    ReqwestHttpTransport::new(reqwest::Client::new(), base_url, token.map(str::to_owned))
}

#[test]
fn base_url_gains_trailing_slash() {
    let base_url = Url::parse("https://data.example.com/api").unwrap_or_else(|_| unreachable!());
    let transport = ReqwestHttpTransport::new(reqwest::Client::new(), base_url, None);

    assert_eq!(transport.base_url().as_str(), "https://data.example.com/api/");
}

#[tokio::test]
async fn json_post_is_sent_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/qnatk/User/list"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!({"limit": 10, "offset": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let body = transport(&server, Some("secret"))
        .send(TransportRequest::post_json(
            "qnatk/User/list",
            json!({"limit": 10, "offset": 0}),
        ))
        .await;

    assert_eq!(body.ok(), Some(json!([{"id": 1}])));
}

#[tokio::test]
async fn empty_success_body_decodes_to_null() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/qnatk/User/5"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let body = transport(&server, None)
        .send(TransportRequest {
            method: HttpMethod::Put,
            path: "qnatk/User/5".to_owned(),
            body: RequestBody::Json(json!({"name": "Ann"})),
        })
        .await;

    assert_eq!(body.ok(), Some(Value::Null));
}

#[tokio::test]
async fn error_status_keeps_server_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/qnatk/User/add"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "statusCode": 409,
            "message": "Duplicate code"
        })))
        .mount(&server)
        .await;

    let result = transport(&server, None)
        .send(TransportRequest::post_json("qnatk/User/add", json!({})))
        .await;

    let Err(AppError::Transport(failure)) = result else {
        unreachable!("expected a transport failure");
    };
    assert_eq!(failure.status(), Some(409));
    assert_eq!(failure.message(), "Request failed with status code 409");
    assert_eq!(failure.server_message().as_deref(), Some("Duplicate code"));
}

#[tokio::test]
async fn non_json_error_body_is_kept_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let result = transport(&server, None)
        .send(TransportRequest {
            method: HttpMethod::Get,
            path: "/health".to_owned(),
            body: RequestBody::Empty,
        })
        .await;

    let failure = result
        .err()
        .and_then(|error| error.transport_failure().cloned());
    assert_eq!(
        failure.and_then(|failure| failure.body().cloned()),
        Some(json!("bad gateway"))
    );
}

#[tokio::test]
async fn unreachable_server_is_a_network_failure() {
    let server = MockServer::start().await;
    let transport = transport(&server, None);
    drop(server);

    let result = transport
        .send(TransportRequest::post_json("qnatk/User/list", json!({})))
        .await;

    let failure = result
        .err()
        .and_then(|error| error.transport_failure().cloned());
    assert!(failure.is_some_and(|failure| !failure.has_response()));
}

#[tokio::test]
async fn attachments_are_sent_as_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains("filename=\"report.pdf\""))
        .and(body_string_contains("Quarterly"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let values = FormValues::new()
        .with("title", "Quarterly")
        .with("file", Attachment::new("report.pdf", "application/pdf", b"%PDF".to_vec()));
    let payload = SubmissionPayload::from_values(&values);

    let body = transport(&server, None)
        .send(TransportRequest {
            method: HttpMethod::Post,
            path: "documents".to_owned(),
            body: payload.into(),
        })
        .await;

    assert_eq!(body.ok(), Some(json!({"id": 3})));
}
