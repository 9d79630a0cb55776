use async_trait::async_trait;
use listkit_application::{HttpMethod, HttpTransport, RequestBody, TransportRequest};
use listkit_core::{AppError, AppResult, TransportFailure};
use listkit_domain::{MultipartPart, PartContent};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct ReqwestHttpTransport {
    http_client: reqwest::Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl ReqwestHttpTransport {
    /// Creates a transport resolving request paths against `base_url`.
    #[must_use]
    pub fn new(http_client: reqwest::Client, mut base_url: Url, bearer_token: Option<String>) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(path.as_str());
        }

        Self {
            http_client,
            base_url,
            bearer_token: bearer_token.filter(|token| !token.trim().is_empty()),
        }
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|error| AppError::Validation(format!("invalid request path '{path}': {error}")))
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: TransportRequest) -> AppResult<Value> {
        let url = self.resolve(request.path.as_str())?;
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        };

        let mut builder = self.http_client.request(method, url.clone());
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        };

        debug!(method = request.method.as_str(), url = %url, "sending request");
        let response = builder.send().await.map_err(|error| {
            warn!(url = %url, error = %error, "request failed without response");
            AppError::from(TransportFailure::network(error.to_string()))
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|error| {
            AppError::from(TransportFailure::network(format!(
                "failed to read response body: {error}"
            )))
        })?;

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "request rejected by server");
            return Err(AppError::from(TransportFailure::with_status(
                status.as_u16(),
                format!("Request failed with status code {}", status.as_u16()),
                error_body(&bytes),
            )));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|error| {
            AppError::Internal(format!("failed to decode response body from '{url}': {error}"))
        })
    }
}

fn error_body(bytes: &[u8]) -> Option<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    Some(
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned())),
    )
}

fn multipart_form(parts: Vec<MultipartPart>) -> AppResult<Form> {
    parts.into_iter().try_fold(Form::new(), |form, part| match part.content {
        PartContent::Text(text) => Ok(form.text(part.name, text)),
        PartContent::File(attachment) => {
            let file = Part::bytes(attachment.bytes().to_vec())
                .file_name(attachment.file_name().to_owned())
                .mime_str(attachment.content_type())
                .map_err(|error| {
                    AppError::Validation(format!(
                        "invalid content type '{}' for '{}': {error}",
                        attachment.content_type(),
                        attachment.file_name()
                    ))
                })?;
            Ok(form.part(part.name, file))
        }
    })
}

#[cfg(test)]
mod tests;
