use async_trait::async_trait;
use listkit_core::{AppError, AppResult, NonEmptyString};
use listkit_domain::{MultipartPart, QueryOptions, SubmissionPayload};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Default path prefix of the generic list/CRUD endpoints.
pub const DEFAULT_BASE_PATH: &str = "qnatk";

/// HTTP verbs used against the data service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Reads.
    Get,
    /// Queries and creates.
    Post,
    /// Updates.
    Put,
}

impl HttpMethod {
    /// Returns the verb as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

/// Request body variants.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// JSON document.
    Json(Value),
    /// Multi-part form.
    Multipart(Vec<MultipartPart>),
}

impl From<SubmissionPayload> for RequestBody {
    fn from(value: SubmissionPayload) -> Self {
        match value {
            SubmissionPayload::Json(body) => Self::Json(body),
            SubmissionPayload::Multipart(parts) => Self::Multipart(parts),
        }
    }
}

/// One call to the data service, relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Path relative to the base URL, without a leading slash.
    pub path: String,
    /// Request body.
    pub body: RequestBody,
}

impl TransportRequest {
    /// Creates a JSON `POST`.
    #[must_use]
    pub fn post_json(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: RequestBody::Json(body),
        }
    }

    /// Returns the JSON body, when there is one.
    #[must_use]
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(body) => Some(body),
            RequestBody::Empty | RequestBody::Multipart(_) => None,
        }
    }
}

/// Transport port for the remote data service.
///
/// Implementations own the base URL and authentication. Non-success
/// responses and network failures are reported as [`AppError::Transport`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends one request and returns the decoded JSON body.
    ///
    /// Empty bodies decode to `Value::Null`.
    async fn send(&self, request: TransportRequest) -> AppResult<Value>;
}

/// Endpoint family of one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEndpoint {
    base_path: String,
    model: NonEmptyString,
}

impl ModelEndpoint {
    /// Creates an endpoint under [`DEFAULT_BASE_PATH`].
    pub fn new(model: impl Into<String>) -> AppResult<Self> {
        Self::with_base_path(DEFAULT_BASE_PATH, model)
    }

    /// Creates an endpoint under a custom prefix. An empty prefix is allowed.
    pub fn with_base_path(base_path: impl Into<String>, model: impl Into<String>) -> AppResult<Self> {
        let model = NonEmptyString::new(model)?;
        if model.as_str().contains('/') {
            return Err(AppError::Validation(format!(
                "model name '{model}' must not contain '/'"
            )));
        }

        Ok(Self {
            base_path: base_path.into().trim_matches('/').to_owned(),
            model,
        })
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        self.model.as_str()
    }

    /// Returns the path prefix.
    #[must_use]
    pub fn base_path(&self) -> &str {
        self.base_path.as_str()
    }

    /// `{base}/{model}/list`
    #[must_use]
    pub fn list_path(&self) -> String {
        self.join(&["list"])
    }

    /// `{base}/{model}/list-and-count[/{hook}]`
    #[must_use]
    pub fn list_and_count_path(&self, hook: Option<&str>) -> String {
        match hook.map(str::trim).filter(|hook| !hook.is_empty()) {
            Some(hook) => self.join(&["list-and-count", hook]),
            None => self.join(&["list-and-count"]),
        }
    }

    /// `{base}/{model}/add`
    #[must_use]
    pub fn add_path(&self) -> String {
        self.join(&["add"])
    }

    /// `{base}/{model}/{id}`
    ///
    /// The id must stay a single path segment.
    pub fn record_path(&self, id: &str) -> AppResult<String> {
        let id = id.trim();
        if id.is_empty()
            || id == "."
            || id == ".."
            || id.contains(['/', '\\', '?', '#'])
        {
            return Err(AppError::Validation(format!(
                "record id '{id}' must be a single path segment"
            )));
        }

        Ok(self.join(&[id]))
    }

    fn join(&self, segments: &[&str]) -> String {
        let mut parts = Vec::with_capacity(segments.len() + 2);
        if !self.base_path.is_empty() {
            parts.push(self.base_path.as_str());
        }
        parts.push(self.model.as_str());
        parts.extend_from_slice(segments);
        parts.join("/")
    }
}

/// Posts query options and decodes the response body.
pub(crate) async fn post_query<T: DeserializeOwned>(
    transport: &dyn HttpTransport,
    path: String,
    query: &QueryOptions,
) -> AppResult<T> {
    let body = serde_json::to_value(query).map_err(|error| {
        AppError::Internal(format!("failed to encode query options: {error}"))
    })?;
    let response = transport
        .send(TransportRequest::post_json(path.clone(), body))
        .await?;

    serde_json::from_value(response).map_err(|error| {
        AppError::Internal(format!("unexpected response body from '{path}': {error}"))
    })
}
