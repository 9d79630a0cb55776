use std::sync::Arc;

use listkit_core::AppResult;
use listkit_domain::{FormField, FormFieldKind, Row};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::loading_guard::{Generation, LoadingGuard};
use crate::{HttpMethod, HttpTransport, ModelEndpoint, RequestBody, RowMapper, TransportRequest};

/// Observable state of a [`RecordWriter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteState {
    /// Whether an insert is running.
    pub inserting: bool,
    /// Whether an update is running.
    pub editing: bool,
    /// Message of the last failure.
    pub error: Option<String>,
}

/// Replaces `select` field values of the form `{label, value}` with `value`.
#[must_use]
pub fn unwrap_select_values(fields: &[FormField], mut data: Row) -> Row {
    for field in fields
        .iter()
        .filter(|field| field.kind() == FormFieldKind::Select)
    {
        let name = field.name().as_str();
        let inner = data
            .get(name)
            .and_then(|value| value.get("value"))
            .cloned();
        if let Some(inner) = inner {
            data.insert(name.to_owned(), inner);
        }
    }
    data
}

/// Creates and updates single records of one model.
pub struct RecordWriter {
    transport: Arc<dyn HttpTransport>,
    endpoint: ModelEndpoint,
    fields: Vec<FormField>,
    insert_transform: Option<Arc<dyn RowMapper>>,
    state: watch::Sender<WriteState>,
    inserts: Generation,
    edits: Generation,
}

impl RecordWriter {
    /// Creates a writer shaping payloads from `fields`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        endpoint: ModelEndpoint,
        fields: Vec<FormField>,
    ) -> Self {
        let (state, _) = watch::channel(WriteState::default());

        Self {
            transport,
            endpoint,
            fields,
            insert_transform: None,
            state,
            inserts: Generation::default(),
            edits: Generation::default(),
        }
    }

    /// Replaces the default payload shaping for inserts.
    #[must_use]
    pub fn with_insert_transform(mut self, transform: Arc<dyn RowMapper>) -> Self {
        self.insert_transform = Some(transform);
        self
    }

    /// Returns a snapshot of the state.
    #[must_use]
    pub fn state(&self) -> WriteState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WriteState> {
        self.state.subscribe()
    }

    /// POSTs a new record and returns the server body.
    pub async fn insert(&self, data: Row) -> AppResult<Value> {
        let guard = LoadingGuard::begin(
            &self.state,
            &self.inserts,
            |state| {
                state.inserting = true;
                state.error = None;
            },
            |state| state.inserting = false,
        );
        let payload = match &self.insert_transform {
            Some(transform) => transform.map_row(data),
            None => unwrap_select_values(&self.fields, data),
        };

        self.write(&guard, HttpMethod::Post, self.endpoint.add_path(), payload)
            .await
    }

    /// PUTs changes to record `id` and returns the server body.
    ///
    /// Ids that would leave the model's route are rejected before any request.
    pub async fn update(&self, id: &str, data: Row) -> AppResult<Value> {
        let path = self.endpoint.record_path(id)?;
        let guard = LoadingGuard::begin(
            &self.state,
            &self.edits,
            |state| {
                state.editing = true;
                state.error = None;
            },
            |state| state.editing = false,
        );
        let payload = unwrap_select_values(&self.fields, data);

        self.write(&guard, HttpMethod::Put, path, payload)
            .await
    }

    async fn write(
        &self,
        guard: &LoadingGuard<'_, WriteState>,
        method: HttpMethod,
        path: String,
        payload: Row,
    ) -> AppResult<Value> {
        let request = TransportRequest {
            method,
            path,
            body: RequestBody::Json(Value::Object(payload)),
        };

        match self.transport.send(request).await {
            Ok(body) => {
                info!(model = %self.endpoint.model(), method = method.as_str(), "record saved");
                Ok(body)
            }
            Err(error) => {
                warn!(model = %self.endpoint.model(), error = %error, "record write failed");
                let message = error.user_message();
                guard.publish(|state| state.error = Some(message));
                Err(error)
            }
        }
    }
}
