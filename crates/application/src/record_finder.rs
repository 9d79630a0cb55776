use std::sync::Arc;

use listkit_core::AppResult;
use listkit_domain::{QueryOptions, Row};

use crate::transport_ports::post_query;
use crate::{HttpTransport, ModelEndpoint};

/// Ad-hoc list lookups against any model.
#[derive(Clone)]
pub struct RecordFinder {
    transport: Arc<dyn HttpTransport>,
    base_path: String,
}

impl RecordFinder {
    /// Creates a finder for models under `base_path`.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, base_path: impl Into<String>) -> Self {
        Self {
            transport,
            base_path: base_path.into(),
        }
    }

    /// Returns all rows matching `options`, passed through unchanged.
    pub async fn find_all(&self, model: &str, options: &QueryOptions) -> AppResult<Vec<Row>> {
        let endpoint = ModelEndpoint::with_base_path(self.base_path.as_str(), model)?;
        post_query(self.transport.as_ref(), endpoint.list_path(), options).await
    }

    /// Returns the first matching row.
    pub async fn find_one(&self, model: &str, options: &QueryOptions) -> AppResult<Option<Row>> {
        let first = QueryOptions {
            limit: Some(1),
            offset: Some(options.offset.unwrap_or(0)),
            ..options.clone()
        };

        let rows = self.find_all(model, &first).await?;
        Ok(rows.into_iter().next())
    }
}
