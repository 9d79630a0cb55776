use std::sync::Arc;

use listkit_core::{AppError, AppResult};
use listkit_domain::{QueryOptions, Row};
use tracing::{debug, info};

use crate::transport_ports::post_query;
use crate::{HttpTransport, ModelEndpoint, RowMapper, number_rows};

mod csv_format;
mod flatten;

pub use csv_format::{CSV_ENCODING, CSV_MIME_TYPE, CsvExport, CsvQuoting, rows_to_csv};
pub use flatten::flatten_row;

/// Default number of rows requested per chunk.
pub const DEFAULT_CHUNK_SIZE: u64 = 1000;
/// Default export file name.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "file.csv";

/// Bulk export settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Rows requested per chunk.
    pub chunk_size: u64,
    /// Cell quoting mode.
    pub quoting: CsvQuoting,
    /// Suggested file name.
    pub file_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            quoting: CsvQuoting::default(),
            file_name: DEFAULT_EXPORT_FILE_NAME.to_owned(),
        }
    }
}

/// Fetches every row of a query in fixed-size chunks and renders CSV.
#[derive(Clone)]
pub struct BulkExporter {
    transport: Arc<dyn HttpTransport>,
    endpoint: ModelEndpoint,
    options: ExportOptions,
}

impl BulkExporter {
    /// Creates an exporter with default options.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, endpoint: ModelEndpoint) -> Self {
        Self {
            transport,
            endpoint,
            options: ExportOptions::default(),
        }
    }

    /// Replaces export options.
    #[must_use]
    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Requests chunks at offsets `0, n, 2n, ...` until a chunk comes back short.
    pub async fn fetch_all(&self, query: &QueryOptions) -> AppResult<Vec<Row>> {
        let chunk_size = self.options.chunk_size;
        if chunk_size == 0 {
            return Err(AppError::Validation(
                "export chunk size must be greater than zero".to_owned(),
            ));
        }

        let mut rows = Vec::new();
        let mut offset = 0_u64;
        loop {
            let chunk_query =
                query.merged_with(&QueryOptions::new().with_limit(chunk_size).with_offset(offset));
            let chunk: Vec<Row> = post_query(
                self.transport.as_ref(),
                self.endpoint.list_path(),
                &chunk_query,
            )
            .await?;

            let received = u64::try_from(chunk.len()).unwrap_or(u64::MAX);
            debug!(model = %self.endpoint.model(), offset, received, "fetched export chunk");
            rows.extend(chunk);

            if received < chunk_size {
                break;
            }
            offset = offset.saturating_add(chunk_size);
        }

        Ok(rows)
    }

    /// Fetches all rows, numbers them and renders CSV text.
    ///
    /// Rows run through `mapper` when given, else through [`flatten_row`].
    pub async fn export_all(
        &self,
        query: &QueryOptions,
        mapper: Option<&dyn RowMapper>,
    ) -> AppResult<String> {
        let rows = self.fetch_all(query).await?;
        self.render(rows, mapper)
    }

    /// Like [`BulkExporter::export_all`], packaged as a file artifact.
    pub async fn export_csv(
        &self,
        query: &QueryOptions,
        mapper: Option<&dyn RowMapper>,
    ) -> AppResult<CsvExport> {
        let rows = self.fetch_all(query).await?;
        let row_count = rows.len();
        let content = self.render(rows, mapper)?;

        info!(
            model = %self.endpoint.model(),
            rows = row_count,
            file_name = %self.options.file_name,
            "export rendered"
        );

        Ok(CsvExport {
            file_name: self.options.file_name.clone(),
            content,
            row_count,
        })
    }

    fn render(&self, rows: Vec<Row>, mapper: Option<&dyn RowMapper>) -> AppResult<String> {
        let numbered = number_rows(rows, Some(1), mapper);
        let shaped: Vec<Row> = match mapper {
            Some(_) => numbered,
            None => numbered.into_iter().map(flatten_row).collect(),
        };

        rows_to_csv(&shaped, self.options.quoting)
    }
}
