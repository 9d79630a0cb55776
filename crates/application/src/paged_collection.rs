use std::sync::Arc;

use listkit_core::{AppError, AppResult};
use listkit_domain::{
    ActionMap, FetchResult, ListAndCountResponse, PaginationState, QueryOptions, Row,
};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::loading_guard::{Generation, LoadingGuard};
use crate::transport_ports::post_query;
use crate::{
    ActionAuthorizer, AllowAllActions, BulkExporter, CsvExport, ExportOptions, HttpTransport,
    ModelEndpoint, Notification, Notifier, QueryComposer, RowMapper, SortTransform,
    TracingNotifier, filter_actions, number_rows,
};

/// Behaviour switches of a [`PagedCollection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionOptions {
    /// Server-side hook appended to the list-and-count route.
    pub hook_name: Option<String>,
    /// Whether rows receive an `s_no` sequence number.
    pub number_rows: bool,
    /// Settings used by [`PagedCollection::download_data`].
    pub export: ExportOptions,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            hook_name: None,
            number_rows: true,
            export: ExportOptions::default(),
        }
    }
}

/// Observable state of a paged collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionState {
    /// Rows of the current page.
    pub rows: Vec<Row>,
    /// Actions the caller may perform.
    pub actions: ActionMap,
    /// Pagination; `rows_number` holds the last reported total.
    pub pagination: PaginationState,
    /// Persistent query options layered under every fetch.
    pub fetch_options: QueryOptions,
    /// Whether a page fetch is running.
    pub loading: bool,
    /// Whether an export is running.
    pub downloading: bool,
    /// Human-readable message of the last failure.
    pub error: Option<String>,
}

/// Paged, sortable, filterable view over one model's list endpoint.
pub struct PagedCollection {
    transport: Arc<dyn HttpTransport>,
    endpoint: ModelEndpoint,
    composer: QueryComposer,
    authorizer: Arc<dyn ActionAuthorizer>,
    notifier: Arc<dyn Notifier>,
    row_mapper: Option<Arc<dyn RowMapper>>,
    export_row_mapper: Option<Arc<dyn RowMapper>>,
    options: CollectionOptions,
    state: watch::Sender<CollectionState>,
    generation: Generation,
    download_generation: Generation,
}

impl PagedCollection {
    /// Creates a collection with default strategies.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, endpoint: ModelEndpoint) -> Self {
        let (state, _) = watch::channel(CollectionState::default());

        Self {
            transport,
            endpoint,
            composer: QueryComposer::default(),
            authorizer: Arc::new(AllowAllActions),
            notifier: Arc::new(TracingNotifier),
            row_mapper: None,
            export_row_mapper: None,
            options: CollectionOptions::default(),
            state,
            generation: Generation::default(),
            download_generation: Generation::default(),
        }
    }

    /// Replaces behaviour switches.
    #[must_use]
    pub fn with_options(mut self, options: CollectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Maps grid sort columns to wire sort keys.
    #[must_use]
    pub fn with_sort_transform(mut self, sort_transform: Arc<dyn SortTransform>) -> Self {
        self.composer = QueryComposer::new(sort_transform);
        self
    }

    /// Filters server-declared actions.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn ActionAuthorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Receives failure notifications.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Reshapes rows after numbering.
    #[must_use]
    pub fn with_row_mapper(mut self, row_mapper: Arc<dyn RowMapper>) -> Self {
        self.row_mapper = Some(row_mapper);
        self
    }

    /// Reshapes exported rows instead of the default flattening.
    #[must_use]
    pub fn with_export_row_mapper(mut self, row_mapper: Arc<dyn RowMapper>) -> Self {
        self.export_row_mapper = Some(row_mapper);
        self
    }

    /// Sets the initial pagination.
    #[must_use]
    pub fn with_pagination(self, pagination: PaginationState) -> Self {
        self.set_pagination(pagination);
        self
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> CollectionState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CollectionState> {
        self.state.subscribe()
    }

    /// Replaces the persistent query options used by later fetches.
    pub fn set_fetch_options(&self, fetch_options: QueryOptions) {
        self.state
            .send_modify(|state| state.fetch_options = fetch_options);
    }

    /// Replaces the caller-owned pagination fields, keeping the reported total.
    pub fn set_pagination(&self, pagination: PaginationState) {
        self.state.send_modify(|state| {
            let rows_number = state.pagination.rows_number;
            state.pagination = PaginationState {
                rows_number,
                ..pagination
            };
        });
    }

    /// Runs one list-and-count call without touching observable state.
    pub async fn fetch(
        &self,
        query: &QueryOptions,
        pagination: &PaginationState,
    ) -> AppResult<FetchResult> {
        let path = self
            .endpoint
            .list_and_count_path(self.options.hook_name.as_deref());
        let response: ListAndCountResponse =
            post_query(self.transport.as_ref(), path, query).await?;

        let first_ordinal = self
            .options
            .number_rows
            .then(|| pagination.ordinal(0));
        let rows = number_rows(response.rows, first_ordinal, self.row_mapper.as_deref());

        Ok(FetchResult {
            rows,
            count: response.count.total(),
            actions: filter_actions(
                &response.actions,
                self.endpoint.model(),
                self.authorizer.as_ref(),
            ),
        })
    }

    /// Fetches the current page and publishes rows, total and actions.
    ///
    /// Returns `None` when the call failed or was superseded by a newer one;
    /// failures are published as `error` and notified.
    pub async fn fetch_data(&self, overrides: Option<QueryOptions>) -> Option<FetchResult> {
        let guard = LoadingGuard::begin(
            &self.state,
            &self.generation,
            |state| {
                state.loading = true;
                state.error = None;
            },
            |state| state.loading = false,
        );
        let (query, pagination) = {
            let state = self.state.borrow();
            (
                self.composer
                    .compose(&state.fetch_options, &state.pagination, overrides.as_ref()),
                state.pagination.clone(),
            )
        };

        match self.fetch(&query, &pagination).await {
            Ok(result) => {
                let published = guard.publish(|state| {
                    state.rows = result.rows.clone();
                    state.actions = result.actions.clone();
                    state.pagination.rows_number = result.count;
                });
                if !published {
                    debug!(model = %self.endpoint.model(), "discarding superseded fetch result");
                    return None;
                }
                Some(result)
            }
            Err(error) => {
                if guard.is_current() {
                    self.report_failure(&guard, &error);
                }
                None
            }
        }
    }

    /// Adopts grid pagination and fetches.
    pub async fn on_request(&self, pagination: PaginationState) -> Option<FetchResult> {
        self.set_pagination(pagination);
        self.fetch_data(None).await
    }

    /// Returns to page 1 and fetches.
    pub async fn reload_from_first_page(&self) -> Option<FetchResult> {
        self.state.send_modify(|state| state.pagination.page = 1);
        self.fetch_data(None).await
    }

    /// Exports every row matching the current query, ignoring page bounds.
    ///
    /// Runs beside page fetches; neither supersedes the other.
    pub async fn download_data(&self, overrides: Option<QueryOptions>) -> Option<CsvExport> {
        let guard = LoadingGuard::begin(
            &self.state,
            &self.download_generation,
            |state| {
                state.downloading = true;
                state.error = None;
            },
            |state| state.downloading = false,
        );
        let query = {
            let state = self.state.borrow();
            self.composer
                .compose_unpaged(&state.fetch_options, &state.pagination, overrides.as_ref())
        };

        let exporter = BulkExporter::new(self.transport.clone(), self.endpoint.clone())
            .with_options(self.options.export.clone());
        match exporter
            .export_csv(&query, self.export_row_mapper.as_deref())
            .await
        {
            Ok(export) => Some(export),
            Err(error) => {
                if guard.is_current() {
                    self.report_failure(&guard, &error);
                }
                None
            }
        }
    }

    fn report_failure(&self, guard: &LoadingGuard<'_, CollectionState>, error: &AppError) {
        let message = error.user_message();
        warn!(model = %self.endpoint.model(), error = %error, "collection request failed");

        guard.publish(|state| state.error = Some(message.clone()));
        self.notifier.notify(Notification::negative(message));
    }
}
