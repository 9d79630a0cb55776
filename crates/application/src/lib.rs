//! Application services and ports.

#![forbid(unsafe_code)]

mod bulk_exporter;
mod form_submission;
mod loading_guard;
mod paged_collection;
mod query_composer;
mod record_finder;
mod record_writer;
mod remote_autocomplete;
mod response_validator;
mod row_processing;
mod strategy_ports;
mod transport_ports;
mod uniqueness_probe;

#[cfg(test)]
mod test_support;

pub use bulk_exporter::{
    BulkExporter, CSV_ENCODING, CSV_MIME_TYPE, CsvExport, CsvQuoting, DEFAULT_CHUNK_SIZE,
    DEFAULT_EXPORT_FILE_NAME, ExportOptions, flatten_row, rows_to_csv,
};
pub use form_submission::{
    FormState, FormSubmission, NO_RESPONSE_MESSAGE, SUBMIT_SUCCESS_MESSAGE, SubmitMethod,
    SubmitOutcome, SubmitTarget, UNEXPECTED_FORMAT_MESSAGE,
};
pub use paged_collection::{CollectionOptions, CollectionState, PagedCollection};
pub use query_composer::QueryComposer;
pub use record_finder::RecordFinder;
pub use record_writer::{RecordWriter, WriteState, unwrap_select_values};
pub use remote_autocomplete::{
    AutocompleteState, LookupOptionsBuilder, MIN_SEARCH_LENGTH, RemoteAutocomplete,
    SUGGESTION_LIMIT,
};
pub use response_validator::{
    ResponseSchema, ResponseValidation, ResponseValidationOptions, SchemaValidator,
    ValidatedBody, ValidationFailurePolicy, validate_response, violations_from,
};
pub use row_processing::{filter_actions, number_rows};
pub use strategy_ports::{
    ActionAuthorizer, ActionGrants, AllowAllActions, BeforeSubmit, IdentitySort, Notification,
    NotificationLevel, Notifier, RowMapper, SortTransform, SubmitErrorHandler,
    SubmitSuccessHandler, TracingNotifier, ValidationDecision, ValidationErrorHandler,
};
pub use transport_ports::{
    DEFAULT_BASE_PATH, HttpMethod, HttpTransport, ModelEndpoint, RequestBody, TransportRequest,
};
pub use uniqueness_probe::{
    CHECK_FAILED_MESSAGE, CHECKING_MESSAGE, ConflictFormatter, DEFAULT_CONFLICT_MESSAGE,
    UniquenessProbe, UniquenessQueryBuilder, UniquenessVerdict,
};
