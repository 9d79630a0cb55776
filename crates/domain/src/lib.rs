//! Data contracts exchanged with list and form endpoints.

#![forbid(unsafe_code)]

mod action;
mod form;
mod pagination;
mod query;
mod record;
mod submission;
mod where_clause;

pub use action::{ActionDescriptor, ActionMap, ActionUi};
pub use form::{Attachment, FormField, FormFieldKind, FormValue, FormValues};
pub use pagination::PaginationState;
pub use query::{
    AttributeSpec, GroupSpec, IncludeSpec, ModelInclude, Order, QueryOptions, SortInclude,
    SortKey,
};
pub use record::{
    CountField, FetchResult, ListAndCountResponse, Row, SEQUENCE_FIELD, SelectOption, is_falsy,
};
pub use submission::{
    JSON_CONTENT_TYPE, MULTIPART_CONTENT_TYPE, MultipartPart, PartContent, SubmissionPayload,
};
pub use where_clause::{Condition, LogicalMode, Operator, WhereClause, WhereNode};
