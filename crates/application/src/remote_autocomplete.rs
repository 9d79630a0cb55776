use std::sync::Arc;

use listkit_domain::{QueryOptions, Row, SelectOption, SortKey, is_falsy};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::loading_guard::{Generation, LoadingGuard};
use crate::transport_ports::post_query;
use crate::{HttpTransport, ModelEndpoint};

/// Shortest search term that triggers a request.
pub const MIN_SEARCH_LENGTH: usize = 2;
/// Maximum suggestions per lookup.
pub const SUGGESTION_LIMIT: u64 = 10;

/// Builds lookup options from a search term or a selected id.
pub type LookupOptionsBuilder = Arc<dyn Fn(&str) -> QueryOptions + Send + Sync>;

/// Observable state of a remote autocomplete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutocompleteState {
    /// Text shown in the input.
    pub search_term: String,
    /// Latest suggestions.
    pub suggestions: Vec<SelectOption>,
    /// Selected option.
    pub selected: Option<SelectOption>,
    /// Whether a lookup is running.
    pub is_loading: bool,
}

/// Search-as-you-type option source backed by a list endpoint.
pub struct RemoteAutocomplete {
    transport: Arc<dyn HttpTransport>,
    endpoint: ModelEndpoint,
    search_options: LookupOptionsBuilder,
    initial_value_options: LookupOptionsBuilder,
    label_field: String,
    value_field: String,
    state: watch::Sender<AutocompleteState>,
    search_generation: Generation,
    selection_generation: Generation,
}

impl RemoteAutocomplete {
    /// Creates a source labelling options with `name` and valuing them with `id`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        endpoint: ModelEndpoint,
        search_options: LookupOptionsBuilder,
        initial_value_options: LookupOptionsBuilder,
    ) -> Self {
        let (state, _) = watch::channel(AutocompleteState::default());

        Self {
            transport,
            endpoint,
            search_options,
            initial_value_options,
            label_field: "name".to_owned(),
            value_field: "id".to_owned(),
            state,
            search_generation: Generation::default(),
            selection_generation: Generation::default(),
        }
    }

    /// Overrides the row fields used for label and value.
    #[must_use]
    pub fn with_fields(mut self, label_field: impl Into<String>, value_field: impl Into<String>) -> Self {
        self.label_field = label_field.into();
        self.value_field = value_field.into();
        self
    }

    /// Returns a snapshot of the state.
    #[must_use]
    pub fn state(&self) -> AutocompleteState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AutocompleteState> {
        self.state.subscribe()
    }

    /// Selects an option, or clears the selection.
    pub fn select(&self, option: Option<SelectOption>) {
        self.selection_generation.advance();
        self.state.send_modify(|state| {
            state.search_term = option
                .as_ref()
                .map(|option| label_text(&option.label))
                .unwrap_or_default();
            state.selected = option;
        });
    }

    /// Looks up suggestions for `term`.
    ///
    /// Terms shorter than [`MIN_SEARCH_LENGTH`] clear suggestions without a
    /// request. Failures are logged and leave suggestions unchanged.
    pub async fn search(&self, term: &str) -> Vec<SelectOption> {
        if term.chars().count() < MIN_SEARCH_LENGTH {
            self.search_generation.advance();
            self.state.send_modify(|state| {
                state.search_term = term.to_owned();
                state.suggestions.clear();
            });
            return Vec::new();
        }

        let guard = LoadingGuard::begin(
            &self.state,
            &self.search_generation,
            |state| state.is_loading = true,
            |state| state.is_loading = false,
        );
        self.state
            .send_modify(|state| state.search_term = term.to_owned());

        match self.lookup((self.search_options)(term)).await {
            Some(rows) => {
                let options: Vec<SelectOption> =
                    rows.into_iter().map(|row| self.to_option(row)).collect();
                if !guard.publish(|state| state.suggestions = options.clone()) {
                    debug!(model = %self.endpoint.model(), term, "discarding superseded suggestions");
                }
                options
            }
            None => self.state.borrow().suggestions.clone(),
        }
    }

    /// Resolves the option of an already stored value.
    ///
    /// Falsy ids leave the selection as it is.
    pub async fn fetch_initial_value(&self, id: &Value) -> Option<SelectOption> {
        if is_falsy(id) {
            return None;
        }
        let id_text = match id {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };

        let guard = LoadingGuard::begin(
            &self.state,
            &self.selection_generation,
            |state| state.is_loading = true,
            |state| state.is_loading = false,
        );
        let selected = match self.lookup((self.initial_value_options)(&id_text)).await {
            Some(rows) => match rows.into_iter().next() {
                Some(row) => Some(self.to_option(row)),
                None => {
                    warn!(model = %self.endpoint.model(), id = %id_text, "no record found for initial value");
                    None
                }
            },
            None => None,
        };

        guard.publish(|state| {
            if let Some(option) = &selected {
                state.search_term = label_text(&option.label);
            }
            state.selected = selected.clone();
        });
        selected
    }

    async fn lookup(&self, options: QueryOptions) -> Option<Vec<Row>> {
        let query = options.merged_with(&QueryOptions {
            limit: Some(SUGGESTION_LIMIT),
            offset: Some(0),
            sort_by: Some(SortKey::Column("id".to_owned())),
            sort_by_descending: Some(false),
            ..QueryOptions::default()
        });

        match post_query::<Vec<Row>>(self.transport.as_ref(), self.endpoint.list_path(), &query)
            .await
        {
            Ok(rows) => Some(rows),
            Err(failure) => {
                error!(model = %self.endpoint.model(), error = %failure, "option lookup failed");
                None
            }
        }
    }

    fn to_option(&self, row: Row) -> SelectOption {
        SelectOption::from_row(row, &self.label_field, &self.value_field)
    }
}

fn label_text(label: &Value) -> String {
    match label {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
