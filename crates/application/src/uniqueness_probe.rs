use std::sync::Arc;

use listkit_domain::{QueryOptions, Row, is_falsy};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::loading_guard::{Generation, LoadingGuard};
use crate::transport_ports::post_query;
use crate::{HttpTransport, ModelEndpoint};

/// Message shown while a check is running.
pub const CHECKING_MESSAGE: &str = "Checking ...";
/// Message shown when the check itself failed.
pub const CHECK_FAILED_MESSAGE: &str = "Error checking uniqueness";
/// Message used when no conflict formatter is configured.
pub const DEFAULT_CONFLICT_MESSAGE: &str = "Value not unique";

/// Builds the lookup query from the trigger value.
pub type UniquenessQueryBuilder = Arc<dyn Fn(&Value) -> QueryOptions + Send + Sync>;
/// Describes the conflicting record.
pub type ConflictFormatter = Arc<dyn Fn(&Row) -> String + Send + Sync>;

/// Result of the latest uniqueness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniquenessVerdict {
    /// Whether no conflicting record exists.
    pub is_unique: bool,
    /// Progress, conflict or error message; empty when unique.
    pub message: String,
    /// Whether a check is running.
    pub checking: bool,
}

impl Default for UniquenessVerdict {
    fn default() -> Self {
        Self {
            is_unique: true,
            message: String::new(),
            checking: false,
        }
    }
}

/// Checks whether a form value collides with an existing record.
pub struct UniquenessProbe {
    transport: Arc<dyn HttpTransport>,
    endpoint: ModelEndpoint,
    query_builder: UniquenessQueryBuilder,
    conflict_formatter: Option<ConflictFormatter>,
    state: watch::Sender<UniquenessVerdict>,
    generation: Generation,
}

impl UniquenessProbe {
    /// Creates a uniqueness check against `endpoint`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        endpoint: ModelEndpoint,
        query_builder: UniquenessQueryBuilder,
    ) -> Self {
        let (state, _) = watch::channel(UniquenessVerdict::default());

        Self {
            transport,
            endpoint,
            query_builder,
            conflict_formatter: None,
            state,
            generation: Generation::default(),
        }
    }

    /// Describes conflicts with a custom message.
    #[must_use]
    pub fn with_conflict_formatter(mut self, formatter: ConflictFormatter) -> Self {
        self.conflict_formatter = Some(formatter);
        self
    }

    /// Returns the latest verdict.
    #[must_use]
    pub fn verdict(&self) -> UniquenessVerdict {
        self.state.borrow().clone()
    }

    /// Subscribes to verdict changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UniquenessVerdict> {
        self.state.subscribe()
    }

    /// Re-checks after the trigger value changed.
    ///
    /// Falsy triggers report unique without a request. Lookup failures only
    /// replace the message.
    pub async fn check(&self, trigger: &Value) -> UniquenessVerdict {
        if is_falsy(trigger) {
            self.generation.advance();
            self.state.send_modify(|verdict| *verdict = UniquenessVerdict::default());
            return self.verdict();
        }

        let guard = LoadingGuard::begin(
            &self.state,
            &self.generation,
            |verdict| {
                verdict.checking = true;
                verdict.message = CHECKING_MESSAGE.to_owned();
            },
            |verdict| verdict.checking = false,
        );
        let query = (self.query_builder)(trigger).with_limit(1);

        let outcome = match post_query::<Vec<Row>>(
            self.transport.as_ref(),
            self.endpoint.list_path(),
            &query,
        )
        .await
        {
            Ok(rows) => match rows.first() {
                None => UniquenessVerdict::default(),
                Some(conflict) => UniquenessVerdict {
                    is_unique: false,
                    message: self.conflict_message(conflict),
                    checking: false,
                },
            },
            Err(error) => {
                warn!(model = %self.endpoint.model(), error = %error, "uniqueness check failed");
                UniquenessVerdict {
                    is_unique: self.state.borrow().is_unique,
                    message: CHECK_FAILED_MESSAGE.to_owned(),
                    checking: false,
                }
            }
        };

        if !guard.publish(|verdict| *verdict = outcome.clone()) {
            debug!(model = %self.endpoint.model(), "discarding superseded uniqueness check");
        }
        drop(guard);
        self.verdict()
    }

    fn conflict_message(&self, conflict: &Row) -> String {
        match &self.conflict_formatter {
            Some(formatter) => formatter(conflict),
            None => DEFAULT_CONFLICT_MESSAGE.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use listkit_core::{AppError, TransportFailure};
    use listkit_domain::{QueryOptions, Row, WhereClause};
    use serde_json::{Value, json};

    use super::{UniquenessProbe, UniquenessQueryBuilder};
    use crate::ModelEndpoint;
    use crate::test_support::FakeTransport;

    fn by_email() -> UniquenessQueryBuilder {
        Arc::new(|value: &Value| {
            QueryOptions::new().with_where(WhereClause::new().eq("email", value.clone()))
        })
    }

    fn checker(transport: Arc<FakeTransport>) -> UniquenessProbe {
        let endpoint = ModelEndpoint::new("User").unwrap_or_else(|_| unreachable!());
        UniquenessProbe::new(transport, endpoint, by_email())
    }

    #[tokio::test]
    async fn empty_trigger_is_unique_without_request() {
        let transport = Arc::new(FakeTransport::scripted(Vec::new()));

        let verdict = checker(transport.clone()).check(&json!("")).await;
        assert!(verdict.is_unique);
        assert!(verdict.message.is_empty());
        assert!(transport.requests().await.is_empty());
    }

    #[tokio::test]
    async fn no_match_is_unique() {
        let transport = Arc::new(FakeTransport::scripted(vec![Ok(json!([]))]));

        let verdict = checker(transport.clone()).check(&json!("a@example.com")).await;
        assert!(verdict.is_unique);
        assert!(!verdict.checking);
        assert_eq!(verdict.message, "");

        let requests = transport.requests().await;
        assert_eq!(requests[0].path, "qnatk/User/list");
        assert_eq!(
            requests[0].json_body().cloned(),
            Some(json!({"where": {"email": "a@example.com"}, "limit": 1}))
        );
    }

    #[tokio::test]
    async fn match_reports_conflict_message() {
        let transport = Arc::new(FakeTransport::scripted(vec![
            Ok(json!([{"id": 3, "name": "Ann"}])),
            Ok(json!([{"id": 3, "name": "Ann"}])),
        ]));
        let plain = checker(transport.clone());
        assert_eq!(plain.check(&json!("a@example.com")).await.message, "Value not unique");

        let formatted = checker(transport).with_conflict_formatter(Arc::new(|row: &Row| {
            format!("Already used by {}", row["name"].as_str().unwrap_or_default())
        }));
        let verdict = formatted.check(&json!("a@example.com")).await;
        assert!(!verdict.is_unique);
        assert_eq!(verdict.message, "Already used by Ann");
    }

    #[tokio::test]
    async fn lookup_failure_only_replaces_message() {
        let transport = Arc::new(FakeTransport::scripted(vec![Err(AppError::Transport(
            TransportFailure::network("timeout"),
        ))]));

        let verdict = checker(transport).check(&json!("a@example.com")).await;
        assert!(verdict.is_unique);
        assert_eq!(verdict.message, "Error checking uniqueness");
    }
}
