use std::collections::BTreeSet;

use async_trait::async_trait;
use listkit_core::{AppError, AppResult};
use listkit_domain::{FormValues, Row, SortKey};
use serde_json::Value;
use tracing::{info, warn};

/// Maps the grid's sort column to the wire sort key.
pub trait SortTransform: Send + Sync {
    /// Converts a sort column name.
    fn transform(&self, sort_by: &str) -> SortKey;
}

impl<F> SortTransform for F
where
    F: Fn(&str) -> SortKey + Send + Sync,
{
    fn transform(&self, sort_by: &str) -> SortKey {
        self(sort_by)
    }
}

/// Sends the sort column unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySort;

impl SortTransform for IdentitySort {
    fn transform(&self, sort_by: &str) -> SortKey {
        SortKey::Column(sort_by.to_owned())
    }
}

/// Rewrites one row for display, export or submission.
pub trait RowMapper: Send + Sync {
    /// Maps one row.
    fn map_row(&self, row: Row) -> Row;
}

impl<F> RowMapper for F
where
    F: Fn(Row) -> Row + Send + Sync,
{
    fn map_row(&self, row: Row) -> Row {
        self(row)
    }
}

/// Decides whether the current user may run a server-declared action.
pub trait ActionAuthorizer: Send + Sync {
    /// Returns whether `action_name` on `model` is allowed.
    fn can_perform(&self, action_name: &str, model: &str) -> bool;
}

impl<F> ActionAuthorizer for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn can_perform(&self, action_name: &str, model: &str) -> bool {
        self(action_name, model)
    }
}

/// Authorizer that allows every action.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllActions;

impl ActionAuthorizer for AllowAllActions {
    fn can_perform(&self, _action_name: &str, _model: &str) -> bool {
        true
    }
}

/// Explicit `(model, action)` grants; `*` matches any model or action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionGrants {
    grants: BTreeSet<(String, String)>,
}

impl ActionGrants {
    /// Creates an empty grant set that denies everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `action_name` on `model`.
    #[must_use]
    pub fn allow(mut self, model: impl Into<String>, action_name: impl Into<String>) -> Self {
        self.grants.insert((model.into(), action_name.into()));
        self
    }

    fn grants(&self, model: &str, action_name: &str) -> bool {
        self.grants
            .contains(&(model.to_owned(), action_name.to_owned()))
    }
}

impl ActionAuthorizer for ActionGrants {
    fn can_perform(&self, action_name: &str, model: &str) -> bool {
        self.grants(model, action_name)
            || self.grants(model, "*")
            || self.grants("*", action_name)
            || self.grants("*", "*")
    }
}

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Completed operation.
    Positive,
    /// Failed operation.
    Negative,
}

/// User-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Notification {
    /// Creates a success notification.
    #[must_use]
    pub fn positive(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Positive,
            message: message.into(),
        }
    }

    /// Creates a failure notification.
    #[must_use]
    pub fn negative(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Negative,
            message: message.into(),
        }
    }
}

/// Notification sink port.
pub trait Notifier: Send + Sync {
    /// Shows one notification.
    fn notify(&self, notification: Notification);
}

/// Notifier that writes notifications to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Positive => info!(text = %notification.message, "notification"),
            NotificationLevel::Negative => warn!(text = %notification.message, "notification"),
        }
    }
}

/// Hook run on form values right before encoding.
#[async_trait]
pub trait BeforeSubmit: Send + Sync {
    /// Returns replacement values, or `None` to keep the input.
    async fn before_submit(&self, values: &FormValues) -> AppResult<Option<FormValues>>;
}

/// Callback run after a successful, accepted submission.
#[async_trait]
pub trait SubmitSuccessHandler: Send + Sync {
    /// Receives the raw response body.
    async fn on_success(&self, body: &Value) -> AppResult<()>;
}

/// Callback run with the raw error of a failed submission.
#[async_trait]
pub trait SubmitErrorHandler: Send + Sync {
    /// Receives the error before default handling runs.
    async fn on_error(&self, error: &AppError);
}

/// Verdict of a [`ValidationErrorHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationDecision {
    /// Accept the response as transformed.
    Keep,
    /// Fail the operation with the validation error.
    Reject,
}

/// Caller hook that decides the outcome of a failed response validation.
pub trait ValidationErrorHandler: Send + Sync {
    /// Inspects one validation error.
    fn on_validation_error(&self, error: &AppError) -> ValidationDecision;
}

impl<F> ValidationErrorHandler for F
where
    F: Fn(&AppError) -> ValidationDecision + Send + Sync,
{
    fn on_validation_error(&self, error: &AppError) -> ValidationDecision {
        self(error)
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionAuthorizer, ActionGrants, AllowAllActions};

    #[test]
    fn grants_support_wildcards() {
        let grants = ActionGrants::new()
            .allow("User", "approve")
            .allow("Invoice", "*")
            .allow("*", "export");

        assert!(grants.can_perform("approve", "User"));
        assert!(!grants.can_perform("delete", "User"));
        assert!(grants.can_perform("delete", "Invoice"));
        assert!(grants.can_perform("export", "Order"));
        assert!(AllowAllActions.can_perform("anything", "Order"));
    }

    #[test]
    fn closures_act_as_authorizers() {
        let authorizer = |action: &str, _model: &str| action != "delete";
        assert!(authorizer.can_perform("edit", "User"));
        assert!(!authorizer.can_perform("delete", "User"));
    }
}
