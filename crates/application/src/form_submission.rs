use std::sync::{Arc, RwLock};

use listkit_core::{AppError, AppResult, FieldErrors, TransportFailure};
use listkit_domain::{FormValue, FormValues, SubmissionPayload};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::loading_guard::{Generation, LoadingGuard};
use crate::{
    BeforeSubmit, HttpMethod, HttpTransport, Notification, Notifier, ResponseValidation,
    SubmitErrorHandler, SubmitSuccessHandler, TracingNotifier, TransportRequest,
    ValidationDecision,
};

/// Notification shown after a submission succeeds without a custom handler.
pub const SUBMIT_SUCCESS_MESSAGE: &str = "Form submitted successfully!";
/// Notification shown when a response has the wrong shape.
pub const UNEXPECTED_FORMAT_MESSAGE: &str =
    "Unexpected response format. Please check the logs for details.";
/// Notification shown when no response was received.
pub const NO_RESPONSE_MESSAGE: &str = "An unexpected error occurred.";

/// HTTP verb of a submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitMethod {
    /// Create.
    #[default]
    Post,
    /// Update.
    Put,
}

impl From<SubmitMethod> for HttpMethod {
    fn from(value: SubmitMethod) -> Self {
        match value {
            SubmitMethod::Post => Self::Post,
            SubmitMethod::Put => Self::Put,
        }
    }
}

/// Submission URL, fixed or derived from the values being sent.
#[derive(Clone)]
pub enum SubmitTarget {
    /// Fixed path.
    Static(String),
    /// Path computed from the final values.
    Computed(Arc<dyn Fn(&FormValues) -> String + Send + Sync>),
}

impl SubmitTarget {
    /// Resolves the path for `values`.
    #[must_use]
    pub fn resolve(&self, values: &FormValues) -> String {
        match self {
            Self::Static(path) => path.clone(),
            Self::Computed(compute) => compute(values),
        }
    }
}

impl std::fmt::Debug for SubmitTarget {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(path) => formatter.debug_tuple("Static").field(path).finish(),
            Self::Computed(_) => formatter.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for SubmitTarget {
    fn from(value: &str) -> Self {
        Self::Static(value.to_owned())
    }
}

/// How the last submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Sent, accepted and post-processed.
    Succeeded,
    /// Response failed validation and the validation hook took over.
    ValidationRejected,
    /// Transport, hook or validation failure.
    Failed,
}

/// Observable state of a form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    /// Working values.
    pub values: FormValues,
    /// Server field errors of the last failure, verbatim.
    pub errors: FieldErrors,
    /// Whether a submission is running.
    pub is_loading: bool,
    /// Last response body, validated when a validator is set.
    pub response_data: Option<Value>,
    /// Outcome of the last finished submission.
    pub last_outcome: Option<SubmitOutcome>,
}

/// Form submission engine: values, encoding, validation and error mapping.
pub struct FormSubmission {
    transport: Arc<dyn HttpTransport>,
    target: RwLock<SubmitTarget>,
    method: SubmitMethod,
    defaults: FormValues,
    validator: Option<Arc<dyn ResponseValidation>>,
    before_submit: Option<Arc<dyn BeforeSubmit>>,
    success_handler: Option<Arc<dyn SubmitSuccessHandler>>,
    error_handler: Option<Arc<dyn SubmitErrorHandler>>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<FormState>,
    generation: Generation,
}

impl FormSubmission {
    /// Creates a form whose working values start as `defaults`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        target: impl Into<SubmitTarget>,
        defaults: FormValues,
    ) -> Self {
        let (state, _) = watch::channel(FormState {
            values: defaults.clone(),
            ..FormState::default()
        });

        Self {
            transport,
            target: RwLock::new(target.into()),
            method: SubmitMethod::default(),
            defaults,
            validator: None,
            before_submit: None,
            success_handler: None,
            error_handler: None,
            notifier: Arc::new(TracingNotifier),
            state,
            generation: Generation::default(),
        }
    }

    /// Sets the HTTP verb.
    #[must_use]
    pub fn with_method(mut self, method: SubmitMethod) -> Self {
        self.method = method;
        self
    }

    /// Validates successful response bodies.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn ResponseValidation>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Transforms values right before encoding.
    #[must_use]
    pub fn with_before_submit(mut self, hook: Arc<dyn BeforeSubmit>) -> Self {
        self.before_submit = Some(hook);
        self
    }

    /// Replaces the default success notification.
    #[must_use]
    pub fn with_success_handler(mut self, handler: Arc<dyn SubmitSuccessHandler>) -> Self {
        self.success_handler = Some(handler);
        self
    }

    /// Receives raw errors before default error handling.
    #[must_use]
    pub fn with_error_handler(mut self, handler: Arc<dyn SubmitErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Receives user-facing notifications.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replaces the submission target for later submissions.
    pub fn update_target(&self, target: impl Into<SubmitTarget>) {
        let target = target.into();
        match self.target.write() {
            Ok(mut current) => *current = target,
            Err(poisoned) => *poisoned.into_inner() = target,
        }
    }

    fn resolve_target(&self, values: &FormValues) -> String {
        match self.target.read() {
            Ok(target) => target.resolve(values),
            Err(poisoned) => poisoned.into_inner().resolve(values),
        }
    }

    /// Returns a snapshot of the form state.
    #[must_use]
    pub fn state(&self) -> FormState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.state.subscribe()
    }

    /// Returns the working values.
    #[must_use]
    pub fn values(&self) -> FormValues {
        self.state.borrow().values.clone()
    }

    /// Sets one working value.
    pub fn set_value(&self, field: impl Into<String>, value: impl Into<FormValue>) {
        let (field, value) = (field.into(), value.into());
        self.state.send_modify(|state| state.values.insert(field, value));
    }

    /// Replaces all working values.
    pub fn set_values(&self, values: FormValues) {
        self.state.send_modify(|state| state.values = values);
    }

    /// Restores the defaults and clears field errors.
    pub fn reset_form(&self) {
        let defaults = self.defaults.clone();
        self.state.send_modify(|state| {
            state.values = defaults;
            state.errors.clear();
        });
    }

    /// Submits the working values.
    ///
    /// Returns the outcome; failures are also reported through the error
    /// handler, field errors and notifications before being returned.
    pub async fn submit(&self, reset_form: bool) -> AppResult<SubmitOutcome> {
        let guard = LoadingGuard::begin(
            &self.state,
            &self.generation,
            |state| {
                state.errors.clear();
                state.is_loading = true;
            },
            |state| state.is_loading = false,
        );
        let values = self.values();

        match self.run(&guard, values, reset_form).await {
            Ok(outcome) => {
                guard.publish(|state| state.last_outcome = Some(outcome));
                Ok(outcome)
            }
            Err(error) => Err(self.fail(&guard, error).await),
        }
    }

    async fn run(
        &self,
        guard: &LoadingGuard<'_, FormState>,
        values: FormValues,
        reset_form: bool,
    ) -> AppResult<SubmitOutcome> {
        let values = match &self.before_submit {
            Some(hook) => hook.before_submit(&values).await?.unwrap_or(values),
            None => values,
        };

        let payload = SubmissionPayload::from_values(&values);
        let request = TransportRequest {
            method: self.method.into(),
            path: self.resolve_target(&values),
            body: payload.clone().into(),
        };
        debug!(
            path = %request.path,
            method = request.method.as_str(),
            content_type = payload.content_type(),
            "submitting form"
        );

        let body = self.transport.send(request).await?;
        guard.publish(|state| state.response_data = Some(body.clone()));

        if let Some(validator) = &self.validator {
            match validator.validate(&body) {
                Ok(validated) => {
                    guard.publish(|state| state.response_data = Some(validated));
                }
                Err(error) => {
                    if let Some(outcome) = self.handle_validation_error(validator.as_ref(), error)? {
                        return Ok(outcome);
                    }
                }
            }
        }

        if reset_form {
            let defaults = self.defaults.clone();
            guard.publish(|state| state.values = defaults);
        }

        match &self.success_handler {
            Some(handler) => handler.on_success(&body).await?,
            None => self
                .notifier
                .notify(Notification::positive(SUBMIT_SUCCESS_MESSAGE)),
        }
        info!(outcome = "succeeded", "form submitted");

        Ok(SubmitOutcome::Succeeded)
    }

    /// Returns `None` when the validation hook keeps the raw response.
    fn handle_validation_error(
        &self,
        validator: &dyn ResponseValidation,
        error: AppError,
    ) -> AppResult<Option<SubmitOutcome>> {
        let Some(handler) = validator.options().on_validation_error.clone() else {
            return Err(error);
        };

        // Rule failures reach this point only after the hook rejected them.
        let decision = match error {
            AppError::SchemaValidation(_) => ValidationDecision::Reject,
            _ => handler.on_validation_error(&error),
        };
        if decision == ValidationDecision::Keep {
            warn!(error = %error, "validation hook kept unvalidated response");
            return Ok(None);
        }

        if error.is_shape_mismatch() {
            self.notifier
                .notify(Notification::negative(UNEXPECTED_FORMAT_MESSAGE));
        }
        warn!(error = %error, "submission response rejected by validation");

        Ok(Some(SubmitOutcome::ValidationRejected))
    }

    async fn fail(&self, guard: &LoadingGuard<'_, FormState>, error: AppError) -> AppError {
        if let Some(handler) = &self.error_handler {
            handler.on_error(&error).await;
        }
        warn!(error = %error, "form submission failed");

        match error.transport_failure().and_then(TransportFailure::field_errors) {
            Some(field_errors) => {
                for (field, messages) in &field_errors {
                    if !self.defaults.contains_field(field) {
                        self.notifier.notify(Notification::negative(format!(
                            "{field}: {}",
                            messages.join("; ")
                        )));
                    }
                }
                guard.publish(|state| state.errors = field_errors);
            }
            None => self
                .notifier
                .notify(Notification::negative(failure_message(&error))),
        }
        guard.publish(|state| state.last_outcome = Some(SubmitOutcome::Failed));

        error
    }
}

fn failure_message(error: &AppError) -> String {
    match error.transport_failure() {
        Some(failure) if failure.has_response() => {
            let message = failure
                .server_message()
                .unwrap_or_else(|| failure.message().to_owned());
            match failure.server_status_code() {
                Some(code) => format!("{code} {message}"),
                None => message,
            }
        }
        Some(_) => NO_RESPONSE_MESSAGE.to_owned(),
        None if error.is_shape_mismatch() => UNEXPECTED_FORMAT_MESSAGE.to_owned(),
        None => error.user_message(),
    }
}
