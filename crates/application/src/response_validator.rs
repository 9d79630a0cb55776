use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use listkit_core::{AppError, AppResult, FieldViolation};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, warn};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::{ValidationDecision, ValidationErrorHandler};

/// Declarative schema a response body is checked against.
///
/// Deserializing is the transform step: fields the type does not declare are
/// dropped, unless the type captures them with `#[serde(flatten)]`.
pub trait ResponseSchema: Serialize + DeserializeOwned + Validate + Send + Sync {
    /// Whether responses of this schema are arrays by default.
    fn expects_array() -> bool {
        false
    }
}

/// What happens when schema rules fail and no handler is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationFailurePolicy {
    /// Log a warning and keep the transformed value.
    #[default]
    Warn,
    /// Log an error and fail.
    Throw,
    /// Keep the transformed value without logging.
    Silent,
}

/// Response validation settings.
#[derive(Clone, Default)]
pub struct ResponseValidationOptions {
    /// Expected shape; `None` defers to [`ResponseSchema::expects_array`].
    pub expect_array: Option<bool>,
    /// Skip the undeclared-field check.
    pub filter_extra_fields: bool,
    /// Log undeclared fields.
    pub warn_on_extra_fields: bool,
    /// Fail on undeclared fields.
    pub throw_on_extra_fields: bool,
    /// Hook deciding the outcome of rule failures; replaces the policy.
    pub on_validation_error: Option<Arc<dyn ValidationErrorHandler>>,
    /// Rule failure policy used without a hook.
    pub validation_failed: ValidationFailurePolicy,
}

impl std::fmt::Debug for ResponseValidationOptions {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ResponseValidationOptions")
            .field("expect_array", &self.expect_array)
            .field("filter_extra_fields", &self.filter_extra_fields)
            .field("warn_on_extra_fields", &self.warn_on_extra_fields)
            .field("throw_on_extra_fields", &self.throw_on_extra_fields)
            .field("on_validation_error", &self.on_validation_error.is_some())
            .field("validation_failed", &self.validation_failed)
            .finish()
    }
}

/// Validated response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedBody<T> {
    /// Single object.
    One(T),
    /// Array of objects.
    Many(Vec<T>),
}

impl<T: Serialize> ValidatedBody<T> {
    /// Serializes the transformed value back to JSON.
    pub fn to_plain(&self) -> AppResult<Value> {
        let encoded = match self {
            Self::One(item) => serde_json::to_value(item),
            Self::Many(items) => serde_json::to_value(items),
        };
        encoded.map_err(|error| {
            AppError::Internal(format!("failed to encode validated response: {error}"))
        })
    }
}

/// Checks shape, transforms, validates and drift-checks a raw body.
pub fn validate_response<T: ResponseSchema>(
    raw: &Value,
    options: &ResponseValidationOptions,
) -> AppResult<ValidatedBody<T>> {
    let expect_array = options.expect_array.unwrap_or_else(T::expects_array);

    match (raw, expect_array) {
        (Value::Array(items), true) => items
            .iter()
            .map(|item| validate_item::<T>(item, options))
            .collect::<AppResult<Vec<_>>>()
            .map(ValidatedBody::Many),
        (Value::Array(_), false) => Err(shape_mismatch(
            "Expected a single object, but received an array.",
        )),
        (_, true) => Err(shape_mismatch(
            "Expected an array, but received a single object.",
        )),
        (other, false) => validate_item::<T>(other, options).map(ValidatedBody::One),
    }
}

fn shape_mismatch(message: &str) -> AppError {
    let error = AppError::ShapeMismatch(message.to_owned());
    error!(error = %error, "response shape mismatch");
    error
}

fn validate_item<T: ResponseSchema>(
    item: &Value,
    options: &ResponseValidationOptions,
) -> AppResult<T> {
    let instance: T = serde_json::from_value(item.clone()).map_err(|error| {
        AppError::SchemaValidation(vec![FieldViolation::new("$", "type", error.to_string())])
    })?;

    if let Err(errors) = instance.validate() {
        handle_violations(violations_from(&errors), options)?;
    }

    if !options.filter_extra_fields {
        check_extra_fields(item, &instance, options)?;
    }

    Ok(instance)
}

fn handle_violations(
    violations: Vec<FieldViolation>,
    options: &ResponseValidationOptions,
) -> AppResult<()> {
    let error = AppError::SchemaValidation(violations);

    if let Some(handler) = &options.on_validation_error {
        return match handler.on_validation_error(&error) {
            ValidationDecision::Keep => Ok(()),
            ValidationDecision::Reject => Err(error),
        };
    }

    match options.validation_failed {
        ValidationFailurePolicy::Warn => {
            warn!(details = %violation_summary(&error), "response validation failed");
            Ok(())
        }
        ValidationFailurePolicy::Throw => {
            error!(details = %violation_summary(&error), "response validation failed");
            Err(error)
        }
        ValidationFailurePolicy::Silent => Ok(()),
    }
}

fn violation_summary(error: &AppError) -> String {
    match error {
        AppError::SchemaValidation(violations) => violations
            .iter()
            .flat_map(FieldViolation::messages)
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

fn check_extra_fields<T: Serialize>(
    raw: &Value,
    instance: &T,
    options: &ResponseValidationOptions,
) -> AppResult<()> {
    let Value::Object(raw_fields) = raw else {
        return Ok(());
    };
    let plain = serde_json::to_value(instance).map_err(|error| {
        AppError::Internal(format!("failed to encode validated response: {error}"))
    })?;
    let Value::Object(kept_fields) = plain else {
        return Ok(());
    };

    let extra: Vec<String> = raw_fields
        .keys()
        .filter(|key| !kept_fields.contains_key(key.as_str()))
        .cloned()
        .collect();
    if extra.is_empty() {
        return Ok(());
    }

    if options.warn_on_extra_fields {
        warn!(fields = %extra.join(", "), "extra fields detected in response");
    }
    if options.throw_on_extra_fields {
        return Err(AppError::ExtraFields(extra));
    }

    Ok(())
}

/// Converts validator output into ordered field violations.
#[must_use]
pub fn violations_from(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut violations: Vec<FieldViolation> = errors
        .errors()
        .iter()
        .map(|(field, kind)| match kind {
            ValidationErrorsKind::Field(list) => FieldViolation {
                property: field.to_string(),
                constraints: list
                    .iter()
                    .map(|failure| {
                        let message = failure
                            .message
                            .as_ref()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| format!("{field} failed '{}' rule", failure.code));
                        (failure.code.to_string(), message)
                    })
                    .collect(),
                children: Vec::new(),
            },
            ValidationErrorsKind::Struct(nested) => FieldViolation {
                property: field.to_string(),
                constraints: BTreeMap::new(),
                children: violations_from(nested),
            },
            ValidationErrorsKind::List(items) => FieldViolation {
                property: field.to_string(),
                constraints: BTreeMap::new(),
                children: items
                    .iter()
                    .map(|(index, nested)| FieldViolation {
                        property: index.to_string(),
                        constraints: BTreeMap::new(),
                        children: violations_from(nested),
                    })
                    .collect(),
            },
        })
        .collect();

    violations.sort_by(|left, right| left.property.cmp(&right.property));
    violations
}

/// Object-safe validator used by services that hold a schema.
pub trait ResponseValidation: Send + Sync {
    /// Validates and returns the transformed value as JSON.
    fn validate(&self, raw: &Value) -> AppResult<Value>;

    /// Returns the settings in effect.
    fn options(&self) -> &ResponseValidationOptions;
}

/// [`ResponseValidation`] bound to one schema type.
pub struct SchemaValidator<T> {
    options: ResponseValidationOptions,
    schema: PhantomData<fn() -> T>,
}

impl<T: ResponseSchema> SchemaValidator<T> {
    /// Creates a validator.
    #[must_use]
    pub fn new(options: ResponseValidationOptions) -> Self {
        Self {
            options,
            schema: PhantomData,
        }
    }
}

impl<T: ResponseSchema> ResponseValidation for SchemaValidator<T> {
    fn validate(&self, raw: &Value) -> AppResult<Value> {
        validate_response::<T>(raw, &self.options)?.to_plain()
    }

    fn options(&self) -> &ResponseValidationOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests;
