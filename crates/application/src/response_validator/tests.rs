use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use listkit_core::AppError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::test_support::LogCapture;
use crate::{ValidationDecision, ValidationErrorHandler};

use super::{
    ResponseSchema, ResponseValidation, ResponseValidationOptions, SchemaValidator,
    ValidatedBody, ValidationFailurePolicy, validate_response,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
struct Tag {
    #[validate(length(min = 1, message = "tag name should not be empty"))]
    name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
struct CreatedUser {
    id: u64,
    #[validate(email(message = "email must be an email"))]
    email: String,
    #[serde(default)]
    #[validate(nested)]
    tags: Vec<Tag>,
}

impl ResponseSchema for CreatedUser {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
struct ListedUser {
    id: u64,
}

impl ResponseSchema for ListedUser {
    fn expects_array() -> bool {
        true
    }
}

fn options() -> ResponseValidationOptions {
    ResponseValidationOptions::default()
}

#[test]
fn single_object_is_transformed() {
    let body = json!({"id": 7, "email": "a@example.com"});

    let validated = validate_response::<CreatedUser>(&body, &options());
    assert_eq!(
        validated.ok(),
        Some(ValidatedBody::One(CreatedUser {
            id: 7,
            email: "a@example.com".to_owned(),
            tags: Vec::new(),
        }))
    );
}

#[test]
fn array_where_object_expected_is_shape_mismatch() {
    let body = json!([{"id": 7, "email": "a@example.com"}]);

    let result = validate_response::<CreatedUser>(&body, &options());
    assert!(matches!(result, Err(AppError::ShapeMismatch(_))));
}

#[test]
fn object_where_array_expected_is_shape_mismatch() {
    let result = validate_response::<ListedUser>(&json!({"id": 1}), &options());
    assert!(result.as_ref().is_err_and(AppError::is_shape_mismatch));

    let forced = ResponseValidationOptions {
        expect_array: Some(false),
        ..options()
    };
    assert!(validate_response::<ListedUser>(&json!({"id": 1}), &forced).is_ok());
}

#[test]
fn arrays_validate_each_item() {
    let result = validate_response::<ListedUser>(&json!([{"id": 1}, {"id": 2}]), &options());
    assert_eq!(
        result.ok(),
        Some(ValidatedBody::Many(vec![ListedUser { id: 1 }, ListedUser { id: 2 }]))
    );
}

#[test]
fn rule_failures_warn_by_default_and_keep_value() {
    let body = json!({"id": 7, "email": "not-an-email"});

    let result = validate_response::<CreatedUser>(&body, &options());
    assert!(result.is_ok());
}

#[test]
fn throw_policy_reports_nested_violations() {
    let body = json!({"id": 7, "email": "not-an-email", "tags": [{"name": ""}]});
    let strict = ResponseValidationOptions {
        validation_failed: ValidationFailurePolicy::Throw,
        ..options()
    };

    let result = validate_response::<CreatedUser>(&body, &strict);
    let Err(AppError::SchemaValidation(violations)) = result else {
        unreachable!("expected schema validation failure");
    };

    let properties: Vec<&str> = violations.iter().map(|violation| violation.property.as_str()).collect();
    assert_eq!(properties, vec!["email", "tags"]);
    assert_eq!(
        violations[0].constraints.get("email").map(String::as_str),
        Some("email must be an email")
    );
    assert_eq!(violations[1].children[0].property, "0");
    assert_eq!(violations[1].children[0].children[0].property, "name");
}

#[test]
fn handler_decides_instead_of_policy() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let handler: Arc<dyn ValidationErrorHandler> = Arc::new(move |_error: &AppError| {
        seen.fetch_add(1, Ordering::SeqCst);
        ValidationDecision::Reject
    });
    let with_handler = ResponseValidationOptions {
        on_validation_error: Some(handler),
        validation_failed: ValidationFailurePolicy::Silent,
        ..options()
    };

    let result =
        validate_response::<CreatedUser>(&json!({"id": 1, "email": "bad"}), &with_handler);
    assert!(matches!(result, Err(AppError::SchemaValidation(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn extra_fields_can_warn_and_throw() {
    let body = json!({"id": 7, "email": "a@example.com", "password_hash": "x", "salt": "y"});

    assert!(validate_response::<CreatedUser>(&body, &options()).is_ok());

    let strict = ResponseValidationOptions {
        warn_on_extra_fields: true,
        throw_on_extra_fields: true,
        ..options()
    };
    let logs = LogCapture::default();
    let result = logs.run(|| validate_response::<CreatedUser>(&body, &strict));
    let Err(AppError::ExtraFields(fields)) = result else {
        unreachable!("expected extra fields failure");
    };
    assert_eq!(fields, vec!["password_hash".to_owned(), "salt".to_owned()]);

    let output = logs.output();
    assert!(output.contains("WARN"));
    assert!(output.contains("extra fields detected in response"));
    assert!(output.contains("password_hash, salt"));

    let filtered = ResponseValidationOptions {
        filter_extra_fields: true,
        ..strict
    };
    assert!(validate_response::<CreatedUser>(&body, &filtered).is_ok());
}

#[test]
fn schema_validator_returns_plain_json_without_undeclared_fields() {
    let validator = SchemaValidator::<CreatedUser>::new(options());

    let plain = validator.validate(&json!({"id": 3, "email": "c@example.com", "debug": true}));
    assert_eq!(
        plain.ok(),
        Some(json!({"id": 3, "email": "c@example.com", "tags": []}))
    );
}

#[test]
fn undecodable_item_is_schema_failure() {
    let result = validate_response::<CreatedUser>(&json!({"id": "seven"}), &options());
    assert!(matches!(result, Err(AppError::SchemaValidation(_))));
}
