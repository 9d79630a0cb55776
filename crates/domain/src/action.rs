use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// Server-declared UI actions keyed by action name.
pub type ActionMap = BTreeMap<String, ActionDescriptor>;

/// Dialog options attached to an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActionUi {
    /// Dialog mode.
    #[validate(required(message = "ui mode must be a string"), length(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Layout rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Vec<Value>>,
    /// Field schema keyed by field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,
    /// Dialog title.
    #[validate(required(message = "title should not be empty"), length(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Dialog message.
    #[validate(required(message = "message should not be empty"), length(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Confirm button label.
    #[validate(required(message = "okLabel should not be empty"), length(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok_label: Option<String>,
    /// Cancel button label.
    #[validate(required(message = "cancelLabel should not be empty"), length(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_label: Option<String>,
    /// Keys the client does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Descriptor of one server-declared action.
///
/// The client reads and filters descriptors but never rewrites them, so
/// unmodelled keys are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptor {
    /// Action name.
    #[validate(required(message = "name should not be empty"), length(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Model the action targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_model: Option<String>,
    /// Label text or localized label object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Value>,
    /// Tooltip text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    /// Icon name or icon object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Value>,
    /// Icon color name or per-state color object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<Value>,
    /// Human description.
    #[validate(required(message = "description should not be empty"), length(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Execution mode.
    #[validate(required(message = "mode should not be empty"), length(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Dialog options.
    #[validate(nested)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<ActionUi>,
    /// Record loading rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_by: Option<Value>,
    /// Row visibility condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Map<String, Value>>,
    /// Model returned after execution, or `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_model: Option<Value>,
    /// Keys the client does not model, `roles` included.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActionDescriptor {
    /// Role names listed under `roles`; non-string entries are skipped.
    #[must_use]
    pub fn roles(&self) -> Vec<&str> {
        self.extra
            .get("roles")
            .and_then(Value::as_array)
            .map(|roles| roles.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use validator::Validate;

    use super::ActionDescriptor;

    fn descriptor() -> Value {
        json!({
            "name": "approve",
            "label": {"en": "Approve"},
            "icon": "check",
            "description": "Approve the request",
            "mode": "single",
            "ui": {
                "mode": "confirm",
                "title": "Approve?",
                "message": "This cannot be undone",
                "okLabel": "Yes",
                "cancelLabel": "No"
            },
            "roles": ["manager"],
            "color": "green"
        })
    }

    #[test]
    fn descriptor_round_trip_keeps_unmodelled_keys() {
        let parsed: Option<ActionDescriptor> = serde_json::from_value(descriptor()).ok();
        assert!(parsed.is_some());
        let parsed = parsed.unwrap_or_else(|| unreachable!());

        assert_eq!(parsed.extra.get("color"), Some(&json!("green")));
        assert_eq!(
            serde_json::to_value(&parsed).unwrap_or(Value::Null),
            descriptor()
        );
    }

    #[test]
    fn absent_and_null_roles_pass_through_untouched() {
        let bare: Option<ActionDescriptor> = serde_json::from_value(json!({"name": "edit"})).ok();
        assert_eq!(
            bare.and_then(|parsed| serde_json::to_value(&parsed).ok()),
            Some(json!({"name": "edit"}))
        );

        let nulled: Option<ActionDescriptor> =
            serde_json::from_value(json!({"name": "edit", "roles": null})).ok();
        assert!(nulled.is_some());
        let nulled = nulled.unwrap_or_else(|| unreachable!());
        assert!(nulled.roles().is_empty());
        assert_eq!(
            serde_json::to_value(&nulled).unwrap_or(Value::Null),
            json!({"name": "edit", "roles": null})
        );
    }

    #[test]
    fn roles_are_read_from_descriptor() {
        let parsed: Option<ActionDescriptor> = serde_json::from_value(descriptor()).ok();
        assert_eq!(parsed.map(|parsed| parsed.roles().len()), Some(1));
    }

    #[test]
    fn descriptor_rules_flag_missing_ui_labels() {
        let mut raw = descriptor();
        if let Some(ui) = raw.get_mut("ui").and_then(Value::as_object_mut) {
            ui.remove("okLabel");
        }
        let parsed: Option<ActionDescriptor> = serde_json::from_value(raw).ok();
        assert!(parsed.is_some());
        let parsed = parsed.unwrap_or_else(|| unreachable!());

        assert!(parsed.validate().is_err());
    }
}
