use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Server-reported field errors keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// One field that failed a schema rule check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Field (property) name, or list index for nested collections.
    pub property: String,
    /// Violated rule codes mapped to their messages.
    pub constraints: BTreeMap<String, String>,
    /// Violations of nested objects under this property.
    pub children: Vec<FieldViolation>,
}

impl FieldViolation {
    /// Creates a violation for a single rule.
    #[must_use]
    pub fn new(
        property: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            constraints: BTreeMap::from([(code.into(), message.into())]),
            children: Vec::new(),
        }
    }

    /// Returns every constraint message, nested ones prefixed by their path.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self
            .constraints
            .values()
            .map(|message| format!("{}: {message}", self.property))
            .collect();

        for child in &self.children {
            messages.extend(
                child
                    .messages()
                    .into_iter()
                    .map(|message| format!("{}.{message}", self.property)),
            );
        }

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::FieldViolation;

    #[test]
    fn messages_include_nested_paths() {
        let mut parent = FieldViolation::new("ui", "nested", "ui is invalid");
        parent
            .children
            .push(FieldViolation::new("title", "length", "title must not be empty"));

        assert_eq!(
            parent.messages(),
            vec![
                "ui: ui is invalid".to_owned(),
                "ui.title: title must not be empty".to_owned(),
            ]
        );
    }
}
