use std::collections::BTreeMap;
use std::str::FromStr;

use listkit_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Binary file selected in a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment.
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Returns the file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.file_name.as_str()
    }

    /// Returns the MIME type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.content_type.as_str()
    }

    /// Returns the file contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// JSON description used when the file sits inside a stringified object.
    #[must_use]
    pub fn describe(&self) -> Value {
        let mut map = Map::new();
        map.insert("fileName".to_owned(), Value::String(self.file_name.clone()));
        map.insert(
            "contentType".to_owned(),
            Value::String(self.content_type.clone()),
        );
        map.insert("size".to_owned(), Value::from(self.bytes.len()));
        Value::Object(map)
    }
}

/// One form value; like JSON but able to hold attachments.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FormValue {
    /// Empty value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(Number),
    /// Text.
    Text(String),
    /// Binary attachment.
    Attachment(Attachment),
    /// Ordered list.
    List(Vec<FormValue>),
    /// Nested object.
    Object(BTreeMap<String, FormValue>),
}

impl FormValue {
    /// Returns whether this value is an attachment.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        matches!(self, Self::Attachment(_))
    }

    /// Returns whether any leaf, at any depth, is an attachment.
    #[must_use]
    pub fn contains_attachment(&self) -> bool {
        match self {
            Self::Attachment(_) => true,
            Self::List(items) => items.iter().any(Self::contains_attachment),
            Self::Object(fields) => fields.values().any(Self::contains_attachment),
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::Text(_) => false,
        }
    }

    /// Converts to JSON; attachments become their description.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(flag) => Value::Bool(*flag),
            Self::Number(number) => Value::Number(number.clone()),
            Self::Text(text) => Value::String(text.clone()),
            Self::Attachment(attachment) => attachment.describe(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for FormValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => Self::Number(number),
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(fields) => Self::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Attachment> for FormValue {
    fn from(value: Attachment) -> Self {
        Self::Attachment(value)
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Working values of a form keyed by field name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormValues(BTreeMap<String, FormValue>);

impl FormValues {
    /// Creates empty values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds values from a JSON object.
    pub fn from_json(value: Value) -> AppResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, FormValue::from(value)))
                    .collect(),
            )),
            other => Err(AppError::Validation(format!(
                "form values must be a JSON object, got '{other}'"
            ))),
        }
    }

    /// Sets one field.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FormValue>) {
        self.0.insert(field.into(), value.into());
    }

    /// Builder-style [`FormValues::insert`].
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FormValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Returns one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FormValue> {
        self.0.get(field)
    }

    /// Returns whether the field is declared.
    #[must_use]
    pub fn contains_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FormValue)> {
        self.0.iter()
    }

    /// Returns whether any field holds an attachment at any depth.
    #[must_use]
    pub fn contains_attachment(&self) -> bool {
        self.0.values().any(FormValue::contains_attachment)
    }

    /// Converts to a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
        )
    }
}

/// Supported form field widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFieldKind {
    /// Free text or number input.
    Input,
    /// Option picker holding `{label, value}` objects.
    Select,
    /// Radio group.
    Radio,
    /// Checkbox.
    Checkbox,
    /// Date picker.
    Date,
}

impl FormFieldKind {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::Date => "date",
        }
    }
}

impl FromStr for FormFieldKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "input" => Ok(Self::Input),
            "select" => Ok(Self::Select),
            "radio" => Ok(Self::Radio),
            "checkbox" => Ok(Self::Checkbox),
            "date" => Ok(Self::Date),
            _ => Err(AppError::Validation(format!(
                "unknown form field kind '{value}'"
            ))),
        }
    }
}

/// Field declaration used to shape create/update payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    name: NonEmptyString,
    label: String,
    kind: FormFieldKind,
}

impl FormField {
    /// Creates a validated field declaration.
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        kind: FormFieldKind,
    ) -> AppResult<Self> {
        Ok(Self {
            name: NonEmptyString::new(name)?,
            label: label.into(),
            kind,
        })
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns the widget kind.
    #[must_use]
    pub fn kind(&self) -> FormFieldKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Attachment, FormFieldKind, FormValue, FormValues};

    #[test]
    fn attachment_detection_is_recursive() {
        let nested = FormValues::new().with(
            "profile",
            FormValue::Object(
                [(
                    "documents".to_owned(),
                    FormValue::List(vec![
                        FormValue::Null,
                        Attachment::new("cv.pdf", "application/pdf", b"%PDF".to_vec()).into(),
                    ]),
                )]
                .into_iter()
                .collect(),
            ),
        );
        assert!(nested.contains_attachment());

        let plain = FormValues::from_json(json!({"name": "a", "tags": ["x"], "meta": {"k": 1}}))
            .unwrap_or_default();
        assert!(!plain.contains_attachment());
    }

    #[test]
    fn json_conversion_describes_attachments() {
        let values = FormValues::new()
            .with("name", "Ann")
            .with("avatar", Attachment::new("a.png", "image/png", vec![1, 2, 3]));

        assert_eq!(
            values.to_json(),
            json!({
                "avatar": {"fileName": "a.png", "contentType": "image/png", "size": 3},
                "name": "Ann"
            })
        );
    }

    #[test]
    fn from_json_rejects_non_objects() {
        assert!(FormValues::from_json(json!([1])).is_err());
    }

    #[test]
    fn field_kind_parses_storage_values() {
        assert_eq!("select".parse::<FormFieldKind>().ok(), Some(FormFieldKind::Select));
        assert!("q-select".parse::<FormFieldKind>().is_err());
    }
}
