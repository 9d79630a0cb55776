use serde_json::Value;

use crate::{Attachment, FormValue, FormValues};

/// Content type of a JSON submission.
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// Content type of a multi-part submission.
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

/// Content of one multi-part field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartContent {
    /// Text field.
    Text(String),
    /// File field.
    File(Attachment),
}

/// One named multi-part field. Names may repeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    /// Field name.
    pub name: String,
    /// Field content.
    pub content: PartContent,
}

impl MultipartPart {
    fn text(name: &str, text: String) -> Self {
        Self {
            name: name.to_owned(),
            content: PartContent::Text(text),
        }
    }

    fn file(name: &str, attachment: &Attachment) -> Self {
        Self {
            name: name.to_owned(),
            content: PartContent::File(attachment.clone()),
        }
    }
}

/// Body of a create/update submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionPayload {
    /// Plain JSON object.
    Json(Value),
    /// Multi-part form, used when any value holds an attachment.
    Multipart(Vec<MultipartPart>),
}

impl SubmissionPayload {
    /// Encodes form values, switching to multi-part when any leaf is a file.
    ///
    /// In multi-part mode top-level files become file parts, lists holding
    /// files append each file under the field name, other objects and lists
    /// are JSON-stringified and scalars are sent as text.
    #[must_use]
    pub fn from_values(values: &FormValues) -> Self {
        if !values.contains_attachment() {
            return Self::Json(values.to_json());
        }

        let mut parts = Vec::new();
        for (name, value) in values.iter() {
            match value {
                FormValue::Attachment(attachment) => parts.push(MultipartPart::file(name, attachment)),
                FormValue::List(items) if items.iter().any(FormValue::is_attachment) => {
                    for item in items {
                        if let FormValue::Attachment(attachment) = item {
                            parts.push(MultipartPart::file(name, attachment));
                        }
                    }
                }
                FormValue::List(_) | FormValue::Object(_) => {
                    parts.push(MultipartPart::text(name, value.to_json().to_string()));
                }
                FormValue::Null => parts.push(MultipartPart::text(name, "null".to_owned())),
                FormValue::Bool(flag) => parts.push(MultipartPart::text(name, flag.to_string())),
                FormValue::Number(number) => {
                    parts.push(MultipartPart::text(name, number.to_string()));
                }
                FormValue::Text(text) => parts.push(MultipartPart::text(name, text.clone())),
            }
        }

        Self::Multipart(parts)
    }

    /// Returns the request content type.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json(_) => JSON_CONTENT_TYPE,
            Self::Multipart(_) => MULTIPART_CONTENT_TYPE,
        }
    }

    /// Returns whether the payload is multi-part.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}
