use listkit_domain::Row;
use serde_json::Value;

/// Default export row shape.
///
/// Nested objects are inlined with `parent_child` keys and arrays are
/// replaced by a `{key}_count` column.
#[must_use]
pub fn flatten_row(row: Row) -> Row {
    let mut flat = Row::new();
    flatten_into(&mut flat, None, row);
    flat
}

fn flatten_into(flat: &mut Row, prefix: Option<&str>, fields: Row) {
    for (key, value) in fields {
        let name = match prefix {
            Some(prefix) => format!("{prefix}_{key}"),
            None => key,
        };

        match value {
            Value::Object(nested) => flatten_into(flat, Some(&name), nested),
            Value::Array(items) => {
                flat.insert(format!("{name}_count"), Value::from(items.len()));
            }
            scalar => {
                flat.insert(name, scalar);
            }
        }
    }
}
