use listkit_domain::{ActionMap, Row, SEQUENCE_FIELD};
use serde_json::Value;

use crate::{ActionAuthorizer, RowMapper};

/// Numbers rows from `first_ordinal` and runs the optional mapper.
///
/// `s_no` is placed first and is restored if the mapper drops it.
pub fn number_rows(
    rows: Vec<Row>,
    first_ordinal: Option<u64>,
    mapper: Option<&dyn RowMapper>,
) -> Vec<Row> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let ordinal = first_ordinal.map(|first| {
                first.saturating_add(u64::try_from(index).unwrap_or(u64::MAX))
            });
            let numbered = match ordinal {
                Some(ordinal) => with_sequence(row, ordinal),
                None => row,
            };

            match (mapper, ordinal) {
                (Some(mapper), Some(ordinal)) => {
                    let mut mapped = mapper.map_row(numbered);
                    if !mapped.contains_key(SEQUENCE_FIELD) {
                        mapped = with_sequence(mapped, ordinal);
                    }
                    mapped
                }
                (Some(mapper), None) => mapper.map_row(numbered),
                (None, _) => numbered,
            }
        })
        .collect()
}

fn with_sequence(row: Row, ordinal: u64) -> Row {
    let mut numbered = Row::with_capacity(row.len() + 1);
    numbered.insert(SEQUENCE_FIELD.to_owned(), Value::from(ordinal));
    for (key, value) in row {
        if key != SEQUENCE_FIELD {
            numbered.insert(key, value);
        }
    }
    numbered
}

/// Keeps only the actions the authorizer allows on `model`.
#[must_use]
pub fn filter_actions(
    actions: &ActionMap,
    model: &str,
    authorizer: &dyn ActionAuthorizer,
) -> ActionMap {
    actions
        .iter()
        .filter(|(name, _)| authorizer.can_perform(name, model))
        .map(|(name, descriptor)| (name.clone(), descriptor.clone()))
        .collect()
}
