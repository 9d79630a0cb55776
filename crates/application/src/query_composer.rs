use std::sync::Arc;

use listkit_domain::{PaginationState, QueryOptions};

use crate::{IdentitySort, SortTransform};

/// Builds the effective query of one list call.
///
/// Layering order: persistent caller options, then pagination fields, then
/// the per-call override. The grid sort column is applied last, so a set
/// pagination sort wins over an override's `sortBy`.
#[derive(Clone)]
pub struct QueryComposer {
    sort_transform: Arc<dyn SortTransform>,
}

impl Default for QueryComposer {
    fn default() -> Self {
        Self::new(Arc::new(IdentitySort))
    }
}

impl QueryComposer {
    /// Creates a composer with a custom sort transform.
    #[must_use]
    pub fn new(sort_transform: Arc<dyn SortTransform>) -> Self {
        Self { sort_transform }
    }

    /// Composes a paged query.
    #[must_use]
    pub fn compose(
        &self,
        persistent: &QueryOptions,
        pagination: &PaginationState,
        override_options: Option<&QueryOptions>,
    ) -> QueryOptions {
        let paged = QueryOptions {
            limit: Some(pagination.limit()),
            offset: Some(pagination.offset()),
            sort_by_descending: Some(pagination.descending),
            ..QueryOptions::default()
        };

        self.finish(persistent.merged_with(&paged), pagination, override_options)
    }

    /// Composes a query without page bounds, for bulk export.
    #[must_use]
    pub fn compose_unpaged(
        &self,
        persistent: &QueryOptions,
        pagination: &PaginationState,
        override_options: Option<&QueryOptions>,
    ) -> QueryOptions {
        let sorted = QueryOptions {
            sort_by_descending: Some(pagination.descending),
            ..QueryOptions::default()
        };

        self.finish(persistent.merged_with(&sorted), pagination, override_options)
    }

    fn finish(
        &self,
        mut effective: QueryOptions,
        pagination: &PaginationState,
        override_options: Option<&QueryOptions>,
    ) -> QueryOptions {
        if let Some(override_options) = override_options {
            effective = effective.merged_with(override_options);
        }
        if pagination.has_sort() {
            effective.sort_by = Some(self.sort_transform.transform(&pagination.sort_by));
        }

        effective
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use listkit_domain::{PaginationState, QueryOptions, SortKey, WhereClause};
    use serde_json::json;

    use super::QueryComposer;

    fn pagination(page: u64, rows_per_page: u64) -> PaginationState {
        PaginationState {
            page,
            rows_per_page,
            sort_by: "name".to_owned(),
            descending: false,
            rows_number: 0,
        }
    }

    #[test]
    fn paged_query_layers_persistent_options_and_bounds() {
        let persistent = QueryOptions::new()
            .with_where(WhereClause::new().eq("active", json!(true)))
            .with_limit(500);
        let composed = QueryComposer::default().compose(&persistent, &pagination(3, 25), None);

        assert_eq!(composed.limit, Some(25));
        assert_eq!(composed.offset, Some(50));
        assert_eq!(composed.sort_by, Some(SortKey::Column("name".to_owned())));
        assert_eq!(composed.sort_by_descending, Some(false));
        assert_eq!(composed.where_clause, persistent.where_clause);
    }

    #[test]
    fn override_wins_except_for_grid_sort() {
        let override_options = QueryOptions::new()
            .with_limit(5)
            .with_sort(SortKey::Column("created_at".to_owned()), true);
        let composed = QueryComposer::default().compose(
            &QueryOptions::new(),
            &pagination(1, 10),
            Some(&override_options),
        );

        assert_eq!(composed.limit, Some(5));
        assert_eq!(composed.sort_by_descending, Some(true));
        assert_eq!(composed.sort_by, Some(SortKey::Column("name".to_owned())));
    }

    #[test]
    fn blank_sort_column_keeps_override_sort() {
        let mut state = pagination(1, 10);
        state.sort_by = String::new();
        let override_options =
            QueryOptions::new().with_sort(SortKey::Column("created_at".to_owned()), true);

        let composed =
            QueryComposer::default().compose(&QueryOptions::new(), &state, Some(&override_options));
        assert_eq!(composed.sort_by, Some(SortKey::Column("created_at".to_owned())));
    }

    #[test]
    fn sort_transform_maps_joined_columns() {
        let composer = QueryComposer::new(Arc::new(|column: &str| match column {
            "role_name" => SortKey::joined("Role", "role", "name"),
            other => SortKey::Column(other.to_owned()),
        }));
        let mut state = pagination(1, 10);
        state.sort_by = "role_name".to_owned();

        let composed = composer.compose(&QueryOptions::new(), &state, None);
        assert_eq!(
            serde_json::to_value(&composed).unwrap_or_default()["sortBy"],
            json!([{"model": "Role", "as": "role"}, "name"])
        );
    }

    #[test]
    fn unpaged_query_has_no_bounds() {
        let composed =
            QueryComposer::default().compose_unpaged(&QueryOptions::new(), &pagination(4, 10), None);

        assert_eq!(composed.limit, None);
        assert_eq!(composed.offset, None);
        assert_eq!(composed.sort_by_descending, Some(false));
    }
}
