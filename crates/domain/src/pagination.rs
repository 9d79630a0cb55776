use serde::{Deserialize, Serialize};

/// Grid pagination state.
///
/// `page`, `rows_per_page`, `sort_by` and `descending` belong to the caller.
/// `rows_number` is only written from the server's reported total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    /// One-based page number.
    pub page: u64,
    /// Page size.
    pub rows_per_page: u64,
    /// Grid sort column; empty disables sorting.
    pub sort_by: String,
    /// Descending sort direction.
    pub descending: bool,
    /// Total rows reported by the server on the last fetch.
    pub rows_number: u64,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page: 1,
            rows_per_page: 10,
            sort_by: "id".to_owned(),
            descending: true,
            rows_number: 0,
        }
    }
}

impl PaginationState {
    /// Rows skipped before the current page. Page `0` counts as page 1.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.rows_per_page)
    }

    /// Page size sent as the query limit.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.rows_per_page
    }

    /// Visible one-based sequence number of the row at `index` on this page.
    #[must_use]
    pub fn ordinal(&self, index: usize) -> u64 {
        let index = u64::try_from(index).unwrap_or(u64::MAX);
        self.offset().saturating_add(index).saturating_add(1)
    }

    /// Returns whether a sort column is set.
    #[must_use]
    pub fn has_sort(&self) -> bool {
        !self.sort_by.trim().is_empty()
    }
}
