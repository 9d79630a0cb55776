use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::WhereClause;

/// Attribute selector entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeSpec {
    /// Plain column name.
    Column(String),
    /// Aliased or computed attribute, sent as-is.
    Expression(Value),
}

/// Grouping selector: one column, a column list, or anything else the server accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupSpec {
    /// Single column name.
    Column(String),
    /// Column names.
    Columns(Vec<String>),
    /// Other grouping expression, sent as-is.
    Expression(Value),
}

/// Joined model specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInclude {
    /// Joined model name.
    pub model: String,
    /// Association alias.
    #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Attribute selector for the joined model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeSpec>>,
    /// Filter applied to the joined model.
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<WhereClause>,
    /// Inner join when true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Whether the join may duplicate parent rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicating: Option<bool>,
    /// Nested joins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<IncludeSpec>>,
    /// Keys the client does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelInclude {
    /// Creates an include for a model with no further options.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            alias: None,
            attributes: None,
            where_clause: None,
            required: None,
            duplicating: None,
            include: None,
            extra: Map::new(),
        }
    }

    /// Sets the association alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Restricts joined attributes to plain columns.
    #[must_use]
    pub fn with_attributes<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(
            columns
                .into_iter()
                .map(|column| AttributeSpec::Column(column.into()))
                .collect(),
        );
        self
    }
}

/// Include entry: typed when it names a model, raw otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncludeSpec {
    /// Typed model include.
    Model(Box<ModelInclude>),
    /// Raw include payload.
    Raw(Value),
}

impl From<ModelInclude> for IncludeSpec {
    fn from(value: ModelInclude) -> Self {
        Self::Model(Box::new(value))
    }
}

/// Ordering specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Order {
    /// Single ordering expression.
    Expression(String),
    /// Ordering terms such as `[["name", "ASC"]]`.
    Terms(Vec<Value>),
}

/// Association reference for sorting on a joined table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortInclude {
    /// Joined model name.
    pub model: String,
    /// Association alias.
    #[serde(rename = "as")]
    pub alias: String,
}

/// Sort key sent as `sortBy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortKey {
    /// Column on the base model.
    Column(String),
    /// `[{model, as}, field]` pair for a joined model.
    Joined(SortInclude, String),
}

impl SortKey {
    /// Creates a joined sort key.
    #[must_use]
    pub fn joined(
        model: impl Into<String>,
        alias: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::Joined(
            SortInclude {
                model: model.into(),
                alias: alias.into(),
            },
            field.into(),
        )
    }
}

/// Model options accepted by the list endpoints.
///
/// Every member is optional; absence means "server default". Keys not
/// modelled here are kept in `extra` and sent back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// Attribute selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeSpec>>,
    /// Joined models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<IncludeSpec>>,
    /// Filter predicate tree.
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<WhereClause>,
    /// Explicit ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Rows to skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Grouping columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupSpec>,
    /// Sub-query flag for joined pagination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_query: Option<bool>,
    /// Distinct flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
    /// Grid sort key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortKey>,
    /// Grid sort direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by_descending: Option<bool>,
    /// Keys the client does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueryOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new value where every member set on `overlay` replaces ours.
    #[must_use]
    pub fn merged_with(&self, overlay: &QueryOptions) -> QueryOptions {
        let mut extra = self.extra.clone();
        for (key, value) in &overlay.extra {
            extra.insert(key.clone(), value.clone());
        }

        QueryOptions {
            attributes: pick(&overlay.attributes, &self.attributes),
            include: pick(&overlay.include, &self.include),
            where_clause: pick(&overlay.where_clause, &self.where_clause),
            order: pick(&overlay.order, &self.order),
            limit: overlay.limit.or(self.limit),
            offset: overlay.offset.or(self.offset),
            group: pick(&overlay.group, &self.group),
            sub_query: overlay.sub_query.or(self.sub_query),
            distinct: overlay.distinct.or(self.distinct),
            sort_by: pick(&overlay.sort_by, &self.sort_by),
            sort_by_descending: overlay.sort_by_descending.or(self.sort_by_descending),
            extra,
        }
    }

    /// Sets the filter predicate.
    #[must_use]
    pub fn with_where(mut self, clause: WhereClause) -> Self {
        self.where_clause = Some(clause);
        self
    }

    /// Restricts attributes to plain columns.
    #[must_use]
    pub fn with_attributes<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(
            columns
                .into_iter()
                .map(|column| AttributeSpec::Column(column.into()))
                .collect(),
        );
        self
    }

    /// Appends a joined model.
    #[must_use]
    pub fn with_include(mut self, include: impl Into<IncludeSpec>) -> Self {
        self.include.get_or_insert_with(Vec::new).push(include.into());
        self
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the row offset.
    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the grid sort key and direction.
    #[must_use]
    pub fn with_sort(mut self, sort_by: SortKey, descending: bool) -> Self {
        self.sort_by = Some(sort_by);
        self.sort_by_descending = Some(descending);
        self
    }

    /// Sets an unmodelled key.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

fn pick<T: Clone>(overlay: &Option<T>, base: &Option<T>) -> Option<T> {
    overlay.as_ref().or(base.as_ref()).cloned()
}
