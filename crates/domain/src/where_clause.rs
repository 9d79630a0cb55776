use listkit_core::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Comparison operator inside a field condition.
///
/// The client never evaluates these; they are carried to the server as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `$eq`
    Eq,
    /// `$ne`
    Ne,
    /// `$gt`
    Gt,
    /// `$gte`
    Gte,
    /// `$lt`
    Lt,
    /// `$lte`
    Lte,
    /// `$like`
    Like,
    /// `$notLike`
    NotLike,
    /// `$iLike`
    ILike,
    /// `$notILike`
    NotILike,
    /// `$in`
    In,
    /// `$notIn`
    NotIn,
    /// `$between`
    Between,
    /// `$notBetween`
    NotBetween,
    /// `$overlap`
    Overlap,
    /// `$contains`
    Contains,
    /// `$startsWith`
    StartsWith,
    /// `$endsWith`
    EndsWith,
    /// Any operator key the client does not model, kept verbatim.
    Other(String),
}

impl Operator {
    /// Returns the wire key for this operator.
    #[must_use]
    pub fn as_key(&self) -> &str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::Like => "$like",
            Self::NotLike => "$notLike",
            Self::ILike => "$iLike",
            Self::NotILike => "$notILike",
            Self::In => "$in",
            Self::NotIn => "$notIn",
            Self::Between => "$between",
            Self::NotBetween => "$notBetween",
            Self::Overlap => "$overlap",
            Self::Contains => "$contains",
            Self::StartsWith => "$startsWith",
            Self::EndsWith => "$endsWith",
            Self::Other(key) => key.as_str(),
        }
    }

    /// Parses a wire key; unknown keys land in [`Operator::Other`].
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        match key {
            "$eq" => Self::Eq,
            "$ne" => Self::Ne,
            "$gt" => Self::Gt,
            "$gte" => Self::Gte,
            "$lt" => Self::Lt,
            "$lte" => Self::Lte,
            "$like" => Self::Like,
            "$notLike" => Self::NotLike,
            "$iLike" => Self::ILike,
            "$notILike" => Self::NotILike,
            "$in" => Self::In,
            "$notIn" => Self::NotIn,
            "$between" => Self::Between,
            "$notBetween" => Self::NotBetween,
            "$overlap" => Self::Overlap,
            "$contains" => Self::Contains,
            "$startsWith" => Self::StartsWith,
            "$endsWith" => Self::EndsWith,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Logical combinator for nested clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalMode {
    /// Every nested clause must match.
    And,
    /// Any nested clause may match.
    Or,
}

impl LogicalMode {
    /// Returns the wire key.
    #[must_use]
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::And => "$and",
            Self::Or => "$or",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "$and" => Some(Self::And),
            "$or" => Some(Self::Or),
            _ => None,
        }
    }
}

/// Condition attached to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Plain value: the server treats it as equality.
    Equals(Value),
    /// Operator map such as `{"$gte": 1, "$lt": 10}`.
    Operators(Vec<(Operator, Value)>),
}

impl Condition {
    fn to_value(&self) -> Value {
        match self {
            Self::Equals(value) => value.clone(),
            Self::Operators(operators) => Value::Object(
                operators
                    .iter()
                    .map(|(operator, value)| (operator.as_key().to_owned(), value.clone()))
                    .collect(),
            ),
        }
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map)
                if !map.is_empty() && map.keys().all(|key| key.starts_with('$')) =>
            {
                Self::Operators(
                    map.into_iter()
                        .map(|(key, value)| (Operator::from_key(key.as_str()), value))
                        .collect(),
                )
            }
            other => Self::Equals(other),
        }
    }
}

/// One entry of a where clause.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereNode {
    /// Condition on a (possibly `$nested.path$`) field.
    Field {
        /// Field name as the server expects it.
        name: String,
        /// Condition for the field.
        condition: Condition,
    },
    /// `$and` / `$or` over nested clauses.
    Group {
        /// Combinator.
        mode: LogicalMode,
        /// Nested clauses.
        clauses: Vec<WhereClause>,
    },
}

/// Filter predicate tree sent as the `where` member of a query.
///
/// Top-level nodes are implicitly combined with AND by the server. Node order
/// is kept on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct WhereClause {
    nodes: Vec<WhereNode>,
}

impl WhereClause {
    /// Creates an empty clause.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality condition.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.nodes.push(WhereNode::Field {
            name: field.into(),
            condition: Condition::Equals(value.into()),
        });
        self
    }

    /// Adds an operator condition, joining earlier operators on the same field.
    #[must_use]
    pub fn op(
        mut self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        let field = field.into();
        let value = value.into();

        let existing = self.nodes.iter_mut().find_map(|node| match node {
            WhereNode::Field {
                name,
                condition: Condition::Operators(operators),
            } if *name == field => Some(operators),
            _ => None,
        });

        match existing {
            Some(operators) => operators.push((operator, value)),
            None => self.nodes.push(WhereNode::Field {
                name: field,
                condition: Condition::Operators(vec![(operator, value)]),
            }),
        }

        self
    }

    /// Adds a `$or` group.
    #[must_use]
    pub fn any_of(mut self, clauses: Vec<WhereClause>) -> Self {
        self.nodes.push(WhereNode::Group {
            mode: LogicalMode::Or,
            clauses,
        });
        self
    }

    /// Adds a `$and` group.
    #[must_use]
    pub fn all_of(mut self, clauses: Vec<WhereClause>) -> Self {
        self.nodes.push(WhereNode::Group {
            mode: LogicalMode::And,
            clauses,
        });
        self
    }

    /// Returns clause nodes in wire order.
    #[must_use]
    pub fn nodes(&self) -> &[WhereNode] {
        &self.nodes
    }

    /// Returns whether the clause has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn from_object(map: Map<String, Value>) -> Result<Self, AppError> {
        let mut nodes = Vec::with_capacity(map.len());

        for (key, value) in map {
            if let Some(mode) = LogicalMode::from_key(key.as_str()) {
                let clauses = match value {
                    Value::Array(items) => items
                        .into_iter()
                        .map(WhereClause::try_from)
                        .collect::<Result<Vec<_>, _>>()?,
                    other => vec![WhereClause::try_from(other)?],
                };
                nodes.push(WhereNode::Group { mode, clauses });
                continue;
            }

            nodes.push(WhereNode::Field {
                name: key,
                condition: Condition::from_value(value),
            });
        }

        Ok(Self { nodes })
    }
}

impl TryFrom<Value> for WhereClause {
    type Error = AppError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Self::from_object(map),
            other => Err(AppError::Validation(format!(
                "where clause must be a JSON object, got '{other}'"
            ))),
        }
    }
}

impl From<WhereClause> for Value {
    fn from(clause: WhereClause) -> Self {
        let mut map = Map::new();

        for node in clause.nodes {
            match node {
                WhereNode::Field { name, condition } => {
                    map.insert(name, condition.to_value());
                }
                WhereNode::Group { mode, clauses } => {
                    map.insert(
                        mode.as_key().to_owned(),
                        Value::Array(clauses.into_iter().map(Value::from).collect()),
                    );
                }
            }
        }

        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{Condition, LogicalMode, Operator, WhereClause, WhereNode};

    #[test]
    fn builder_serializes_operators_and_groups() {
        let clause = WhereClause::new()
            .eq("status", "active")
            .op("age", Operator::Gte, 18)
            .op("age", Operator::Lt, 65)
            .any_of(vec![
                WhereClause::new().op("name", Operator::ILike, "%ann%"),
                WhereClause::new().op("email", Operator::ILike, "%ann%"),
            ]);

        assert_eq!(
            Value::from(clause),
            json!({
                "status": "active",
                "age": {"$gte": 18, "$lt": 65},
                "$or": [
                    {"name": {"$iLike": "%ann%"}},
                    {"email": {"$iLike": "%ann%"}}
                ]
            })
        );
    }

    #[test]
    fn unknown_operators_pass_through_verbatim() {
        let raw = json!({"tags": {"$contained": ["a", "b"]}, "$user.name$": "bob"});
        let clause = WhereClause::try_from(raw.clone()).unwrap_or_default();

        assert_eq!(
            clause.nodes()[0],
            WhereNode::Field {
                name: "tags".to_owned(),
                condition: Condition::Operators(vec![(
                    Operator::Other("$contained".to_owned()),
                    json!(["a", "b"])
                )]),
            }
        );
        assert_eq!(Value::from(clause), raw);
    }

    #[test]
    fn mixed_key_objects_are_equality_values() {
        let clause =
            WhereClause::try_from(json!({"meta": {"kind": "x", "$raw": 1}})).unwrap_or_default();

        assert!(matches!(
            &clause.nodes()[0],
            WhereNode::Field { condition: Condition::Equals(_), .. }
        ));
    }

    #[test]
    fn single_object_group_is_accepted() {
        let clause = WhereClause::try_from(json!({"$and": {"a": 1}})).unwrap_or_default();

        match &clause.nodes()[0] {
            WhereNode::Group { mode, clauses } => {
                assert_eq!(*mode, LogicalMode::And);
                assert_eq!(clauses.len(), 1);
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(WhereClause::try_from(json!([1, 2])).is_err());
    }
}
