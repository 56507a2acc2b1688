//! The filter tree model and its wire shape.
//!
//! A filter is a single root [`Group`] whose ordered children are nested
//! groups or [`Comparison`] leaves. The serde representation of these types
//! *is* the payload sent to search endpoints: a group serializes as
//! `{ id, logic_operator: "and"|"or", items: [...] }` and a comparison as
//! `{ id, column, operator, value, project_metadata_id? }`, with no further
//! transformation between committed state and the wire.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::columns::{FilterColumn, MetadataId};
use crate::error::{FilterError, Result};
use crate::operators::FilterOperator;

/// Opaque node identifier, unique within one tree.
///
/// Fresh ids are v4 UUIDs, so an id is never reused after deletion: a stale
/// id fails lookups instead of aliasing to a resurrected node. The root group
/// of every namespace conventionally carries the literal id `"root"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Generate a fresh id, unique for the lifetime of any tree.
    pub fn fresh() -> Self {
        NodeId(uuid::Uuid::new_v4().to_string())
    }

    /// The conventional root-group id.
    pub fn root() -> Self {
        NodeId("root".to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Boolean connective applied to all direct children of a group.
///
/// Wire values `"and"` / `"or"`. Evaluation is order-independent; the order
/// of `items` is meaningful only for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicOperator {
    And,
    Or,
}

/// The value slot of a comparison.
///
/// The runtime shape depends on the operator/kind pairing; the variants are
/// serialized untagged so the wire carries the raw JSON shapes (`null`,
/// booleans, numbers, strings, `[id, text]` pairs, arrays). `change_column`
/// always installs the kind-neutral variant, never a stale shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// The explicit empty value; `null` on the wire.
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    /// `[id, text]` pair for compound operators such as `contains_id`.
    IdText(u64, String),
    /// Ordered list of values, e.g. the `[low, high]` pair of `between`.
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// The two-element list used by `between`.
    pub fn range(low: FilterValue, high: FilterValue) -> Self {
        FilterValue::List(vec![low, high])
    }
}

/// A column reference: either a named column from the view's closed
/// enumeration, or the synthetic metadata column (wire literal `"METADATA"`),
/// discriminated by the comparison's `project_metadata_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef<C> {
    Named(C),
    Metadata,
}

impl<C: FilterColumn> Serialize for ColumnRef<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ColumnRef::Named(c) => serializer.serialize_str(c.code()),
            ColumnRef::Metadata => serializer.serialize_str("METADATA"),
        }
    }
}

impl<'de, C: FilterColumn> Deserialize<'de> for ColumnRef<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ColumnVisitor<C>(std::marker::PhantomData<C>);

        impl<C: FilterColumn> Visitor<'_> for ColumnVisitor<C> {
            type Value = ColumnRef<C>;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a column code string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<ColumnRef<C>, E> {
                if v == "METADATA" {
                    return Ok(ColumnRef::Metadata);
                }
                C::from_code(v)
                    .map(ColumnRef::Named)
                    .ok_or_else(|| E::custom(format!("unknown column code: {v}")))
            }
        }

        deserializer.deserialize_str(ColumnVisitor(std::marker::PhantomData))
    }
}

impl<C: FilterColumn> ColumnRef<C> {
    /// Parse a column code typed in by a user (console `SET COLUMN`).
    pub fn from_code(code: &str) -> Result<Self> {
        if code == "METADATA" {
            return Ok(ColumnRef::Metadata);
        }
        C::from_code(code)
            .map(ColumnRef::Named)
            .ok_or_else(|| FilterError::UnknownColumn(code.to_string()))
    }

    pub fn code(&self) -> &'static str {
        match self {
            ColumnRef::Named(c) => c.code(),
            ColumnRef::Metadata => "METADATA",
        }
    }
}

/// Leaf node: one column, one operator, one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "C: FilterColumn")]
pub struct Comparison<C> {
    pub id: NodeId,
    pub column: ColumnRef<C>,
    pub operator: FilterOperator,
    pub value: FilterValue,
    /// Set iff `column` is the synthetic metadata column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_metadata_id: Option<MetadataId>,
}

impl<C: FilterColumn> Comparison<C> {
    /// A fully-formed comparison on a named column, under a fresh id.
    pub fn named(column: C, operator: FilterOperator, value: FilterValue) -> Self {
        Comparison {
            id: NodeId::fresh(),
            column: ColumnRef::Named(column),
            operator,
            value,
            project_metadata_id: None,
        }
    }

    /// A fully-formed comparison on a project metadata field, under a fresh id.
    pub fn metadata(field: MetadataId, operator: FilterOperator, value: FilterValue) -> Self {
        Comparison {
            id: NodeId::fresh(),
            column: ColumnRef::Metadata,
            operator,
            value,
            project_metadata_id: Some(field),
        }
    }
}

/// A tree node: a nested group or a comparison leaf.
///
/// Serialized untagged; the two shapes are disambiguated structurally
/// (`logic_operator`/`items` vs `column`/`operator`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, bound = "C: FilterColumn")]
pub enum FilterNode<C> {
    Group(Group<C>),
    Comparison(Comparison<C>),
}

impl<C> FilterNode<C> {
    pub fn id(&self) -> &NodeId {
        match self {
            FilterNode::Group(g) => &g.id,
            FilterNode::Comparison(c) => &c.id,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, FilterNode::Group(_))
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, FilterNode::Comparison(_))
    }
}

/// Internal node combining children under AND/OR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "C: FilterColumn")]
pub struct Group<C> {
    pub id: NodeId,
    pub logic_operator: LogicOperator,
    pub items: Vec<FilterNode<C>>,
}

impl<C: FilterColumn> Group<C> {
    /// An empty AND group under the conventional root id.
    pub fn new_root() -> Self {
        Group {
            id: NodeId::root(),
            logic_operator: LogicOperator::And,
            items: Vec::new(),
        }
    }

    /// An empty AND group under a fresh id.
    pub fn empty() -> Self {
        Group {
            id: NodeId::fresh(),
            logic_operator: LogicOperator::And,
            items: Vec::new(),
        }
    }

    /// Encode this tree as the wire payload.
    pub fn to_wire_json(&self) -> String {
        // Serialization of the model cannot fail: every field is a plain
        // string, number, or nested instance of the same shapes.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Decode a tree from raw wire JSON (the expert-mode escape hatch).
    pub fn from_wire_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::DocumentColumn;
    use serde_json::json;

    fn sample_tree() -> Group<DocumentColumn> {
        Group {
            id: NodeId::root(),
            logic_operator: LogicOperator::And,
            items: vec![
                FilterNode::Comparison(Comparison {
                    id: NodeId::new("c1"),
                    column: ColumnRef::Named(DocumentColumn::Name),
                    operator: FilterOperator::Contains,
                    value: FilterValue::Text("interview".to_string()),
                    project_metadata_id: None,
                }),
                FilterNode::Group(Group {
                    id: NodeId::new("g1"),
                    logic_operator: LogicOperator::Or,
                    items: vec![
                        FilterNode::Comparison(Comparison {
                            id: NodeId::new("c2"),
                            column: ColumnRef::Named(DocumentColumn::WordCount),
                            operator: FilterOperator::GreaterThan,
                            value: FilterValue::Number(500.0),
                            project_metadata_id: None,
                        }),
                        FilterNode::Comparison(Comparison {
                            id: NodeId::new("c3"),
                            column: ColumnRef::Metadata,
                            operator: FilterOperator::Equals,
                            value: FilterValue::Text("2023-04-01".to_string()),
                            project_metadata_id: Some(7),
                        }),
                    ],
                }),
            ],
        }
    }

    // -----------------------------------------------------------------------
    // Wire shape pinning
    // -----------------------------------------------------------------------

    #[test]
    fn test_wire_shape() {
        let tree = sample_tree();
        let wire = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            wire,
            json!({
                "id": "root",
                "logic_operator": "and",
                "items": [
                    {
                        "id": "c1",
                        "column": "NAME",
                        "operator": "contains",
                        "value": "interview"
                    },
                    {
                        "id": "g1",
                        "logic_operator": "or",
                        "items": [
                            {
                                "id": "c2",
                                "column": "WORD_COUNT",
                                "operator": "greater_than",
                                "value": 500.0
                            },
                            {
                                "id": "c3",
                                "column": "METADATA",
                                "operator": "equals",
                                "value": "2023-04-01",
                                "project_metadata_id": 7
                            }
                        ]
                    }
                ]
            })
        );
    }

    #[test]
    fn test_metadata_id_omitted_for_named_columns() {
        let cmp = Comparison::named(
            DocumentColumn::Starred,
            FilterOperator::IsTrue,
            FilterValue::Bool(true),
        );
        let wire = serde_json::to_value(&cmp).unwrap();
        assert!(wire.get("project_metadata_id").is_none());
    }

    #[test]
    fn test_empty_value_is_null() {
        let wire = serde_json::to_value(FilterValue::Empty).unwrap();
        assert!(wire.is_null());
    }

    #[test]
    fn test_id_text_pair_shape() {
        let wire = serde_json::to_value(FilterValue::IdText(3, "method".to_string())).unwrap();
        assert_eq!(wire, json!([3, "method"]));
    }

    #[test]
    fn test_between_range_shape() {
        let value = FilterValue::range(FilterValue::Number(1.0), FilterValue::Number(9.0));
        assert_eq!(serde_json::to_value(&value).unwrap(), json!([1.0, 9.0]));
    }

    // -----------------------------------------------------------------------
    // Round trips
    // -----------------------------------------------------------------------

    #[test]
    fn test_roundtrip_json() {
        let tree = sample_tree();
        let encoded = tree.to_wire_json();
        let decoded = Group::<DocumentColumn>::from_wire_json(&encoded).unwrap();
        assert_eq!(tree, decoded);
    }

    #[test]
    fn test_roundtrip_msgpack() {
        let tree = sample_tree();
        let bytes = rmp_serde::to_vec_named(&tree).unwrap();
        let decoded: Group<DocumentColumn> = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(tree, decoded);
    }

    #[test]
    fn test_value_shapes_roundtrip() {
        let values = [
            FilterValue::Empty,
            FilterValue::Bool(false),
            FilterValue::Number(12.5),
            FilterValue::Text("hello".to_string()),
            FilterValue::IdText(42, "tag".to_string()),
            FilterValue::range(
                FilterValue::Text("2023-01-01".to_string()),
                FilterValue::Text("2023-12-31".to_string()),
            ),
        ];
        for value in values {
            let encoded = serde_json::to_string(&value).unwrap();
            let decoded: FilterValue = serde_json::from_str(&encoded).unwrap();
            assert_eq!(value, decoded);
        }
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn test_unknown_column_rejected() {
        let payload = json!({
            "id": "root",
            "logic_operator": "and",
            "items": [
                {"id": "x", "column": "NO_SUCH_COLUMN", "operator": "contains", "value": ""}
            ]
        })
        .to_string();
        assert!(Group::<DocumentColumn>::from_wire_json(&payload).is_err());
    }

    #[test]
    fn test_malformed_payload_rejected() {
        assert!(Group::<DocumentColumn>::from_wire_json("{not json").is_err());
    }

    #[test]
    fn test_column_ref_from_code() {
        let named = ColumnRef::<DocumentColumn>::from_code("NAME").unwrap();
        assert_eq!(named, ColumnRef::Named(DocumentColumn::Name));
        let meta = ColumnRef::<DocumentColumn>::from_code("METADATA").unwrap();
        assert_eq!(meta, ColumnRef::Metadata);
        assert!(ColumnRef::<DocumentColumn>::from_code("nope").is_err());
    }

    // -----------------------------------------------------------------------
    // Ids
    // -----------------------------------------------------------------------

    #[test]
    fn test_fresh_ids_are_distinct() {
        let a = NodeId::fresh();
        let b = NodeId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn test_constructors_assign_fresh_ids() {
        let a = Comparison::named(
            DocumentColumn::Name,
            FilterOperator::Contains,
            FilterValue::Text(String::new()),
        );
        let b = Comparison::named(
            DocumentColumn::Name,
            FilterOperator::Contains,
            FilterValue::Text(String::new()),
        );
        assert_ne!(a.id, b.id);

        let m = Comparison::<DocumentColumn>::metadata(7, FilterOperator::Equals, FilterValue::Empty);
        assert_eq!(m.column, ColumnRef::Metadata);
        assert_eq!(m.project_metadata_id, Some(7));
    }
}
