//! Evaluation of a filter tree against records.
//!
//! [`Filterable`] exposes a record's fields as borrowed [`FieldValue`]s;
//! [`matches`] walks the tree shape-directed. Evaluation never errors: a
//! comparison whose field is absent, whose value shape does not fit its
//! operator, or whose metadata id is unknown to the record matches nothing.

use chrono::NaiveDate;

use crate::columns::{FilterColumn, MetadataId};
use crate::model::{ColumnRef, Comparison, FilterNode, FilterValue, Group, LogicOperator};
use crate::operators::FilterOperator;

/// A borrowed view of one record field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
    Bool(bool),
    /// Id-list fields (tag references).
    Ids(&'a [u64]),
    /// Free-list fields (keywords).
    Texts(&'a [String]),
    /// Array-valued metadata fields; the list operators view the elements
    /// through their JSON shapes.
    JsonList(&'a [serde_json::Value]),
    Absent,
}

impl<'a> FieldValue<'a> {
    /// View a loosely-typed metadata value. Arrays come back as a
    /// [`FieldValue::JsonList`] for the list operators; objects, which no
    /// operator applies to, come back as `Absent`.
    pub fn from_json(value: &'a serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => FieldValue::Text(s),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => FieldValue::Number(f),
                None => FieldValue::Absent,
            },
            serde_json::Value::Bool(b) => FieldValue::Bool(*b),
            serde_json::Value::Array(items) => FieldValue::JsonList(items.as_slice()),
            _ => FieldValue::Absent,
        }
    }
}

/// A record that filter trees typed to column enumeration `C` can evaluate
/// against.
pub trait Filterable<C> {
    /// The record's value for a named column.
    fn field(&self, column: C) -> FieldValue<'_>;

    /// The record's value for a project metadata field, or `None` when the
    /// record carries no value for it.
    fn metadata(&self, id: MetadataId) -> Option<FieldValue<'_>>;
}

/// Evaluate a tree against a record.
///
/// AND over empty `items` is vacuously true, so an empty root filter matches
/// everything; OR over empty `items` is false.
pub fn matches<C: FilterColumn, R: Filterable<C>>(group: &Group<C>, record: &R) -> bool {
    match group.logic_operator {
        LogicOperator::And => group.items.iter().all(|n| node_matches(n, record)),
        LogicOperator::Or => group.items.iter().any(|n| node_matches(n, record)),
    }
}

fn node_matches<C: FilterColumn, R: Filterable<C>>(node: &FilterNode<C>, record: &R) -> bool {
    match node {
        FilterNode::Group(g) => matches(g, record),
        FilterNode::Comparison(c) => comparison_matches(c, record),
    }
}

fn comparison_matches<C: FilterColumn, R: Filterable<C>>(cmp: &Comparison<C>, record: &R) -> bool {
    let field = match cmp.column {
        ColumnRef::Named(c) => record.field(c),
        ColumnRef::Metadata => {
            let Some(field) = cmp.project_metadata_id.and_then(|id| record.metadata(id)) else {
                return false;
            };
            field
        }
    };
    apply(cmp.operator, field, &cmp.value)
}

fn apply(operator: FilterOperator, field: FieldValue<'_>, value: &FilterValue) -> bool {
    use FilterOperator::*;
    match operator {
        Contains => match (field, value) {
            (FieldValue::Text(f), FilterValue::Text(v)) => f.contains(v.as_str()),
            _ => false,
        },
        Equals => match (field, value) {
            // Date-kind columns share `equals` with string columns; when
            // both sides parse as calendar dates, compare those (so a
            // datetime field value still equals its plain-date filter).
            (FieldValue::Text(f), FilterValue::Text(v)) => match (parse_date(f), parse_date(v)) {
                (Some(a), Some(b)) => a == b,
                _ => f == v,
            },
            (FieldValue::Number(f), FilterValue::Number(v)) => f == *v,
            _ => false,
        },
        StartsWith => match (field, value) {
            (FieldValue::Text(f), FilterValue::Text(v)) => f.starts_with(v.as_str()),
            _ => false,
        },
        EndsWith => match (field, value) {
            (FieldValue::Text(f), FilterValue::Text(v)) => f.ends_with(v.as_str()),
            _ => false,
        },
        LessThan => match (field, value) {
            (FieldValue::Number(f), FilterValue::Number(v)) => f < *v,
            (FieldValue::Text(f), FilterValue::Text(v)) => date_cmp(f, v, |a, b| a < b),
            _ => false,
        },
        GreaterThan => match (field, value) {
            (FieldValue::Number(f), FilterValue::Number(v)) => f > *v,
            (FieldValue::Text(f), FilterValue::Text(v)) => date_cmp(f, v, |a, b| a > b),
            _ => false,
        },
        Between => between(field, value),
        SameMonth => match (field, value) {
            (FieldValue::Text(f), FilterValue::Text(v)) => match (parse_date(f), parse_date(v)) {
                (Some(a), Some(b)) => {
                    use chrono::Datelike;
                    a.year() == b.year() && a.month() == b.month()
                }
                _ => false,
            },
            _ => false,
        },
        SameYear => match (field, value) {
            (FieldValue::Text(f), FilterValue::Text(v)) => match (parse_date(f), parse_date(v)) {
                (Some(a), Some(b)) => {
                    use chrono::Datelike;
                    a.year() == b.year()
                }
                _ => false,
            },
            _ => false,
        },
        ContainsId => match (field, value) {
            (FieldValue::Ids(ids), FilterValue::IdText(id, _)) => ids.contains(id),
            (FieldValue::JsonList(items), FilterValue::IdText(id, _)) => {
                items.iter().any(|v| v.as_u64() == Some(*id))
            }
            _ => false,
        },
        ContainsValue => match (field, value) {
            (FieldValue::Texts(items), FilterValue::Text(v)) => items.iter().any(|t| t == v),
            (FieldValue::JsonList(items), FilterValue::Text(v)) => {
                items.iter().any(|i| i.as_str() == Some(v.as_str()))
            }
            _ => false,
        },
        IsTrue => field == FieldValue::Bool(true),
        IsFalse => field == FieldValue::Bool(false),
        Unresolved => false,
    }
}

/// `between` is inclusive on both ends, over numbers or calendar dates.
fn between(field: FieldValue<'_>, value: &FilterValue) -> bool {
    let FilterValue::List(bounds) = value else {
        return false;
    };
    let [low, high] = bounds.as_slice() else {
        return false;
    };
    match (field, low, high) {
        (FieldValue::Number(f), FilterValue::Number(lo), FilterValue::Number(hi)) => {
            *lo <= f && f <= *hi
        }
        (FieldValue::Text(f), FilterValue::Text(lo), FilterValue::Text(hi)) => {
            match (parse_date(f), parse_date(lo), parse_date(hi)) {
                (Some(f), Some(lo), Some(hi)) => lo <= f && f <= hi,
                _ => false,
            }
        }
        _ => false,
    }
}

fn date_cmp(field: &str, value: &str, ord: impl Fn(NaiveDate, NaiveDate) -> bool) -> bool {
    match (parse_date(field), parse_date(value)) {
        (Some(a), Some(b)) => ord(a, b),
        _ => false,
    }
}

/// Parse an ISO-8601 calendar date; datetime strings are truncated to their
/// date component first.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
