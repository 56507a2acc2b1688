//! Operator kinds and the closed comparison-operator sets legal for each kind.
//!
//! Every column resolves to exactly one [`OperatorKind`]; the kind determines
//! which operators a comparison on that column may carry, which operator a
//! freshly retargeted comparison receives, and which neutral value replaces
//! its previous value when the column changes.

use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::model::FilterValue;

/// The semantic value category of a column.
///
/// Static columns declare their kind once per view; metadata columns resolve
/// theirs at runtime from the project's field descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    String,
    Number,
    Date,
    IdList,
    List,
    Boolean,
}

/// A comparison operator.
///
/// The union of every per-kind operator set. A given operator is only legal
/// on comparisons whose column resolves to a kind that lists it; the mutation
/// algebra maintains that invariant on column changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    // String
    Contains,
    Equals,
    StartsWith,
    EndsWith,
    // Number / date
    LessThan,
    GreaterThan,
    Between,
    // Date (calendar granularity)
    SameMonth,
    SameYear,
    // Id-list / list
    ContainsId,
    ContainsValue,
    // Boolean
    IsTrue,
    IsFalse,
    /// Placeholder carried by a comparison whose column kind could not be
    /// resolved (e.g. a stale metadata reference). Never legal for any kind;
    /// such a comparison matches nothing until the user fixes it.
    Unresolved,
}

const STRING_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Contains,
    FilterOperator::Equals,
    FilterOperator::StartsWith,
    FilterOperator::EndsWith,
];

const NUMBER_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::LessThan,
    FilterOperator::GreaterThan,
    FilterOperator::Between,
];

const DATE_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::LessThan,
    FilterOperator::GreaterThan,
    FilterOperator::Between,
    FilterOperator::SameMonth,
    FilterOperator::SameYear,
];

const ID_LIST_OPERATORS: &[FilterOperator] = &[FilterOperator::ContainsId];

const LIST_OPERATORS: &[FilterOperator] = &[FilterOperator::ContainsValue];

const BOOLEAN_OPERATORS: &[FilterOperator] = &[FilterOperator::IsTrue, FilterOperator::IsFalse];

impl OperatorKind {
    /// The ordered, closed set of operators legal for this kind.
    pub fn legal_operators(self) -> &'static [FilterOperator] {
        match self {
            OperatorKind::String => STRING_OPERATORS,
            OperatorKind::Number => NUMBER_OPERATORS,
            OperatorKind::Date => DATE_OPERATORS,
            OperatorKind::IdList => ID_LIST_OPERATORS,
            OperatorKind::List => LIST_OPERATORS,
            OperatorKind::Boolean => BOOLEAN_OPERATORS,
        }
    }

    /// The canonical operator a comparison receives when its column changes
    /// to a column of this kind. Always the first legal operator.
    pub fn default_operator(self) -> FilterOperator {
        self.legal_operators()[0]
    }

    /// The kind-neutral value a comparison receives alongside the default
    /// operator on a column change.
    pub fn neutral_value(self) -> FilterValue {
        match self {
            OperatorKind::String | OperatorKind::List => FilterValue::Text(String::new()),
            OperatorKind::Number | OperatorKind::Date | OperatorKind::IdList => FilterValue::Empty,
            OperatorKind::Boolean => FilterValue::Bool(true),
        }
    }
}

impl FilterOperator {
    /// The wire code for this operator.
    pub fn code(self) -> &'static str {
        match self {
            FilterOperator::Contains => "contains",
            FilterOperator::Equals => "equals",
            FilterOperator::StartsWith => "starts_with",
            FilterOperator::EndsWith => "ends_with",
            FilterOperator::LessThan => "less_than",
            FilterOperator::GreaterThan => "greater_than",
            FilterOperator::Between => "between",
            FilterOperator::SameMonth => "same_month",
            FilterOperator::SameYear => "same_year",
            FilterOperator::ContainsId => "contains_id",
            FilterOperator::ContainsValue => "contains_value",
            FilterOperator::IsTrue => "is_true",
            FilterOperator::IsFalse => "is_false",
            FilterOperator::Unresolved => "unresolved",
        }
    }

    /// Parse a wire code typed in by a user (console `SET OP`).
    pub fn from_code(code: &str) -> Result<Self, FilterError> {
        let op = match code {
            "contains" => FilterOperator::Contains,
            "equals" => FilterOperator::Equals,
            "starts_with" => FilterOperator::StartsWith,
            "ends_with" => FilterOperator::EndsWith,
            "less_than" => FilterOperator::LessThan,
            "greater_than" => FilterOperator::GreaterThan,
            "between" => FilterOperator::Between,
            "same_month" => FilterOperator::SameMonth,
            "same_year" => FilterOperator::SameYear,
            "contains_id" => FilterOperator::ContainsId,
            "contains_value" => FilterOperator::ContainsValue,
            "is_true" => FilterOperator::IsTrue,
            "is_false" => FilterOperator::IsFalse,
            other => return Err(FilterError::UnknownOperator(other.to_string())),
        };
        Ok(op)
    }
}
