//! Column enumerations for each view, and the metadata field descriptors
//! that extend them at runtime.
//!
//! Each list/table view owns a closed column enum implementing
//! [`FilterColumn`]: a wire code, a display label, and a statically known
//! [`OperatorKind`] per column. Project-defined metadata fields are not part
//! of any enum; a comparison targets one through the synthetic metadata
//! column plus its `project_metadata_id`, and its kind is resolved at
//! runtime from a [`MetadataDescriptor`].

use serde::{Deserialize, Serialize};

use crate::model::{Comparison, FilterValue};
use crate::operators::{FilterOperator, OperatorKind};

/// Identifier of a project metadata field.
pub type MetadataId = u64;

/// A column usable in filter comparisons.
///
/// Implementations are plain fieldless enums; `code` is the wire
/// representation and `from_code` its inverse.
pub trait FilterColumn: Copy + Eq + std::hash::Hash + std::fmt::Debug + 'static {
    /// The wire code of this column.
    fn code(&self) -> &'static str;

    /// Parse a wire code; `None` for codes outside this view's enumeration.
    fn from_code(code: &str) -> Option<Self>;

    /// Human-readable label shown in column pickers.
    fn label(&self) -> &'static str;

    /// The statically declared operator kind of this column.
    fn kind(&self) -> OperatorKind;

    /// All columns of the view, in picker order.
    fn all() -> &'static [Self];
}

/// Descriptor of one project-defined metadata field, as supplied by the
/// metadata collaborator at session initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDescriptor {
    pub id: MetadataId,
    pub document_type: String,
    pub key: String,
    pub value_kind: OperatorKind,
}

impl MetadataDescriptor {
    /// Picker label for the synthetic column entry of this field.
    pub fn label(&self) -> String {
        format!("{}: {}", self.document_type, self.key)
    }
}

// ---------------------------------------------------------------------------
// Document view
// ---------------------------------------------------------------------------

/// Columns of the document browsing/search view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentColumn {
    Name,
    Content,
    Tags,
    Keywords,
    WordCount,
    Created,
    Starred,
}

impl FilterColumn for DocumentColumn {
    fn code(&self) -> &'static str {
        match self {
            DocumentColumn::Name => "NAME",
            DocumentColumn::Content => "CONTENT",
            DocumentColumn::Tags => "TAGS",
            DocumentColumn::Keywords => "KEYWORDS",
            DocumentColumn::WordCount => "WORD_COUNT",
            DocumentColumn::Created => "CREATED",
            DocumentColumn::Starred => "STARRED",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        let column = match code {
            "NAME" => DocumentColumn::Name,
            "CONTENT" => DocumentColumn::Content,
            "TAGS" => DocumentColumn::Tags,
            "KEYWORDS" => DocumentColumn::Keywords,
            "WORD_COUNT" => DocumentColumn::WordCount,
            "CREATED" => DocumentColumn::Created,
            "STARRED" => DocumentColumn::Starred,
            _ => return None,
        };
        Some(column)
    }

    fn label(&self) -> &'static str {
        match self {
            DocumentColumn::Name => "Name",
            DocumentColumn::Content => "Content",
            DocumentColumn::Tags => "Tags",
            DocumentColumn::Keywords => "Keywords",
            DocumentColumn::WordCount => "Word count",
            DocumentColumn::Created => "Created",
            DocumentColumn::Starred => "Starred",
        }
    }

    fn kind(&self) -> OperatorKind {
        match self {
            DocumentColumn::Name | DocumentColumn::Content => OperatorKind::String,
            DocumentColumn::Tags => OperatorKind::IdList,
            DocumentColumn::Keywords => OperatorKind::List,
            DocumentColumn::WordCount => OperatorKind::Number,
            DocumentColumn::Created => OperatorKind::Date,
            DocumentColumn::Starred => OperatorKind::Boolean,
        }
    }

    fn all() -> &'static [Self] {
        &[
            DocumentColumn::Name,
            DocumentColumn::Content,
            DocumentColumn::Tags,
            DocumentColumn::Keywords,
            DocumentColumn::WordCount,
            DocumentColumn::Created,
            DocumentColumn::Starred,
        ]
    }
}

/// One-shot comparisons built from clicks on concrete values (tag chips,
/// filenames, keywords), bypassing the guided column/operator flow.
impl Comparison<DocumentColumn> {
    /// "Filter by this tag."
    pub fn with_tag(tag_id: u64, title: impl Into<String>) -> Self {
        Comparison::named(
            DocumentColumn::Tags,
            FilterOperator::ContainsId,
            FilterValue::IdText(tag_id, title.into()),
        )
    }

    /// "Filter by this exact filename."
    pub fn with_name(name: impl Into<String>) -> Self {
        Comparison::named(
            DocumentColumn::Name,
            FilterOperator::Equals,
            FilterValue::Text(name.into()),
        )
    }

    /// "Filter by this keyword."
    pub fn with_keyword(keyword: impl Into<String>) -> Self {
        Comparison::named(
            DocumentColumn::Keywords,
            FilterOperator::ContainsValue,
            FilterValue::Text(keyword.into()),
        )
    }
}

// ---------------------------------------------------------------------------
// Annotation view
// ---------------------------------------------------------------------------

/// Columns of the annotation table view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationColumn {
    Excerpt,
    Note,
    Author,
    Tags,
    Created,
}

impl FilterColumn for AnnotationColumn {
    fn code(&self) -> &'static str {
        match self {
            AnnotationColumn::Excerpt => "EXCERPT",
            AnnotationColumn::Note => "NOTE",
            AnnotationColumn::Author => "AUTHOR",
            AnnotationColumn::Tags => "TAGS",
            AnnotationColumn::Created => "CREATED",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        let column = match code {
            "EXCERPT" => AnnotationColumn::Excerpt,
            "NOTE" => AnnotationColumn::Note,
            "AUTHOR" => AnnotationColumn::Author,
            "TAGS" => AnnotationColumn::Tags,
            "CREATED" => AnnotationColumn::Created,
            _ => return None,
        };
        Some(column)
    }

    fn label(&self) -> &'static str {
        match self {
            AnnotationColumn::Excerpt => "Excerpt",
            AnnotationColumn::Note => "Note",
            AnnotationColumn::Author => "Author",
            AnnotationColumn::Tags => "Tags",
            AnnotationColumn::Created => "Created",
        }
    }

    fn kind(&self) -> OperatorKind {
        match self {
            AnnotationColumn::Excerpt | AnnotationColumn::Note | AnnotationColumn::Author => {
                OperatorKind::String
            }
            AnnotationColumn::Tags => OperatorKind::IdList,
            AnnotationColumn::Created => OperatorKind::Date,
        }
    }

    fn all() -> &'static [Self] {
        &[
            AnnotationColumn::Excerpt,
            AnnotationColumn::Note,
            AnnotationColumn::Author,
            AnnotationColumn::Tags,
            AnnotationColumn::Created,
        ]
    }
}

// ---------------------------------------------------------------------------
// Memo view
// ---------------------------------------------------------------------------

/// Columns of the memo search view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoColumn {
    Title,
    Body,
    Author,
    Created,
    Starred,
}

impl FilterColumn for MemoColumn {
    fn code(&self) -> &'static str {
        match self {
            MemoColumn::Title => "TITLE",
            MemoColumn::Body => "BODY",
            MemoColumn::Author => "AUTHOR",
            MemoColumn::Created => "CREATED",
            MemoColumn::Starred => "STARRED",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        let column = match code {
            "TITLE" => MemoColumn::Title,
            "BODY" => MemoColumn::Body,
            "AUTHOR" => MemoColumn::Author,
            "CREATED" => MemoColumn::Created,
            "STARRED" => MemoColumn::Starred,
            _ => return None,
        };
        Some(column)
    }

    fn label(&self) -> &'static str {
        match self {
            MemoColumn::Title => "Title",
            MemoColumn::Body => "Body",
            MemoColumn::Author => "Author",
            MemoColumn::Created => "Created",
            MemoColumn::Starred => "Starred",
        }
    }

    fn kind(&self) -> OperatorKind {
        match self {
            MemoColumn::Title | MemoColumn::Body | MemoColumn::Author => OperatorKind::String,
            MemoColumn::Created => OperatorKind::Date,
            MemoColumn::Starred => OperatorKind::Boolean,
        }
    }

    fn all() -> &'static [Self] {
        &[
            MemoColumn::Title,
            MemoColumn::Body,
            MemoColumn::Author,
            MemoColumn::Created,
            MemoColumn::Starred,
        ]
    }
}

// ---------------------------------------------------------------------------
// Tag view
// ---------------------------------------------------------------------------

/// Columns of the tag listing view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagColumn {
    Title,
    Created,
}

impl FilterColumn for TagColumn {
    fn code(&self) -> &'static str {
        match self {
            TagColumn::Title => "TITLE",
            TagColumn::Created => "CREATED",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        let column = match code {
            "TITLE" => TagColumn::Title,
            "CREATED" => TagColumn::Created,
            _ => return None,
        };
        Some(column)
    }

    fn label(&self) -> &'static str {
        match self {
            TagColumn::Title => "Title",
            TagColumn::Created => "Created",
        }
    }

    fn kind(&self) -> OperatorKind {
        match self {
            TagColumn::Title => OperatorKind::String,
            TagColumn::Created => OperatorKind::Date,
        }
    }

    fn all() -> &'static [Self] {
        &[TagColumn::Title, TagColumn::Created]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnRef;

    #[test]
    fn test_codes_roundtrip_for_every_view() {
        for c in DocumentColumn::all() {
            assert_eq!(DocumentColumn::from_code(c.code()), Some(*c));
        }
        for c in AnnotationColumn::all() {
            assert_eq!(AnnotationColumn::from_code(c.code()), Some(*c));
        }
        for c in MemoColumn::all() {
            assert_eq!(MemoColumn::from_code(c.code()), Some(*c));
        }
        for c in TagColumn::all() {
            assert_eq!(TagColumn::from_code(c.code()), Some(*c));
        }
    }

    #[test]
    fn test_metadata_code_reserved() {
        // "METADATA" must never collide with a named column in any view.
        assert!(DocumentColumn::from_code("METADATA").is_none());
        assert!(AnnotationColumn::from_code("METADATA").is_none());
        assert!(MemoColumn::from_code("METADATA").is_none());
        assert!(TagColumn::from_code("METADATA").is_none());
    }

    #[test]
    fn test_document_kinds() {
        assert_eq!(DocumentColumn::Name.kind(), OperatorKind::String);
        assert_eq!(DocumentColumn::Tags.kind(), OperatorKind::IdList);
        assert_eq!(DocumentColumn::Keywords.kind(), OperatorKind::List);
        assert_eq!(DocumentColumn::WordCount.kind(), OperatorKind::Number);
        assert_eq!(DocumentColumn::Created.kind(), OperatorKind::Date);
        assert_eq!(DocumentColumn::Starred.kind(), OperatorKind::Boolean);
    }

    #[test]
    fn test_descriptor_label() {
        let desc = MetadataDescriptor {
            id: 3,
            document_type: "Interview".to_string(),
            key: "participant_age".to_string(),
            value_kind: OperatorKind::Number,
        };
        assert_eq!(desc.label(), "Interview: participant_age");
    }

    // -----------------------------------------------------------------------
    // One-shot chip constructors
    // -----------------------------------------------------------------------

    #[test]
    fn test_tag_chip() {
        let cmp = Comparison::with_tag(9, "grounded theory");
        assert_eq!(cmp.column, ColumnRef::Named(DocumentColumn::Tags));
        assert_eq!(cmp.operator, FilterOperator::ContainsId);
        assert_eq!(
            cmp.value,
            FilterValue::IdText(9, "grounded theory".to_string())
        );
        assert!(cmp.project_metadata_id.is_none());
    }

    #[test]
    fn test_name_chip() {
        let cmp = Comparison::with_name("interview_01.txt");
        assert_eq!(cmp.column, ColumnRef::Named(DocumentColumn::Name));
        assert_eq!(cmp.operator, FilterOperator::Equals);
        assert_eq!(cmp.value, FilterValue::Text("interview_01.txt".to_string()));
    }

    #[test]
    fn test_keyword_chip() {
        let cmp = Comparison::with_keyword("burnout");
        assert_eq!(cmp.column, ColumnRef::Named(DocumentColumn::Keywords));
        assert_eq!(cmp.operator, FilterOperator::ContainsValue);
    }
}
