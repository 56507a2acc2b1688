use serde_json::Value;

use vellum_core::{FilterOperator, LogicOperator, MetadataId, OperatorKind};
use vellum_server::store::Granularity;

/// The view families of a workspace. Each owns its own column enum, session
/// registry, and server collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewKind {
    #[default]
    Documents,
    Annotations,
    Memos,
    Tags,
}

impl ViewKind {
    /// The session namespace and prompt segment of this view.
    pub fn name(self) -> &'static str {
        match self {
            ViewKind::Documents => "documents",
            ViewKind::Annotations => "annotations",
            ViewKind::Memos => "memos",
            ViewKind::Tags => "tags",
        }
    }
}

/// Target of a SET COLUMN: a static column code or a metadata field id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnTarget {
    Code(String),
    Metadata(MetadataId),
}

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Server / project
    Ping,
    CreateProject { name: String },
    Use { project: String },
    View { view: ViewKind },
    DefineMetadata {
        document_type: String,
        key: String,
        value_kind: OperatorKind,
    },
    Metadata,
    Put { record: Value },

    // Filter inspection
    Show,
    ShowDraft,
    Columns,
    Ops { node: String },

    // One-shot chips (documents view)
    FilterTag { tag_id: u64, title: String },
    FilterName { name: String },
    FilterKeyword { keyword: String },

    // Mutation algebra
    Edit { group: Option<String> },
    AddGroup { parent: Option<String> },
    AddRule { parent: Option<String> },
    SetLogic { group: String, operator: LogicOperator },
    SetColumn { node: String, column: ColumnTarget },
    SetOp { node: String, operator: FilterOperator },
    SetValue { node: String, value: Value },
    Delete { node: String },
    Commit,
    Cancel,
    Reset,

    // Expert mode
    Expert { on: bool },
    Raw { payload: String },

    // Queries
    Search { limit: Option<usize> },
    Freq { limit: Option<usize> },
    Timeline { granularity: Option<Granularity> },

    Help(Option<String>),
    Exit,
}
