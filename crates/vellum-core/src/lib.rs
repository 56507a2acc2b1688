//! Recursive filter-expression engine for the Vellum research platform.
//!
//! Every list/table view (documents, annotations, memos, tags, and the
//! analysis views built on them) filters through the same structure: a
//! serializable boolean tree of AND/OR [`Group`]s over [`Comparison`] leaves,
//! built interactively, staged through a draft, and sent verbatim as the
//! query payload of the search service.
//!
//! The crate is synchronous and I/O-free. Sessions take `&mut self`; the
//! mutation algebra in [`ops`] is plain functions over a root group.
//!
//! # Quick start
//!
//! ```
//! use vellum_core::{
//!     ops, Comparison, DocumentColumn, FilterOperator, FilterValue, NodeId, SessionRegistry,
//! };
//!
//! let mut sessions = SessionRegistry::new(Comparison::named(
//!     DocumentColumn::Name,
//!     FilterOperator::Contains,
//!     FilterValue::Text(String::new()),
//! ));
//!
//! // One-shot chip, applied straight to the committed tree.
//! ops::append_comparison(
//!     sessions.session("documents").committed_mut(),
//!     Comparison::with_tag(3, "coping"),
//! );
//!
//! // Modal edit: algebra runs against the draft, committed on finish.
//! sessions.start_edit("documents", &NodeId::root());
//! let template = sessions.session("documents").default_template().clone();
//! ops::add_comparison(sessions.draft_mut().unwrap(), &NodeId::root(), &template);
//! sessions.finish_edit();
//!
//! assert_eq!(sessions.session("documents").committed().items.len(), 2);
//! let payload = sessions.session("documents").committed().to_wire_json();
//! assert!(payload.contains("\"logic_operator\":\"and\""));
//! ```

pub mod columns;
pub mod error;
pub mod eval;
pub mod model;
pub mod operators;
pub mod ops;
pub mod registry;
pub mod session;

pub use columns::{
    AnnotationColumn, DocumentColumn, FilterColumn, MemoColumn, MetadataDescriptor, MetadataId,
    TagColumn,
};
pub use error::{FilterError, Result};
pub use eval::{matches, FieldValue, Filterable};
pub use model::{
    ColumnRef, Comparison, FilterNode, FilterValue, Group, LogicOperator, NodeId,
};
pub use operators::{FilterOperator, OperatorKind};
pub use registry::{ColumnEntry, ColumnRegistry};
pub use session::{FilterSession, SessionRegistry};
