//! Column registry: the ordered picker entries for a view and the kind
//! resolution behind the operator registry.
//!
//! Built wholesale at (re-)initialization from the view's static columns plus
//! one synthetic entry per discovered metadata field; never patched
//! incrementally, so a partially updated registry is never observable.

use std::collections::HashMap;

use crate::columns::{FilterColumn, MetadataDescriptor, MetadataId};
use crate::model::{ColumnRef, Comparison};
use crate::operators::{FilterOperator, OperatorKind};

/// One selectable entry in a column picker.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnEntry<C> {
    pub label: String,
    pub column: ColumnRef<C>,
    /// Set iff this entry targets a metadata field.
    pub metadata_id: Option<MetadataId>,
}

/// The resolved column set of one view.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry<C> {
    entries: Vec<ColumnEntry<C>>,
    metadata_kinds: HashMap<MetadataId, OperatorKind>,
}

impl<C: FilterColumn> ColumnRegistry<C> {
    /// Build the registry for a view: its static columns in declaration
    /// order, followed by one entry per metadata field in descriptor order.
    pub fn build(metadata: &[MetadataDescriptor]) -> Self {
        let mut entries: Vec<ColumnEntry<C>> = C::all()
            .iter()
            .map(|c| ColumnEntry {
                label: c.label().to_string(),
                column: ColumnRef::Named(*c),
                metadata_id: None,
            })
            .collect();

        let mut metadata_kinds = HashMap::with_capacity(metadata.len());
        for desc in metadata {
            entries.push(ColumnEntry {
                label: desc.label(),
                column: ColumnRef::Metadata,
                metadata_id: Some(desc.id),
            });
            metadata_kinds.insert(desc.id, desc.value_kind);
        }

        ColumnRegistry {
            entries,
            metadata_kinds,
        }
    }

    /// Picker entries in display order.
    pub fn entries(&self) -> &[ColumnEntry<C>] {
        &self.entries
    }

    /// Resolve the operator kind of a column reference.
    ///
    /// Named columns resolve from the static per-view table; the metadata
    /// column resolves through `metadata_id`. Returns `None` (never panics)
    /// when the reference cannot be resolved, e.g. a metadata id whose field
    /// no longer exists in the project.
    pub fn resolve_kind(
        &self,
        column: &ColumnRef<C>,
        metadata_id: Option<MetadataId>,
    ) -> Option<OperatorKind> {
        match column {
            ColumnRef::Named(c) => Some(c.kind()),
            ColumnRef::Metadata => self.metadata_kinds.get(&metadata_id?).copied(),
        }
    }

    /// Resolve the kind of an existing comparison.
    pub fn comparison_kind(&self, comparison: &Comparison<C>) -> Option<OperatorKind> {
        self.resolve_kind(&comparison.column, comparison.project_metadata_id)
    }

    /// The operators legal for a comparison, or `None` when its column kind
    /// is unresolved. The presentation layer renders `None` as a
    /// non-actionable placeholder rather than guessing.
    pub fn legal_operators(&self, comparison: &Comparison<C>) -> Option<&'static [FilterOperator]> {
        self.comparison_kind(comparison)
            .map(OperatorKind::legal_operators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::DocumentColumn;

    fn descriptors() -> Vec<MetadataDescriptor> {
        vec![
            MetadataDescriptor {
                id: 7,
                document_type: "Interview".to_string(),
                key: "session_date".to_string(),
                value_kind: OperatorKind::Date,
            },
            MetadataDescriptor {
                id: 8,
                document_type: "Interview".to_string(),
                key: "participant".to_string(),
                value_kind: OperatorKind::String,
            },
        ]
    }

    #[test]
    fn test_build_orders_static_then_metadata() {
        let reg = ColumnRegistry::<DocumentColumn>::build(&descriptors());
        let entries = reg.entries();
        assert_eq!(entries.len(), DocumentColumn::all().len() + 2);
        assert_eq!(
            entries[0].column,
            ColumnRef::Named(DocumentColumn::Name)
        );
        let meta = &entries[DocumentColumn::all().len()];
        assert_eq!(meta.column, ColumnRef::Metadata);
        assert_eq!(meta.metadata_id, Some(7));
        assert_eq!(meta.label, "Interview: session_date");
    }

    #[test]
    fn test_resolve_named() {
        let reg = ColumnRegistry::<DocumentColumn>::build(&[]);
        assert_eq!(
            reg.resolve_kind(&ColumnRef::Named(DocumentColumn::WordCount), None),
            Some(OperatorKind::Number)
        );
    }

    #[test]
    fn test_resolve_metadata() {
        let reg = ColumnRegistry::<DocumentColumn>::build(&descriptors());
        assert_eq!(
            reg.resolve_kind(&ColumnRef::Metadata, Some(7)),
            Some(OperatorKind::Date)
        );
        assert_eq!(
            reg.resolve_kind(&ColumnRef::Metadata, Some(8)),
            Some(OperatorKind::String)
        );
    }

    #[test]
    fn test_stale_metadata_is_unresolved() {
        let reg = ColumnRegistry::<DocumentColumn>::build(&descriptors());
        assert_eq!(reg.resolve_kind(&ColumnRef::Metadata, Some(99)), None);
        assert_eq!(reg.resolve_kind(&ColumnRef::Metadata, None), None);
    }

    #[test]
    fn test_comparison_resolution() {
        let reg = ColumnRegistry::<DocumentColumn>::build(&descriptors());
        let cmp = Comparison::<DocumentColumn>::metadata(
            7,
            FilterOperator::Equals,
            crate::model::FilterValue::Empty,
        );
        assert_eq!(reg.comparison_kind(&cmp), Some(OperatorKind::Date));
        assert_eq!(
            reg.legal_operators(&cmp),
            Some(OperatorKind::Date.legal_operators())
        );

        let stale = Comparison::<DocumentColumn>::metadata(
            99,
            FilterOperator::Equals,
            crate::model::FilterValue::Empty,
        );
        assert_eq!(reg.comparison_kind(&stale), None);
        assert_eq!(reg.legal_operators(&stale), None);
    }

    #[test]
    fn test_rebuild_replaces_wholesale() {
        let reg = ColumnRegistry::<DocumentColumn>::build(&descriptors());
        assert!(reg.resolve_kind(&ColumnRef::Metadata, Some(7)).is_some());

        // Rebuilding with the field removed drops its resolution entirely.
        let reg = ColumnRegistry::<DocumentColumn>::build(&[]);
        assert_eq!(reg.resolve_kind(&ColumnRef::Metadata, Some(7)), None);
        assert_eq!(reg.entries().len(), DocumentColumn::all().len());
    }
}
