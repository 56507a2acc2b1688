//! The tree mutation algebra.
//!
//! Pure functions over a root [`Group`], addressing nodes by id with a
//! depth-first scan (no parent pointers, no id index; trees are tens of
//! nodes). Every operation is a silent no-op when the id is missing or
//! names the wrong node kind: those cases arise from presentation wiring
//! bugs, not user input, and must never break an editing session.

use crate::columns::{FilterColumn, MetadataId};
use crate::model::{
    ColumnRef, Comparison, FilterNode, FilterValue, Group, LogicOperator, NodeId,
};
use crate::operators::FilterOperator;
use crate::registry::ColumnRegistry;

/// A borrowed view of a located node. The root group is addressable even
/// though it is not wrapped in a [`FilterNode`].
#[derive(Debug)]
pub enum NodeRef<'a, C> {
    Group(&'a Group<C>),
    Comparison(&'a Comparison<C>),
}

impl<C> NodeRef<'_, C> {
    pub fn is_group(&self) -> bool {
        matches!(self, NodeRef::Group(_))
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, NodeRef::Comparison(_))
    }
}

/// Depth-first search for the node with the given id, including the root
/// itself. Terminates on any finite tree; no depth limit is imposed.
pub fn find<'a, C>(root: &'a Group<C>, id: &NodeId) -> Option<NodeRef<'a, C>> {
    if root.id == *id {
        return Some(NodeRef::Group(root));
    }
    for item in &root.items {
        match item {
            FilterNode::Group(g) => {
                if let Some(found) = find(g, id) {
                    return Some(found);
                }
            }
            FilterNode::Comparison(c) => {
                if c.id == *id {
                    return Some(NodeRef::Comparison(c));
                }
            }
        }
    }
    None
}

/// Locate the group with the given id, including the root.
pub fn find_group_mut<'a, C>(root: &'a mut Group<C>, id: &NodeId) -> Option<&'a mut Group<C>> {
    if root.id == *id {
        return Some(root);
    }
    for item in &mut root.items {
        if let FilterNode::Group(g) = item {
            if let Some(found) = find_group_mut(g, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Locate the comparison with the given id.
pub fn find_comparison_mut<'a, C>(
    root: &'a mut Group<C>,
    id: &NodeId,
) -> Option<&'a mut Comparison<C>> {
    for item in &mut root.items {
        match item {
            FilterNode::Group(g) => {
                if let Some(found) = find_comparison_mut(g, id) {
                    return Some(found);
                }
            }
            FilterNode::Comparison(c) => {
                if c.id == *id {
                    return Some(c);
                }
            }
        }
    }
    None
}

/// Remove the node with the given id from wherever it occurs. Deleting a
/// group deletes its entire subtree. The root itself is never deletable;
/// passing the root's id is a no-op. Returns whether anything was removed.
pub fn delete<C>(root: &mut Group<C>, id: &NodeId) -> bool {
    if let Some(pos) = root.items.iter().position(|item| item.id() == id) {
        root.items.remove(pos);
        return true;
    }
    for item in &mut root.items {
        if let FilterNode::Group(g) = item {
            if delete(g, id) {
                return true;
            }
        }
    }
    false
}

/// Prepend a fresh empty AND group to the group at `parent_id`.
/// No-op when `parent_id` does not name a group.
pub fn add_group<C: FilterColumn>(root: &mut Group<C>, parent_id: &NodeId) {
    if let Some(parent) = find_group_mut(root, parent_id) {
        parent.items.insert(0, FilterNode::Group(Group::empty()));
    }
}

/// Prepend a copy of `template` under a fresh id to the group at
/// `parent_id`. No-op when `parent_id` does not name a group.
///
/// New nodes go to the front so the most recently added criterion is
/// visually first.
pub fn add_comparison<C: FilterColumn>(
    root: &mut Group<C>,
    parent_id: &NodeId,
    template: &Comparison<C>,
) {
    if let Some(parent) = find_group_mut(root, parent_id) {
        let mut comparison = template.clone();
        comparison.id = NodeId::fresh();
        parent.items.insert(0, FilterNode::Comparison(comparison));
    }
}

/// Append a fully-formed comparison to the root's items (the one-shot
/// insertion path used by tag chips and similar single-click filters).
pub fn append_comparison<C>(root: &mut Group<C>, comparison: Comparison<C>) {
    root.items.push(FilterNode::Comparison(comparison));
}

/// Set the logic operator of the group at `group_id`.
/// No-op when the id does not name a group.
pub fn set_logic_operator<C>(root: &mut Group<C>, group_id: &NodeId, operator: LogicOperator) {
    if let Some(group) = find_group_mut(root, group_id) {
        group.logic_operator = operator;
    }
}

/// Retarget the comparison at `comparison_id` to a new column.
///
/// Resets operator and value to the new kind's defaults; a comparison must
/// never keep an operator or value shaped for its previous column. When the
/// new column's kind is unresolved the comparison keeps the column but
/// receives the unresolved placeholder state.
pub fn change_column<C: FilterColumn>(
    root: &mut Group<C>,
    comparison_id: &NodeId,
    column: ColumnRef<C>,
    metadata_id: Option<MetadataId>,
    registry: &ColumnRegistry<C>,
) {
    let Some(comparison) = find_comparison_mut(root, comparison_id) else {
        return;
    };
    let metadata_id = match column {
        ColumnRef::Named(_) => None,
        ColumnRef::Metadata => metadata_id,
    };
    comparison.column = column;
    comparison.project_metadata_id = metadata_id;
    match registry.resolve_kind(&column, metadata_id) {
        Some(kind) => {
            comparison.operator = kind.default_operator();
            comparison.value = kind.neutral_value();
        }
        None => {
            comparison.operator = FilterOperator::Unresolved;
            comparison.value = FilterValue::Empty;
        }
    }
}

/// Set the operator of the comparison at `comparison_id`, leaving the value
/// untouched: switching among operators of one kind (contains to
/// starts_with) must not discard user-entered text.
pub fn change_operator<C>(root: &mut Group<C>, comparison_id: &NodeId, operator: FilterOperator) {
    if let Some(comparison) = find_comparison_mut(root, comparison_id) {
        comparison.operator = operator;
    }
}

/// Set the value of the comparison at `comparison_id`. No validation of the
/// value's shape against the current operator; evaluation treats mismatched
/// shapes as non-matching.
pub fn change_value<C>(root: &mut Group<C>, comparison_id: &NodeId, value: FilterValue) {
    if let Some(comparison) = find_comparison_mut(root, comparison_id) {
        comparison.value = value;
    }
}

/// Collect every id in the tree, root first, in depth-first order.
pub fn collect_ids<C>(root: &Group<C>) -> Vec<NodeId> {
    fn walk<C>(group: &Group<C>, out: &mut Vec<NodeId>) {
        out.push(group.id.clone());
        for item in &group.items {
            match item {
                FilterNode::Group(g) => walk(g, out),
                FilterNode::Comparison(c) => out.push(c.id.clone()),
            }
        }
    }
    let mut ids = Vec::new();
    walk(root, &mut ids);
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{DocumentColumn, MetadataDescriptor};
    use crate::operators::OperatorKind;
    use std::collections::HashSet;

    fn registry() -> ColumnRegistry<DocumentColumn> {
        ColumnRegistry::build(&[MetadataDescriptor {
            id: 7,
            document_type: "Interview".to_string(),
            key: "session_date".to_string(),
            value_kind: OperatorKind::Date,
        }])
    }

    fn default_template() -> Comparison<DocumentColumn> {
        Comparison::named(
            DocumentColumn::Name,
            FilterOperator::Contains,
            FilterValue::Text(String::new()),
        )
    }

    /// Root AND group containing one comparison and a nested OR group with
    /// two comparisons.
    fn nested_tree() -> (Group<DocumentColumn>, NodeId, NodeId, NodeId, NodeId) {
        let c1 = Comparison::with_name("notes.txt");
        let c2 = Comparison::with_keyword("burnout");
        let c3 = Comparison::with_tag(4, "coping");
        let (c1_id, c2_id, c3_id) = (c1.id.clone(), c2.id.clone(), c3.id.clone());
        let inner = Group {
            id: NodeId::fresh(),
            logic_operator: LogicOperator::Or,
            items: vec![FilterNode::Comparison(c2), FilterNode::Comparison(c3)],
        };
        let inner_id = inner.id.clone();
        let root = Group {
            id: NodeId::root(),
            logic_operator: LogicOperator::And,
            items: vec![FilterNode::Comparison(c1), FilterNode::Group(inner)],
        };
        (root, c1_id, inner_id, c2_id, c3_id)
    }

    // -----------------------------------------------------------------------
    // find
    // -----------------------------------------------------------------------

    #[test]
    fn test_find_root() {
        let (root, ..) = nested_tree();
        let found = find(&root, &NodeId::root()).unwrap();
        assert!(found.is_group());
    }

    #[test]
    fn test_find_nested_comparison() {
        let (root, _, _, c2_id, _) = nested_tree();
        let found = find(&root, &c2_id).unwrap();
        assert!(found.is_comparison());
    }

    #[test]
    fn test_find_missing() {
        let (root, ..) = nested_tree();
        assert!(find(&root, &NodeId::new("nope")).is_none());
    }

    #[test]
    fn test_find_deeply_nested() {
        // A 40-level chain of single-child groups terminates and resolves.
        let mut root = Group::<DocumentColumn>::new_root();
        let mut parent = NodeId::root();
        for _ in 0..40 {
            add_group(&mut root, &parent);
            let FilterNode::Group(g) = &find_group_mut(&mut root, &parent).unwrap().items[0] else {
                panic!("expected group");
            };
            parent = g.id.clone();
        }
        assert!(find(&root, &parent).is_some());
    }

    // -----------------------------------------------------------------------
    // Id uniqueness
    // -----------------------------------------------------------------------

    #[test]
    fn test_inserted_ids_unique() {
        let mut root = Group::<DocumentColumn>::new_root();
        let template = default_template();
        for _ in 0..10 {
            add_comparison(&mut root, &NodeId::root(), &template);
            add_group(&mut root, &NodeId::root());
        }
        let ids = collect_ids(&root);
        let distinct: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), distinct.len());
    }

    // -----------------------------------------------------------------------
    // delete
    // -----------------------------------------------------------------------

    #[test]
    fn test_delete_then_find() {
        let (mut root, c1_id, ..) = nested_tree();
        assert!(delete(&mut root, &c1_id));
        assert!(find(&root, &c1_id).is_none());
    }

    #[test]
    fn test_delete_nested_group_removes_subtree() {
        let (mut root, _, inner_id, c2_id, c3_id) = nested_tree();
        assert!(delete(&mut root, &inner_id));
        assert!(find(&root, &inner_id).is_none());
        assert!(find(&root, &c2_id).is_none());
        assert!(find(&root, &c3_id).is_none());
        assert_eq!(root.items.len(), 1);
    }

    #[test]
    fn test_delete_root_is_noop() {
        let (mut root, ..) = nested_tree();
        let before = root.clone();
        assert!(!delete(&mut root, &NodeId::root()));
        assert_eq!(root, before);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let (mut root, ..) = nested_tree();
        let before = root.clone();
        assert!(!delete(&mut root, &NodeId::new("nope")));
        assert_eq!(root, before);
    }

    // -----------------------------------------------------------------------
    // add
    // -----------------------------------------------------------------------

    #[test]
    fn test_add_and_delete_top_level_comparison() {
        let mut root = Group::<DocumentColumn>::new_root();
        let template = default_template();
        add_comparison(&mut root, &NodeId::root(), &template);

        assert_eq!(root.items.len(), 1);
        let FilterNode::Comparison(added) = &root.items[0] else {
            panic!("expected comparison");
        };
        assert_ne!(added.id, template.id);
        assert_eq!(added.column, template.column);
        assert_eq!(added.operator, template.operator);
        assert_eq!(added.value, template.value);

        let k = added.id.clone();
        assert!(delete(&mut root, &k));
        assert!(root.items.is_empty());
    }

    #[test]
    fn test_add_prepends() {
        let (mut root, c1_id, ..) = nested_tree();
        add_comparison(&mut root, &NodeId::root(), &default_template());
        // The new criterion lands in front of the existing ones.
        assert_ne!(root.items[0].id(), &c1_id);
        assert!(root.items[0].is_comparison());
        assert_eq!(root.items.len(), 3);
    }

    #[test]
    fn test_add_to_comparison_is_noop() {
        let (mut root, c1_id, ..) = nested_tree();
        let before = root.clone();
        add_group(&mut root, &c1_id);
        add_comparison(&mut root, &c1_id, &default_template());
        assert_eq!(root, before);
    }

    #[test]
    fn test_append_comparison_goes_last() {
        let (mut root, ..) = nested_tree();
        let chip = Comparison::with_tag(1, "stress");
        let chip_id = chip.id.clone();
        append_comparison(&mut root, chip);
        assert_eq!(root.items.last().unwrap().id(), &chip_id);
    }

    // -----------------------------------------------------------------------
    // Logic operator
    // -----------------------------------------------------------------------

    #[test]
    fn test_set_logic_operator() {
        let (mut root, _, inner_id, ..) = nested_tree();
        set_logic_operator(&mut root, &inner_id, LogicOperator::And);
        let NodeRef::Group(inner) = find(&root, &inner_id).unwrap() else {
            panic!("expected group");
        };
        assert_eq!(inner.logic_operator, LogicOperator::And);
    }

    #[test]
    fn test_set_logic_operator_on_comparison_is_noop() {
        let (mut root, c1_id, ..) = nested_tree();
        let before = root.clone();
        set_logic_operator(&mut root, &c1_id, LogicOperator::Or);
        assert_eq!(root, before);
    }

    // -----------------------------------------------------------------------
    // change_column
    // -----------------------------------------------------------------------

    #[test]
    fn test_change_column_resets_operator_and_value() {
        let reg = registry();
        let (mut root, c1_id, ..) = nested_tree();
        change_column(
            &mut root,
            &c1_id,
            ColumnRef::Named(DocumentColumn::WordCount),
            None,
            &reg,
        );
        let NodeRef::Comparison(c) = find(&root, &c1_id).unwrap() else {
            panic!("expected comparison");
        };
        assert_eq!(c.column, ColumnRef::Named(DocumentColumn::WordCount));
        assert_eq!(c.operator, OperatorKind::Number.default_operator());
        assert_eq!(c.value, OperatorKind::Number.neutral_value());
        assert!(c.project_metadata_id.is_none());
    }

    #[test]
    fn test_change_column_to_metadata_then_back() {
        let reg = registry();
        let (mut root, c1_id, ..) = nested_tree();

        // Metadata field 7 is a date: operator set becomes the DATE set.
        change_column(&mut root, &c1_id, ColumnRef::Metadata, Some(7), &reg);
        {
            let NodeRef::Comparison(c) = find(&root, &c1_id).unwrap() else {
                panic!("expected comparison");
            };
            assert_eq!(c.project_metadata_id, Some(7));
            assert_eq!(reg.comparison_kind(c), Some(OperatorKind::Date));
            assert_eq!(c.operator, OperatorKind::Date.default_operator());
        }

        // Give it a date-shaped value, then retarget to a string column:
        // operator resets to the STRING default and the date value is cleared.
        change_value(
            &mut root,
            &c1_id,
            FilterValue::Text("2023-04-01".to_string()),
        );
        change_column(
            &mut root,
            &c1_id,
            ColumnRef::Named(DocumentColumn::Name),
            None,
            &reg,
        );
        let NodeRef::Comparison(c) = find(&root, &c1_id).unwrap() else {
            panic!("expected comparison");
        };
        assert_eq!(c.operator, OperatorKind::String.default_operator());
        assert_eq!(c.value, FilterValue::Text(String::new()));
        assert!(c.project_metadata_id.is_none());
    }

    #[test]
    fn test_change_column_unresolved_metadata() {
        let reg = registry();
        let (mut root, c1_id, ..) = nested_tree();
        change_column(&mut root, &c1_id, ColumnRef::Metadata, Some(99), &reg);
        let NodeRef::Comparison(c) = find(&root, &c1_id).unwrap() else {
            panic!("expected comparison");
        };
        // Column kept, operator parked on the unresolved placeholder.
        assert_eq!(c.column, ColumnRef::Metadata);
        assert_eq!(c.project_metadata_id, Some(99));
        assert_eq!(c.operator, FilterOperator::Unresolved);
        assert_eq!(c.value, FilterValue::Empty);
    }

    #[test]
    fn test_change_column_on_group_is_noop() {
        let reg = registry();
        let (mut root, _, inner_id, ..) = nested_tree();
        let before = root.clone();
        change_column(
            &mut root,
            &inner_id,
            ColumnRef::Named(DocumentColumn::Name),
            None,
            &reg,
        );
        assert_eq!(root, before);
    }

    // -----------------------------------------------------------------------
    // change_operator / change_value independence
    // -----------------------------------------------------------------------

    #[test]
    fn test_change_operator_preserves_value() {
        let (mut root, c1_id, ..) = nested_tree();
        change_operator(&mut root, &c1_id, FilterOperator::StartsWith);
        let NodeRef::Comparison(c) = find(&root, &c1_id).unwrap() else {
            panic!("expected comparison");
        };
        assert_eq!(c.operator, FilterOperator::StartsWith);
        // User-entered text survives the switch.
        assert_eq!(c.value, FilterValue::Text("notes.txt".to_string()));
    }

    #[test]
    fn test_change_value_preserves_operator_and_column() {
        let (mut root, c1_id, ..) = nested_tree();
        change_value(&mut root, &c1_id, FilterValue::Text("other.txt".to_string()));
        let NodeRef::Comparison(c) = find(&root, &c1_id).unwrap() else {
            panic!("expected comparison");
        };
        assert_eq!(c.column, ColumnRef::Named(DocumentColumn::Name));
        assert_eq!(c.operator, FilterOperator::Equals);
        assert_eq!(c.value, FilterValue::Text("other.txt".to_string()));
    }

    #[test]
    fn test_mutations_with_missing_id_are_noops() {
        let reg = registry();
        let (mut root, ..) = nested_tree();
        let before = root.clone();
        let ghost = NodeId::new("ghost");

        change_column(
            &mut root,
            &ghost,
            ColumnRef::Named(DocumentColumn::Content),
            None,
            &reg,
        );
        change_operator(&mut root, &ghost, FilterOperator::EndsWith);
        change_value(&mut root, &ghost, FilterValue::Bool(true));
        set_logic_operator(&mut root, &ghost, LogicOperator::Or);
        add_group(&mut root, &ghost);
        add_comparison(&mut root, &ghost, &default_template());
        delete(&mut root, &ghost);

        assert_eq!(root, before);
    }
}
