//! Per-namespace filter session state and the draft/commit discipline.
//!
//! A [`FilterSession`] owns one namespace's committed tree, its column
//! registry, the default comparison template, and the expert-mode flag. A
//! [`SessionRegistry`] owns the sessions of one view family (one per
//! namespace, created lazily), the single shared draft, and the
//! project-change reset.
//!
//! Direct edits (one-shot chips, quick deletes) apply the algebra straight to
//! `committed` via [`FilterSession::committed_mut`]. Multi-step edits go
//! through `start_edit` / `finish_edit` / `cancel_edit`: the draft is a deep
//! copy, so nothing reaches `committed` until the commit.

use std::collections::HashMap;

use tracing::debug;

use crate::columns::{FilterColumn, MetadataDescriptor};
use crate::error::Result;
use crate::model::{Comparison, Group, NodeId};
use crate::ops;
use crate::registry::ColumnRegistry;

/// One namespace's filter state.
#[derive(Debug, Clone)]
pub struct FilterSession<C: FilterColumn> {
    committed: Group<C>,
    registry: ColumnRegistry<C>,
    default_template: Comparison<C>,
    expert_mode: bool,
    /// When set, this namespace survives project changes.
    project_independent: bool,
}

impl<C: FilterColumn> FilterSession<C> {
    pub fn new(default_template: Comparison<C>) -> Self {
        FilterSession {
            committed: Group::new_root(),
            registry: ColumnRegistry::build(&[]),
            default_template,
            expert_mode: false,
            project_independent: false,
        }
    }

    /// Rebuild the column registry wholesale from the current project's
    /// metadata descriptors. The committed tree is preserved: a comparison
    /// referencing a now-deleted metadata field becomes unresolved rather
    /// than being dropped.
    pub fn initialize(&mut self, metadata: &[MetadataDescriptor]) {
        self.registry = ColumnRegistry::build(metadata);
        debug!(fields = metadata.len(), "session registry rebuilt");
    }

    /// The live filter consumed by queries.
    pub fn committed(&self) -> &Group<C> {
        &self.committed
    }

    /// Mutable access for direct (non-modal) edits through the algebra.
    pub fn committed_mut(&mut self) -> &mut Group<C> {
        &mut self.committed
    }

    pub fn registry(&self) -> &ColumnRegistry<C> {
        &self.registry
    }

    pub fn default_template(&self) -> &Comparison<C> {
        &self.default_template
    }

    pub fn expert_mode(&self) -> bool {
        self.expert_mode
    }

    /// Pure flag flip; does not touch the tree.
    pub fn set_expert_mode(&mut self, on: bool) {
        self.expert_mode = on;
    }

    pub fn project_independent(&self) -> bool {
        self.project_independent
    }

    pub fn set_project_independent(&mut self, on: bool) {
        self.project_independent = on;
    }

    /// Clear the committed tree back to an empty AND group.
    pub fn reset(&mut self) {
        self.committed = Group::new_root();
    }
}

/// The in-progress copy of one group under modal edit.
#[derive(Debug, Clone)]
struct Draft<C> {
    namespace: String,
    /// Id of the group in `committed` the draft was snapshotted from.
    target: NodeId,
    tree: Group<C>,
}

/// The sessions of one view family, keyed by namespace name.
///
/// At most one draft exists per registry at a time; starting a new edit
/// discards any pending one (last-writer-wins, no queuing).
#[derive(Debug)]
pub struct SessionRegistry<C: FilterColumn> {
    sessions: HashMap<String, FilterSession<C>>,
    draft: Option<Draft<C>>,
    default_template: Comparison<C>,
}

impl<C: FilterColumn> SessionRegistry<C> {
    /// `default_template` seeds every lazily-created session's default
    /// comparison (cloned per session, re-id'd per insertion).
    pub fn new(default_template: Comparison<C>) -> Self {
        SessionRegistry {
            sessions: HashMap::new(),
            draft: None,
            default_template,
        }
    }

    /// The session for `namespace`, created on first use.
    pub fn session(&mut self, namespace: &str) -> &mut FilterSession<C> {
        let template = &self.default_template;
        self.sessions.entry(namespace.to_string()).or_insert_with(|| {
            debug!(namespace, "creating filter session");
            FilterSession::new(template.clone())
        })
    }

    pub fn get(&self, namespace: &str) -> Option<&FilterSession<C>> {
        self.sessions.get(namespace)
    }

    // -- draft lifecycle ----------------------------------------------------

    /// Snapshot the group at `group_id` in `namespace`'s committed tree into
    /// the draft. A pending draft is discarded only once the new edit
    /// actually opens; when `group_id` does not name a group this is a no-op
    /// and any open draft stays in place.
    pub fn start_edit(&mut self, namespace: &str, group_id: &NodeId) -> bool {
        let session = self.session(namespace);
        let Some(ops::NodeRef::Group(group)) = ops::find(&session.committed, group_id) else {
            return false;
        };
        let tree = group.clone();
        if let Some(discarded) = self.draft.take() {
            debug!(namespace = %discarded.namespace, "discarding pending draft");
        }
        debug!(namespace, target = %group_id, "edit session started");
        self.draft = Some(Draft {
            namespace: namespace.to_string(),
            target: group_id.clone(),
            tree,
        });
        true
    }

    pub fn draft(&self) -> Option<&Group<C>> {
        self.draft.as_ref().map(|d| &d.tree)
    }

    /// Mutable access to the draft tree for the algebra.
    pub fn draft_mut(&mut self) -> Option<&mut Group<C>> {
        self.draft.as_mut().map(|d| &mut d.tree)
    }

    /// Namespace owning the open draft, if any.
    pub fn draft_namespace(&self) -> Option<&str> {
        self.draft.as_ref().map(|d| d.namespace.as_str())
    }

    /// Copy the draft back over its source group in `committed` and close
    /// the edit session. Returns whether a commit happened (false when no
    /// draft is open, or when the target group has meanwhile left the tree).
    pub fn finish_edit(&mut self) -> bool {
        let Some(draft) = self.draft.take() else {
            return false;
        };
        let session = self.session(&draft.namespace);
        let Some(target) = ops::find_group_mut(&mut session.committed, &draft.target) else {
            debug!(namespace = %draft.namespace, target = %draft.target, "draft target gone, discarding");
            return false;
        };
        *target = draft.tree;
        debug!(namespace = %draft.namespace, target = %draft.target, "edit session committed");
        true
    }

    /// Discard the draft without touching `committed`. Always succeeds.
    pub fn cancel_edit(&mut self) {
        if let Some(draft) = self.draft.take() {
            debug!(namespace = %draft.namespace, "edit session cancelled");
        }
    }

    /// Replace the entire draft tree with one parsed from raw wire JSON (the
    /// expert-mode escape hatch). The parsed tree's root id is forced to the
    /// draft's snapshot target so the commit still lands on the same node.
    /// No-op when no draft is open.
    pub fn replace_draft(&mut self, payload: &str) -> Result<()> {
        let Some(draft) = self.draft.as_mut() else {
            return Ok(());
        };
        let mut tree = Group::from_wire_json(payload)?;
        tree.id = draft.target.clone();
        draft.tree = tree;
        debug!(namespace = %draft.namespace, "draft replaced from raw payload");
        Ok(())
    }

    // -- lifecycle ----------------------------------------------------------

    /// Project-change reset: clear every session's committed tree back to an
    /// empty AND group, except sessions declared project-independent. An open
    /// draft over a reset namespace is discarded.
    pub fn reset_for_project(&mut self) {
        for (namespace, session) in &mut self.sessions {
            if session.project_independent {
                continue;
            }
            debug!(namespace, "resetting filter for project change");
            session.reset();
        }
        let draft_survives = self
            .draft
            .as_ref()
            .and_then(|d| self.sessions.get(&d.namespace))
            .is_some_and(|s| s.project_independent);
        if !draft_survives {
            self.cancel_edit();
        }
    }
}
