use serde_json::Value;
use tokio::runtime::Runtime;

use vellum_core::{
    ops, AnnotationColumn, ColumnRef, Comparison, DocumentColumn, FilterColumn, FilterOperator,
    FilterValue, Group, MemoColumn, MetadataDescriptor, NodeId, OperatorKind, SessionRegistry,
    TagColumn,
};
use vellum_server::client::{AnnotationInput, DocumentInput, MemoInput, VellumClient};
use vellum_server::store::{TimelineBucket, WordCount};

use crate::commands::{ColumnTarget, Command, ViewKind};

/// Structured result from executing a command.
pub enum CommandResult {
    /// Plain confirmation message.
    Ok(String),
    /// Record or metadata field created (PUT, DEFINE METADATA).
    Created(u64),
    /// A filter tree to render (SHOW, SHOW DRAFT).
    Tree { state: &'static str, tree: Value },
    /// Column picker entries of the current view (COLUMNS).
    Columns(Vec<ColumnInfo>),
    /// Legal operator codes for a comparison (OPS).
    Operators(Vec<&'static str>),
    /// Metadata field descriptors (METADATA).
    Metadata(Vec<MetadataDescriptor>),
    /// Matching records (SEARCH).
    Items(Vec<Value>),
    /// Word-frequency rows (FREQ).
    Words(Vec<WordCount>),
    /// Timeline buckets (TIMELINE).
    Buckets(Vec<TimelineBucket>),
    /// Help text (optional topic for per-command help).
    Help(Option<String>),
    /// Exit signal.
    Exit,
}

/// One row of the COLUMNS listing.
pub struct ColumnInfo {
    pub code: String,
    pub label: String,
    pub kind: &'static str,
}

/// Client-side state of one console run: the selected project and view, and
/// the filter sessions of every view family.
pub struct Workspace {
    pub project: Option<String>,
    pub view: ViewKind,
    documents: SessionRegistry<DocumentColumn>,
    annotations: SessionRegistry<AnnotationColumn>,
    memos: SessionRegistry<MemoColumn>,
    tags: SessionRegistry<TagColumn>,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace {
            project: None,
            view: ViewKind::Documents,
            documents: SessionRegistry::new(Comparison::named(
                DocumentColumn::Name,
                FilterOperator::Contains,
                FilterValue::Text(String::new()),
            )),
            annotations: SessionRegistry::new(Comparison::named(
                AnnotationColumn::Note,
                FilterOperator::Contains,
                FilterValue::Text(String::new()),
            )),
            memos: SessionRegistry::new(Comparison::named(
                MemoColumn::Title,
                FilterOperator::Contains,
                FilterValue::Text(String::new()),
            )),
            tags: SessionRegistry::new(Comparison::named(
                TagColumn::Title,
                FilterOperator::Contains,
                FilterValue::Text(String::new()),
            )),
        }
    }

    /// One draft across the whole workspace, not one per view family: opening
    /// an edit in the current view discards drafts everywhere else.
    fn cancel_other_drafts(&mut self) {
        if self.view != ViewKind::Documents {
            self.documents.cancel_edit();
        }
        if self.view != ViewKind::Annotations {
            self.annotations.cancel_edit();
        }
        if self.view != ViewKind::Memos {
            self.memos.cancel_edit();
        }
        if self.view != ViewKind::Tags {
            self.tags.cancel_edit();
        }
    }

    fn reset_for_project(&mut self) {
        self.documents.reset_for_project();
        self.annotations.reset_for_project();
        self.memos.reset_for_project();
        self.tags.reset_for_project();
    }

    fn require_project(&self) -> Result<String, String> {
        self.project
            .clone()
            .ok_or_else(|| "No project selected. Set one with: USE <project>".to_string())
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Workspace::new()
    }
}

/// Dispatch over the current view's session registry: binds `$sessions` to
/// the registry and `$ns` to the session namespace.
macro_rules! with_view {
    ($ws:expr, $sessions:ident, $ns:ident, $body:expr) => {
        match $ws.view {
            ViewKind::Documents => {
                let $ns = "documents";
                let $sessions = &mut $ws.documents;
                $body
            }
            ViewKind::Annotations => {
                let $ns = "annotations";
                let $sessions = &mut $ws.annotations;
                $body
            }
            ViewKind::Memos => {
                let $ns = "memos";
                let $sessions = &mut $ws.memos;
                $body
            }
            ViewKind::Tags => {
                let $ns = "tags";
                let $sessions = &mut $ws.tags;
                $body
            }
        }
    };
}

/// Execute a parsed command against the workspace and the server.
pub fn execute(
    client: &mut VellumClient,
    rt: &Runtime,
    ws: &mut Workspace,
    cmd: Command,
) -> Result<CommandResult, String> {
    match cmd {
        Command::Ping => {
            rt.block_on(client.ping()).map_err(err_str)?;
            Ok(CommandResult::Ok("Server is up".to_string()))
        }
        Command::CreateProject { name } => {
            rt.block_on(client.create_project(&name)).map_err(err_str)?;
            Ok(CommandResult::Ok(format!("Project '{name}' created")))
        }
        Command::Use { project } => exec_use(client, rt, ws, project),
        Command::View { view } => {
            ws.view = view;
            Ok(CommandResult::Ok(format!("Viewing {}", view.name())))
        }
        Command::DefineMetadata {
            document_type,
            key,
            value_kind,
        } => exec_define_metadata(client, rt, ws, &document_type, &key, value_kind),
        Command::Metadata => {
            let project = ws.require_project()?;
            let descriptors = rt
                .block_on(client.project_metadata(&project))
                .map_err(err_str)?;
            ws.documents.session("documents").initialize(&descriptors);
            Ok(CommandResult::Metadata(descriptors))
        }
        Command::Put { record } => exec_put(client, rt, ws, record),

        Command::Show => with_view!(ws, sessions, ns, show_committed(sessions, ns)),
        Command::ShowDraft => with_view!(ws, sessions, _ns, show_draft(sessions)),
        Command::Columns => with_view!(ws, sessions, ns, list_columns(sessions, ns)),
        Command::Ops { node } => with_view!(ws, sessions, ns, list_operators(sessions, ns, &node)),

        Command::FilterTag { tag_id, title } => {
            exec_chip(ws, Comparison::with_tag(tag_id, title))
        }
        Command::FilterName { name } => exec_chip(ws, Comparison::with_name(name)),
        Command::FilterKeyword { keyword } => exec_chip(ws, Comparison::with_keyword(keyword)),

        Command::Edit { group } => {
            let result = with_view!(ws, sessions, ns, start_edit(sessions, ns, group.as_deref()));
            // A failed EDIT must leave drafts in other views untouched.
            if result.is_ok() {
                ws.cancel_other_drafts();
            }
            result
        }
        Command::AddGroup { parent } => {
            with_view!(ws, sessions, ns, add_group(sessions, ns, parent.as_deref()))
        }
        Command::AddRule { parent } => {
            with_view!(ws, sessions, ns, add_rule(sessions, ns, parent.as_deref()))
        }
        Command::SetLogic { group, operator } => {
            with_view!(ws, sessions, ns, set_logic(sessions, ns, &group, operator))
        }
        Command::SetColumn { node, column } => {
            with_view!(ws, sessions, ns, set_column(sessions, ns, &node, &column))
        }
        Command::SetOp { node, operator } => {
            with_view!(ws, sessions, ns, set_op(sessions, ns, &node, operator))
        }
        Command::SetValue { node, value } => {
            with_view!(ws, sessions, ns, set_value(sessions, ns, &node, value))
        }
        Command::Delete { node } => {
            with_view!(ws, sessions, ns, delete_node(sessions, ns, &node))
        }
        Command::Commit => with_view!(ws, sessions, _ns, commit(sessions)),
        Command::Cancel => with_view!(ws, sessions, _ns, cancel(sessions)),
        Command::Reset => with_view!(ws, sessions, ns, {
            sessions.session(ns).reset();
            Ok(CommandResult::Ok("Filter cleared".to_string()))
        }),

        Command::Expert { on } => with_view!(ws, sessions, ns, {
            sessions.session(ns).set_expert_mode(on);
            Ok(CommandResult::Ok(format!(
                "Expert mode {}",
                if on { "on" } else { "off" }
            )))
        }),
        Command::Raw { payload } => with_view!(ws, sessions, ns, raw(sessions, ns, &payload)),

        Command::Search { limit } => exec_search(client, rt, ws, limit),
        Command::Freq { limit } => {
            let project = ws.require_project()?;
            let filter = ws.documents.session("documents").committed().clone();
            let words = rt
                .block_on(client.word_frequency(&project, Some(&filter), limit))
                .map_err(err_str)?;
            Ok(CommandResult::Words(words))
        }
        Command::Timeline { granularity } => {
            let project = ws.require_project()?;
            let filter = ws.documents.session("documents").committed().clone();
            let buckets = rt
                .block_on(client.timeline(&project, Some(&filter), granularity))
                .map_err(err_str)?;
            Ok(CommandResult::Buckets(buckets))
        }

        Command::Help(topic) => Ok(CommandResult::Help(topic)),
        Command::Exit => Ok(CommandResult::Exit),
    }
}

// ---------------------------------------------------------------------------
// Project and ingest commands
// ---------------------------------------------------------------------------

fn exec_use(
    client: &mut VellumClient,
    rt: &Runtime,
    ws: &mut Workspace,
    project: String,
) -> Result<CommandResult, String> {
    let descriptors = rt
        .block_on(client.project_metadata(&project))
        .map_err(err_str)?;
    ws.reset_for_project();
    ws.documents.session("documents").initialize(&descriptors);
    let fields = descriptors.len();
    ws.project = Some(project.clone());
    Ok(CommandResult::Ok(format!(
        "Using project '{project}' ({fields} metadata fields)"
    )))
}

fn exec_define_metadata(
    client: &mut VellumClient,
    rt: &Runtime,
    ws: &mut Workspace,
    document_type: &str,
    key: &str,
    value_kind: OperatorKind,
) -> Result<CommandResult, String> {
    let project = ws.require_project()?;
    let id = rt
        .block_on(client.define_metadata_field(&project, document_type, key, value_kind))
        .map_err(err_str)?;
    // Pick the new field up in the document session's column registry.
    let descriptors = rt
        .block_on(client.project_metadata(&project))
        .map_err(err_str)?;
    ws.documents.session("documents").initialize(&descriptors);
    Ok(CommandResult::Created(id))
}

fn exec_put(
    client: &mut VellumClient,
    rt: &Runtime,
    ws: &mut Workspace,
    record: Value,
) -> Result<CommandResult, String> {
    let project = ws.require_project()?;
    let id = match ws.view {
        ViewKind::Documents => {
            let input: DocumentInput =
                serde_json::from_value(record).map_err(|e| format!("Invalid document: {e}"))?;
            rt.block_on(client.add_document(&project, &input))
        }
        ViewKind::Annotations => {
            let input: AnnotationInput =
                serde_json::from_value(record).map_err(|e| format!("Invalid annotation: {e}"))?;
            rt.block_on(client.add_annotation(&project, &input))
        }
        ViewKind::Memos => {
            let input: MemoInput =
                serde_json::from_value(record).map_err(|e| format!("Invalid memo: {e}"))?;
            rt.block_on(client.add_memo(&project, &input))
        }
        ViewKind::Tags => {
            let title = record
                .get("title")
                .and_then(Value::as_str)
                .ok_or_else(|| "A tag record requires a 'title'".to_string())?;
            let created = record
                .get("created")
                .and_then(Value::as_str)
                .unwrap_or_default();
            rt.block_on(client.add_tag(&project, title, created))
        }
    }
    .map_err(err_str)?;
    Ok(CommandResult::Created(id))
}

fn exec_search(
    client: &mut VellumClient,
    rt: &Runtime,
    ws: &mut Workspace,
    limit: Option<usize>,
) -> Result<CommandResult, String> {
    let project = ws.require_project()?;
    let items = match ws.view {
        ViewKind::Documents => {
            let filter = ws.documents.session("documents").committed().clone();
            rt.block_on(client.search_documents(&project, Some(&filter), limit))
        }
        ViewKind::Annotations => {
            let filter = ws.annotations.session("annotations").committed().clone();
            rt.block_on(client.search_annotations(&project, Some(&filter), limit))
        }
        ViewKind::Memos => {
            let filter = ws.memos.session("memos").committed().clone();
            rt.block_on(client.search_memos(&project, Some(&filter), limit))
        }
        ViewKind::Tags => {
            let filter = ws.tags.session("tags").committed().clone();
            rt.block_on(client.search_tags(&project, Some(&filter), limit))
        }
    }
    .map_err(err_str)?;
    Ok(CommandResult::Items(items))
}

fn exec_chip(ws: &mut Workspace, chip: Comparison<DocumentColumn>) -> Result<CommandResult, String> {
    if ws.view != ViewKind::Documents {
        return Err("Filter chips apply to the documents view. Switch with: VIEW documents".to_string());
    }
    ops::append_comparison(ws.documents.session("documents").committed_mut(), chip);
    Ok(CommandResult::Ok("Filter chip added".to_string()))
}

// ---------------------------------------------------------------------------
// Session and tree helpers
// ---------------------------------------------------------------------------

/// The tree mutations act on: the draft while an edit is open, the committed
/// tree otherwise (direct edits).
fn with_tree<C: FilterColumn, T>(
    sessions: &mut SessionRegistry<C>,
    ns: &str,
    f: impl FnOnce(&mut Group<C>) -> T,
) -> T {
    if let Some(draft) = sessions.draft_mut() {
        return f(draft);
    }
    f(sessions.session(ns).committed_mut())
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

fn show_committed<C: FilterColumn>(
    sessions: &mut SessionRegistry<C>,
    ns: &str,
) -> Result<CommandResult, String> {
    let tree = to_value(sessions.session(ns).committed())?;
    Ok(CommandResult::Tree {
        state: "committed",
        tree,
    })
}

fn show_draft<C: FilterColumn>(sessions: &mut SessionRegistry<C>) -> Result<CommandResult, String> {
    let Some(draft) = sessions.draft() else {
        return Err("No edit in progress. Start one with: EDIT".to_string());
    };
    Ok(CommandResult::Tree {
        state: "draft",
        tree: to_value(draft)?,
    })
}

fn kind_code(kind: OperatorKind) -> &'static str {
    match kind {
        OperatorKind::String => "string",
        OperatorKind::Number => "number",
        OperatorKind::Date => "date",
        OperatorKind::IdList => "id_list",
        OperatorKind::List => "list",
        OperatorKind::Boolean => "boolean",
    }
}

fn list_columns<C: FilterColumn>(
    sessions: &mut SessionRegistry<C>,
    ns: &str,
) -> Result<CommandResult, String> {
    let registry = sessions.session(ns).registry();
    let columns = registry
        .entries()
        .iter()
        .map(|entry| {
            let code = match entry.metadata_id {
                Some(id) => format!("METADATA {id}"),
                None => entry.column.code().to_string(),
            };
            let kind = registry
                .resolve_kind(&entry.column, entry.metadata_id)
                .map(kind_code)
                .unwrap_or("unresolved");
            ColumnInfo {
                code,
                label: entry.label.clone(),
                kind,
            }
        })
        .collect();
    Ok(CommandResult::Columns(columns))
}

fn list_operators<C: FilterColumn>(
    sessions: &mut SessionRegistry<C>,
    ns: &str,
    node: &str,
) -> Result<CommandResult, String> {
    let registry = sessions.session(ns).registry().clone();
    let id = NodeId::new(node);
    with_tree(sessions, ns, |tree| {
        let legal = match ops::find(tree, &id) {
            Some(ops::NodeRef::Comparison(c)) => registry.legal_operators(c),
            _ => return Err(format!("No comparison with id '{node}'")),
        };
        let Some(legal) = legal else {
            return Err(format!(
                "Column kind of '{node}' is unresolved; no operators are legal"
            ));
        };
        Ok(CommandResult::Operators(
            legal.iter().map(|op| op.code()).collect(),
        ))
    })
}

// ---------------------------------------------------------------------------
// Mutation algebra commands
// ---------------------------------------------------------------------------

fn start_edit<C: FilterColumn>(
    sessions: &mut SessionRegistry<C>,
    ns: &str,
    group: Option<&str>,
) -> Result<CommandResult, String> {
    let target = group.map(NodeId::new).unwrap_or_else(NodeId::root);
    if sessions.start_edit(ns, &target) {
        Ok(CommandResult::Ok(format!(
            "Editing '{target}'. COMMIT applies, CANCEL discards."
        )))
    } else {
        Err(format!("No group with id '{target}'"))
    }
}

fn add_group<C: FilterColumn>(
    sessions: &mut SessionRegistry<C>,
    ns: &str,
    parent: Option<&str>,
) -> Result<CommandResult, String> {
    let parent_id = parent.map(NodeId::new).unwrap_or_else(NodeId::root);
    let added = with_tree(sessions, ns, |tree| {
        if !ops::find(tree, &parent_id).is_some_and(|n| n.is_group()) {
            return false;
        }
        ops::add_group(tree, &parent_id);
        true
    });
    if added {
        Ok(CommandResult::Ok(format!("Group added under '{parent_id}'")))
    } else {
        Err(format!("No group with id '{parent_id}'"))
    }
}

fn add_rule<C: FilterColumn>(
    sessions: &mut SessionRegistry<C>,
    ns: &str,
    parent: Option<&str>,
) -> Result<CommandResult, String> {
    let parent_id = parent.map(NodeId::new).unwrap_or_else(NodeId::root);
    let template = sessions.session(ns).default_template().clone();
    let added = with_tree(sessions, ns, |tree| {
        if !ops::find(tree, &parent_id).is_some_and(|n| n.is_group()) {
            return false;
        }
        ops::add_comparison(tree, &parent_id, &template);
        true
    });
    if added {
        Ok(CommandResult::Ok(format!("Rule added under '{parent_id}'")))
    } else {
        Err(format!("No group with id '{parent_id}'"))
    }
}

fn set_logic<C: FilterColumn>(
    sessions: &mut SessionRegistry<C>,
    ns: &str,
    group: &str,
    operator: vellum_core::LogicOperator,
) -> Result<CommandResult, String> {
    let id = NodeId::new(group);
    let changed = with_tree(sessions, ns, |tree| {
        if !ops::find(tree, &id).is_some_and(|n| n.is_group()) {
            return false;
        }
        ops::set_logic_operator(tree, &id, operator);
        true
    });
    if changed {
        Ok(CommandResult::Ok(format!("Logic changed on '{group}'")))
    } else {
        Err(format!("No group with id '{group}'"))
    }
}

fn set_column<C: FilterColumn>(
    sessions: &mut SessionRegistry<C>,
    ns: &str,
    node: &str,
    target: &ColumnTarget,
) -> Result<CommandResult, String> {
    let registry = sessions.session(ns).registry().clone();
    let (column, metadata_id) = match target {
        ColumnTarget::Code(code) => {
            let Some(c) = C::from_code(code) else {
                return Err(format!("Unknown column '{code}' in this view"));
            };
            (ColumnRef::Named(c), None)
        }
        ColumnTarget::Metadata(id) => (ColumnRef::Metadata, Some(*id)),
    };
    let id = NodeId::new(node);
    let changed = with_tree(sessions, ns, |tree| {
        if !ops::find(tree, &id).is_some_and(|n| n.is_comparison()) {
            return false;
        }
        ops::change_column(tree, &id, column, metadata_id, &registry);
        true
    });
    if !changed {
        return Err(format!("No comparison with id '{node}'"));
    }
    // An unknown metadata id leaves the comparison unresolved; it matches
    // nothing until the field exists.
    if registry.resolve_kind(&column, metadata_id).is_none() {
        return Ok(CommandResult::Ok(format!(
            "Column changed on '{node}' (unresolved field; the rule matches nothing)"
        )));
    }
    Ok(CommandResult::Ok(format!("Column changed on '{node}'")))
}

fn set_op<C: FilterColumn>(
    sessions: &mut SessionRegistry<C>,
    ns: &str,
    node: &str,
    operator: FilterOperator,
) -> Result<CommandResult, String> {
    let registry = sessions.session(ns).registry().clone();
    let id = NodeId::new(node);
    with_tree(sessions, ns, |tree| {
        let legal = match ops::find(tree, &id) {
            Some(ops::NodeRef::Comparison(c)) => registry.legal_operators(c),
            _ => return Err(format!("No comparison with id '{node}'")),
        };
        match legal {
            Some(legal) if legal.contains(&operator) => {
                ops::change_operator(tree, &id, operator);
                Ok(CommandResult::Ok(format!("Operator changed on '{node}'")))
            }
            Some(legal) => Err(format!(
                "Operator '{}' is not legal for this column. Legal: {}",
                operator.code(),
                legal
                    .iter()
                    .map(|op| op.code())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            None => Err(format!(
                "Column kind of '{node}' is unresolved; fix the column before the operator"
            )),
        }
    })
}

fn set_value<C: FilterColumn>(
    sessions: &mut SessionRegistry<C>,
    ns: &str,
    node: &str,
    value: Value,
) -> Result<CommandResult, String> {
    let value: FilterValue =
        serde_json::from_value(value).map_err(|e| format!("Invalid value: {e}"))?;
    let id = NodeId::new(node);
    let changed = with_tree(sessions, ns, |tree| {
        if !ops::find(tree, &id).is_some_and(|n| n.is_comparison()) {
            return false;
        }
        ops::change_value(tree, &id, value);
        true
    });
    if changed {
        Ok(CommandResult::Ok(format!("Value changed on '{node}'")))
    } else {
        Err(format!("No comparison with id '{node}'"))
    }
}

fn delete_node<C: FilterColumn>(
    sessions: &mut SessionRegistry<C>,
    ns: &str,
    node: &str,
) -> Result<CommandResult, String> {
    let id = NodeId::new(node);
    if id == NodeId::root() {
        return Err("The root group cannot be deleted".to_string());
    }
    let deleted = with_tree(sessions, ns, |tree| ops::delete(tree, &id));
    if deleted {
        Ok(CommandResult::Ok(format!("Deleted '{node}'")))
    } else {
        Err(format!("No node with id '{node}'"))
    }
}

fn commit<C: FilterColumn>(sessions: &mut SessionRegistry<C>) -> Result<CommandResult, String> {
    if sessions.draft().is_none() {
        return Err("No edit in progress".to_string());
    }
    if sessions.finish_edit() {
        Ok(CommandResult::Ok("Filter committed".to_string()))
    } else {
        Ok(CommandResult::Ok(
            "Edit discarded: the edited group no longer exists".to_string(),
        ))
    }
}

fn cancel<C: FilterColumn>(sessions: &mut SessionRegistry<C>) -> Result<CommandResult, String> {
    if sessions.draft().is_none() {
        return Err("No edit in progress".to_string());
    }
    sessions.cancel_edit();
    Ok(CommandResult::Ok("Edit cancelled".to_string()))
}

fn raw<C: FilterColumn>(
    sessions: &mut SessionRegistry<C>,
    ns: &str,
    payload: &str,
) -> Result<CommandResult, String> {
    if !sessions.session(ns).expert_mode() {
        return Err("Raw editing requires expert mode. Enable with: EXPERT on".to_string());
    }
    if sessions.draft().is_none() {
        return Err("No edit in progress. Start one with: EDIT".to_string());
    }
    sessions.replace_draft(payload).map_err(|e| e.to_string())?;
    Ok(CommandResult::Ok("Draft replaced from raw payload".to_string()))
}

fn err_str(err: vellum_server::ClientError) -> String {
    err.to_string()
}
