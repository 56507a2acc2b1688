use serde_json::{json, Value};

use crate::executor::CommandResult;

/// Output mode for rendering command results.
pub enum OutputMode {
    /// Human-readable pretty-printed output.
    Pretty,
    /// Machine-parseable JSON (one JSON object per result on stdout).
    Json,
}

/// Render a command result to stdout in the given mode.
///
/// Returns `true` to continue execution, `false` to signal exit.
pub fn render(result: &CommandResult, mode: &OutputMode) -> bool {
    match result {
        CommandResult::Ok(msg) => match mode {
            OutputMode::Pretty => println!("{msg}"),
            OutputMode::Json => println!("{}", json!({"ok": true, "message": msg})),
        },
        CommandResult::Created(id) => match mode {
            OutputMode::Pretty => println!("OK (id {id})"),
            OutputMode::Json => println!("{}", json!({"ok": true, "id": id})),
        },
        CommandResult::Tree { state, tree } => match mode {
            OutputMode::Pretty => {
                println!("{state} filter:");
                print_tree(tree, 1);
            }
            OutputMode::Json => println!("{}", json!({"state": state, "filter": tree})),
        },
        CommandResult::Columns(columns) => match mode {
            OutputMode::Pretty => {
                for col in columns {
                    println!("  {:<14} {:<24} {}", col.code, col.label, col.kind);
                }
            }
            OutputMode::Json => {
                let items: Vec<Value> = columns
                    .iter()
                    .map(|c| json!({"code": c.code, "label": c.label, "kind": c.kind}))
                    .collect();
                println!("{}", json!({"columns": items}));
            }
        },
        CommandResult::Operators(operators) => match mode {
            OutputMode::Pretty => println!("Legal operators: {}", operators.join(", ")),
            OutputMode::Json => println!("{}", json!({"operators": operators})),
        },
        CommandResult::Metadata(fields) => match mode {
            OutputMode::Pretty => {
                if fields.is_empty() {
                    println!("No metadata fields defined.");
                }
                for field in fields {
                    println!("  {:<4} {}", field.id, field.label());
                }
            }
            OutputMode::Json => {
                println!(
                    "{}",
                    json!({"fields": serde_json::to_value(fields).unwrap_or_default()})
                );
            }
        },
        CommandResult::Items(items) => match mode {
            OutputMode::Pretty => {
                for item in items {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(item).unwrap_or_else(|_| item.to_string())
                    );
                }
                println!(
                    "{} item{}",
                    items.len(),
                    if items.len() == 1 { "" } else { "s" }
                );
            }
            OutputMode::Json => {
                println!("{}", json!({"items": items, "count": items.len()}));
            }
        },
        CommandResult::Words(words) => match mode {
            OutputMode::Pretty => {
                for row in words {
                    println!("  {:<24} {}", row.word, row.count);
                }
            }
            OutputMode::Json => {
                println!(
                    "{}",
                    json!({"words": serde_json::to_value(words).unwrap_or_default()})
                );
            }
        },
        CommandResult::Buckets(buckets) => match mode {
            OutputMode::Pretty => {
                for bucket in buckets {
                    println!("  {:<10} {}", bucket.bucket, bucket.count);
                }
            }
            OutputMode::Json => {
                println!(
                    "{}",
                    json!({"buckets": serde_json::to_value(buckets).unwrap_or_default()})
                );
            }
        },
        CommandResult::Help(topic) => println!("{}", help_text(topic.as_deref())),
        CommandResult::Exit => {
            if matches!(mode, OutputMode::Pretty) {
                println!("Bye!");
            }
            return false;
        }
    }
    true
}

/// Render an error in the given mode (stderr when pretty, stdout JSON line
/// when machine-parseable).
pub fn render_error(err: &impl std::fmt::Display, mode: &OutputMode) {
    match mode {
        OutputMode::Pretty => eprintln!("Error: {err}"),
        OutputMode::Json => println!("{}", json!({"error": err.to_string()})),
    }
}

/// Print an error for the REPL.
pub fn print_error(err: &impl std::fmt::Display) {
    eprintln!("Error: {err}");
}

/// Recursively print a filter tree from its wire-JSON form.
fn print_tree(node: &Value, indent: usize) {
    let pad = "  ".repeat(indent);
    let id = node.get("id").and_then(Value::as_str).unwrap_or("?");
    if let Some(items) = node.get("items").and_then(Value::as_array) {
        let logic = node
            .get("logic_operator")
            .and_then(Value::as_str)
            .unwrap_or("and");
        println!("{pad}{} [{id}]", logic.to_uppercase());
        if items.is_empty() {
            let outcome = if logic == "or" { "nothing" } else { "everything" };
            println!("{pad}  (empty: matches {outcome})");
        }
        for item in items {
            print_tree(item, indent + 1);
        }
    } else {
        let column = match node.get("column").and_then(Value::as_str) {
            Some("METADATA") => match node.get("project_metadata_id").and_then(Value::as_u64) {
                Some(field) => format!("METADATA {field}"),
                None => "METADATA".to_string(),
            },
            Some(code) => code.to_string(),
            None => "?".to_string(),
        };
        let operator = node.get("operator").and_then(Value::as_str).unwrap_or("?");
        let value = node.get("value").cloned().unwrap_or(Value::Null);
        println!("{pad}{column} {operator} {value} [{id}]");
    }
}

/// Help text, optionally narrowed to a command topic.
fn help_text(topic: Option<&str>) -> String {
    let Some(topic) = topic else {
        return GENERAL_HELP.to_string();
    };
    let text = match topic.to_uppercase().as_str() {
        "USE" => "USE <project>\n  Select a project. Fetches its metadata fields and resets every\n  view's filter (project-independent sessions keep theirs).",
        "VIEW" => "VIEW <documents|annotations|memos|tags>\n  Switch the current view. Each view keeps its own filter session.",
        "PUT" => "PUT {json}\n  Ingest a record into the current view's collection.\n  Documents: {\"name\", \"content\", \"tags\", \"keywords\", \"created\", \"starred\", \"metadata\"}\n  Annotations: {\"document_id\", \"excerpt\", \"note\", \"author\", \"tags\", \"created\"}\n  Memos: {\"title\", \"body\", \"author\", \"created\", \"starred\"}\n  Tags: {\"title\", \"created\"}",
        "FILTER" => "FILTER TAG <id> <title> | FILTER NAME <name> | FILTER KEYWORD <word>\n  One-shot chips appended straight to the committed document filter.",
        "EDIT" => "EDIT [group-id]\n  Open a draft over a group (default: the root). Mutations then apply\n  to the draft; COMMIT copies it back, CANCEL discards it. Only one\n  draft exists at a time across all views.",
        "ADD" => "ADD GROUP [parent-id] | ADD RULE [parent-id]\n  Prepend an empty group or a default rule to a group (default: root).\n  Applies to the draft when one is open, else to the committed tree.",
        "SET" => "SET LOGIC <group> <and|or>\nSET COLUMN <node> <code> | SET COLUMN <node> METADATA <field-id>\nSET OP <node> <operator>\nSET VALUE <node> <value>\n  Changing a column resets the rule's operator and value to the new\n  column kind's defaults. Operators must be legal for the column kind\n  (see OPS <node>). Values are free-form; a shape mismatch makes the\n  rule match nothing.",
        "RAW" => "RAW {filter-tree-json}\n  Replace the open draft wholesale from wire JSON. Requires EXPERT on.",
        "SEARCH" => "SEARCH [LIMIT <n>]\n  Run the current view's committed filter against the server.",
        "FREQ" => "FREQ [LIMIT <n>]\n  Word-frequency table over documents matching the document filter.",
        "TIMELINE" => "TIMELINE [MONTH|YEAR]\n  Bucket documents matching the document filter by creation date.",
        _ => return format!("No help for '{topic}'. Type HELP for the command list."),
    };
    text.to_string()
}

const GENERAL_HELP: &str = "\
Commands:
  PING                          Check the server connection
  CREATE PROJECT <name>         Create a project
  USE <project>                 Select a project
  VIEW <name>                   Switch view (documents, annotations, memos, tags)
  DEFINE METADATA <type> <key> <kind>
                                Register a metadata field
  METADATA                      List metadata fields
  PUT {json}                    Ingest a record into the current view
  SHOW | SHOW DRAFT             Print the committed / draft filter tree
  COLUMNS                       List the current view's filterable columns
  OPS <node-id>                 List operators legal for a rule
  FILTER TAG|NAME|KEYWORD ...   Append a one-shot chip (documents view)
  EDIT [group-id]               Open a draft edit session
  ADD GROUP|RULE [parent-id]    Add a node
  SET LOGIC|COLUMN|OP|VALUE ... Change a node
  DELETE <node-id>              Remove a node
  COMMIT | CANCEL               Apply or discard the draft
  RESET                         Clear the committed filter
  EXPERT <on|off>               Toggle expert mode
  RAW {json}                    Replace the draft from wire JSON (expert)
  SEARCH [LIMIT n]              Search the current view
  FREQ [LIMIT n]                Word-frequency table (documents)
  TIMELINE [MONTH|YEAR]         Document timeline
  HELP [command]                This text, or per-command detail
  EXIT                          Leave the console";
