use serde_json::Value;

use vellum_core::{FilterOperator, LogicOperator, OperatorKind};
use vellum_server::store::Granularity;

use crate::commands::{ColumnTarget, Command, ViewKind};

/// Tokenize an input line into a vector of string tokens.
///
/// Handles:
/// - Whitespace-separated words
/// - Quoted strings: `"coping strategies"` becomes a single token (quotes
///   preserved)
/// - JSON bodies: when `{` or `[` is encountered, scans to the matching
///   closer (tracking nesting and string literals inside the JSON), returning
///   the entire body as one token
fn tokenize(input: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        // Skip whitespace.
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        // JSON body.
        if chars[i] == '{' || chars[i] == '[' {
            let (open, close) = if chars[i] == '{' { ('{', '}') } else { ('[', ']') };
            let start = i;
            let mut depth = 0;
            let mut in_string = false;
            loop {
                if i >= len {
                    return Err("Unterminated JSON body".to_string());
                }
                let c = chars[i];
                if in_string {
                    if c == '\\' {
                        // Skip escaped character.
                        i += 1;
                    } else if c == '"' {
                        in_string = false;
                    }
                } else if c == '"' {
                    in_string = true;
                } else if c == open {
                    depth += 1;
                } else if c == close {
                    depth -= 1;
                    if depth == 0 {
                        i += 1;
                        break;
                    }
                }
                i += 1;
            }
            let token: String = chars[start..i].iter().collect();
            tokens.push(token);
            continue;
        }

        // Quoted string.
        if chars[i] == '"' {
            let start = i;
            i += 1;
            while i < len && chars[i] != '"' {
                if chars[i] == '\\' {
                    i += 1; // skip escaped char
                }
                i += 1;
            }
            if i >= len {
                return Err("Unterminated quoted string".to_string());
            }
            i += 1; // skip closing quote
            let token: String = chars[start..i].iter().collect();
            tokens.push(token);
            continue;
        }

        // Regular word token.
        let start = i;
        while i < len && !chars[i].is_whitespace() && chars[i] != '"' && chars[i] != '{' && chars[i] != '[' {
            i += 1;
        }
        let token: String = chars[start..i].iter().collect();
        tokens.push(token);
    }

    Ok(tokens)
}

/// Strip surrounding double quotes from a string, if present.
fn strip_quotes(s: &str) -> String {
    if s.starts_with('"') && s.ends_with('"') && s.len() >= 2 {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Parse a raw value token into a JSON value.
///
/// - `[...]` bodies are parsed as JSON (BETWEEN ranges, id/text pairs)
/// - `"..."` becomes a JSON string with the quotes stripped
/// - `true` / `false` become booleans
/// - Numbers become JSON numbers
/// - Anything else is a bare-word string
fn parse_value_token(s: &str) -> Result<Value, String> {
    if s.starts_with('[') {
        return serde_json::from_str(s).map_err(|e| format!("Invalid JSON value: {e}"));
    }
    if s.starts_with('"') {
        return Ok(Value::String(strip_quotes(s)));
    }
    match s {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }
    if let Ok(n) = s.parse::<f64>() {
        return Ok(serde_json::Number::from_f64(n)
            .map_or_else(|| Value::String(s.to_string()), Value::Number));
    }
    Ok(Value::String(s.to_string()))
}

fn parse_view(s: &str) -> Result<ViewKind, String> {
    match s.to_lowercase().as_str() {
        "documents" => Ok(ViewKind::Documents),
        "annotations" => Ok(ViewKind::Annotations),
        "memos" => Ok(ViewKind::Memos),
        "tags" => Ok(ViewKind::Tags),
        _ => Err(format!(
            "Unknown view '{s}'. Expected documents, annotations, memos, or tags."
        )),
    }
}

fn parse_kind(s: &str) -> Result<OperatorKind, String> {
    match s.to_lowercase().as_str() {
        "string" => Ok(OperatorKind::String),
        "number" => Ok(OperatorKind::Number),
        "date" => Ok(OperatorKind::Date),
        "id_list" => Ok(OperatorKind::IdList),
        "list" => Ok(OperatorKind::List),
        "boolean" => Ok(OperatorKind::Boolean),
        _ => Err(format!(
            "Unknown value kind '{s}'. Expected string, number, date, id_list, list, or boolean."
        )),
    }
}

fn parse_limit(tokens: &[String], offset: usize) -> Result<Option<usize>, String> {
    if tokens.len() <= offset {
        return Ok(None);
    }
    if tokens[offset].to_uppercase() != "LIMIT" {
        return Err(format!("Unexpected token '{}'", tokens[offset]));
    }
    if tokens.len() < offset + 2 {
        return Err("LIMIT requires a number".to_string());
    }
    let n = tokens[offset + 1]
        .parse::<usize>()
        .map_err(|_| format!("Invalid LIMIT value '{}'", tokens[offset + 1]))?;
    if tokens.len() > offset + 2 {
        return Err(format!("Unexpected token '{}'", tokens[offset + 2]));
    }
    Ok(Some(n))
}

/// Parse an input line into a [`Command`].
pub fn parse(input: &str) -> Result<Command, String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("Empty command".to_string());
    }

    let first = tokens[0].to_uppercase();
    match first.as_str() {
        "PING" => expect_len(&tokens, 1).map(|()| Command::Ping),
        "CREATE" => parse_create(&tokens),
        "USE" => parse_use(&tokens),
        "VIEW" => parse_view_cmd(&tokens),
        "DEFINE" => parse_define(&tokens),
        "METADATA" => expect_len(&tokens, 1).map(|()| Command::Metadata),
        "PUT" => parse_put(&tokens),
        "SHOW" => parse_show(&tokens),
        "COLUMNS" => expect_len(&tokens, 1).map(|()| Command::Columns),
        "OPS" => parse_ops(&tokens),
        "FILTER" => parse_filter(&tokens),
        "EDIT" => parse_edit(&tokens),
        "ADD" => parse_add(&tokens),
        "SET" => parse_set(&tokens),
        "DELETE" => parse_delete(&tokens),
        "COMMIT" => expect_len(&tokens, 1).map(|()| Command::Commit),
        "CANCEL" => expect_len(&tokens, 1).map(|()| Command::Cancel),
        "RESET" => expect_len(&tokens, 1).map(|()| Command::Reset),
        "EXPERT" => parse_expert(&tokens),
        "RAW" => parse_raw(&tokens),
        "SEARCH" => Ok(Command::Search {
            limit: parse_limit(&tokens, 1)?,
        }),
        "FREQ" => Ok(Command::Freq {
            limit: parse_limit(&tokens, 1)?,
        }),
        "TIMELINE" => parse_timeline(&tokens),
        "HELP" => {
            let topic = if tokens.len() > 1 {
                Some(tokens[1..].join(" "))
            } else {
                None
            };
            Ok(Command::Help(topic))
        }
        "EXIT" | "QUIT" => Ok(Command::Exit),
        _ => Err(format!("Unknown command '{}'", tokens[0])),
    }
}

fn expect_len(tokens: &[String], len: usize) -> Result<(), String> {
    if tokens.len() > len {
        return Err(format!("Unexpected token '{}'", tokens[len]));
    }
    Ok(())
}

/// CREATE PROJECT <name>
fn parse_create(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 3 || tokens[1].to_uppercase() != "PROJECT" {
        return Err("Usage: CREATE PROJECT <name>".to_string());
    }
    Ok(Command::CreateProject {
        name: strip_quotes(&tokens[2]),
    })
}

/// USE <project>
fn parse_use(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 2 {
        return Err("Usage: USE <project>".to_string());
    }
    Ok(Command::Use {
        project: strip_quotes(&tokens[1]),
    })
}

/// VIEW <documents|annotations|memos|tags>
fn parse_view_cmd(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 2 {
        return Err("Usage: VIEW <documents|annotations|memos|tags>".to_string());
    }
    Ok(Command::View {
        view: parse_view(&tokens[1])?,
    })
}

/// DEFINE METADATA <document_type> <key> <kind>
fn parse_define(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 5 || tokens[1].to_uppercase() != "METADATA" {
        return Err(
            "Usage: DEFINE METADATA <document_type> <key> <string|number|date|id_list|list|boolean>"
                .to_string(),
        );
    }
    Ok(Command::DefineMetadata {
        document_type: strip_quotes(&tokens[2]),
        key: strip_quotes(&tokens[3]),
        value_kind: parse_kind(&tokens[4])?,
    })
}

/// PUT {json}
fn parse_put(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 2 || !tokens[1].starts_with('{') {
        return Err("Usage: PUT {json}".to_string());
    }
    let record: Value =
        serde_json::from_str(&tokens[1]).map_err(|e| format!("Invalid JSON: {e}"))?;
    Ok(Command::Put { record })
}

/// SHOW [DRAFT]
fn parse_show(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 2 {
        return Ok(Command::Show);
    }
    if tokens[1].to_uppercase() == "DRAFT" {
        return Ok(Command::ShowDraft);
    }
    Err(format!("Unexpected token '{}' in SHOW", tokens[1]))
}

/// OPS <node-id>
fn parse_ops(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 2 {
        return Err("Usage: OPS <node-id>".to_string());
    }
    Ok(Command::Ops {
        node: tokens[1].clone(),
    })
}

/// FILTER TAG <id> <title> | FILTER NAME <name> | FILTER KEYWORD <word>
fn parse_filter(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 3 {
        return Err(
            "Usage: FILTER TAG <id> <title> | FILTER NAME <name> | FILTER KEYWORD <word>"
                .to_string(),
        );
    }
    match tokens[1].to_uppercase().as_str() {
        "TAG" => {
            if tokens.len() < 4 {
                return Err("Usage: FILTER TAG <id> <title>".to_string());
            }
            let tag_id = tokens[2]
                .parse::<u64>()
                .map_err(|_| format!("Invalid tag id '{}'", tokens[2]))?;
            Ok(Command::FilterTag {
                tag_id,
                title: strip_quotes(&tokens[3]),
            })
        }
        "NAME" => Ok(Command::FilterName {
            name: strip_quotes(&tokens[2]),
        }),
        "KEYWORD" => Ok(Command::FilterKeyword {
            keyword: strip_quotes(&tokens[2]),
        }),
        other => Err(format!(
            "Expected TAG, NAME, or KEYWORD after FILTER, got '{other}'"
        )),
    }
}

/// EDIT [group-id]
fn parse_edit(tokens: &[String]) -> Result<Command, String> {
    expect_len(tokens, 2)?;
    Ok(Command::Edit {
        group: tokens.get(1).cloned(),
    })
}

/// ADD GROUP [parent-id] | ADD RULE [parent-id]
fn parse_add(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 2 {
        return Err("Usage: ADD GROUP [parent-id] | ADD RULE [parent-id]".to_string());
    }
    expect_len(tokens, 3)?;
    let parent = tokens.get(2).cloned();
    match tokens[1].to_uppercase().as_str() {
        "GROUP" => Ok(Command::AddGroup { parent }),
        "RULE" => Ok(Command::AddRule { parent }),
        other => Err(format!("Expected GROUP or RULE after ADD, got '{other}'")),
    }
}

/// SET LOGIC <group> <and|or> | SET COLUMN <node> <code>|METADATA <id>
/// | SET OP <node> <operator> | SET VALUE <node> <value>
fn parse_set(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 4 {
        return Err(
            "Usage: SET LOGIC <group> <and|or> | SET COLUMN <node> <column> | SET OP <node> <operator> | SET VALUE <node> <value>"
                .to_string(),
        );
    }
    let node = tokens[2].clone();
    match tokens[1].to_uppercase().as_str() {
        "LOGIC" => {
            expect_len(tokens, 4)?;
            let operator = match tokens[3].to_lowercase().as_str() {
                "and" => LogicOperator::And,
                "or" => LogicOperator::Or,
                other => return Err(format!("Expected and|or, got '{other}'")),
            };
            Ok(Command::SetLogic {
                group: node,
                operator,
            })
        }
        "COLUMN" => {
            let column = if tokens[3].to_uppercase() == "METADATA" {
                if tokens.len() < 5 {
                    return Err("Usage: SET COLUMN <node> METADATA <field-id>".to_string());
                }
                expect_len(tokens, 5)?;
                let id = tokens[4]
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid metadata field id '{}'", tokens[4]))?;
                ColumnTarget::Metadata(id)
            } else {
                expect_len(tokens, 4)?;
                ColumnTarget::Code(tokens[3].to_uppercase())
            };
            Ok(Command::SetColumn { node, column })
        }
        "OP" => {
            expect_len(tokens, 4)?;
            let operator = FilterOperator::from_code(&tokens[3].to_lowercase())
                .map_err(|_| format!("Unknown operator '{}'", tokens[3]))?;
            Ok(Command::SetOp { node, operator })
        }
        "VALUE" => {
            expect_len(tokens, 4)?;
            Ok(Command::SetValue {
                node,
                value: parse_value_token(&tokens[3])?,
            })
        }
        other => Err(format!(
            "Expected LOGIC, COLUMN, OP, or VALUE after SET, got '{other}'"
        )),
    }
}

/// DELETE <node-id>
fn parse_delete(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 2 {
        return Err("Usage: DELETE <node-id>".to_string());
    }
    expect_len(tokens, 2)?;
    Ok(Command::Delete {
        node: tokens[1].clone(),
    })
}

/// EXPERT <on|off>
fn parse_expert(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 2 {
        return Err("Usage: EXPERT <on|off>".to_string());
    }
    expect_len(tokens, 2)?;
    let on = match tokens[1].to_lowercase().as_str() {
        "on" => true,
        "off" => false,
        other => return Err(format!("Expected on|off, got '{other}'")),
    };
    Ok(Command::Expert { on })
}

/// RAW {json}
fn parse_raw(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 2 || !tokens[1].starts_with('{') {
        return Err("Usage: RAW {filter-tree-json}".to_string());
    }
    expect_len(tokens, 2)?;
    Ok(Command::Raw {
        payload: tokens[1].clone(),
    })
}

/// TIMELINE [MONTH|YEAR]
fn parse_timeline(tokens: &[String]) -> Result<Command, String> {
    expect_len(tokens, 2)?;
    let granularity = match tokens.get(1) {
        None => None,
        Some(t) => match t.to_lowercase().as_str() {
            "month" => Some(Granularity::Month),
            "year" => Some(Granularity::Year),
            other => return Err(format!("Expected MONTH or YEAR, got '{other}'")),
        },
    };
    Ok(Command::Timeline { granularity })
}
