//! Wire protocol: JSON-over-newlines request/response types.
//!
//! Each request is a single JSON line tagged by `op`; each response is a
//! single JSON line, an untagged ok/error union. Search requests carry the
//! committed filter tree verbatim, typed to the view's column enumeration —
//! the payload shape is exactly `Group`'s serde representation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vellum_core::{
    AnnotationColumn, DocumentColumn, Group, MemoColumn, MetadataDescriptor, MetadataId,
    OperatorKind, TagColumn,
};

use crate::store::{Granularity, TimelineBucket, WordCount};

/// A request from a client.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Ping,
    CreateProject {
        project: String,
    },
    DefineMetadataField {
        project: String,
        document_type: String,
        key: String,
        value_kind: OperatorKind,
    },
    AddDocument {
        project: String,
        name: String,
        content: String,
        #[serde(default)]
        tags: Vec<u64>,
        #[serde(default)]
        keywords: Vec<String>,
        created: String,
        #[serde(default)]
        starred: bool,
        #[serde(default)]
        metadata: HashMap<MetadataId, Value>,
    },
    AddAnnotation {
        project: String,
        document_id: u64,
        excerpt: String,
        note: String,
        author: String,
        #[serde(default)]
        tags: Vec<u64>,
        created: String,
    },
    AddMemo {
        project: String,
        title: String,
        body: String,
        author: String,
        created: String,
        #[serde(default)]
        starred: bool,
    },
    AddTag {
        project: String,
        title: String,
        created: String,
    },
    ProjectMetadata {
        project: String,
    },
    SearchDocuments {
        project: String,
        #[serde(default)]
        filter: Option<Group<DocumentColumn>>,
        #[serde(default)]
        limit: Option<usize>,
    },
    SearchAnnotations {
        project: String,
        #[serde(default)]
        filter: Option<Group<AnnotationColumn>>,
        #[serde(default)]
        limit: Option<usize>,
    },
    SearchMemos {
        project: String,
        #[serde(default)]
        filter: Option<Group<MemoColumn>>,
        #[serde(default)]
        limit: Option<usize>,
    },
    SearchTags {
        project: String,
        #[serde(default)]
        filter: Option<Group<TagColumn>>,
        #[serde(default)]
        limit: Option<usize>,
    },
    WordFrequency {
        project: String,
        #[serde(default)]
        filter: Option<Group<DocumentColumn>>,
        #[serde(default)]
        limit: Option<usize>,
    },
    Timeline {
        project: String,
        #[serde(default)]
        filter: Option<Group<DocumentColumn>>,
        #[serde(default)]
        granularity: Option<Granularity>,
    },
}

/// A response sent back to the client.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ok(OkResponse),
    Error(ErrorResponse),
}

/// Successful response variants.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OkResponse {
    Empty {
        ok: bool,
    },
    Created {
        ok: bool,
        id: u64,
    },
    Metadata {
        ok: bool,
        fields: Vec<MetadataDescriptor>,
    },
    Items {
        ok: bool,
        items: Vec<Value>,
    },
    Words {
        ok: bool,
        words: Vec<WordCount>,
    },
    Buckets {
        ok: bool,
        buckets: Vec<TimelineBucket>,
    },
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl Response {
    pub fn ok_empty() -> Self {
        Response::Ok(OkResponse::Empty { ok: true })
    }

    pub fn ok_created(id: u64) -> Self {
        Response::Ok(OkResponse::Created { ok: true, id })
    }

    pub fn ok_metadata(fields: Vec<MetadataDescriptor>) -> Self {
        Response::Ok(OkResponse::Metadata { ok: true, fields })
    }

    pub fn ok_items(items: Vec<Value>) -> Self {
        Response::Ok(OkResponse::Items { ok: true, items })
    }

    pub fn ok_words(words: Vec<WordCount>) -> Self {
        Response::Ok(OkResponse::Words { ok: true, words })
    }

    pub fn ok_buckets(buckets: Vec<TimelineBucket>) -> Self {
        Response::Ok(OkResponse::Buckets { ok: true, buckets })
    }

    pub fn error(error: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error(ErrorResponse {
            error: error.into(),
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_parses_with_inline_filter() {
        let line = json!({
            "op": "search_documents",
            "project": "study",
            "filter": {
                "id": "root",
                "logic_operator": "and",
                "items": [
                    {"id": "c1", "column": "NAME", "operator": "contains", "value": "interview"}
                ]
            },
            "limit": 5
        })
        .to_string();
        let req: Request = serde_json::from_str(&line).unwrap();
        let Request::SearchDocuments {
            project,
            filter,
            limit,
        } = req
        else {
            panic!("expected search_documents");
        };
        assert_eq!(project, "study");
        assert_eq!(limit, Some(5));
        assert_eq!(filter.unwrap().items.len(), 1);
    }

    #[test]
    fn test_optional_fields_default() {
        let line = json!({
            "op": "add_document",
            "project": "study",
            "name": "a.txt",
            "content": "text",
            "created": "2023-01-01"
        })
        .to_string();
        let req: Request = serde_json::from_str(&line).unwrap();
        let Request::AddDocument {
            tags,
            keywords,
            starred,
            metadata,
            ..
        } = req
        else {
            panic!("expected add_document");
        };
        assert!(tags.is_empty());
        assert!(keywords.is_empty());
        assert!(!starred);
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_error_response_shape() {
        let resp = Response::error("ProjectNotFound", "project not found: x");
        let wire = serde_json::to_value(&resp).unwrap();
        assert_eq!(wire["error"], "ProjectNotFound");
        assert!(wire.get("ok").is_none());
    }

    #[test]
    fn test_ok_response_carries_flag() {
        let wire = serde_json::to_value(Response::ok_created(3)).unwrap();
        assert_eq!(wire, json!({"ok": true, "id": 3}));
    }

    #[test]
    fn test_granularity_codes() {
        let req: Request = serde_json::from_str(
            &json!({"op": "timeline", "project": "study", "granularity": "year"}).to_string(),
        )
        .unwrap();
        let Request::Timeline { granularity, .. } = req else {
            panic!("expected timeline");
        };
        assert_eq!(granularity, Some(Granularity::Year));
    }
}
