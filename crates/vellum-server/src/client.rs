//! Client library for connecting to a `vellum-server` via Unix socket.
//!
//! Each method serializes a JSON-line request, sends it, reads a JSON-line
//! response, and returns the parsed result. Filters are passed as committed
//! `Group` trees and serialized verbatim into the request body.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

use vellum_core::{
    AnnotationColumn, DocumentColumn, Group, MemoColumn, MetadataDescriptor, MetadataId,
    OperatorKind, TagColumn,
};

use crate::error::ClientError;
use crate::protocol::ErrorResponse;
use crate::store::{Granularity, TimelineBucket, WordCount};

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Document fields for `add_document`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DocumentInput {
    pub name: String,
    pub content: String,
    pub tags: Vec<u64>,
    pub keywords: Vec<String>,
    pub created: String,
    pub starred: bool,
    pub metadata: HashMap<MetadataId, Value>,
}

/// Annotation fields for `add_annotation`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnnotationInput {
    pub document_id: u64,
    pub excerpt: String,
    pub note: String,
    pub author: String,
    pub tags: Vec<u64>,
    pub created: String,
}

/// Memo fields for `add_memo`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemoInput {
    pub title: String,
    pub body: String,
    pub author: String,
    pub created: String,
    pub starred: bool,
}

/// Client for a vellum search service.
pub struct VellumClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    line_buf: String,
}

impl VellumClient {
    /// Connect to a server at the given Unix socket path.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let stream = UnixStream::connect(path.as_ref()).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            line_buf: String::new(),
        })
    }

    /// Liveness check.
    pub async fn ping(&mut self) -> Result<()> {
        let req = serde_json::json!({"op": "ping"});
        let resp = self.send_request(&req).await?;
        check_ok(&resp)
    }

    /// Create a project.
    pub async fn create_project(&mut self, project: &str) -> Result<()> {
        let req = serde_json::json!({
            "op": "create_project",
            "project": project,
        });
        let resp = self.send_request(&req).await?;
        check_ok(&resp)
    }

    /// Register a metadata field, returning its store-assigned id.
    pub async fn define_metadata_field(
        &mut self,
        project: &str,
        document_type: &str,
        key: &str,
        value_kind: OperatorKind,
    ) -> Result<MetadataId> {
        let req = serde_json::json!({
            "op": "define_metadata_field",
            "project": project,
            "document_type": document_type,
            "key": key,
            "value_kind": to_json(&value_kind)?,
        });
        let resp = self.send_request(&req).await?;
        id_from_response(&resp)
    }

    /// Fetch the project's metadata field descriptors (the session
    /// initialization input).
    pub async fn project_metadata(&mut self, project: &str) -> Result<Vec<MetadataDescriptor>> {
        let req = serde_json::json!({
            "op": "project_metadata",
            "project": project,
        });
        let resp = self.send_request(&req).await?;
        metadata_from_response(&resp)
    }

    /// Ingest a document, returning its id.
    pub async fn add_document(&mut self, project: &str, doc: &DocumentInput) -> Result<u64> {
        let req = serde_json::json!({
            "op": "add_document",
            "project": project,
            "name": doc.name,
            "content": doc.content,
            "tags": doc.tags,
            "keywords": doc.keywords,
            "created": doc.created,
            "starred": doc.starred,
            "metadata": to_json(&doc.metadata)?,
        });
        let resp = self.send_request(&req).await?;
        id_from_response(&resp)
    }

    /// Ingest an annotation, returning its id.
    pub async fn add_annotation(
        &mut self,
        project: &str,
        annotation: &AnnotationInput,
    ) -> Result<u64> {
        let req = serde_json::json!({
            "op": "add_annotation",
            "project": project,
            "document_id": annotation.document_id,
            "excerpt": annotation.excerpt,
            "note": annotation.note,
            "author": annotation.author,
            "tags": annotation.tags,
            "created": annotation.created,
        });
        let resp = self.send_request(&req).await?;
        id_from_response(&resp)
    }

    /// Ingest a memo, returning its id.
    pub async fn add_memo(&mut self, project: &str, memo: &MemoInput) -> Result<u64> {
        let req = serde_json::json!({
            "op": "add_memo",
            "project": project,
            "title": memo.title,
            "body": memo.body,
            "author": memo.author,
            "created": memo.created,
            "starred": memo.starred,
        });
        let resp = self.send_request(&req).await?;
        id_from_response(&resp)
    }

    /// Create a tag, returning its id.
    pub async fn add_tag(&mut self, project: &str, title: &str, created: &str) -> Result<u64> {
        let req = serde_json::json!({
            "op": "add_tag",
            "project": project,
            "title": title,
            "created": created,
        });
        let resp = self.send_request(&req).await?;
        id_from_response(&resp)
    }

    /// Search documents with an optional committed filter tree.
    pub async fn search_documents(
        &mut self,
        project: &str,
        filter: Option<&Group<DocumentColumn>>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        self.search("search_documents", project, filter, limit).await
    }

    /// Search annotations with an optional committed filter tree.
    pub async fn search_annotations(
        &mut self,
        project: &str,
        filter: Option<&Group<AnnotationColumn>>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        self.search("search_annotations", project, filter, limit)
            .await
    }

    /// Search memos with an optional committed filter tree.
    pub async fn search_memos(
        &mut self,
        project: &str,
        filter: Option<&Group<MemoColumn>>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        self.search("search_memos", project, filter, limit).await
    }

    /// Search tags with an optional committed filter tree.
    pub async fn search_tags(
        &mut self,
        project: &str,
        filter: Option<&Group<TagColumn>>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        self.search("search_tags", project, filter, limit).await
    }

    /// Word-frequency table over matching documents.
    pub async fn word_frequency(
        &mut self,
        project: &str,
        filter: Option<&Group<DocumentColumn>>,
        limit: Option<usize>,
    ) -> Result<Vec<WordCount>> {
        let mut req = serde_json::json!({
            "op": "word_frequency",
            "project": project,
        });
        insert_filter(&mut req, filter)?;
        insert_limit(&mut req, limit);
        let resp = self.send_request(&req).await?;
        words_from_response(&resp)
    }

    /// Timeline buckets over matching documents.
    pub async fn timeline(
        &mut self,
        project: &str,
        filter: Option<&Group<DocumentColumn>>,
        granularity: Option<Granularity>,
    ) -> Result<Vec<TimelineBucket>> {
        let mut req = serde_json::json!({
            "op": "timeline",
            "project": project,
        });
        insert_filter(&mut req, filter)?;
        if let Some(g) = granularity {
            insert_field(&mut req, "granularity", to_json(&g)?);
        }
        let resp = self.send_request(&req).await?;
        buckets_from_response(&resp)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    async fn search<C: vellum_core::FilterColumn>(
        &mut self,
        op: &str,
        project: &str,
        filter: Option<&Group<C>>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        let mut req = serde_json::json!({
            "op": op,
            "project": project,
        });
        insert_filter(&mut req, filter)?;
        insert_limit(&mut req, limit);
        let resp = self.send_request(&req).await?;
        items_from_response(&resp)
    }

    async fn send_request(&mut self, req: &Value) -> Result<Value> {
        let mut data = serde_json::to_vec(req).map_err(ClientError::Serialization)?;
        data.push(b'\n');
        self.writer.write_all(&data).await?;
        self.writer.flush().await?;

        self.line_buf.clear();
        let n = self.reader.read_line(&mut self.line_buf).await?;
        if n == 0 {
            return Err(ClientError::Disconnected);
        }

        let resp: Value =
            serde_json::from_str(self.line_buf.trim()).map_err(ClientError::Serialization)?;
        Ok(resp)
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(ClientError::Serialization)
}

fn insert_field(req: &mut Value, key: &str, value: Value) {
    if let Some(obj) = req.as_object_mut() {
        obj.insert(key.to_string(), value);
    }
}

fn insert_filter<C: vellum_core::FilterColumn>(
    req: &mut Value,
    filter: Option<&Group<C>>,
) -> Result<()> {
    if let Some(f) = filter {
        insert_field(req, "filter", to_json(f)?);
    }
    Ok(())
}

fn insert_limit(req: &mut Value, limit: Option<usize>) {
    if let Some(n) = limit {
        insert_field(req, "limit", serde_json::json!(n));
    }
}

// ---------------------------------------------------------------------------
// Response parsing helpers
// ---------------------------------------------------------------------------

fn check_error(resp: &Value) -> Result<()> {
    if let Some(err) = resp.get("error") {
        let error = err.as_str().unwrap_or("Unknown").to_string();
        let message = resp
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("")
            .to_string();
        return Err(ClientError::Server(ErrorResponse { error, message }));
    }
    Ok(())
}

fn check_ok(resp: &Value) -> Result<()> {
    check_error(resp)?;
    Ok(())
}

fn id_from_response(resp: &Value) -> Result<u64> {
    check_error(resp)?;
    resp.get("id")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ClientError::Protocol("missing 'id' in response".to_string()))
}

fn items_from_response(resp: &Value) -> Result<Vec<Value>> {
    check_error(resp)?;
    Ok(resp
        .get("items")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default())
}

fn metadata_from_response(resp: &Value) -> Result<Vec<MetadataDescriptor>> {
    check_error(resp)?;
    let fields = resp
        .get("fields")
        .ok_or_else(|| ClientError::Protocol("missing 'fields' in response".to_string()))?;
    serde_json::from_value(fields.clone()).map_err(ClientError::Serialization)
}

fn words_from_response(resp: &Value) -> Result<Vec<WordCount>> {
    check_error(resp)?;
    let words = resp
        .get("words")
        .ok_or_else(|| ClientError::Protocol("missing 'words' in response".to_string()))?;
    serde_json::from_value(words.clone()).map_err(ClientError::Serialization)
}

fn buckets_from_response(resp: &Value) -> Result<Vec<TimelineBucket>> {
    check_error(resp)?;
    let buckets = resp
        .get("buckets")
        .ok_or_else(|| ClientError::Protocol("missing 'buckets' in response".to_string()))?;
    serde_json::from_value(buckets.clone()).map_err(ClientError::Serialization)
}
