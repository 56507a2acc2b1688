//! In-memory multi-project store and the search operations over it.
//!
//! Each project holds its metadata field descriptors and four record
//! collections (documents, annotations, memos, tags) with store-assigned
//! sequential ids. Search filters records through `vellum_core::eval`
//! against the committed tree the client sends; results keep insertion
//! order.
//!
//! Reads are concurrent, writes serialized, via an internal
//! `parking_lot::RwLock` — the store clones cheaply and is shared across
//! connection tasks.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vellum_core::{
    eval, AnnotationColumn, DocumentColumn, FieldValue, FilterColumn, Filterable, Group,
    MemoColumn, MetadataDescriptor, MetadataId, OperatorKind, TagColumn,
};

/// Errors for operations against the project store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("project already exists: {0}")]
    ProjectExists(String),

    #[error("document not found: {0}")]
    DocumentNotFound(u64),
}

pub type Result<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    pub name: String,
    pub content: String,
    pub tags: Vec<u64>,
    pub keywords: Vec<String>,
    /// Derived from `content` at ingest.
    pub word_count: u64,
    pub created: String,
    pub starred: bool,
    pub metadata: HashMap<MetadataId, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: u64,
    pub document_id: u64,
    pub excerpt: String,
    pub note: String,
    pub author: String,
    pub tags: Vec<u64>,
    pub created: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memo {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub created: String,
    pub starred: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub title: String,
    pub created: String,
}

/// Fields of a document as supplied by the client; id and word count are
/// store-assigned.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub content: String,
    pub tags: Vec<u64>,
    pub keywords: Vec<String>,
    pub created: String,
    pub starred: bool,
    pub metadata: HashMap<MetadataId, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewAnnotation {
    pub document_id: u64,
    pub excerpt: String,
    pub note: String,
    pub author: String,
    pub tags: Vec<u64>,
    pub created: String,
}

#[derive(Debug, Clone)]
pub struct NewMemo {
    pub title: String,
    pub body: String,
    pub author: String,
    pub created: String,
    pub starred: bool,
}

// ---------------------------------------------------------------------------
// Filterable views
// ---------------------------------------------------------------------------

impl Filterable<DocumentColumn> for Document {
    fn field(&self, column: DocumentColumn) -> FieldValue<'_> {
        match column {
            DocumentColumn::Name => FieldValue::Text(&self.name),
            DocumentColumn::Content => FieldValue::Text(&self.content),
            DocumentColumn::Tags => FieldValue::Ids(&self.tags),
            DocumentColumn::Keywords => FieldValue::Texts(&self.keywords),
            DocumentColumn::WordCount => FieldValue::Number(self.word_count as f64),
            DocumentColumn::Created => FieldValue::Text(&self.created),
            DocumentColumn::Starred => FieldValue::Bool(self.starred),
        }
    }

    fn metadata(&self, id: MetadataId) -> Option<FieldValue<'_>> {
        self.metadata.get(&id).map(FieldValue::from_json)
    }
}

impl Filterable<AnnotationColumn> for Annotation {
    fn field(&self, column: AnnotationColumn) -> FieldValue<'_> {
        match column {
            AnnotationColumn::Excerpt => FieldValue::Text(&self.excerpt),
            AnnotationColumn::Note => FieldValue::Text(&self.note),
            AnnotationColumn::Author => FieldValue::Text(&self.author),
            AnnotationColumn::Tags => FieldValue::Ids(&self.tags),
            AnnotationColumn::Created => FieldValue::Text(&self.created),
        }
    }

    fn metadata(&self, _id: MetadataId) -> Option<FieldValue<'_>> {
        None
    }
}

impl Filterable<MemoColumn> for Memo {
    fn field(&self, column: MemoColumn) -> FieldValue<'_> {
        match column {
            MemoColumn::Title => FieldValue::Text(&self.title),
            MemoColumn::Body => FieldValue::Text(&self.body),
            MemoColumn::Author => FieldValue::Text(&self.author),
            MemoColumn::Created => FieldValue::Text(&self.created),
            MemoColumn::Starred => FieldValue::Bool(self.starred),
        }
    }

    fn metadata(&self, _id: MetadataId) -> Option<FieldValue<'_>> {
        None
    }
}

impl Filterable<TagColumn> for Tag {
    fn field(&self, column: TagColumn) -> FieldValue<'_> {
        match column {
            TagColumn::Title => FieldValue::Text(&self.title),
            TagColumn::Created => FieldValue::Text(&self.created),
        }
    }

    fn metadata(&self, _id: MetadataId) -> Option<FieldValue<'_>> {
        None
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Project {
    metadata_fields: Vec<MetadataDescriptor>,
    documents: Vec<Document>,
    annotations: Vec<Annotation>,
    memos: Vec<Memo>,
    tags: Vec<Tag>,
    next_field_id: MetadataId,
    next_record_id: u64,
}

impl Project {
    fn next_field_id(&mut self) -> MetadataId {
        self.next_field_id += 1;
        self.next_field_id
    }

    fn next_record_id(&mut self) -> u64 {
        self.next_record_id += 1;
        self.next_record_id
    }
}

/// The shared project store. Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<HashMap<String, Project>>>,
}

/// One row of a word-frequency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

/// One bucket of a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineBucket {
    pub bucket: String,
    pub count: u64,
}

/// Timeline bucketing granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Month,
    Year,
}

const DEFAULT_WORD_LIMIT: usize = 20;

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    pub fn create_project(&self, name: &str) -> Result<()> {
        let mut projects = self.inner.write();
        if projects.contains_key(name) {
            return Err(StoreError::ProjectExists(name.to_string()));
        }
        projects.insert(name.to_string(), Project::default());
        Ok(())
    }

    /// Register a metadata field on a project, returning its descriptor.
    pub fn define_metadata_field(
        &self,
        project: &str,
        document_type: &str,
        key: &str,
        value_kind: OperatorKind,
    ) -> Result<MetadataDescriptor> {
        let mut projects = self.inner.write();
        let project = get_mut(&mut projects, project)?;
        let descriptor = MetadataDescriptor {
            id: project.next_field_id(),
            document_type: document_type.to_string(),
            key: key.to_string(),
            value_kind,
        };
        project.metadata_fields.push(descriptor.clone());
        Ok(descriptor)
    }

    pub fn project_metadata(&self, project: &str) -> Result<Vec<MetadataDescriptor>> {
        let projects = self.inner.read();
        Ok(get(&projects, project)?.metadata_fields.clone())
    }

    pub fn add_document(&self, project: &str, new: NewDocument) -> Result<u64> {
        let mut projects = self.inner.write();
        let project = get_mut(&mut projects, project)?;
        let id = project.next_record_id();
        let word_count = new.content.split_whitespace().count() as u64;
        project.documents.push(Document {
            id,
            name: new.name,
            content: new.content,
            tags: new.tags,
            keywords: new.keywords,
            word_count,
            created: new.created,
            starred: new.starred,
            metadata: new.metadata,
        });
        Ok(id)
    }

    pub fn add_annotation(&self, project: &str, new: NewAnnotation) -> Result<u64> {
        let mut projects = self.inner.write();
        let project = get_mut(&mut projects, project)?;
        if !project.documents.iter().any(|d| d.id == new.document_id) {
            return Err(StoreError::DocumentNotFound(new.document_id));
        }
        let id = project.next_record_id();
        project.annotations.push(Annotation {
            id,
            document_id: new.document_id,
            excerpt: new.excerpt,
            note: new.note,
            author: new.author,
            tags: new.tags,
            created: new.created,
        });
        Ok(id)
    }

    pub fn add_memo(&self, project: &str, new: NewMemo) -> Result<u64> {
        let mut projects = self.inner.write();
        let project = get_mut(&mut projects, project)?;
        let id = project.next_record_id();
        project.memos.push(Memo {
            id,
            title: new.title,
            body: new.body,
            author: new.author,
            created: new.created,
            starred: new.starred,
        });
        Ok(id)
    }

    pub fn add_tag(&self, project: &str, title: &str, created: &str) -> Result<u64> {
        let mut projects = self.inner.write();
        let project = get_mut(&mut projects, project)?;
        let id = project.next_record_id();
        project.tags.push(Tag {
            id,
            title: title.to_string(),
            created: created.to_string(),
        });
        Ok(id)
    }

    // -- searches -----------------------------------------------------------

    pub fn search_documents(
        &self,
        project: &str,
        filter: Option<&Group<DocumentColumn>>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let projects = self.inner.read();
        Ok(search(&get(&projects, project)?.documents, filter, limit))
    }

    pub fn search_annotations(
        &self,
        project: &str,
        filter: Option<&Group<AnnotationColumn>>,
        limit: Option<usize>,
    ) -> Result<Vec<Annotation>> {
        let projects = self.inner.read();
        Ok(search(&get(&projects, project)?.annotations, filter, limit))
    }

    pub fn search_memos(
        &self,
        project: &str,
        filter: Option<&Group<MemoColumn>>,
        limit: Option<usize>,
    ) -> Result<Vec<Memo>> {
        let projects = self.inner.read();
        Ok(search(&get(&projects, project)?.memos, filter, limit))
    }

    pub fn search_tags(
        &self,
        project: &str,
        filter: Option<&Group<TagColumn>>,
        limit: Option<usize>,
    ) -> Result<Vec<Tag>> {
        let projects = self.inner.read();
        Ok(search(&get(&projects, project)?.tags, filter, limit))
    }

    // -- analysis views -----------------------------------------------------

    /// Word-frequency table over the content of matching documents:
    /// lowercased alphanumeric words, descending by count (ties broken
    /// lexicographically), truncated to `limit` (default 20).
    pub fn word_frequency(
        &self,
        project: &str,
        filter: Option<&Group<DocumentColumn>>,
        limit: Option<usize>,
    ) -> Result<Vec<WordCount>> {
        let projects = self.inner.read();
        let documents = &get(&projects, project)?.documents;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for doc in documents.iter().filter(|d| passes(filter, *d)) {
            for word in tokenize(&doc.content) {
                *counts.entry(word).or_insert(0) += 1;
            }
        }

        let mut table: Vec<WordCount> = counts
            .into_iter()
            .map(|(word, count)| WordCount { word, count })
            .collect();
        table.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
        table.truncate(limit.unwrap_or(DEFAULT_WORD_LIMIT));
        Ok(table)
    }

    /// Bucket matching documents by their `created` calendar month or year,
    /// ascending by bucket. Documents whose `created` is too short to carry
    /// the bucket prefix are skipped.
    pub fn timeline(
        &self,
        project: &str,
        filter: Option<&Group<DocumentColumn>>,
        granularity: Granularity,
    ) -> Result<Vec<TimelineBucket>> {
        let projects = self.inner.read();
        let documents = &get(&projects, project)?.documents;

        let prefix_len = match granularity {
            Granularity::Month => 7,
            Granularity::Year => 4,
        };

        let mut buckets: BTreeMap<String, u64> = BTreeMap::new();
        for doc in documents.iter().filter(|d| passes(filter, *d)) {
            if let Some(bucket) = doc.created.get(..prefix_len) {
                *buckets.entry(bucket.to_string()).or_insert(0) += 1;
            }
        }

        Ok(buckets
            .into_iter()
            .map(|(bucket, count)| TimelineBucket { bucket, count })
            .collect())
    }
}

fn get<'a>(projects: &'a HashMap<String, Project>, name: &str) -> Result<&'a Project> {
    projects
        .get(name)
        .ok_or_else(|| StoreError::ProjectNotFound(name.to_string()))
}

fn get_mut<'a>(projects: &'a mut HashMap<String, Project>, name: &str) -> Result<&'a mut Project> {
    projects
        .get_mut(name)
        .ok_or_else(|| StoreError::ProjectNotFound(name.to_string()))
}

fn passes<C: FilterColumn, R: Filterable<C>>(filter: Option<&Group<C>>, record: &R) -> bool {
    filter.is_none_or(|f| eval::matches(f, record))
}

fn search<C: FilterColumn, R: Filterable<C> + Clone>(
    records: &[R],
    filter: Option<&Group<C>>,
    limit: Option<usize>,
) -> Vec<R> {
    records
        .iter()
        .filter(|r| passes(filter, *r))
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

fn tokenize(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::{Comparison, FilterNode, FilterOperator, FilterValue, NodeId};

    fn store_with_docs() -> Store {
        let store = Store::new();
        store.create_project("study").unwrap();
        store
            .add_document(
                "study",
                NewDocument {
                    name: "interview-01.txt".to_string(),
                    content: "Coping with stress. Stress at work.".to_string(),
                    tags: vec![],
                    keywords: vec!["stress".to_string()],
                    created: "2023-04-15".to_string(),
                    starred: true,
                    metadata: HashMap::new(),
                },
            )
            .unwrap();
        store
            .add_document(
                "study",
                NewDocument {
                    name: "interview-02.txt".to_string(),
                    content: "Recovery and rest.".to_string(),
                    tags: vec![],
                    keywords: vec![],
                    created: "2023-05-02".to_string(),
                    starred: false,
                    metadata: HashMap::new(),
                },
            )
            .unwrap();
        store
    }

    fn starred_filter() -> Group<DocumentColumn> {
        Group {
            id: NodeId::root(),
            logic_operator: vellum_core::LogicOperator::And,
            items: vec![FilterNode::Comparison(Comparison::named(
                DocumentColumn::Starred,
                FilterOperator::IsTrue,
                FilterValue::Bool(true),
            ))],
        }
    }

    // -----------------------------------------------------------------------
    // Projects and ingest
    // -----------------------------------------------------------------------

    #[test]
    fn test_duplicate_project_rejected() {
        let store = Store::new();
        store.create_project("study").unwrap();
        assert!(matches!(
            store.create_project("study"),
            Err(StoreError::ProjectExists(_))
        ));
    }

    #[test]
    fn test_unknown_project_rejected() {
        let store = Store::new();
        assert!(matches!(
            store.search_documents("nope", None, None),
            Err(StoreError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn test_word_count_derived_on_ingest() {
        let store = store_with_docs();
        let docs = store.search_documents("study", None, None).unwrap();
        assert_eq!(docs[0].word_count, 6);
        assert_eq!(docs[1].word_count, 3);
    }

    #[test]
    fn test_record_ids_are_sequential() {
        let store = store_with_docs();
        let docs = store.search_documents("study", None, None).unwrap();
        assert_eq!(docs[0].id, 1);
        assert_eq!(docs[1].id, 2);
    }

    #[test]
    fn test_annotation_requires_document() {
        let store = store_with_docs();
        let result = store.add_annotation(
            "study",
            NewAnnotation {
                document_id: 99,
                excerpt: String::new(),
                note: String::new(),
                author: "rk".to_string(),
                tags: vec![],
                created: "2023-04-16".to_string(),
            },
        );
        assert!(matches!(result, Err(StoreError::DocumentNotFound(99))));
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    #[test]
    fn test_search_filters_and_limits() {
        let store = store_with_docs();

        let all = store.search_documents("study", None, None).unwrap();
        assert_eq!(all.len(), 2);

        let starred = store
            .search_documents("study", Some(&starred_filter()), None)
            .unwrap();
        assert_eq!(starred.len(), 1);
        assert_eq!(starred[0].name, "interview-01.txt");

        let limited = store.search_documents("study", None, Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Word frequency
    // -----------------------------------------------------------------------

    #[test]
    fn test_word_frequency_ordering() {
        let store = store_with_docs();
        let table = store.word_frequency("study", None, None).unwrap();
        // "stress" appears twice; everything else once, ties lexicographic.
        assert_eq!(table[0].word, "stress");
        assert_eq!(table[0].count, 2);
        assert_eq!(table[1].word, "and");
        assert_eq!(table[1].count, 1);
    }

    #[test]
    fn test_word_frequency_respects_filter_and_limit() {
        let store = store_with_docs();
        let table = store
            .word_frequency("study", Some(&starred_filter()), Some(2))
            .unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.iter().all(|w| w.word != "recovery"));
    }

    // -----------------------------------------------------------------------
    // Timeline
    // -----------------------------------------------------------------------

    #[test]
    fn test_timeline_by_month_and_year() {
        let store = store_with_docs();

        let months = store
            .timeline("study", None, Granularity::Month)
            .unwrap();
        assert_eq!(
            months,
            vec![
                TimelineBucket {
                    bucket: "2023-04".to_string(),
                    count: 1
                },
                TimelineBucket {
                    bucket: "2023-05".to_string(),
                    count: 1
                },
            ]
        );

        let years = store.timeline("study", None, Granularity::Year).unwrap();
        assert_eq!(
            years,
            vec![TimelineBucket {
                bucket: "2023".to_string(),
                count: 2
            }]
        );
    }
}
