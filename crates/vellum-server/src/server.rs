//! Unix domain socket server wrapping the project [`Store`].
//!
//! Each connected client sends JSON-line requests and receives JSON-line
//! responses. Request handling never propagates an error to the process
//! level: every failure becomes an error response on the wire.

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use crate::protocol::{Request, Response};
use crate::store::{NewAnnotation, NewDocument, NewMemo, Store, StoreError};

/// A search service listening on a Unix socket.
pub struct VellumServer {
    store: Store,
    socket_path: PathBuf,
}

impl VellumServer {
    pub fn new(store: Store, socket_path: PathBuf) -> Self {
        Self { store, socket_path }
    }

    /// Run the server, accepting connections until a shutdown signal is received.
    ///
    /// On startup, removes any stale socket file and binds a new one.
    /// On shutdown (SIGINT or SIGTERM), removes the socket file before exiting.
    pub async fn run(&self) -> std::io::Result<()> {
        // Remove stale socket file if it exists.
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        info!(path = %self.socket_path.display(), "server listening");

        let accept_loop = async {
            loop {
                match listener.accept().await {
                    Ok((stream, _addr)) => {
                        let store = self.store.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(store, stream).await {
                                warn!(error = %e, "connection handler error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept error");
                    }
                }
            }
        };

        // Wait for either the accept loop (runs forever) or a shutdown signal.
        tokio::select! {
            _ = accept_loop => {}
            _ = shutdown_signal() => {
                info!("shutdown signal received");
            }
        }

        // Clean up the socket file.
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(error = %e, "failed to remove socket file on shutdown");
            } else {
                info!(path = %self.socket_path.display(), "socket file removed");
            }
        }

        Ok(())
    }
}

async fn handle_connection(store: Store, stream: tokio::net::UnixStream) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            // Client disconnected.
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(trimmed) {
            Ok(req) => {
                debug!(op = request_op(&req), "handling request");
                dispatch(&store, req)
            }
            Err(e) => Response::error("ParseError", e.to_string()),
        };

        let mut resp_bytes = serde_json::to_vec(&response).unwrap_or_else(|e| {
            let fallback = Response::error("SerializationError", e.to_string());
            serde_json::to_vec(&fallback).unwrap_or_default()
        });
        resp_bytes.push(b'\n');

        writer.write_all(&resp_bytes).await?;
        writer.flush().await?;
    }

    Ok(())
}

fn request_op(req: &Request) -> &'static str {
    match req {
        Request::Ping => "ping",
        Request::CreateProject { .. } => "create_project",
        Request::DefineMetadataField { .. } => "define_metadata_field",
        Request::AddDocument { .. } => "add_document",
        Request::AddAnnotation { .. } => "add_annotation",
        Request::AddMemo { .. } => "add_memo",
        Request::AddTag { .. } => "add_tag",
        Request::ProjectMetadata { .. } => "project_metadata",
        Request::SearchDocuments { .. } => "search_documents",
        Request::SearchAnnotations { .. } => "search_annotations",
        Request::SearchMemos { .. } => "search_memos",
        Request::SearchTags { .. } => "search_tags",
        Request::WordFrequency { .. } => "word_frequency",
        Request::Timeline { .. } => "timeline",
    }
}

fn dispatch(store: &Store, req: Request) -> Response {
    match req {
        Request::Ping => Response::ok_empty(),

        Request::CreateProject { project } => match store.create_project(&project) {
            Ok(()) => Response::ok_empty(),
            Err(e) => store_error_to_response(e),
        },

        Request::DefineMetadataField {
            project,
            document_type,
            key,
            value_kind,
        } => match store.define_metadata_field(&project, &document_type, &key, value_kind) {
            Ok(descriptor) => Response::ok_created(descriptor.id),
            Err(e) => store_error_to_response(e),
        },

        Request::AddDocument {
            project,
            name,
            content,
            tags,
            keywords,
            created,
            starred,
            metadata,
        } => {
            let new = NewDocument {
                name,
                content,
                tags,
                keywords,
                created,
                starred,
                metadata,
            };
            match store.add_document(&project, new) {
                Ok(id) => Response::ok_created(id),
                Err(e) => store_error_to_response(e),
            }
        }

        Request::AddAnnotation {
            project,
            document_id,
            excerpt,
            note,
            author,
            tags,
            created,
        } => {
            let new = NewAnnotation {
                document_id,
                excerpt,
                note,
                author,
                tags,
                created,
            };
            match store.add_annotation(&project, new) {
                Ok(id) => Response::ok_created(id),
                Err(e) => store_error_to_response(e),
            }
        }

        Request::AddMemo {
            project,
            title,
            body,
            author,
            created,
            starred,
        } => {
            let new = NewMemo {
                title,
                body,
                author,
                created,
                starred,
            };
            match store.add_memo(&project, new) {
                Ok(id) => Response::ok_created(id),
                Err(e) => store_error_to_response(e),
            }
        }

        Request::AddTag {
            project,
            title,
            created,
        } => match store.add_tag(&project, &title, &created) {
            Ok(id) => Response::ok_created(id),
            Err(e) => store_error_to_response(e),
        },

        Request::ProjectMetadata { project } => match store.project_metadata(&project) {
            Ok(fields) => Response::ok_metadata(fields),
            Err(e) => store_error_to_response(e),
        },

        Request::SearchDocuments {
            project,
            filter,
            limit,
        } => match store.search_documents(&project, filter.as_ref(), limit) {
            Ok(docs) => items_response(&docs),
            Err(e) => store_error_to_response(e),
        },

        Request::SearchAnnotations {
            project,
            filter,
            limit,
        } => match store.search_annotations(&project, filter.as_ref(), limit) {
            Ok(annotations) => items_response(&annotations),
            Err(e) => store_error_to_response(e),
        },

        Request::SearchMemos {
            project,
            filter,
            limit,
        } => match store.search_memos(&project, filter.as_ref(), limit) {
            Ok(memos) => items_response(&memos),
            Err(e) => store_error_to_response(e),
        },

        Request::SearchTags {
            project,
            filter,
            limit,
        } => match store.search_tags(&project, filter.as_ref(), limit) {
            Ok(tags) => items_response(&tags),
            Err(e) => store_error_to_response(e),
        },

        Request::WordFrequency {
            project,
            filter,
            limit,
        } => match store.word_frequency(&project, filter.as_ref(), limit) {
            Ok(words) => Response::ok_words(words),
            Err(e) => store_error_to_response(e),
        },

        Request::Timeline {
            project,
            filter,
            granularity,
        } => match store.timeline(&project, filter.as_ref(), granularity.unwrap_or_default()) {
            Ok(buckets) => Response::ok_buckets(buckets),
            Err(e) => store_error_to_response(e),
        },
    }
}

fn items_response<T: serde::Serialize>(records: &[T]) -> Response {
    let mut items = Vec::with_capacity(records.len());
    for record in records {
        match serde_json::to_value(record) {
            Ok(v) => items.push(v),
            Err(e) => return Response::error("SerializationError", e.to_string()),
        }
    }
    Response::ok_items(items)
}

fn store_error_to_response(err: StoreError) -> Response {
    match &err {
        StoreError::ProjectNotFound(_) => Response::error("ProjectNotFound", err.to_string()),
        StoreError::ProjectExists(_) => Response::error("ProjectExists", err.to_string()),
        StoreError::DocumentNotFound(_) => Response::error("DocumentNotFound", err.to_string()),
    }
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
