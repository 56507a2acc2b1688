//! Search service and client library for committed filter trees.
//!
//! Runs the in-memory project store as a local Unix socket server: list/table
//! views send their committed filter tree verbatim as part of a JSON-line
//! request and receive the matching records, word-frequency tables, or
//! timeline buckets. The typed client is shared by the console and the
//! integration tests.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;
pub mod store;

pub use client::VellumClient;
pub use error::ClientError;
pub use server::VellumServer;
pub use store::Store;
