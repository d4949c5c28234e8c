#![deny(missing_docs)]

//! Core library for the docqa document question-answering service and its client.

/// HTTP routing and REST handlers.
pub mod api;
/// Interactive terminal client.
pub mod client;
/// Answer generation client abstraction and adapters.
pub mod completion;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// PDF text extraction.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Service counters.
pub mod metrics;
/// Document processing pipeline utilities.
pub mod processing;
/// Metadata and raw upload persistence.
pub mod storage;
/// Per-document vector indexes.
pub mod vector;
