//! LSP transport layer for veld-lsp.
//!
//! Implements Content-Length based message framing over any buffered
//! stream, per the LSP Base Protocol. The reader enforces hard limits on
//! header and body size and reports framing violations as recoverable
//! protocol errors without losing stream synchronization.

#![deny(unsafe_code)]

mod framing;

pub use framing::{
    read_message, write_error, write_message, write_notification, ReadOutcome, MAX_BODY_BYTES,
    MAX_HEADER_BYTES, MAX_HEADER_LINES,
};
