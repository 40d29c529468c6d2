//! Veld Language Server runtime.
//!
//! Reads JSON-RPC messages over stdio with Content-Length framing,
//! maintains per-document analyses (tokens, AST, symbols) plus a
//! workspace-wide declaration index, and serves the LSP feature set:
//! diagnostics, hover, navigation, references, symbols, highlights,
//! folding, rename, completion, signature help, inlay hints, semantic
//! tokens, formatting, and code actions.

#![deny(unsafe_code)]

mod analysis;
pub mod bridge;
mod convert;
mod diagnostics;
pub mod features;
mod server;
mod state;

pub use server::LspServer;
pub use state::ServerState;

/// Run the LSP server in stdio mode.
///
/// Reads JSON-RPC from stdin and writes responses to stdout until the
/// client sends `exit` or closes the stream.
pub fn run_stdio() -> anyhow::Result<()> {
    let mut server = LspServer::new();
    server.run()
}
