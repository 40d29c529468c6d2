//! JSON-RPC 2.0 protocol layer for the Veld language server.
//!
//! Message types, the standard error codes, LSP method name constants, and
//! the capability set advertised on `initialize`.

mod capabilities;
mod jsonrpc;
pub mod methods;

pub use capabilities::{
    server_capabilities, semantic_tokens_legend, DEBUG_COMMANDS, TOKEN_MODIFIERS, TOKEN_TYPES,
};
pub use jsonrpc::{error_codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
