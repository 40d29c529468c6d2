//! Server capabilities advertised on `initialize`.
//!
//! Single source of truth for feature availability, including the semantic
//! token legend, which is fixed for the lifetime of the server.

use serde_json::{json, Value};

/// Semantic token types, in legend (index) order.
pub const TOKEN_TYPES: [&str; 8] =
    ["keyword", "function", "variable", "type", "string", "number", "comment", "operator"];

/// Semantic token modifiers, in bit order.
pub const TOKEN_MODIFIERS: [&str; 1] = ["declaration"];

/// Commands accepted by `workspace/executeCommand` when the debug bridge is
/// configured.
pub const DEBUG_COMMANDS: [&str; 4] =
    ["veld.bridge.status", "veld.bridge.pause", "veld.bridge.resume", "veld.bridge.eval"];

/// The semantic tokens legend as a JSON value.
pub fn semantic_tokens_legend() -> Value {
    json!({
        "tokenTypes": TOKEN_TYPES,
        "tokenModifiers": TOKEN_MODIFIERS,
    })
}

/// Full capability object returned from `initialize`.
pub fn server_capabilities() -> Value {
    json!({
        "positionEncoding": "utf-16",
        "textDocumentSync": {
            "openClose": true,
            "change": 2,
            "save": true,
        },
        "hoverProvider": true,
        "definitionProvider": true,
        "typeDefinitionProvider": true,
        "referencesProvider": true,
        "documentSymbolProvider": true,
        "documentHighlightProvider": true,
        "foldingRangeProvider": true,
        "renameProvider": { "prepareProvider": true },
        "workspaceSymbolProvider": true,
        "completionProvider": {
            "triggerCharacters": [".", ":", ",", "(", "[", " "],
            "resolveProvider": true,
        },
        "signatureHelpProvider": {
            "triggerCharacters": ["(", ","],
        },
        "documentFormattingProvider": true,
        "documentRangeFormattingProvider": true,
        "documentOnTypeFormattingProvider": {
            "firstTriggerCharacter": "}",
            "moreTriggerCharacter": ["\n", ")", ";", "{"],
        },
        "semanticTokensProvider": {
            "legend": semantic_tokens_legend(),
            "full": true,
            "range": true,
        },
        "inlayHintProvider": true,
        "codeActionProvider": {
            "codeActionKinds": ["quickfix", "refactor", "refactor.extract"],
        },
        "executeCommandProvider": {
            "commands": DEBUG_COMMANDS,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_position_encoding_advertised() {
        let caps = server_capabilities();
        assert_eq!(caps["positionEncoding"], "utf-16");
        assert_eq!(caps["textDocumentSync"]["change"], 2);
    }

    #[test]
    fn test_legend_matches_constant_order() {
        let legend = semantic_tokens_legend();
        assert_eq!(legend["tokenTypes"][0], "keyword");
        assert_eq!(legend["tokenTypes"].as_array().map(|a| a.len()), Some(TOKEN_TYPES.len()));
        assert_eq!(legend["tokenModifiers"][0], "declaration");
    }

    #[test]
    fn test_completion_trigger_characters() {
        let caps = server_capabilities();
        let triggers = caps["completionProvider"]["triggerCharacters"]
            .as_array()
            .map(|a| a.len())
            .unwrap_or(0);
        assert_eq!(triggers, 6);
        assert_eq!(caps["completionProvider"]["resolveProvider"], true);
    }
}
