//! Message framing for LSP Base Protocol
//!
//! Implements Content-Length based message framing. Header names are
//! case-insensitive and unknown headers are ignored. Framing violations
//! (oversized headers, missing or absurd content-length) surface as
//! [`ReadOutcome::Protocol`] so the caller can answer with a JSON-RPC error
//! and keep reading the stream.

use std::io::{self, BufRead, Write};
use veld_lsp_protocol::{error_codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// Maximum accepted size of one header block.
pub const MAX_HEADER_BYTES: usize = 32 * 1024;
/// Maximum accepted number of header lines.
pub const MAX_HEADER_LINES: usize = 100;
/// Maximum accepted body size.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Hard stop for draining a runaway header block after a violation.
const MAX_DRAIN_BYTES: usize = 1024 * 1024;

/// Result of one framed read.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A parsed JSON-RPC message
    Message(JsonRpcRequest),
    /// A recoverable framing or parse violation; reply with this error
    /// (with no `id`) and continue reading
    Protocol(JsonRpcError),
    /// End of stream
    Eof,
}

fn invalid_request(message: &str) -> ReadOutcome {
    ReadOutcome::Protocol(JsonRpcError::new(error_codes::INVALID_REQUEST, message))
}

/// Read one framed message.
///
/// Returns `Err` only for unrecoverable I/O errors; everything a client can
/// provoke with bytes comes back as a [`ReadOutcome`].
pub fn read_message<R: BufRead>(reader: &mut R) -> io::Result<ReadOutcome> {
    let mut content_length: Option<i64> = None;
    let mut header_bytes = 0usize;
    let mut header_lines = 0usize;
    let mut violation: Option<&'static str> = None;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(ReadOutcome::Eof);
        }
        header_bytes += line.len();
        header_lines += 1;

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }

        if violation.is_none() {
            if header_lines > MAX_HEADER_LINES {
                violation = Some("header block exceeds line limit");
            } else if header_bytes > MAX_HEADER_BYTES {
                violation = Some("header block exceeds size limit");
            }
        }
        if violation.is_some() {
            if header_bytes > MAX_DRAIN_BYTES {
                // Runaway stream: give up on draining to the blank line.
                return Ok(invalid_request("header block exceeds size limit"));
            }
            continue;
        }

        if let Some((name, value)) = trimmed.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse::<i64>().ok().or(Some(-1));
            }
            // Unknown headers are ignored.
        }
    }

    if let Some(reason) = violation {
        // Best-effort resync: skip the body the offending frame declared,
        // when it declared a plausible one.
        if let Some(len) = content_length {
            if len > 0 && (len as usize) <= MAX_BODY_BYTES {
                skip_bytes(reader, len as usize)?;
            }
        }
        return Ok(invalid_request(reason));
    }

    let Some(length) = content_length else {
        return Ok(invalid_request("missing content-length header"));
    };
    if length <= 0 {
        return Ok(invalid_request("content-length must be a positive integer"));
    }
    let length = length as usize;
    if length > MAX_BODY_BYTES {
        // Do not attempt to read an absurd body; the declared frame is
        // rejected wholesale.
        return Ok(invalid_request("content-length exceeds body size limit"));
    }

    let mut content = vec![0u8; length];
    if read_full(reader, &mut content)?.is_none() {
        return Ok(ReadOutcome::Eof);
    }

    let value: serde_json::Value = match serde_json::from_slice(&content) {
        Ok(value) => value,
        Err(e) => {
            return Ok(ReadOutcome::Protocol(JsonRpcError::new(
                error_codes::PARSE_ERROR,
                format!("invalid JSON body: {e}"),
            )));
        }
    };
    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(request) => Ok(ReadOutcome::Message(request)),
        Err(e) => Ok(ReadOutcome::Protocol(JsonRpcError::new(
            error_codes::INVALID_REQUEST,
            format!("not a JSON-RPC request: {e}"),
        ))),
    }
}

/// Read exactly `buf.len()` bytes; `None` on EOF mid-body.
fn read_full<R: BufRead>(reader: &mut R, buf: &mut [u8]) -> io::Result<Option<()>> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => return Ok(None),
            n => filled += n,
        }
    }
    Ok(Some(()))
}

fn skip_bytes<R: BufRead>(reader: &mut R, mut remaining: usize) -> io::Result<()> {
    let mut chunk = [0u8; 4096];
    while remaining > 0 {
        let want = remaining.min(chunk.len());
        match reader.read(&mut chunk[..want])? {
            0 => break,
            n => remaining -= n,
        }
    }
    Ok(())
}

/// Write an LSP message to a writer with proper framing
pub fn write_message<W: Write>(writer: &mut W, response: &JsonRpcResponse) -> io::Result<()> {
    let content = serde_json::to_string(response)?;
    write!(writer, "Content-Length: {}\r\n\r\n{}", content.len(), content)?;
    writer.flush()
}

/// Write an LSP notification to a writer
pub fn write_notification<W: Write>(
    writer: &mut W,
    method: &str,
    params: serde_json::Value,
) -> io::Result<()> {
    let notification = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params
    });
    let content = serde_json::to_string(&notification)?;
    write!(writer, "Content-Length: {}\r\n\r\n{}", content.len(), content)?;
    writer.flush()
}

/// Write an id-less error response for a framing violation.
pub fn write_error<W: Write>(writer: &mut W, error: JsonRpcError) -> io::Result<()> {
    write_message(writer, &JsonRpcResponse::error(None, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn frame(body: &str) -> String {
        format!("Content-Length: {}\r\n\r\n{}", body.len(), body)
    }

    fn read(input: &str) -> ReadOutcome {
        let mut cursor = Cursor::new(input.as_bytes().to_vec());
        read_message(&mut cursor).expect("io")
    }

    #[test]
    fn test_reads_simple_frame() {
        let outcome = read(&frame(r#"{"jsonrpc":"2.0","id":1,"method":"shutdown"}"#));
        let ReadOutcome::Message(req) = outcome else { panic!("expected message: {outcome:?}") };
        assert_eq!(req.method, "shutdown");
        assert_eq!(req.id, Some(serde_json::json!(1)));
    }

    #[test]
    fn test_header_names_case_insensitive() {
        let body = r#"{"jsonrpc":"2.0","method":"initialized"}"#;
        let input = format!("content-length: {}\r\n\r\n{}", body.len(), body);
        let ReadOutcome::Message(req) = read(&input) else { panic!("expected message") };
        assert_eq!(req.method, "initialized");
    }

    #[test]
    fn test_unknown_headers_ignored() {
        let body = r#"{"jsonrpc":"2.0","method":"initialized"}"#;
        let input = format!(
            "Content-Type: application/vscode-jsonrpc\r\nContent-Length: {}\r\nX-Custom: 1\r\n\r\n{}",
            body.len(),
            body
        );
        assert!(matches!(read(&input), ReadOutcome::Message(_)));
    }

    #[test]
    fn test_missing_content_length() {
        let ReadOutcome::Protocol(err) = read("X-Whatever: 1\r\n\r\n") else {
            panic!("expected protocol error")
        };
        assert_eq!(err.code, error_codes::INVALID_REQUEST);
    }

    #[test]
    fn test_non_positive_content_length() {
        for bad in ["0", "-5", "ten"] {
            let input = format!("Content-Length: {bad}\r\n\r\n");
            let ReadOutcome::Protocol(err) = read(&input) else {
                panic!("expected protocol error for {bad}")
            };
            assert_eq!(err.code, error_codes::INVALID_REQUEST);
        }
    }

    #[test]
    fn test_oversized_content_length_then_next_frame_ok() {
        let mut input = String::from("Content-Length: 99999999\r\n\r\n");
        input.push_str(&frame(r#"{"jsonrpc":"2.0","id":2,"method":"shutdown"}"#));
        let mut cursor = Cursor::new(input.into_bytes());

        let ReadOutcome::Protocol(err) = read_message(&mut cursor).expect("io") else {
            panic!("expected protocol error")
        };
        assert_eq!(err.code, error_codes::INVALID_REQUEST);

        let ReadOutcome::Message(req) = read_message(&mut cursor).expect("io") else {
            panic!("expected message after resync")
        };
        assert_eq!(req.method, "shutdown");
    }

    #[test]
    fn test_too_many_header_lines_then_recover() {
        let mut input = String::new();
        for i in 0..150 {
            input.push_str(&format!("X-Header-{i}: v\r\n"));
        }
        input.push_str("\r\n");
        input.push_str(&frame(r#"{"jsonrpc":"2.0","id":3,"method":"shutdown"}"#));
        let mut cursor = Cursor::new(input.into_bytes());

        let ReadOutcome::Protocol(err) = read_message(&mut cursor).expect("io") else {
            panic!("expected protocol error")
        };
        assert_eq!(err.code, error_codes::INVALID_REQUEST);

        assert!(matches!(read_message(&mut cursor).expect("io"), ReadOutcome::Message(_)));
    }

    #[test]
    fn test_oversized_header_block() {
        let mut input = String::new();
        input.push_str(&format!("X-Big: {}\r\n\r\n", "a".repeat(40 * 1024)));
        let ReadOutcome::Protocol(err) = read(&input) else { panic!("expected protocol error") };
        assert_eq!(err.code, error_codes::INVALID_REQUEST);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let ReadOutcome::Protocol(err) = read(&frame("{not json")) else {
            panic!("expected protocol error")
        };
        assert_eq!(err.code, error_codes::PARSE_ERROR);
    }

    #[test]
    fn test_valid_json_wrong_shape_is_invalid_request() {
        let ReadOutcome::Protocol(err) = read(&frame(r#"{"jsonrpc":"2.0"}"#)) else {
            panic!("expected protocol error")
        };
        assert_eq!(err.code, error_codes::INVALID_REQUEST);
    }

    #[test]
    fn test_eof_mid_body() {
        let input = "Content-Length: 50\r\n\r\n{\"jsonrpc\"";
        assert!(matches!(read(input), ReadOutcome::Eof));
    }

    #[test]
    fn test_empty_stream_is_eof() {
        assert!(matches!(read(""), ReadOutcome::Eof));
    }

    #[test]
    fn test_write_message_framing() {
        let mut out = Vec::new();
        write_message(&mut out, &JsonRpcResponse::null(Some(serde_json::json!(7)))).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        let body = text.split("\r\n\r\n").nth(1).expect("body");
        assert!(text.starts_with(&format!("Content-Length: {}\r\n\r\n", body.len())));
        assert!(body.contains("\"result\":null"));
    }
}
