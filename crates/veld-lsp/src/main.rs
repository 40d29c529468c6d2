//! Veld Language Server binary
//!
//! Speaks the Language Server Protocol over stdio for any LSP-compatible
//! editor.
//!
//! Usage:
//!   veld-lsp [options]
//!
//! Options:
//!   --stdio      Use stdio for communication (default)
//!   --log        Enable logging to stderr
//!   --health     Quick health check
//!   --version    Show version information
//!   --help       Show this help message

use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut enable_logging = env::var("VELD_LSP_LOG").is_ok();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--stdio" => {}
            "--log" => enable_logging = true,
            "--health" => {
                println!("ok {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            "--version" => {
                println!("veld-lsp {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown option: {other}");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    if enable_logging {
        let filter = EnvFilter::try_from_env("VELD_LSP_LOG")
            .unwrap_or_else(|_| EnvFilter::new("veld_lsp=debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .init();
    }

    if let Err(e) = veld_lsp::run_stdio() {
        eprintln!("veld-lsp error: {e}");
        process::exit(1);
    }
}

fn print_help() {
    eprintln!("Veld Language Server");
    eprintln!();
    eprintln!("Usage: veld-lsp [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --stdio     Use stdio for communication (default)");
    eprintln!("  --log       Enable logging to stderr (or set VELD_LSP_LOG)");
    eprintln!("  --health    Quick health check (prints 'ok <version>')");
    eprintln!("  --version   Show version information");
    eprintln!("  --help      Show this help message");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VELD_DEBUG_HTTP_URL   Base URL of the runtime debug bridge");
    eprintln!("  VELD_RSP_ADDR         Remote-serial-protocol endpoint");
    eprintln!("  VELD_LSP_LOG          Log filter (implies --log)");
}
