//! # Vitrine - Exhibition Journal Capture Service
//!
//! The main binary for the Vitrine capture-target decision engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for policy, memory and capture operations
//! - Location lookup through a fixed point or an external locator command
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     apps/vitrine (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐     │
//! │  │   CLI       │    │   HTTP API  │    │ Location source  │     │
//! │  │  (clap)     │    │   (axum)    │    │ (tokio process)  │     │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘     │
//! │         │                  │                    │               │
//! │         └──────────────────┼────────────────────┘               │
//! │                            ▼                                    │
//! │                    ┌───────────────┐                            │
//! │                    │ vitrine-core  │                            │
//! │                    │ (THE LOGIC)   │                            │
//! │                    └───────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! vitrine server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! vitrine policy set --time-window 90 --mode auto
//! vitrine capture -f pool.json --lat 37.5665 --lng 126.978
//! vitrine decide -f pool.json --target 1700000000000
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitrine::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // VITRINE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("VITRINE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "vitrine=debug,vitrine_core=debug,tower_http=debug"
    } else {
        "vitrine=info,vitrine_core=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // JSON output must stay parseable.
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Vitrine startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗   ██╗██╗████████╗██████╗ ██╗███╗   ██╗███████╗
  ██║   ██║██║╚══██╔══╝██╔══██╗██║████╗  ██║██╔════╝
  ██║   ██║██║   ██║   ██████╔╝██║██╔██╗ ██║█████╗
  ╚██╗ ██╔╝██║   ██║   ██╔══██╗██║██║╚██╗██║██╔══╝
   ╚████╔╝ ██║   ██║   ██║  ██║██║██║ ╚████║███████╗
    ╚═══╝  ╚═╝   ╚═╝   ╚═╝  ╚═╝╚═╝╚═╝  ╚═══╝╚══════╝

  Exhibition Journal Capture Service v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
