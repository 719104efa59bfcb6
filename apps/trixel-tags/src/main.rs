//! # trixel-tags
//!
//! Tag index for trixels: a many-to-many relation between numeric trixel
//! ids and free-text tags, served over HTTP or driven from the CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! trixel-tags serve --host 0.0.0.0 --port 8080 --static-dir public
//!
//! # CLI operations
//! trixel-tags tag 42 red
//! trixel-tags tags 42
//! trixel-tags ids red
//! trixel-tags verify
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trixel_tags::cli;
use trixel_tags::config::ENV_LOG_FORMAT;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // TRIXEL_TAGS_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trixel_tags=info,trixel_tags_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  trixel-tags v{}
  tags <-> trixels, both ways
"#,
        env!("CARGO_PKG_VERSION")
    );
}
