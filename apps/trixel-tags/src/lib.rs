//! # trixel-tags
//!
//! Application layer over `trixel-tags-core`: the HTTP API, the CLI and
//! configuration loading. The binary in `main.rs` only sets up logging and
//! hands the parsed command line to [`cli::execute`].

pub mod api;
pub mod cli;
pub mod config;
pub mod error;

pub use config::Config;
pub use error::AppError;
