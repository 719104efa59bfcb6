//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::Backend;
use crate::api::{self, AppState, validate_trid};
use crate::{AppError, Config};
use trixel_tags_core::{Discrepancy, TagEngine};

/// Pretty-print a JSON value on stdout.
fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_serve(engine: TagEngine, config: Config, backend: Backend) -> Result<(), AppError> {
    println!("trixel-tags server starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.bind_addr());
    println!("  Backend:  {}", backend.as_str());
    println!("  Database: {:?}", config.database);
    match &config.server.static_dir {
        Some(dir) => println!("  Static:   {:?}", dir),
        None => println!("  Static:   (disabled)"),
    }
    println!();
    println!("Endpoints:");
    println!("  GET    /trids/{{trid}}           - Tags of a trixel");
    println!("  DELETE /trids/{{trid}}/tag/{{tag}} - Remove a tag");
    println!("  GET    /tags/                  - All tags");
    println!("  GET    /tags/{{tag}}             - Trixels with a tag");
    println!("  POST   /tags/{{tag}}             - Tag the trixel in the body");
    println!("  POST   /tags/                  - Same, with the empty tag");
    println!("  GET    /health                 - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(AppState::new(engine, config)).await
}

// =============================================================================
// MUTATION COMMANDS
// =============================================================================

/// Associate `tag` with `trid`.
pub fn cmd_tag(engine: &TagEngine, trid: &str, tag: &str, json: bool) -> Result<(), AppError> {
    let trid = validate_trid(trid)?;
    engine.associate(trid, tag)?;
    let count = engine.count_of(tag)?.unwrap_or(0);

    if json {
        print_json(&serde_json::json!({ "trid": trid, "tag": tag, "count": count }));
    } else {
        println!("Tagged {} with {:?} ({} in total)", trid, tag, count);
    }
    Ok(())
}

/// Remove the association between `trid` and `tag`.
pub fn cmd_untag(engine: &TagEngine, trid: &str, tag: &str, json: bool) -> Result<(), AppError> {
    let trid = validate_trid(trid)?;
    engine.dissociate(trid, tag)?;
    let count = engine.count_of(tag)?.unwrap_or(0);

    if json {
        print_json(&serde_json::json!({ "trid": trid, "tag": tag, "count": count }));
    } else {
        println!("Removed {:?} from {} ({} left)", tag, trid, count);
    }
    Ok(())
}

// =============================================================================
// LOOKUP COMMANDS
// =============================================================================

/// Tags of one trixel, or all tags in use.
pub fn cmd_tags(engine: &TagEngine, trid: Option<&str>, json: bool) -> Result<(), AppError> {
    let tags = match trid {
        Some(trid) => engine.tags_of(validate_trid(trid)?)?,
        None => engine.all_tags()?,
    };
    print_list(&tags, json);
    Ok(())
}

/// Trixels carrying `tag`.
pub fn cmd_ids(engine: &TagEngine, tag: &str, json: bool) -> Result<(), AppError> {
    let ids = engine.ids_of(tag)?;
    print_list(&ids, json);
    Ok(())
}

/// One item per line; tags are debug-quoted so blanks and controls show.
fn print_list(items: &[String], json: bool) {
    if json {
        print_json(&serde_json::json!(items));
        return;
    }
    for item in items {
        println!("{:?}", item);
    }
}

/// Every tag with its occurrence count.
pub fn cmd_counts(engine: &TagEngine, json: bool) -> Result<(), AppError> {
    let counts = engine.tag_counts()?;

    if json {
        let map: serde_json::Map<String, serde_json::Value> = counts
            .into_iter()
            .map(|(tag, count)| (tag, count.into()))
            .collect();
        print_json(&serde_json::Value::Object(map));
        return Ok(());
    }

    for (tag, count) in &counts {
        println!("{:>8}  {:?}", count, tag);
    }
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show index totals.
pub fn cmd_status(
    engine: &TagEngine,
    config: &Config,
    backend: Backend,
    json: bool,
) -> Result<(), AppError> {
    let stats = engine.stats()?;

    if json {
        print_json(&serde_json::json!({
            "database": config.database.to_string_lossy(),
            "backend": backend.as_str(),
            "associations": stats.associations,
            "tags": stats.tags,
        }));
        return Ok(());
    }

    println!("trixel-tags Index Status");
    println!("========================");
    println!("Database:     {:?}", config.database);
    println!("Backend:      {}", backend.as_str());
    println!();
    println!("Associations: {}", stats.associations);
    println!("Tags:         {}", stats.tags);
    Ok(())
}

// =============================================================================
// VERIFY COMMAND
// =============================================================================

/// Cross-check the indices. Fails when any discrepancy is found.
pub fn cmd_verify(engine: &TagEngine, json: bool) -> Result<(), AppError> {
    let report = engine.verify()?;

    if json {
        let found: Vec<String> = report.discrepancies.iter().map(describe).collect();
        print_json(&serde_json::json!({
            "consistent": report.is_consistent(),
            "associations": report.stats.associations,
            "tags": report.stats.tags,
            "discrepancies": found,
        }));
    } else {
        println!(
            "Checked {} associations over {} tags",
            report.stats.associations, report.stats.tags
        );
        for discrepancy in &report.discrepancies {
            println!("  {}", describe(discrepancy));
        }
        if report.is_consistent() {
            println!("Index is consistent");
        }
    }

    if report.is_consistent() {
        Ok(())
    } else {
        Err(AppError::Inconsistent(report.discrepancies.len()))
    }
}

fn describe(discrepancy: &Discrepancy) -> String {
    match discrepancy {
        Discrepancy::MissingReverse { id, tag } => {
            format!("{} -> {:?} has no reverse entry", id, tag)
        }
        Discrepancy::MissingForward { id, tag } => {
            format!("{:?} -> {} has no forward entry", tag, id)
        }
        Discrepancy::CountMismatch {
            tag,
            recorded,
            actual,
        } => format!("{:?} counted {} but used {} times", tag, recorded, actual),
        Discrepancy::MissingCount { tag, actual } => {
            format!("{:?} used {} times but has no count", tag, actual)
        }
        Discrepancy::OrphanCount { tag, recorded } => {
            format!("{:?} counted {} but unused", tag, recorded)
        }
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the engine on the configured backend.
pub fn open_engine(config: &Config, backend: Backend) -> Result<TagEngine, AppError> {
    match backend {
        Backend::Redb => {
            tracing::debug!(database = ?config.database, "opening redb index");
            Ok(TagEngine::open(&config.database)?)
        }
        Backend::Memory => {
            tracing::warn!("memory backend: associations are lost on exit");
            Ok(TagEngine::in_memory())
        }
    }
}
