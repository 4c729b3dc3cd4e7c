//! CLI command implementations
//!
//! Every command runs the full startup sequence first, so a command that
//! succeeds proves the configuration would boot a worker.

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::amqp::{Message, Operation};
use crate::boot::{BootError, Runtime};
use crate::observability::{Logger, Severity};
use crate::planner::ExplainPlan;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    Logger::set_min_severity(if cli.verbose {
        Severity::Trace
    } else {
        Severity::Warn
    });

    let output = run_command(cli.command)?;
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", output.trim_end())?;
    stdout.flush()?;
    Ok(())
}

/// Run the appropriate command, returning what it prints
pub fn run_command(cmd: Command) -> CliResult<String> {
    match cmd {
        Command::Check { config } => check(&config),
        Command::Explain {
            config,
            entity,
            json,
        } => explain(&config, &entity, json),
        Command::Fanout {
            config,
            table,
            json,
        } => fanout(&config, &table, json),
    }
}

/// Boot and summarize catalog, entities and retry settings as JSON
pub fn check(config_path: &Path) -> CliResult<String> {
    let runtime = Runtime::boot(config_path)?;
    render_check(&runtime)
}

/// Print one entity's compiled plan
pub fn explain(config_path: &Path, entity: &str, as_json: bool) -> CliResult<String> {
    let runtime = match Runtime::boot(config_path) {
        Ok(runtime) => runtime,
        Err(BootError::Planner(err)) => {
            let rejected = ExplainPlan::from_error(entity, &err);
            return Err(CliError::boot_failed(rejected.to_string()));
        }
        Err(err) => return Err(err.into()),
    };
    render_explain(&runtime, entity, as_json)
}

/// Print the projection queries and back references a change on a table
/// triggers
pub fn fanout(config_path: &Path, table: &str, as_json: bool) -> CliResult<String> {
    let runtime = Runtime::boot(config_path)?;
    render_fanout(&runtime, table, as_json)
}

fn render_check(runtime: &Runtime) -> CliResult<String> {
    let entities: Vec<Value> = runtime
        .registry()
        .iter()
        .map(|entity| {
            let plan = entity.plan();
            let deferred: usize = plan.directives().map(|d| d.deferred.len()).sum();
            json!({
                "name": entity.name(),
                "root": plan.root(),
                "version": entity.version(),
                "fields": entity.fields().len(),
                "hops": plan.len(),
                "deferred_columns": deferred,
            })
        })
        .collect();

    let broker = &runtime.config().broker;
    let summary = json!({
        "status": "ok",
        "schema": runtime.fanout().schema(),
        "tables": runtime.catalog().len(),
        "entities": entities,
        "broker": {
            "index_queue": broker.index_queue,
            "delete_queue": broker.delete_queue,
            "retry_exchange": broker.retry_exchange,
            "failed_exchange": broker.failed_exchange,
            "max_retries": broker.max_retries,
        },
    });

    Ok(serde_json::to_string_pretty(&summary)?)
}

fn render_explain(runtime: &Runtime, entity: &str, as_json: bool) -> CliResult<String> {
    let registry = runtime.registry();
    let Some(found) = registry.get(entity) else {
        return Err(CliError::unknown_entity(entity, &registry.names()));
    };

    let plan = ExplainPlan::from_plan(found.plan());
    if as_json {
        Ok(serde_json::to_string_pretty(&plan)?)
    } else {
        Ok(plan.to_string())
    }
}

/// One projection query as listed by `fanout`
#[derive(Debug, Serialize)]
struct FanoutQuery {
    entity: String,
    /// Message column whose value is bound to `:ids`
    source: String,
    sql: String,
}

/// One direct re-index as listed by `fanout`
#[derive(Debug, Serialize)]
struct FanoutDirect {
    entity: String,
    relationship: String,
    source: String,
}

fn render_fanout(runtime: &Runtime, table: &str, as_json: bool) -> CliResult<String> {
    let Some(def) = runtime.catalog().table(table) else {
        return Err(CliError::unknown_table(table));
    };

    // Each column carries its own name, so every query's ids show which
    // column of an incoming row feeds it.
    let columns: Map<String, Value> = def
        .columns
        .iter()
        .map(|c| (c.db_name().to_string(), Value::String(c.db_name().to_string())))
        .collect();
    let sample = Message::new(table, columns, Operation::Update);

    let resolver = runtime.fanout();
    let queries: Vec<FanoutQuery> = resolver
        .queries(&sample)
        .map_err(|_| CliError::unknown_table(table))?
        .into_iter()
        .map(|q| FanoutQuery {
            entity: q.entity.clone(),
            source: q.ids.join(","),
            sql: q.sql(),
        })
        .collect();
    let direct: Vec<FanoutDirect> = resolver
        .back_references_of(table)
        .iter()
        .map(|b| FanoutDirect {
            entity: b.entity.clone(),
            relationship: b.relationship.clone(),
            source: b.column.clone(),
        })
        .collect();
    let entity_table = resolver.is_entity_table(table);

    if as_json {
        let out = json!({
            "table": table,
            "entity_table": entity_table,
            "queries": queries,
            "direct": direct,
        });
        return Ok(serde_json::to_string_pretty(&out)?);
    }

    let mut out = format!("=== FANOUT: {} ===\n", table);
    if entity_table {
        out.push_str("Entity table: changed rows are re-indexed by id\n");
    }
    if queries.is_empty() && direct.is_empty() {
        out.push_str("No dependents\n");
    }
    for q in &queries {
        out.push_str(&format!("{} <- {}: {}\n", q.entity, q.source, q.sql));
    }
    for d in &direct {
        out.push_str(&format!(
            "{} <- {}: direct ({})\n",
            d.entity, d.source, d.relationship
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliErrorCode;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_check_summary() {
        let file = config_file("{}");
        let out = check(file.path()).unwrap();
        let summary: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(summary["status"], "ok");
        assert_eq!(summary["tables"], 14);
        assert_eq!(summary["entities"].as_array().unwrap().len(), 4);
        assert_eq!(summary["entities"][1]["name"], "artist");
        assert_eq!(summary["broker"]["max_retries"], 4);
    }

    #[test]
    fn test_check_bad_config() {
        let file = config_file(r#"{"broker": {"index_queue": "q", "delete_queue": "q"}}"#);
        let err = check(file.path()).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::BootFailed);
        assert!(err.message().contains("SEARCH_CONFIG_INVALID"));
    }

    #[test]
    fn test_explain_text() {
        let file = config_file("{}");
        let out = explain(file.path(), "place", false).unwrap();
        assert!(out.starts_with("=== EXPLAIN PLAN: place ==="));
        assert!(out.contains("Root: place (all columns)"));
        assert!(out.contains("area -> area [JOIN]"));
    }

    #[test]
    fn test_explain_json() {
        let file = config_file("{}");
        let out = explain(file.path(), "artist", true).unwrap();
        let plan: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(plan["accepted"], true);
        assert_eq!(plan["root"], "artist");
    }

    #[test]
    fn test_explain_disabled_entity() {
        let file = config_file(r#"{"entities": ["area"]}"#);
        let err = explain(file.path(), "artist", false).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::UnknownEntity);
    }

    #[test]
    fn test_fanout_area() {
        let file = config_file("{}");
        let out = fanout(file.path(), "area", false).unwrap();
        assert!(out.contains("Entity table"));
        assert!(out.contains(
            "artist <- id: SELECT artist.id FROM musicbrainz.artist WHERE artist.begin_area IN (:ids)"
        ));
        assert_eq!(out.lines().filter(|l| l.contains("SELECT")).count(), 5);
    }

    #[test]
    fn test_fanout_child_table_json() {
        let file = config_file("{}");
        let out = fanout(file.path(), "area_alias", true).unwrap();
        let listing: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(listing["entity_table"], false);
        assert_eq!(listing["queries"].as_array().unwrap().len(), 5);
        assert_eq!(listing["queries"][0]["source"], "area");
        assert_eq!(listing["direct"][0]["entity"], "area");
    }

    #[test]
    fn test_fanout_unknown_table() {
        let file = config_file("{}");
        let err = fanout(file.path(), "recording", false).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::UnknownTable);
    }
}
