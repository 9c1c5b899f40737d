//! sql-template - Main entry point.
//!
//! Runs one parameterized SQL statement inside a transaction on a pooled
//! connection and prints the result as JSON on stdout.

use sql_template::config::{Config, Mode};
use sql_template::db::{
    ConnectionOperations, PooledOperations, SqlxDataSource, bind_all, collect_rows,
};
use sql_template::models::SqlValue;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

/// Run the configured statement and render its outcome.
fn run(
    operations: &PooledOperations<&SqlxDataSource>,
    config: &Config,
    params: &[SqlValue],
) -> sql_template::DbResult<serde_json::Value> {
    let sql = config.sql.as_str();
    operations.execute_in_transaction(config.transaction_config(), |connection| {
        let mut ops = ConnectionOperations::new(connection);
        let output = match config.mode {
            Mode::Query => {
                let rows = ops.query(sql, |st| bind_all(st, params), collect_rows)?;
                serde_json::json!(rows)
            }
            Mode::Update => {
                let affected = ops.update(sql, |st| bind_all(st, params))?;
                serde_json::json!({ "rows_affected": affected })
            }
            Mode::Keys => {
                let keys = ops.update_returning_keys(sql, |st| bind_all(st, params))?;
                serde_json::json!(keys)
            }
        };
        Ok(output)
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Logging is opt-in so stdout stays machine-readable
    if config.enable_logs {
        init_tracing(&config);
    }

    let data_source_config = config.data_source()?;
    let params = config.parameters();

    info!(
        mode = %config.mode,
        transaction = %config.transaction_config(),
        params = params.len(),
        "Starting sql-template v{}",
        env!("CARGO_PKG_VERSION")
    );

    let data_source = SqlxDataSource::connect(&data_source_config)?;
    let operations = PooledOperations::new(&data_source);
    let result = run(&operations, &config, &params);
    data_source.close();

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, kind = %e.kind(), "Statement failed");
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {suggestion}");
            }
            for suppressed in e.suppressed() {
                eprintln!("Suppressed: {suppressed}");
            }
            Err(e.into())
        }
    }
}
