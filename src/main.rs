//! sqlconn - diagnostic entry point.
//!
//! Routes or runs one statement through the facade, printing the result.

use clap::Parser;
use sqlconn::config::{Command, Config};
use sqlconn::db::JsonRow;
use sqlconn::{SqlConn, SqlError};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout only carries results
    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn run(conn: &SqlConn, command: &Command) -> Result<String, SqlError> {
    match command {
        Command::Route { sql } => Ok(conn.route(sql)?.to_string()),
        Command::Exec { sql } => {
            let result = conn.exec(sql, &[]).await?;
            Ok(serde_json::to_string_pretty(&result)?)
        }
        Command::Query { sql, one, partial } => {
            let rows = match (*one, *partial) {
                (true, false) => vec![conn.query_row::<JsonRow>(sql, &[]).await?],
                (true, true) => vec![conn.query_row_partial::<JsonRow>(sql, &[]).await?],
                (false, false) => conn.query_rows::<JsonRow>(sql, &[]).await?,
                (false, true) => conn.query_rows_partial::<JsonRow>(sql, &[]).await?,
            };
            Ok(serde_json::to_string_pretty(&rows)?)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        driver = %config.driver,
        cluster = config.cluster,
        "Starting sqlconn v{}",
        env!("CARGO_PKG_VERSION")
    );

    let conn = SqlConn::from_config(&config.to_sql_conn_config())?;
    let result = run(&conn, &config.command).await;
    conn.pool_cache().close_all().await;

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Hint: {}", suggestion);
            }
            Err(e.into())
        }
    }
}
