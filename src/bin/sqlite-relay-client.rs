//! sqlite-relay-client - Thin client for the relay daemon.
//!
//! CHANGELOG:
//! - 10/16/2026 - Relay request envelope (method, sql, params)

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;

use sqlite_relay::config::RelayConfig;
use sqlite_relay::relay::{Request, Response};

#[derive(Parser)]
#[command(name = "sqlite-relay-client")]
#[command(about = "Thin client for sqlite-relay daemon")]
struct Cli {
    /// Method to call (init, execute, query)
    method: String,

    /// SQL text for execute/query
    #[arg(long)]
    sql: Option<String>,

    /// Bind values as JSON (array or object)
    #[arg(long)]
    params: Option<String>,

    /// Socket path (default: $SQLITE_RELAY_SOCKET or ~/.sqlite-relay/relay.sock)
    #[arg(long)]
    socket: Option<String>,

    /// Request timeout (seconds)
    #[arg(long, default_value = "5.0")]
    timeout: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Parse params JSON
    let params: Option<Value> = match cli.params {
        Some(p) => Some(serde_json::from_str(&p).context("--params is not valid JSON")?),
        None => None,
    };

    let args = if cli.sql.is_some() || params.is_some() {
        Some(json!({ "sql": cli.sql, "params": params }))
    } else {
        None
    };

    let request = Request::new(uuid::Uuid::new_v4().to_string(), cli.method, args);

    let config = match cli.socket {
        Some(socket) => RelayConfig::default().with_socket(socket),
        None => RelayConfig::default(),
    };

    // Connect to daemon
    let stream = UnixStream::connect(&config.socket_path)
        .with_context(|| format!("Failed to connect to {:?}", config.socket_path))?;

    let timeout = std::time::Duration::from_secs_f64(cli.timeout);
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    // Send request (NDJSON)
    (&stream).write_all(request.to_ndjson_line()?.as_bytes())?;

    // Read response (NDJSON)
    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader.read_line(&mut response_line)?;

    let response: Response =
        serde_json::from_str(&response_line).context("Failed to parse response JSON")?;

    match response.error {
        None => {
            // Success: print result only
            let result = response.result.unwrap_or(Value::Null);
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Some(message) => {
            // Error: print error and exit with code 1
            eprintln!("Error: {}", message);
            std::process::exit(1);
        }
    }
}
