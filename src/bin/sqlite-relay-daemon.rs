//! sqlite-relay-daemon - Background relay serving an in-memory SQLite database.
//!
//! CHANGELOG:
//! - 10/16/2026 - Relay server, stdio mode, tracing setup

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;

use sqlite_relay::config::{RelayConfig, DEFAULT_MAX_PENDING};
use sqlite_relay::relay::server::{serve_stdio, RelayServer};

#[derive(Parser)]
#[command(name = "sqlite-relay-daemon")]
#[command(about = "Background worker relaying init/execute/query to in-memory SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon
    Start {
        /// Socket path (default: $SQLITE_RELAY_SOCKET or ~/.sqlite-relay/relay.sock)
        #[arg(long)]
        socket: Option<String>,

        /// Run in foreground (don't daemonize)
        #[arg(long)]
        foreground: bool,

        /// Max requests waiting for the worker
        #[arg(long, default_value_t = DEFAULT_MAX_PENDING)]
        queue: usize,
    },

    /// Stop the daemon
    Stop {
        /// Socket path
        #[arg(long)]
        socket: Option<String>,
    },

    /// Check daemon status
    Status {
        /// Socket path
        #[arg(long)]
        socket: Option<String>,
    },

    /// Relay NDJSON between stdin and stdout
    Stdio {
        /// Max requests waiting for the worker
        #[arg(long, default_value_t = DEFAULT_MAX_PENDING)]
        queue: usize,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so stdio mode keeps stdout for responses
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            socket,
            foreground,
            queue,
        } => cmd_start(config_for(socket).with_max_pending(queue), foreground),
        Commands::Stop { socket } => cmd_stop(config_for(socket)),
        Commands::Status { socket } => cmd_status(config_for(socket)),
        Commands::Stdio { queue } => {
            let config = RelayConfig::default().with_max_pending(queue);
            runtime()?.block_on(serve_stdio(&config))
        }
    }
}

fn config_for(socket: Option<String>) -> RelayConfig {
    match socket {
        Some(socket) => RelayConfig::default().with_socket(socket),
        None => RelayConfig::default(),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")
}

fn run_server(config: &RelayConfig) -> Result<()> {
    runtime()?.block_on(async {
        let server = RelayServer::new(config)?;
        server.serve().await
    })
}

fn cmd_start(config: RelayConfig, foreground: bool) -> Result<()> {
    // Create parent directory if needed
    if let Some(parent) = Path::new(&config.socket_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    if foreground {
        tracing::info!("starting in foreground");
        return run_server(&config);
    }

    // Fork before any runtime or worker thread exists
    use daemonize::Daemonize;

    let daemonize = Daemonize::new()
        .pid_file(config.pid_file())
        .working_directory("/tmp");

    match daemonize.start() {
        Ok(_) => run_server(&config),
        Err(e) => {
            eprintln!("Failed to daemonize: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_stop(config: RelayConfig) -> Result<()> {
    let pid_file = config.pid_file();

    let pid_str = std::fs::read_to_string(&pid_file)
        .with_context(|| format!("Failed to read pid file {:?}", pid_file))?;
    let pid: i32 = pid_str.trim().parse()?;

    let was_running = send_sigterm(pid)?;

    // Clean up files (stale ones too)
    let _ = std::fs::remove_file(&pid_file);
    let _ = std::fs::remove_file(&config.socket_path);

    if was_running {
        println!("Daemon stopped (pid {})", pid);
    } else {
        println!("Daemon not running (stale pid {})", pid);
    }

    Ok(())
}

/// SIGTERM the daemon. Ok(false) when no such process exists.
fn send_sigterm(pid: i32) -> Result<bool> {
    if pid <= 0 {
        anyhow::bail!("Refusing to signal pid {}", pid);
    }

    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc == 0 {
        return Ok(true);
    }

    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(false)
    } else {
        Err(err).with_context(|| format!("Failed to signal pid {}", pid))
    }
}

fn cmd_status(config: RelayConfig) -> Result<()> {
    match std::os::unix::net::UnixStream::connect(&config.socket_path) {
        Ok(_) => {
            println!("Daemon running at {}", config.socket_path.display());
            Ok(())
        }
        Err(_) => {
            println!("Daemon not running");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigterm_missing_process() {
        // Above any configurable pid_max, so never a live process
        assert!(!send_sigterm(i32::MAX).unwrap());
    }

    #[test]
    fn test_sigterm_rejects_process_groups() {
        assert!(send_sigterm(0).is_err());
        assert!(send_sigterm(-1).is_err());
    }
}
