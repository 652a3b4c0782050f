use crate::config::{load_config, ServiceConfig};
use crate::deferred::{DEFERRED_INIT_HANDLER_TYPE, DELEGATE_HANDLER_TYPE_PARAM, NOT_READY_STATUS};
use crate::deploy::deploy;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::registry::HandlerRegistry;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use http::Method;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

/// Command-line interface for defer-dispatch
///
/// Validates service configurations and probes deployed handlers.
#[derive(Debug, Parser)]
#[command(name = "defer-dispatch")]
#[command(about = "Named handlers with deferred initialization", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check that every handler type in a config resolves
    ///
    /// Also checks the `delegate-handler-type` of every `deferred-init` handler.
    Check {
        /// Path to the service configuration (YAML)
        #[arg(short, long, env = "DEFER_CONFIG")]
        config: PathBuf,
    },
    /// Deploy a config and probe one handler until it is ready
    ///
    /// Requests are repeated while the handler answers 502 (not loaded yet).
    /// Exits non-zero if the handler never becomes ready or its final
    /// response is not a success.
    Probe {
        /// Path to the service configuration (YAML)
        #[arg(short, long, env = "DEFER_CONFIG")]
        config: PathBuf,

        /// Name of the handler to probe
        #[arg(long)]
        handler: String,

        /// Request path sent with each probe
        #[arg(long, default_value = "/")]
        path: String,

        /// Maximum number of probe requests
        #[arg(long, default_value_t = 20)]
        attempts: u32,

        /// Pause between probe requests in milliseconds
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
    },
}

/// Problems that would make `deploy` fail for `config` against `registry`.
///
/// Parameters are checked only as far as the registry can tell without
/// running any setup.
#[must_use]
pub fn check_config(config: &ServiceConfig, registry: &HandlerRegistry) -> Vec<String> {
    let mut problems = Vec::new();
    for entry in &config.handlers {
        let handler_type = entry.handler_type.trim();
        if handler_type == DEFERRED_INIT_HANDLER_TYPE {
            let delegate = entry
                .to_handler_config()
                .ok()
                .and_then(|c| c.param(DELEGATE_HANDLER_TYPE_PARAM).map(|d| d.trim().to_string()))
                .filter(|d| !d.is_empty());
            match delegate {
                None => problems.push(format!(
                    "handler '{}': please set the '{}' init parameter",
                    entry.name, DELEGATE_HANDLER_TYPE_PARAM
                )),
                Some(delegate) if !registry.contains(&delegate) => problems.push(format!(
                    "handler '{}': cannot find the delegate handler type '{}'",
                    entry.name, delegate
                )),
                Some(_) => {}
            }
        } else if !registry.contains(handler_type) {
            problems.push(format!(
                "handler '{}': cannot find the handler type '{}'",
                entry.name, handler_type
            ));
        }
    }
    problems
}

fn print_response(attempt: u32, resp: &HandlerResponse) {
    println!("attempt {}: {} {}", attempt, resp.status, resp.body);
}

fn probe(
    config: &ServiceConfig,
    registry: &Arc<HandlerRegistry>,
    handler: &str,
    path: &str,
    attempts: u32,
    interval: Duration,
) -> Result<()> {
    if config.entry(handler).is_none() {
        bail!("handler '{}' is not declared in the config", handler);
    }
    let mut dispatcher = deploy(config, registry).context("Deployment failed")?;

    let mut last = None;
    for attempt in 1..=attempts.max(1) {
        let req = HandlerRequest::new(Method::GET, handler, path);
        let Some(resp) = dispatcher.dispatch(req) else {
            bail!("handler '{}' is not registered", handler);
        };
        print_response(attempt, &resp);
        let ready = resp.status != NOT_READY_STATUS;
        last = Some(resp);
        if ready {
            break;
        }
        if attempt < attempts {
            thread::sleep(interval);
        }
    }
    dispatcher.shutdown();

    match last {
        Some(resp) if resp.status == NOT_READY_STATUS => {
            bail!("handler '{}' not ready after {} attempts", handler, attempts)
        }
        Some(resp) if !resp.is_success() => {
            bail!("handler '{}' answered with status {}", handler, resp.status)
        }
        _ => Ok(()),
    }
}

/// Execute a parsed command against the built-in registry.
pub fn run(cli: Cli) -> Result<()> {
    let registry = Arc::new(HandlerRegistry::builtin());
    match cli.command {
        Commands::Check { config } => {
            let service = load_config(&config)?;
            let problems = check_config(&service, &registry);
            if !problems.is_empty() {
                for problem in &problems {
                    eprintln!("error: {}", problem);
                }
                bail!("{} problem(s) found in {}", problems.len(), config.display());
            }
            info!(
                config = %config.display(),
                handlers = service.handlers.len(),
                "Configuration is valid"
            );
            println!(
                "{}: {} handler(s) OK",
                config.display(),
                service.handlers.len()
            );
            Ok(())
        }
        Commands::Probe {
            config,
            handler,
            path,
            attempts,
            interval_ms,
        } => {
            let service = load_config(&config)?;
            probe(
                &service,
                &registry,
                &handler,
                &path,
                attempts,
                Duration::from_millis(interval_ms),
            )
        }
    }
}

/// Parse the process arguments and run the selected command.
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}
