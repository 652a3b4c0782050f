//! # CLI Module
//!
//! Command-line front end for checking and exercising service configurations.
//!
//! ## Commands
//!
//! ### `check`
//!
//! Load a configuration and verify every handler type resolves in the
//! built-in registry, including the delegates of `deferred-init` handlers:
//!
//! ```bash
//! defer-dispatch check --config service.yaml
//! ```
//!
//! ### `probe`
//!
//! Deploy a configuration and send requests to one handler until it stops
//! answering `502`, printing every status:
//!
//! ```bash
//! defer-dispatch probe --config service.yaml --handler reports --attempts 50
//! ```
//!
//! Both commands exit non-zero on failure.

mod commands;


pub use commands::{check_config, run, run_cli, Cli, Commands};
