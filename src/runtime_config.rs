//! # Runtime Configuration Module
//!
//! Environment variable based tuning for the background threads this crate
//! spawns.
//!
//! ## Environment Variables
//!
//! ### `DEFER_INIT_STACK_SIZE`
//!
//! Stack size of the thread that runs a deferred handler's setup. Accepts:
//! - Decimal: `4194304` (4 MiB)
//! - Hexadecimal: `0x400000` (4 MiB)
//!
//! Default: `0x200000` (2 MiB, the platform default for spawned threads)
//!
//! Delegate setups often load large data sets or deeply recursive config
//! trees, so this is the knob to turn when a deferred setup overflows its stack.
//!
//! ## Usage
//!
//! ```rust
//! use defer_dispatch::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Init stack size: {} bytes", config.init_stack_size);
//! ```

use std::env;

/// Default stack size for deferred initialization threads.
pub const DEFAULT_INIT_STACK_SIZE: usize = 0x20_0000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size in bytes for deferred initialization threads
    pub init_stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            init_stack_size: DEFAULT_INIT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let init_stack_size = env::var("DEFER_INIT_STACK_SIZE")
            .ok()
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_INIT_STACK_SIZE);
        RuntimeConfig { init_stack_size }
    }
}

/// Parse a byte size given in decimal or `0x`-prefixed hex. Zero is rejected.
#[must_use]
pub fn parse_size(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    };
    parsed.filter(|size| *size > 0)
}
