//! Logging infrastructure for Sift.
//!
//! This module provides structured logging controlled by the `SIFT_DEBUG`
//! environment variable.
//!
//! # Environment Variables
//!
//! - `SIFT_DEBUG=true` - Enable debug logging
//! - `SIFT_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `SIFT_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use sift_query::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//! ```
//!
//! Within Sift, the standard tracing macros are used; compilation and join
//! realization emit debug/trace events.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `SIFT_DEBUG`.
///
/// Returns `true` if `SIFT_DEBUG` is set to "true", "1", or "yes"
/// (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("SIFT_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `SIFT_LOG_LEVEL`.
///
/// Defaults to "debug" if `SIFT_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    if let Ok(level) = env::var("SIFT_LOG_LEVEL") {
        match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => {
                if is_debug_enabled() {
                    "debug"
                } else {
                    "warn"
                }
            }
        }
    } else if is_debug_enabled() {
        "debug"
    } else {
        "warn"
    }
}

/// Get the configured log format from `SIFT_LOG_FORMAT`.
///
/// Defaults to "json" for structured logging.
pub fn get_log_format() -> &'static str {
    env::var("SIFT_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize the Sift logging system.
///
/// This should be called once at application startup. Subsequent calls are
/// no-ops. Without the `tracing-subscriber` feature the call is silent and
/// the application is expected to install its own subscriber.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("SIFT_LOG_LEVEL").is_err() {
            // no logging requested
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!(
                "sift_query={},sift_schema={}",
                level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            match get_log_format() {
                "json" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
                "compact" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().compact())
                        .init();
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().pretty())
                        .init();
                }
            }

            tracing::info!(
                level = level,
                format = get_log_format(),
                "Sift logging initialized"
            );
        }
    });
}

/// Initialize logging with a specific level.
///
/// # Safety
///
/// This function modifies environment variables, which is unsafe in
/// multi-threaded programs. Call this early in your program before
/// spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: intended for program startup, before threads are spawned.
    unsafe {
        env::set_var("SIFT_LOG_LEVEL", level);
    }
    init();
}
