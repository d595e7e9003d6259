/*!
Logging setup for shadow binaries.

The library itself only emits `tracing` events; binaries call
[`init_tracing`] once at startup to install a subscriber.
*/

use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::{Result, ShadowError};

/// Logging options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Log at debug level unless `RUST_LOG` says otherwise
    pub verbose: bool,
    /// Emit JSON lines instead of human readable text
    pub json: bool,
}

/// Build the filter used by [`init_tracing`]
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when verbose.
pub fn env_filter(verbose: bool) -> EnvFilter {
    let default_level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global tracing subscriber
///
/// Logs go to stderr so they never mix with command output.
///
/// # Errors
/// * `ShadowError::Config` - If a global subscriber is already installed
pub fn init_tracing(options: LogOptions) -> Result<()> {
    let filter = env_filter(options.verbose);

    let installed = if options.json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false)
            .with_writer(std::io::stderr);
        set_global_default(Registry::default().with(filter).with(fmt_layer))
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        set_global_default(Registry::default().with(filter).with(fmt_layer))
    };

    installed.map_err(|e| {
        ShadowError::config(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::debug!("Tracing initialized");
    Ok(())
}
