//! Global `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::RpcForgeError;

/// Installs a formatting subscriber for the whole process.
///
/// `RUST_LOG` wins when set (e.g. `RUST_LOG=rpcforge_session=debug`);
/// otherwise `default_level` is used.
///
/// # Errors
/// [`RpcForgeError::Logging`] if a global subscriber is already installed.
pub fn init_logging(default_level: &str) -> Result<(), RpcForgeError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .map_err(|e| RpcForgeError::Logging(e.to_string()))
}
