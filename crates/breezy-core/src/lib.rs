pub mod config;
pub mod error;
pub mod retry;

pub use config::{
    Config, FirebaseConfig, GoogleConfig, LocationConfig, Theme, UiConfig, UnitSystem,
    ValidationResult, WeatherConfig,
};
pub use error::{
    AppError, AuthError, ConfigError, DatabaseError, NetworkError, ReqwestErrorExt,
    RusqliteErrorExt, WeatherError,
};
pub use retry::{with_retry, RetryConfig};

use anyhow::Result;

/// Initialize logging for the process.
///
/// Honors `RUST_LOG`; defaults to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("Breezy core initialized");
    Ok(())
}
