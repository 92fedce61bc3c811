//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.  `RUST_LOG` wins over `level`.
pub fn init(level: &str) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|err| anyhow::anyhow!("invalid log level/filter {level:?}: {err}"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("telemetry error: {err}"))
}
