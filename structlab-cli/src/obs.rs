use anyhow::{anyhow, Result};

/// Install the global subscriber. `STRUCTLAB_LOG` overrides `log_level`
/// with a full filter directive (e.g. `structlab_runner=debug,info`).
pub fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let filter = std::env::var("STRUCTLAB_LOG").unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| anyhow!("invalid log filter: {err}"))?;

    let format = log_format.trim().to_lowercase();
    if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
