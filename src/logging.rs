use anyhow::Context as _;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "questionbank=info,warn";

/// Structured logs go to stderr so `slug` and `locate` keep stdout for their answer.
pub fn init() -> anyhow::Result<()> {
    init_with(DEFAULT_FILTER)
}

pub fn init_with(default_filter: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_filter))
        .with_context(|| format!("build log filter: {default_filter}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
