use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins; otherwise `info`.
/// Safe to call twice (tests); the second call is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
