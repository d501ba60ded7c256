//! Tracing setup for binaries embedding the randomizer.

/// Installs a stderr subscriber honoring `RUST_LOG`, defaulting to INFO.
pub fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
