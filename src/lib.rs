pub mod concepts;
pub mod config;
pub mod error;
pub mod innovation;
pub mod models;
pub mod random_concept;
pub mod server;
pub mod tabular;

/// Initialize tracing with the configured filter; RUST_LOG wins when set.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
