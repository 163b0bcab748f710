use tracing_subscriber::EnvFilter;

/// Installs a test-friendly subscriber once per test binary. Set `RUST_LOG`
/// to see the registry's events.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}
