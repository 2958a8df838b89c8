//! Tracing initialization, lifted from the teacher's `main.rs` and
//! extended with an env-filter so `RUST_LOG` can tune verbosity per
//! module without a rebuild.

use tracing_subscriber::EnvFilter;

pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .init();
}
