pub mod config;
pub mod models;
pub mod safety;

mod phi_audit;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber on stderr.
/// `RUST_LOG` wins over `config::default_log_filter()`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}
