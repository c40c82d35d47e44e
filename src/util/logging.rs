use tracing_subscriber::{fmt, EnvFilter};

/// Initializes tracing. `RUST_LOG` wins over `default_level`; output goes to
/// stderr so stdout only carries the conversation.
pub fn init_tracing(default_level: &str, json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
