//! Tracing subscriber setup
//!
//! JSON output emits one object per event with the structured fields attached
//! at the call site (`request_id`, `stage`, `engine`, `memory_used_mb`, ...).

use tracing_subscriber::EnvFilter;

/// Output format for the fmt subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Build the env filter: `RUST_LOG` wins, otherwise `level` for this crate and
/// `warn` for chromiumoxide, whose CDP handler is noisy.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "kodegen_tools_searchscrape={level},kodegen_searchscrape={level},chromiumoxide=warn,warn"
        ))
    })
}

/// Install the global subscriber, writing to stderr
///
/// Safe to call more than once; only the first call takes effect.
pub fn init(level: &str, format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Json => builder
            .json()
            .with_current_span(true)
            .flatten_event(true)
            .try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
