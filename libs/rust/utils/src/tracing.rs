use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Crates that log every request at info level and drown out the report.
const NOISY_TARGETS: [&str; 5] = [
    "hyper_util",
    "reqwest",
    "alloy_rpc_client",
    "alloy_transport_http",
    "alloy_provider",
];

/// Builds the filter used by `setup_tracing`. `RUST_LOG` wins over `default_level`.
pub fn build_env_filter(default_level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    for target in NOISY_TARGETS {
        if let Ok(directive) = format!("{target}=off").parse() {
            filter = filter.add_directive(directive);
        }
    }

    filter
}

/// Installs the global subscriber. Logs go to stderr so stdout only carries program output.
pub fn setup_tracing(default_level: &str) {
    let fmt_layer = fmt::layer()
        .with_line_number(true)
        .compact()
        .with_writer(std::io::stderr);

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(build_env_filter(default_level))
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_silences_noisy_targets() {
        let filter = build_env_filter("info").to_string();
        for target in NOISY_TARGETS {
            assert!(filter.contains(&format!("{target}=off")), "{filter}");
        }
    }

    #[test]
    fn test_setup_tracing_twice_does_not_panic() {
        setup_tracing("debug");
        setup_tracing("debug");
    }
}
