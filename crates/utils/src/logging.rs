//! Tracing bootstrap for the server binaries.

use strum_macros::{Display, EnumString};
use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, prelude::*};

const DEFAULT_FILTER: &str = "info,sqlx=warn,tower_http=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Installs the global subscriber. A second call is a no-op.
///
/// `RUST_LOG` overrides the default filter. When `sentry_enabled` is set, events at
/// `error` level are forwarded to Sentry through `sentry-tracing`; the Sentry client
/// itself must be initialised beforehand with [`init_sentry`].
pub fn init_tracing(format: LogFormat, sentry_enabled: bool) {
    if dispatcher::has_been_set() {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json_layer = (format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
    });
    let text_layer = (format == LogFormat::Text).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });
    let sentry_layer = sentry_enabled.then(|| sentry_tracing::layer());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_layer)
        .try_init();
}

/// Starts the Sentry client. The returned guard flushes pending events on drop and
/// must be kept alive for the lifetime of the process.
pub fn init_sentry(dsn: &str, environment: &str) -> sentry::ClientInitGuard {
    sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(environment.to_string().into()),
            attach_stacktrace: true,
            ..Default::default()
        },
    ))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("text").unwrap(), LogFormat::Text);
        assert!(LogFormat::from_str("xml").is_err());
    }
}
