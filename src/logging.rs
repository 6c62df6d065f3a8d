//! Logging setup for the `vec` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! application's job. The level comes from `[logging]` in the settings file
//! unless `RUST_LOG` is set, which wins:
//!
//! ```bash
//! RUST_LOG=vectara_kit=debug vec index docs ./doc.json
//! ```
//!
//! Output goes to stderr so command output on stdout stays clean.

use std::sync::Once;

use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::settings::LoggingSettings;

static INIT: Once = Once::new();

/// HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Build an `EnvFilter` directive string from settings.
pub fn filter_directives(settings: &LoggingSettings) -> String {
    let mut directives = settings.default.clone();
    for (module, level) in &settings.modules {
        directives.push_str(&format!(",{module}={level}"));
    }
    directives
}

/// Install the global subscriber. Only the first call has any effect.
pub fn init_with_settings(settings: &LoggingSettings) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(filter_directives(settings))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(CompactTime)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let settings = LoggingSettings::default();
        init_with_settings(&settings);
        init_with_settings(&settings);
        tracing::info!("subscriber installed once");
    }

    #[test]
    fn test_directives_default_only() {
        assert_eq!(filter_directives(&LoggingSettings::default()), "warn");
    }

    #[test]
    fn test_directives_with_modules() {
        let mut settings = LoggingSettings::default();
        settings.default = "info".into();
        settings.modules.insert("vectara_kit::session".into(), "trace".into());
        settings.modules.insert("reqwest".into(), "error".into());
        assert_eq!(
            filter_directives(&settings),
            "info,reqwest=error,vectara_kit::session=trace"
        );
    }
}
