//! ## pulse-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! `RUST_LOG` wins over the configured level when set. Logs go to stderr;
//! stdout carries the dashboard.

use tracing::{info_span, Instrument, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. Fails if one is already installed.
    pub fn init(default_level: &str) -> Result<(), InitError> {
        Self::subscriber(default_level, std::io::stderr).try_init()?;
        Ok(())
    }

    pub fn subscriber<W>(
        default_level: &str,
        writer: W,
    ) -> impl Subscriber + Send + Sync + 'static
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_writer(writer)
            .with_thread_names(true)
            .with_span_events(FmtSpan::ENTER)
            .finish()
    }

    /// Records a lifecycle event of a replay run (start, stop, hash check)
    /// inside its own span.
    pub async fn log_event(event_type: &str, metadata: Vec<(&'static str, String)>) {
        let span = info_span!("replay_event", event_type = event_type);

        async {
            tracing::info!(metadata = ?metadata, "Replay event");
        }
        .instrument(span)
        .await
    }
}
