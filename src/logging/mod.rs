// Logging module - subscriber setup and per-request access records
//
// Diagnostics go through `tracing`. Every proxied request additionally emits
// exactly one access record on the `a2o::access` target, whichever way it
// ends: success, failure, or the client going away mid-flight.

use std::time::Instant;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, LogRotation, LoggingConfig};
use crate::proxy::error::ProxyError;
use crate::proxy::routing::RoutingDecision;

/// Target for access records, filterable on its own (`RUST_LOG=a2o::access=info`)
pub const ACCESS_TARGET: &str = "a2o::access";

/// Install the global subscriber
///
/// Precedence: RUST_LOG env var > config file > default "info". The returned
/// guard flushes the file writer and must live until shutdown.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let default_filter = format!("a2o={},tower_http=info,axum=info", config.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let stdout = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };

    // File layer is always JSON for structured log parsing
    let (file, guard) = if config.file_enabled {
        std::fs::create_dir_all(&config.file_dir).with_context(|| {
            format!("Could not create log directory {}", config.file_dir.display())
        })?;

        let appender = match config.file_rotation {
            LogRotation::Hourly => {
                tracing_appender::rolling::hourly(&config.file_dir, &config.file_prefix)
            }
            LogRotation::Daily => {
                tracing_appender::rolling::daily(&config.file_dir, &config.file_prefix)
            }
            LogRotation::Never => {
                tracing_appender::rolling::never(&config.file_dir, &config.file_prefix)
            }
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// One access record, emitted exactly once
///
/// Finish with [`success`](Self::success) or [`failure`](Self::failure).
/// Dropping an unfinished record logs `proxy.cancelled`, which is what
/// happens when a client disconnects mid-request or mid-stream.
#[derive(Debug)]
pub struct RequestLog {
    started: Instant,
    model: Option<String>,
    stream: bool,
    provider: Option<String>,
    endpoint: Option<String>,
    key: Option<String>,
    finished: bool,
}

impl RequestLog {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            model: None,
            stream: false,
            provider: None,
            endpoint: None,
            key: None,
            finished: false,
        }
    }

    pub fn parsed(&mut self, model: &str, stream: bool) {
        self.model = Some(model.to_string());
        self.stream = stream;
    }

    /// Record the routing target; only the credential's fingerprint is kept
    pub fn routed(&mut self, route: &RoutingDecision) {
        self.provider = Some(route.provider.clone());
        self.endpoint = Some(route.base_url.clone());
        self.key = Some(route.credential.fingerprint());
    }

    pub fn success(mut self, input_tokens: u32, output_tokens: u32) {
        self.finished = true;
        tracing::info!(
            target: ACCESS_TARGET,
            ts = chrono::Utc::now().timestamp_millis(),
            event = "proxy.success",
            model = self.model(),
            provider = self.provider(),
            endpoint = self.endpoint(),
            stream = self.stream,
            key = self.key(),
            input_tokens,
            output_tokens,
            duration_ms = self.elapsed_ms(),
        );
    }

    pub fn failure(mut self, err: &ProxyError) {
        self.finished = true;
        let ts = chrono::Utc::now().timestamp_millis();
        let (model, provider, endpoint, key) =
            (self.model(), self.provider(), self.endpoint(), self.key());
        let stream = self.stream;
        let duration_ms = self.elapsed_ms();
        let error = err.to_string();
        let error_kind = err.kind();

        macro_rules! record {
            ($level:ident) => {
                tracing::$level!(
                    target: ACCESS_TARGET,
                    ts,
                    event = "proxy.error",
                    model,
                    provider,
                    endpoint,
                    stream,
                    key,
                    error = %error,
                    error_kind,
                    duration_ms,
                )
            };
        }

        match err {
            ProxyError::Translation(_) => record!(error),
            _ if err.is_client_error() => record!(info),
            _ => record!(warn),
        }
    }

    fn model(&self) -> &str {
        self.model.as_deref().unwrap_or("-")
    }

    fn provider(&self) -> &str {
        self.provider.as_deref().unwrap_or("-")
    }

    fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or("-")
    }

    fn key(&self) -> &str {
        self.key.as_deref().unwrap_or("-")
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

impl Drop for RequestLog {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::info!(
            target: ACCESS_TARGET,
            ts = chrono::Utc::now().timestamp_millis(),
            event = "proxy.cancelled",
            model = self.model(),
            provider = self.provider(),
            endpoint = self.endpoint(),
            stream = self.stream,
            key = self.key(),
            duration_ms = self.elapsed_ms(),
        );
    }
}

#[cfg(test)]
pub(crate) mod capture {
    //! Test layer that keeps access records in memory

    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use tracing::{Level, Subscriber};
    use tracing_subscriber::layer::Context;
    use tracing_subscriber::Layer;

    #[derive(Debug, Clone)]
    pub struct Record {
        pub level: Level,
        pub fields: BTreeMap<String, String>,
    }

    #[derive(Clone, Default)]
    pub struct CaptureLayer {
        pub records: Arc<Mutex<Vec<Record>>>,
    }

    impl<S: Subscriber> Layer<S> for CaptureLayer {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if event.metadata().target() != super::ACCESS_TARGET {
                return;
            }
            let mut fields = BTreeMap::new();
            event.record(&mut FieldVisitor(&mut fields));
            self.records.lock().unwrap().push(Record {
                level: *event.metadata().level(),
                fields,
            });
        }
    }

    struct FieldVisitor<'a>(&'a mut BTreeMap<String, String>);

    impl tracing::field::Visit for FieldVisitor<'_> {
        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            self.0.insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            self.0.insert(field.name().to_string(), format!("{:?}", value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::capture::CaptureLayer;
    use super::*;
    use crate::config::ProviderAuth;
    use crate::proxy::routing::Credential;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    fn captured(f: impl FnOnce()) -> Vec<super::capture::Record> {
        let layer = CaptureLayer::default();
        let records = layer.records.clone();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);
        let out = records.lock().unwrap().clone();
        out
    }

    fn route() -> RoutingDecision {
        RoutingDecision {
            provider: "cerebras".to_string(),
            base_url: "https://api.cerebras.ai/v1".to_string(),
            auth: ProviderAuth::default(),
            credential: Credential::new("sk-very-secret"),
        }
    }

    #[test]
    fn test_success_record_fields() {
        let records = captured(|| {
            let mut log = RequestLog::start();
            log.parsed("llama3.1-8b", false);
            log.routed(&route());
            log.success(13, 7);
        });

        assert_eq!(records.len(), 1);
        let fields = &records[0].fields;
        assert_eq!(fields["event"], "proxy.success");
        assert_eq!(fields["model"], "llama3.1-8b");
        assert_eq!(fields["provider"], "cerebras");
        assert_eq!(fields["endpoint"], "https://api.cerebras.ai/v1");
        assert_eq!(fields["input_tokens"], "13");
        assert_eq!(fields["output_tokens"], "7");
        assert_eq!(fields["key"].len(), 16);
        assert!(fields.values().all(|v| !v.contains("sk-very-secret")));
    }

    #[test]
    fn test_failure_levels_follow_error_kind() {
        let records = captured(|| {
            RequestLog::start().failure(&ProxyError::Validation("bad".into()));
            RequestLog::start().failure(&ProxyError::UpstreamStatus {
                status: 429,
                body: "slow down".into(),
            });
            RequestLog::start().failure(&ProxyError::Translation("no usage".into()));
        });

        let levels: Vec<Level> = records.iter().map(|r| r.level).collect();
        assert_eq!(levels, vec![Level::INFO, Level::WARN, Level::ERROR]);
        assert_eq!(records[1].fields["event"], "proxy.error");
        assert_eq!(records[1].fields["error_kind"], "upstream_status");
    }

    #[test]
    fn test_unfinished_record_logs_cancelled_once() {
        let records = captured(|| {
            let mut log = RequestLog::start();
            log.parsed("gpt-4o", true);
            drop(log);
        });

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields["event"], "proxy.cancelled");
        assert_eq!(records[0].fields["stream"], "true");
    }
}
