use std::fmt;
use chrono::{Local, Utc};
use serde_json::json;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::{Directive, LevelFilter},
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};
use color_eyre::eyre::{Result, WrapErr};
use color_eyre::Section;

use crate::config::Config;

/// One JSON object per line. The `round` and `tool` fields of enclosing spans
/// are lifted to the top level so a log file can be filtered per round trip.
pub struct CustomJsonFormatter;

impl<S, N> FormatEvent<S, N> for CustomJsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let mut round = None;
        let mut tool = None;
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                    if let Some(value) = span_field(fields.as_str(), "round").and_then(|r| r.parse::<u32>().ok()) {
                        round = Some(value);
                    }
                    if let Some(value) = span_field(fields.as_str(), "tool") {
                        tool = Some(value.to_string());
                    }
                }
            }
        }

        let mut visitor = JsonVisitor::new();
        event.record(&mut visitor);

        let mut log_entry = json!({
            "timestamp": Local::now().to_rfc3339(),
            "timestamp_utc": Utc::now().to_rfc3339(),
            "level": metadata.level().to_string(),
            "target": metadata.target(),
            "file": metadata.file(),
            "line": metadata.line(),
            "fields": visitor.fields
        });
        if let Some(round) = round {
            log_entry["round"] = json!(round);
        }
        if let Some(tool) = tool {
            log_entry["tool"] = json!(tool);
        }

        writeln!(writer, "{}", log_entry)
    }
}

/// Value of `name` in a span's formatted fields (`round=2 tool="get_weather"`),
/// with surrounding quotes stripped.
fn span_field<'a>(fields: &'a str, name: &str) -> Option<&'a str> {
    fields.split_whitespace().find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.trim_matches('"'))
    })
}

struct JsonVisitor {
    fields: serde_json::Map<String, serde_json::Value>,
}

impl JsonVisitor {
    fn new() -> Self {
        Self {
            fields: serde_json::Map::new(),
        }
    }
}

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        self.fields.insert(field.name().to_string(), json!(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }
}

/// JSON lines go to a daily file under `config.log_dir`; only warnings and
/// errors reach stderr, keeping stdout for the conversation itself.
/// The returned guard must live until the process exits.
pub fn init_logger(config: &Config) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir)
        .wrap_err_with(|| format!("Failed to create logs directory {:?}", config.log_dir))
        .with_suggestion(|| "Set LOG_DIR to a writable directory")?;

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "weatherbot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let directive = format!("weatherbot={}", config.log_level)
        .parse::<Directive>()
        .wrap_err("Failed to parse log filter directive")
        .with_suggestion(|| "LOG_LEVEL must be one of error, warn, info, debug, trace")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .event_format(CustomJsonFormatter)
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .compact()
                .with_filter(LevelFilter::WARN)
        )
        .with(EnvFilter::from_default_env().add_directive(directive))
        .try_init()
        .wrap_err("Failed to install tracing subscriber")?;

    Ok(guard)
}
