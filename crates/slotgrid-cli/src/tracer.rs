//! Stderr subscriber for `tracing` events, filtered by `RUST_LOG`.
//!
//! `RUST_LOG` is a comma-separated list of `level`, `target` or
//! `target=level` entries. An event is shown when it is at or above the level
//! of any entry whose target prefixes its own. Unset means silent.

use std::env;
use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::field::Visit;
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_core::span::{Attributes, Id, Record};
use tracing_core::Field;

struct LineVisitor<'a> {
    line: &'a mut String,
}

impl Visit for LineVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let _ = if field.name() == "message" {
            write!(self.line, "{value:?} ")
        } else {
            write!(self.line, "{}={:?} ", field.name(), value)
        };
    }
}

#[derive(Debug, PartialEq)]
struct Directive {
    target: Option<String>,
    level: Level,
}

fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn parse_directives(spec: &str) -> Vec<Directive> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((target, level)) => Directive {
                target: Some(target.to_string()),
                level: parse_level(level).unwrap_or(Level::TRACE),
            },
            None => match parse_level(entry) {
                Some(level) => Directive {
                    target: None,
                    level,
                },
                None => Directive {
                    target: Some(entry.to_string()),
                    level: Level::TRACE,
                },
            },
        })
        .collect()
}

pub struct StderrTracer {
    directives: Vec<Directive>,
}

static NEXT_SPAN: AtomicU64 = AtomicU64::new(1);

impl StderrTracer {
    /// Install as the global default if `RUST_LOG` is set.
    pub fn register() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
        let Ok(spec) = env::var("RUST_LOG") else {
            return Ok(());
        };
        tracing::subscriber::set_global_default(StderrTracer {
            directives: parse_directives(&spec),
        })
    }
}

impl Subscriber for StderrTracer {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        // Level ordering in tracing: TRACE > DEBUG > ... > ERROR.
        self.directives.iter().any(|d| {
            metadata.level() <= &d.level
                && d
                    .target
                    .as_deref()
                    .is_none_or(|t| metadata.target().starts_with(t))
        })
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(NEXT_SPAN.fetch_add(1, Ordering::Relaxed))
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let metadata = event.metadata();
        let mut line = String::new();
        event.record(&mut LineVisitor { line: &mut line });
        eprintln!("{} {}: {}", metadata.level(), metadata.target(), line.trim_end());
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}
