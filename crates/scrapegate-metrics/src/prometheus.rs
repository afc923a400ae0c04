//! Prometheus text exposition format.
//!
//! Renders a registry into the text format (version 0.0.4) for scraping
//! by a Prometheus server or compatible agent.

use std::fmt::Write;

use crate::metric::{Metric, MetricKind, Sample};
use crate::registry::Registry;

/// Content type of a rendered exposition body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render every metric of the registry, in registry order.
///
/// Each metric emits an optional `# HELP` line, a `# TYPE` line unless it
/// is untyped, and one line per sample. An empty registry renders to an
/// empty string.
pub fn render_prometheus(registry: &Registry) -> String {
    let mut out = String::new();
    for metric in registry.all() {
        render_metric(&mut out, metric);
    }
    out
}

fn render_metric(out: &mut String, metric: &dyn Metric) {
    let name = metric.name();

    if let Some(help) = metric.help() {
        out.push_str("# HELP ");
        out.push_str(name);
        out.push(' ');
        out.push_str(&escape_help(help));
        out.push('\n');
    }

    if metric.kind() != MetricKind::Untyped {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "# TYPE {name} {}", metric.kind());
    }

    for sample in metric.samples() {
        render_sample(out, name, &sample);
    }
}

fn render_sample(out: &mut String, name: &str, sample: &Sample) {
    out.push_str(name);

    if !sample.labels.is_empty() {
        out.push('{');
        for (i, (key, value)) in sample.labels.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_label_value(value));
            out.push('"');
        }
        out.push('}');
    }

    out.push(' ');
    out.push_str(&format_value(sample.value));

    if let Some(ts) = sample.timestamp_ms {
        let _ = write!(out, " {ts}");
    }
    out.push('\n');
}

/// Format a sample value so it parses back to the same `f64`.
///
/// `Display` for `f64` prints the shortest round-tripping decimal
/// (`42.0` → `42`). Non-finite values use the format's tokens.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}
