//! Prometheus text exposition format.
//!
//! Renders aggregated series into the text format scraped by a Prometheus
//! server. Sums become counters, summaries become summaries with the
//! minimum and maximum reported as quantiles `0` and `1`, last values
//! become gauges.

use std::fmt::Write;

use meterline_api::LabelSet;
use meterline_sdk::Aggregation;

/// Content type of the text exposition format
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// One series to render: instrument name, label set and its aggregate.
pub type Series<'a> = (&'a str, &'a LabelSet, &'a Aggregation);

/// Render series into Prometheus text format.
///
/// Series must arrive grouped by name; a `# TYPE` line is written at the
/// start of each group. No input renders an empty string.
pub fn render<'a, I>(series: I) -> String
where
    I: IntoIterator<Item = Series<'a>>,
{
    let mut out = String::new();
    let mut current: Option<&str> = None;

    for (name, labels, aggregation) in series {
        let metric = sanitize_name(name);
        if current != Some(name) {
            let _ = writeln!(out, "# TYPE {} {}", metric, type_of(aggregation));
            current = Some(name);
        }

        match aggregation {
            Aggregation::Sum(value) | Aggregation::LastValue(value) => {
                write_sample(&mut out, &metric, "", labels, None, value);
            }
            Aggregation::Summary(summary) => {
                write_sample(&mut out, &metric, "_sum", labels, None, &summary.sum);
                write_sample(&mut out, &metric, "_count", labels, None, &summary.count);
                write_sample(&mut out, &metric, "", labels, Some("0"), &summary.min);
                write_sample(&mut out, &metric, "", labels, Some("1"), &summary.max);
            }
        }
    }

    out
}

fn type_of(aggregation: &Aggregation) -> &'static str {
    match aggregation {
        Aggregation::Sum(_) => "counter",
        Aggregation::Summary(_) => "summary",
        Aggregation::LastValue(_) => "gauge",
    }
}

fn write_sample(
    out: &mut String,
    metric: &str,
    suffix: &str,
    labels: &LabelSet,
    quantile: Option<&str>,
    value: &dyn std::fmt::Display,
) {
    out.push_str(metric);
    out.push_str(suffix);

    if !labels.is_empty() || quantile.is_some() {
        out.push('{');
        let mut first = true;
        for (key, val) in labels.iter() {
            if !first {
                out.push(',');
            }
            first = false;
            let _ = write!(out, "{}=\"{}\"", sanitize_name(key), escape_label_value(val));
        }
        if let Some(q) = quantile {
            if !first {
                out.push(',');
            }
            let _ = write!(out, "quantile=\"{}\"", q);
        }
        out.push('}');
    }

    let _ = writeln!(out, " {}", value);
}

/// Replace every character outside `[a-zA-Z0-9_:]` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Escape backslash, double quote and newline in a label value.
pub fn escape_label_value(value: &str) -> String {
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
