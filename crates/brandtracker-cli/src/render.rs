//! Plain-text rendering of a sponsor report.

use std::fmt::Write as _;

use brandtracker_client::FailureReason;
use brandtracker_core::{AggregateView, Report, SponsorRecord};

/// Rows shown in the screen-time chart.
pub(crate) const CHART_ROWS: usize = 10;
const BAR_WIDTH: usize = 40;

pub(crate) fn failure_line(reason: &FailureReason) -> String {
    format!("Analysis failed: {reason}")
}

/// Headline metrics, screen-time chart, and detail table.
pub(crate) fn report(report: &Report, view: &AggregateView) -> String {
    let mut out = String::new();
    out.push_str(&headline(view));
    out.push('\n');

    if view.is_empty() {
        out.push_str("No sponsors detected\n");
        return out;
    }

    out.push_str(&chart(report.chart_rows(CHART_ROWS)));
    out.push('\n');
    out.push_str(&table(report.sponsors()));
    out
}

pub(crate) fn headline(view: &AggregateView) -> String {
    let hottest = view.top_sponsor.as_ref().map_or_else(
        || "N/A".to_owned(),
        |top| format!("{} ({:.1}s on screen)", top.sponsor, top.duration_seconds),
    );

    let mut out = String::new();
    let _ = writeln!(out, "{:<18}{hottest}", "Hottest sponsor");
    let _ = writeln!(out, "{:<18}{}", "Total detections", view.total_detections);
    let _ = writeln!(out, "{:<18}{}", "Unique brands", view.unique_brand_count);
    out
}

/// Horizontal bars scaled to the longest duration among `rows`.
pub(crate) fn chart(rows: &[SponsorRecord]) -> String {
    let name_width = rows
        .iter()
        .map(|r| r.sponsor.chars().count())
        .max()
        .unwrap_or(0);
    let longest = rows
        .iter()
        .map(|r| r.duration_seconds)
        .fold(0.0_f64, f64::max);

    let mut out = format!("Screen time (top {CHART_ROWS})\n");
    for row in rows {
        let bar = "#".repeat(bar_len(row.duration_seconds, longest));
        let _ = writeln!(
            out,
            "{:<name_width$}  {bar} {:.2}s",
            row.sponsor, row.duration_seconds
        );
    }
    out
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn bar_len(duration: f64, longest: f64) -> usize {
    if longest <= 0.0 {
        return 0;
    }
    // Rows are validated as non-negative, so the ratio lies in [0, 1].
    let len = (duration / longest * BAR_WIDTH as f64).round();
    (len.clamp(0.0, BAR_WIDTH as f64) as usize).max(usize::from(duration > 0.0))
}

pub(crate) fn table(rows: &[SponsorRecord]) -> String {
    let mut out = format!(
        "{:<24}{:>14}{:>12}{:>16}\n",
        "SPONSOR", "DURATION (S)", "DETECTIONS", "FIRST SEEN (S)"
    );
    for row in rows {
        let sponsor = if row.sponsor.chars().count() > 22 {
            format!("{}...", row.sponsor.chars().take(19).collect::<String>())
        } else {
            row.sponsor.clone()
        };
        let _ = writeln!(
            out,
            "{:<24}{:>14.2}{:>12}{:>16.1}",
            sponsor, row.duration_seconds, row.detections, row.first_appearance
        );
    }
    out
}
