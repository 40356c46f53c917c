//! Rendering of the two-tier action logs (overview + per-phase protocol).
//!
//! Log printing is best-effort: a failure while fetching logs never fails
//! the surrounding operation, the outcome of an action is determined by
//! its status alone.

use tracing::{debug, info};

use adk_common::text::{dashed_line, pad_left, pad_right};
use adk_domain::types::action::{LogEntryStatus, LogOverviewEntry};

use super::ports::SoftwareComponentApi;

/// Page size of the protocol pagination.
pub const ENTRIES_PER_PAGE: usize = 100_000;

const STATUS_WIDTH: usize = 10;
const TIMESTAMP_WIDTH: usize = 29;
const MIN_PHASE_WIDTH: usize = 22;
const EXECUTION_TYPE_WIDTH: usize = 7;

/// Fetch and render all logs of the in-flight action.
pub async fn print_logs<A>(api: &mut A)
where
    A: SoftwareComponentApi + ?Sized,
{
    print_execution_log(api).await;

    let mut overview = match api.log_overview().await {
        Ok(overview) => overview,
        Err(err) => {
            debug!(error = %err, "No log overview available");
            return;
        }
    };
    if overview.is_empty() {
        return;
    }
    overview.sort_by_key(|entry| entry.index);

    print_overview(api, &overview);

    for entry in &overview {
        print_protocol(api, entry).await;
    }
    info!("{}", dashed_line(MIN_PHASE_WIDTH + STATUS_WIDTH + TIMESTAMP_WIDTH + 10));
}

async fn print_execution_log<A>(api: &mut A)
where
    A: SoftwareComponentApi + ?Sized,
{
    let entries = match api.execution_log().await {
        Ok(entries) => entries,
        Err(err) => {
            debug!(error = %err, "No execution log available");
            return;
        }
    };
    if entries.is_empty() {
        return;
    }

    info!("");
    info!("Execution Log");
    for entry in &entries {
        info!("  {} - {}", pad_right(&entry.line_type, EXECUTION_TYPE_WIDTH), entry.description);
    }
}

fn print_overview<A>(api: &A, overview: &[LogOverviewEntry])
where
    A: SoftwareComponentApi + ?Sized,
{
    let phase_width = overview
        .iter()
        .map(|entry| entry.name.len())
        .max()
        .unwrap_or(0)
        .max(MIN_PHASE_WIDTH);
    let line_width = 10 + phase_width + STATUS_WIDTH + TIMESTAMP_WIDTH;

    info!("");
    info!("{}", dashed_line(line_width));
    info!(
        "| {} | {} | {} |",
        pad_right("Phase", phase_width),
        pad_left("Status", STATUS_WIDTH),
        pad_right("Timestamp", TIMESTAMP_WIDTH),
    );
    info!("{}", dashed_line(line_width));
    for entry in overview {
        info!(
            "| {} | {} | {} |",
            pad_right(&entry.name, phase_width),
            pad_left(entry.status.as_str(), STATUS_WIDTH),
            pad_right(&api.convert_time(&entry.timestamp).to_string(), TIMESTAMP_WIDTH),
        );
    }
    info!("{}", dashed_line(line_width));
}

async fn print_protocol<A>(api: &mut A, entry: &LogOverviewEntry)
where
    A: SoftwareComponentApi + ?Sized,
{
    // Failed phases surface at INFO so they reach the pipeline log
    // without raising the verbosity; everything else stays at DEBUG.
    let elevated = entry.status == LogEntryStatus::Error;
    let timestamp = api.convert_time(&entry.timestamp);

    print_leveled(elevated, "");
    print_leveled(elevated, &dashed_line(MIN_PHASE_WIDTH + STATUS_WIDTH + TIMESTAMP_WIDTH));
    print_leveled(elevated, &format!("{} ({})", entry.name, timestamp));
    print_leveled(elevated, &dashed_line(MIN_PHASE_WIDTH + STATUS_WIDTH + TIMESTAMP_WIDTH));

    let mut page = 0;
    loop {
        let (mut lines, count) = match api.log_protocol(entry, page).await {
            Ok(result) => result,
            Err(_) => break,
        };
        lines.sort_by_key(|line| line.protocol_line);
        for line in &lines {
            print_leveled(elevated, &line.description);
        }

        page += 1;
        if lines.is_empty() || count <= page * ENTRIES_PER_PAGE {
            break;
        }
    }
}

fn print_leveled(elevated: bool, message: &str) {
    if elevated {
        info!("{message}");
    } else {
        debug!("{message}");
    }
}
