//! Observers for synchronisation runs.

use classkit_core::roster::RosterRecord;
use tracing::{error, info, warn};

use crate::sync::{SyncOutcome, SyncReport};

/// Receives each outcome as it is produced, then the finished report.
pub trait Reporter: Send + Sync {
    /// Called once per record, in input order.
    fn record(&self, record: &RosterRecord, outcome: &SyncOutcome);

    /// Called once at the end of the run.
    fn finish(&self, report: &SyncReport);
}

/// Reporter that emits every outcome as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn record(&self, record: &RosterRecord, outcome: &SyncOutcome) {
        let email = record.identifier();
        let line = record.source_line();
        match outcome {
            SyncOutcome::Added(enrollment) => {
                info!(line, email, user_id = enrollment.user_id(), "student added")
            }
            SyncOutcome::AlreadyEnrolled(_) => {
                warn!(line, email, "student already enrolled")
            }
            SyncOutcome::Failed { kind, message } => {
                error!(line, email, %kind, "student not added: {message}")
            }
            SyncOutcome::NotAttempted => warn!(line, email, "student not attempted"),
        }
    }

    fn finish(&self, report: &SyncReport) {
        let counts = report.counts();
        info!(
            course_id = report.course_id(),
            mode = %report.mode(),
            added = counts.added,
            already_enrolled = counts.already_enrolled,
            failed = counts.failed,
            not_attempted = counts.not_attempted,
            skipped_rows = report.skipped_rows().len(),
            "roster sync complete"
        );
        if let Some(reason) = report.aborted() {
            error!(course_id = report.course_id(), "roster sync aborted: {reason}");
        }
    }
}
