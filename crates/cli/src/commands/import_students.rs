use std::path::{Path, PathBuf};
use std::sync::Arc;

use classkit_classroom::report::TracingReporter;
use classkit_classroom::sync::{
    CourseRef, EnrollMode, RosterSynchronizer, SyncContext, SyncOutcome, SyncReport,
};
use classkit_core::roster::{write_roster_csv, RosterFormat, RosterSource};
use tracing::info;

use super::{connect, load_config, resolve_course};

/// Options for the `import-students` command.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub course: String,
    pub file: PathBuf,
    /// Overrides detection from the file extension.
    pub format: Option<RosterFormat>,
    /// Overrides `roster.mode` from the configuration.
    pub mode: Option<EnrollMode>,
    pub dry_run: bool,
    /// Where to write the records that need another run.
    pub failed_out: Option<PathBuf>,
}

/// Run the `import-students` command: enrol every student of a roster file.
pub async fn run(config_path: &str, opts: ImportOptions) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let format = match opts.format {
        Some(format) => format,
        None => RosterFormat::from_path(&opts.file)?,
    };
    let bytes = std::fs::read(&opts.file)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", opts.file.display()))?;
    let roster = RosterSource::parse(bytes, format)?;

    if opts.dry_run {
        print_preview(roster);
        return Ok(());
    }

    let mode = opts.mode.unwrap_or_else(|| config.roster.mode.into());
    let client = connect(&config).await?;
    let (course_id, course) = resolve_course(&client, &opts.course).await?;

    info!(course_id, name = %course.name, %mode, file = %opts.file.display(), "importing students");

    let ctx = SyncContext::new(CourseRef::new(course_id), mode);
    let synchronizer = RosterSynchronizer::new(Arc::new(client), Arc::new(TracingReporter));
    let report = synchronizer.run(&ctx, roster).await?;

    print_report(&course.name, &report);

    if let Some(path) = &opts.failed_out {
        write_failed(path, &report)?;
    }

    if let Some(reason) = report.aborted() {
        anyhow::bail!("roster import aborted: {reason}");
    }

    Ok(())
}

fn print_preview(roster: RosterSource) {
    let mut valid = 0;
    let mut skipped = 0;
    println!("Roster preview:");
    for item in roster {
        match item {
            Ok(record) => {
                valid += 1;
                println!(
                    "  line {:>4}  {:<40} {}",
                    record.source_line(),
                    record.identifier(),
                    record.display_name().unwrap_or("")
                );
            }
            Err(row) => {
                skipped += 1;
                println!("  skipped   {row}");
            }
        }
    }
    println!();
    println!("  Valid rows:   {valid}");
    println!("  Skipped rows: {skipped}");
    println!();
    println!("This was a dry run. No students were enrolled.");
}

fn describe(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Failed { kind, message } => format!("failed ({kind}): {message}"),
        other => other.label().to_string(),
    }
}

fn print_report(course_name: &str, report: &SyncReport) {
    println!("Roster import into {course_name} ({} mode):", report.mode());
    for (record, outcome) in report.entries() {
        println!(
            "  line {:>4}  {:<40} {}",
            record.source_line(),
            record.identifier(),
            describe(outcome)
        );
    }
    for row in report.skipped_rows() {
        println!("  skipped   {row}");
    }

    let counts = report.counts();
    println!();
    println!("  Added:            {}", counts.added);
    println!("  Already enrolled: {}", counts.already_enrolled);
    println!("  Failed:           {}", counts.failed);
    println!("  Not attempted:    {}", counts.not_attempted);
    println!("  Skipped rows:     {}", report.skipped_rows().len());
}

/// Write the records to retry to `path`. A clean run removes any retry file
/// left over from an earlier run.
fn write_failed(path: &Path, report: &SyncReport) -> anyhow::Result<()> {
    let failed = report.failed_records();
    if failed.is_empty() {
        match std::fs::remove_file(path) {
            Ok(()) => info!(path = %path.display(), "removed stale retry file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => anyhow::bail!("cannot remove stale {}: {e}", path.display()),
        }
        return Ok(());
    }
    let count = failed.len();
    write_roster_csv(path, failed)?;
    println!();
    println!("Wrote {count} record(s) to retry to {}", path.display());
    Ok(())
}
