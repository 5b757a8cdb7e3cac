//! Bulk roster synchronisation engine.

use std::sync::Arc;

use classkit_core::config::EnrollModeConfig;
use classkit_core::error::{ClasskitError, ErrorKind, RemoteErrorKind, Result};
use classkit_core::roster::{RosterFormat, RosterRecord, RosterSource, RowError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{EnrollResult, RosterApi};
use crate::models::Enrollment;
use crate::report::Reporter;

/// Identifier of the course a run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRef {
    course_id: String,
}

impl CourseRef {
    pub fn new(course_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
        }
    }

    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    /// Reject ids that can never name a course.
    pub fn validate(&self) -> Result<()> {
        if self.course_id.trim().is_empty() {
            return Err(ClasskitError::InvalidCourse("course id is empty".into()));
        }
        if self.course_id.trim() != self.course_id {
            return Err(ClasskitError::InvalidCourse(format!(
                "course id '{}' has surrounding whitespace",
                self.course_id
            )));
        }
        if self.course_id.contains('/') {
            return Err(ClasskitError::InvalidCourse(format!(
                "course id '{}' contains '/'",
                self.course_id
            )));
        }
        Ok(())
    }
}

/// How students are brought into the course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollMode {
    /// Enrol directly. Requires domain administrator rights.
    Add,
    /// Send an invitation the student must accept.
    #[default]
    Invite,
}

impl From<EnrollModeConfig> for EnrollMode {
    fn from(mode: EnrollModeConfig) -> Self {
        match mode {
            EnrollModeConfig::Add => Self::Add,
            EnrollModeConfig::Invite => Self::Invite,
        }
    }
}

impl std::fmt::Display for EnrollMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Invite => f.write_str("invite"),
        }
    }
}

/// Everything a single run needs besides the roster itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncContext {
    pub course: CourseRef,
    pub mode: EnrollMode,
}

impl SyncContext {
    pub fn new(course: CourseRef, mode: EnrollMode) -> Self {
        Self { course, mode }
    }
}

/// Result of synchronising one roster record.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Added(Enrollment),
    AlreadyEnrolled(Enrollment),
    /// The provider rejected the call; carries its message verbatim.
    Failed {
        kind: RemoteErrorKind,
        message: String,
    },
    /// The run was aborted before this record was tried.
    NotAttempted,
}

impl SyncOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::AlreadyEnrolled(_) => "already enrolled",
            Self::Failed { .. } => "failed",
            Self::NotAttempted => "not attempted",
        }
    }

    /// Run-level error category, for failed outcomes.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Failed { .. } => Some(ErrorKind::RemoteError),
            _ => None,
        }
    }

    /// True when the record should be included in a re-run.
    pub fn needs_retry(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::NotAttempted)
    }
}

/// Number of records per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub added: usize,
    pub already_enrolled: usize,
    pub failed: usize,
    pub not_attempted: usize,
}

impl OutcomeCounts {
    fn tally<'a>(outcomes: impl Iterator<Item = &'a SyncOutcome>) -> Self {
        let mut counts = Self::default();
        for outcome in outcomes {
            match outcome {
                SyncOutcome::Added(_) => counts.added += 1,
                SyncOutcome::AlreadyEnrolled(_) => counts.already_enrolled += 1,
                SyncOutcome::Failed { .. } => counts.failed += 1,
                SyncOutcome::NotAttempted => counts.not_attempted += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.added + self.already_enrolled + self.failed + self.not_attempted
    }
}

/// Immutable summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    course_id: String,
    mode: EnrollMode,
    entries: Vec<(RosterRecord, SyncOutcome)>,
    skipped_rows: Vec<RowError>,
    counts: OutcomeCounts,
    aborted: Option<String>,
}

impl SyncReport {
    fn new(
        ctx: &SyncContext,
        entries: Vec<(RosterRecord, SyncOutcome)>,
        skipped_rows: Vec<RowError>,
        aborted: Option<String>,
    ) -> Self {
        let counts = OutcomeCounts::tally(entries.iter().map(|(_, o)| o));
        Self {
            course_id: ctx.course.course_id().to_string(),
            mode: ctx.mode,
            entries,
            skipped_rows,
            counts,
            aborted,
        }
    }

    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    pub fn mode(&self) -> EnrollMode {
        self.mode
    }

    /// One entry per parsed record, in input order.
    pub fn entries(&self) -> &[(RosterRecord, SyncOutcome)] {
        &self.entries
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.entries.iter().map(|(_, o)| o)
    }

    /// Rows dropped by the reader, with their line numbers.
    pub fn skipped_rows(&self) -> &[RowError] {
        &self.skipped_rows
    }

    pub fn counts(&self) -> OutcomeCounts {
        self.counts
    }

    /// Reason the run stopped early, if it did.
    pub fn aborted(&self) -> Option<&str> {
        self.aborted.as_deref()
    }

    /// Records that were rejected or never tried.
    pub fn failed_records(&self) -> Vec<&RosterRecord> {
        self.entries
            .iter()
            .filter(|(_, o)| o.needs_retry())
            .map(|(r, _)| r)
            .collect()
    }

    /// True when every record was added or already present.
    pub fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.counts.failed == 0 && self.counts.not_attempted == 0
    }
}

/// Applies a roster to one course, one record at a time.
pub struct RosterSynchronizer<A: RosterApi> {
    api: Arc<A>,
    reporter: Arc<dyn Reporter>,
}

impl<A: RosterApi> RosterSynchronizer<A> {
    pub fn new(api: Arc<A>, reporter: Arc<dyn Reporter>) -> Self {
        Self { api, reporter }
    }

    /// Parse `bytes` and run. Parse failures surface before any remote call.
    pub async fn sync_bytes(
        &self,
        ctx: &SyncContext,
        bytes: Vec<u8>,
        format: RosterFormat,
    ) -> Result<SyncReport> {
        let roster = RosterSource::parse(bytes, format)?;
        self.run(ctx, roster).await
    }

    /// Enrol every record of `roster` into the course.
    ///
    /// Fails only when the course does not resolve or credentials are
    /// rejected before the first enrolment. Per-record rejections are
    /// reported as [`SyncOutcome::Failed`]. Credentials rejected mid-run
    /// stop the run; the remaining records are [`SyncOutcome::NotAttempted`].
    pub async fn run(&self, ctx: &SyncContext, roster: RosterSource) -> Result<SyncReport> {
        ctx.course.validate()?;
        let course_id = ctx.course.course_id();
        self.check_course(course_id).await?;

        info!(course_id, mode = %ctx.mode, format = %roster.format(), "starting roster sync");

        let mut entries = Vec::new();
        let mut skipped_rows = Vec::new();
        let mut aborted: Option<String> = None;

        for item in roster {
            let record = match item {
                Ok(record) => record,
                Err(row) => {
                    warn!(line = row.line, reason = %row.reason, "skipping malformed roster row");
                    skipped_rows.push(row);
                    continue;
                }
            };

            let outcome = if aborted.is_some() {
                SyncOutcome::NotAttempted
            } else {
                match self.enroll(ctx, &record).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(line = record.source_line(), error = %e, "stopping roster sync");
                        aborted = Some(e.to_string());
                        SyncOutcome::NotAttempted
                    }
                }
            };

            self.reporter.record(&record, &outcome);
            entries.push((record, outcome));
        }

        let report = SyncReport::new(ctx, entries, skipped_rows, aborted);
        self.reporter.finish(&report);
        Ok(report)
    }

    async fn check_course(&self, course_id: &str) -> Result<()> {
        match self.api.get_course(course_id).await {
            Ok(Some(course)) => {
                debug!(course_id, name = %course.name, "target course resolved");
                Ok(())
            }
            Ok(None) => Err(ClasskitError::InvalidCourse(format!(
                "course {course_id} does not exist"
            ))),
            Err(ClasskitError::Remote {
                kind: RemoteErrorKind::NotFound | RemoteErrorKind::InvalidIdentifier,
                message,
                ..
            }) => Err(ClasskitError::InvalidCourse(format!(
                "course {course_id}: {message}"
            ))),
            Err(e) => Err(e),
        }
    }

    /// One enrolment call. `Err` only for authentication failures.
    async fn enroll(&self, ctx: &SyncContext, record: &RosterRecord) -> Result<SyncOutcome> {
        let course_id = ctx.course.course_id();
        let result = match ctx.mode {
            EnrollMode::Add => self.api.add_student(course_id, record.identifier()).await,
            EnrollMode::Invite => self.api.invite_student(course_id, record.identifier()).await,
        };

        match result {
            Ok(EnrollResult::Added(enrollment)) => Ok(SyncOutcome::Added(enrollment)),
            Ok(EnrollResult::AlreadyEnrolled(enrollment)) => {
                Ok(SyncOutcome::AlreadyEnrolled(enrollment))
            }
            Err(e) if e.kind() == ErrorKind::AuthError => Err(e),
            Err(e) => {
                let (kind, message) = e.remote_parts();
                Ok(SyncOutcome::Failed { kind, message })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, CourseRole, Invitation, Student};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeClassroom {
        courses: HashSet<String>,
        enrolled: Mutex<HashSet<String>>,
        rejects: HashMap<String, (u16, String)>,
        expire_token_at: Option<String>,
        course_lookups: Mutex<usize>,
        calls: Mutex<Vec<(EnrollMode, String)>>,
    }

    impl FakeClassroom {
        fn with_course(course_id: &str) -> Self {
            Self {
                courses: HashSet::from([course_id.to_string()]),
                ..Self::default()
            }
        }

        fn reject(mut self, email: &str, status: u16, message: &str) -> Self {
            self.rejects
                .insert(email.to_string(), (status, message.to_string()));
            self
        }

        fn enrolled(self, email: &str) -> Self {
            self.enrolled.lock().unwrap().insert(email.to_string());
            self
        }

        fn calls(&self) -> Vec<(EnrollMode, String)> {
            self.calls.lock().unwrap().clone()
        }

        fn enroll(&self, mode: EnrollMode, course_id: &str, user_id: &str) -> Result<EnrollResult> {
            self.calls
                .lock()
                .unwrap()
                .push((mode, user_id.to_string()));

            if self.expire_token_at.as_deref() == Some(user_id) {
                return Err(ClasskitError::Auth("token expired".into()));
            }
            if let Some((status, message)) = self.rejects.get(user_id) {
                return Err(ClasskitError::Remote {
                    status: *status,
                    kind: RemoteErrorKind::from_status(*status, None),
                    message: message.clone(),
                });
            }

            let enrollment = match mode {
                EnrollMode::Add => Enrollment::Student(Student {
                    course_id: course_id.to_string(),
                    user_id: user_id.to_string(),
                    profile: None,
                }),
                EnrollMode::Invite => Enrollment::Invitation(Invitation {
                    id: Some(format!("inv-{user_id}")),
                    user_id: user_id.to_string(),
                    course_id: course_id.to_string(),
                    role: CourseRole::Student,
                }),
            };

            let newly_added = self.enrolled.lock().unwrap().insert(user_id.to_string());
            if newly_added {
                Ok(EnrollResult::Added(enrollment))
            } else {
                Ok(EnrollResult::AlreadyEnrolled(enrollment))
            }
        }
    }

    #[async_trait]
    impl RosterApi for FakeClassroom {
        async fn get_course(&self, course_id: &str) -> Result<Option<Course>> {
            *self.course_lookups.lock().unwrap() += 1;
            Ok(self.courses.contains(course_id).then(|| Course {
                id: Some(course_id.to_string()),
                name: "Algebra".into(),
                ..Course::default()
            }))
        }

        async fn add_student(&self, course_id: &str, user_id: &str) -> Result<EnrollResult> {
            self.enroll(EnrollMode::Add, course_id, user_id)
        }

        async fn invite_student(&self, course_id: &str, user_id: &str) -> Result<EnrollResult> {
            self.enroll(EnrollMode::Invite, course_id, user_id)
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        seen: Mutex<Vec<(String, &'static str)>>,
        finished: Mutex<Vec<OutcomeCounts>>,
    }

    impl Reporter for RecordingReporter {
        fn record(&self, record: &RosterRecord, outcome: &SyncOutcome) {
            self.seen
                .lock()
                .unwrap()
                .push((record.identifier().to_string(), outcome.label()));
        }

        fn finish(&self, report: &SyncReport) {
            self.finished.lock().unwrap().push(report.counts());
        }
    }

    fn ctx(mode: EnrollMode) -> SyncContext {
        SyncContext::new(CourseRef::new("c1"), mode)
    }

    fn synchronizer(api: &Arc<FakeClassroom>) -> RosterSynchronizer<FakeClassroom> {
        RosterSynchronizer::new(api.clone(), Arc::new(crate::report::TracingReporter))
    }

    async fn run_csv(api: &Arc<FakeClassroom>, mode: EnrollMode, csv: &str) -> Result<SyncReport> {
        synchronizer(api)
            .sync_bytes(&ctx(mode), csv.as_bytes().to_vec(), RosterFormat::Csv)
            .await
    }

    fn labels(report: &SyncReport) -> Vec<(&str, &'static str)> {
        report
            .entries()
            .iter()
            .map(|(r, o)| (r.identifier(), o.label()))
            .collect()
    }

    const TWO_STUDENTS: &str = "email,name\na@x.com,A\nb@x.com,B\n";

    #[tokio::test]
    async fn all_students_added() {
        let api = Arc::new(FakeClassroom::with_course("c1"));
        let report = run_csv(&api, EnrollMode::Add, TWO_STUDENTS).await.unwrap();

        assert_eq!(labels(&report), vec![("a@x.com", "added"), ("b@x.com", "added")]);
        assert_eq!(
            report.counts(),
            OutcomeCounts {
                added: 2,
                ..OutcomeCounts::default()
            }
        );
        assert!(report.is_clean());
        assert_eq!(report.course_id(), "c1");
    }

    #[tokio::test]
    async fn one_rejection_does_not_stop_the_run() {
        let api = Arc::new(FakeClassroom::with_course("c1").reject(
            "b@x.com",
            404,
            "student not found",
        ));
        let report = run_csv(&api, EnrollMode::Add, TWO_STUDENTS).await.unwrap();

        let outcomes: Vec<&SyncOutcome> = report.outcomes().collect();
        assert!(matches!(outcomes[0], SyncOutcome::Added(_)));
        assert_eq!(
            outcomes[1],
            &SyncOutcome::Failed {
                kind: RemoteErrorKind::NotFound,
                message: "student not found".into(),
            }
        );
        assert_eq!(outcomes[1].error_kind(), Some(ErrorKind::RemoteError));
        assert_eq!(report.counts().failed, 1);
        assert!(!report.is_clean());
        assert!(report.aborted().is_none());
    }

    #[tokio::test]
    async fn middle_rejection_leaves_neighbours_added() {
        let api = Arc::new(FakeClassroom::with_course("c1").reject(
            "b@x.com",
            404,
            "student not found",
        ));
        let report = run_csv(&api, EnrollMode::Add, "email\na@x.com\nb@x.com\nc@x.com\n")
            .await
            .unwrap();

        assert_eq!(
            labels(&report),
            vec![
                ("a@x.com", "added"),
                ("b@x.com", "failed"),
                ("c@x.com", "added"),
            ]
        );
        assert!(report.aborted().is_none());
        assert_eq!(api.calls().len(), 3);
        assert_eq!(report.counts().added, 2);
        assert_eq!(report.counts().failed, 1);
    }

    #[tokio::test]
    async fn json_student_already_enrolled() {
        let api = Arc::new(FakeClassroom::with_course("c1").enrolled("a@x.com"));
        let report = synchronizer(&api)
            .sync_bytes(
                &ctx(EnrollMode::Add),
                br#"[{"email":"a@x.com"}]"#.to_vec(),
                RosterFormat::Json,
            )
            .await
            .unwrap();

        assert_eq!(labels(&report), vec![("a@x.com", "already enrolled")]);
        assert_eq!(report.counts().already_enrolled, 1);
    }

    #[tokio::test]
    async fn missing_email_column_makes_no_remote_calls() {
        let api = Arc::new(FakeClassroom::with_course("c1"));
        let err = run_csv(&api, EnrollMode::Add, "name\nAnn\n")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(api.calls().is_empty());
        assert_eq!(*api.course_lookups.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn json_element_without_email_makes_no_remote_calls() {
        let api = Arc::new(FakeClassroom::with_course("c1"));
        let err = synchronizer(&api)
            .sync_bytes(
                &ctx(EnrollMode::Add),
                br#"[{"email":"a@x.com"},{"name":"B"}]"#.to_vec(),
                RosterFormat::Json,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ClasskitError::MalformedInput(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_course_is_fatal_before_enrolment() {
        let api = Arc::new(FakeClassroom::with_course("other"));
        let err = run_csv(&api, EnrollMode::Add, TWO_STUDENTS)
            .await
            .unwrap_err();

        assert!(matches!(err, ClasskitError::InvalidCourse(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_course_ref_skips_lookup() {
        let api = Arc::new(FakeClassroom::with_course("c1"));
        let ctx = SyncContext::new(CourseRef::new("c1/students"), EnrollMode::Add);
        let err = synchronizer(&api)
            .sync_bytes(&ctx, TWO_STUDENTS.as_bytes().to_vec(), RosterFormat::Csv)
            .await
            .unwrap_err();

        assert!(matches!(err, ClasskitError::InvalidCourse(_)));
        assert_eq!(*api.course_lookups.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn second_run_reports_already_enrolled() {
        let api = Arc::new(FakeClassroom::with_course("c1"));
        let first = run_csv(&api, EnrollMode::Add, TWO_STUDENTS).await.unwrap();
        let second = run_csv(&api, EnrollMode::Add, TWO_STUDENTS).await.unwrap();

        assert_eq!(first.counts().added, 2);
        assert_eq!(second.counts().added, 0);
        assert_eq!(second.counts().already_enrolled, 2);
    }

    #[tokio::test]
    async fn expired_token_aborts_remaining_records() {
        let api = Arc::new(FakeClassroom {
            expire_token_at: Some("b@x.com".into()),
            ..FakeClassroom::with_course("c1")
        });
        let report = run_csv(
            &api,
            EnrollMode::Add,
            "email\na@x.com\nb@x.com\nc@x.com\n",
        )
        .await
        .unwrap();

        assert_eq!(
            labels(&report),
            vec![
                ("a@x.com", "added"),
                ("b@x.com", "not attempted"),
                ("c@x.com", "not attempted"),
            ]
        );
        assert!(report.aborted().unwrap().contains("token expired"));
        // c@x.com is never sent and b@x.com is not retried.
        assert_eq!(api.calls().len(), 2);

        let retry: Vec<&str> = report
            .failed_records()
            .iter()
            .map(|r| r.identifier())
            .collect();
        assert_eq!(retry, vec!["b@x.com", "c@x.com"]);
    }

    #[tokio::test]
    async fn malformed_row_is_skipped_and_recorded() {
        let api = Arc::new(FakeClassroom::with_course("c1"));
        let report = run_csv(
            &api,
            EnrollMode::Add,
            "email,name\na@x.com,A\nbad@x.com,B,extra\nc@x.com,C\n",
        )
        .await
        .unwrap();

        assert_eq!(labels(&report), vec![("a@x.com", "added"), ("c@x.com", "added")]);
        assert_eq!(report.skipped_rows().len(), 1);
        assert_eq!(report.skipped_rows()[0].line, 3);
        assert_eq!(api.calls().len(), 2);
        assert_eq!(report.entries()[1].0.source_line(), 4);
    }

    #[tokio::test]
    async fn every_record_called_once_in_order() {
        let api = Arc::new(
            FakeClassroom::with_course("c1")
                .reject("b@x.com", 403, "The caller does not have permission")
                .enrolled("c@x.com"),
        );
        let report = run_csv(
            &api,
            EnrollMode::Invite,
            "email\na@x.com\nb@x.com\nc@x.com\nd@x.com\n",
        )
        .await
        .unwrap();

        let sent: Vec<String> = api.calls().into_iter().map(|(_, email)| email).collect();
        assert_eq!(sent, vec!["a@x.com", "b@x.com", "c@x.com", "d@x.com"]);
        assert!(api.calls().iter().all(|(mode, _)| *mode == EnrollMode::Invite));

        assert_eq!(report.entries().len(), 4);
        assert_eq!(report.counts().total(), 4);
        assert_eq!(report.mode(), EnrollMode::Invite);
        match &report.entries()[0].1 {
            SyncOutcome::Added(Enrollment::Invitation(inv)) => {
                assert_eq!(inv.id.as_deref(), Some("inv-a@x.com"))
            }
            other => panic!("expected invitation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reporter_sees_each_outcome_then_summary() {
        let api = Arc::new(FakeClassroom::with_course("c1").reject("b@x.com", 429, "Quota exceeded"));
        let reporter = Arc::new(RecordingReporter::default());
        let sync = RosterSynchronizer::new(api.clone(), reporter.clone());

        let report = sync
            .sync_bytes(
                &ctx(EnrollMode::Add),
                TWO_STUDENTS.as_bytes().to_vec(),
                RosterFormat::Csv,
            )
            .await
            .unwrap();

        assert_eq!(
            *reporter.seen.lock().unwrap(),
            vec![
                ("a@x.com".to_string(), "added"),
                ("b@x.com".to_string(), "failed"),
            ]
        );
        assert_eq!(*reporter.finished.lock().unwrap(), vec![report.counts()]);
    }

    #[tokio::test]
    async fn empty_roster_yields_empty_report() {
        let api = Arc::new(FakeClassroom::with_course("c1"));
        let report = run_csv(&api, EnrollMode::Add, "email,name\n").await.unwrap();
        assert!(report.entries().is_empty());
        assert_eq!(report.counts().total(), 0);
        assert!(report.is_clean());
    }

    #[test]
    fn course_ref_validation() {
        assert!(CourseRef::new("770249109796").validate().is_ok());
        assert!(CourseRef::new("").validate().is_err());
        assert!(CourseRef::new("   ").validate().is_err());
        assert!(CourseRef::new(" 77 ").validate().is_err());
        assert!(CourseRef::new("a/b").validate().is_err());
    }

    #[test]
    fn enroll_mode_from_config() {
        assert_eq!(EnrollMode::from(EnrollModeConfig::Add), EnrollMode::Add);
        assert_eq!(EnrollMode::from(EnrollModeConfig::default()), EnrollMode::Invite);
        assert_eq!(EnrollMode::Invite.to_string(), "invite");
    }
}
