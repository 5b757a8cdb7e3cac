//! The remote operations roster synchronisation depends on.

use async_trait::async_trait;
use classkit_core::error::Result;

use crate::client::ClassroomClient;
use crate::models::{Course, Enrollment};

/// Result of a single enrolment call that reached the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrollResult {
    /// The student was newly enrolled or invited.
    Added(Enrollment),
    /// The provider reported the student as already present.
    AlreadyEnrolled(Enrollment),
}

/// Classroom operations used by [`crate::sync::RosterSynchronizer`].
///
/// Implemented by [`ClassroomClient`]; tests substitute an in-memory fake.
#[async_trait]
pub trait RosterApi: Send + Sync {
    /// Look up a course. `Ok(None)` when it does not exist.
    async fn get_course(&self, course_id: &str) -> Result<Option<Course>>;

    /// Enrol a student directly.
    async fn add_student(&self, course_id: &str, user_id: &str) -> Result<EnrollResult>;

    /// Invite a student to join.
    async fn invite_student(&self, course_id: &str, user_id: &str) -> Result<EnrollResult>;
}

#[async_trait]
impl RosterApi for ClassroomClient {
    async fn get_course(&self, course_id: &str) -> Result<Option<Course>> {
        ClassroomClient::get_course(self, course_id).await
    }

    async fn add_student(&self, course_id: &str, user_id: &str) -> Result<EnrollResult> {
        ClassroomClient::add_student(self, course_id, user_id).await
    }

    async fn invite_student(&self, course_id: &str, user_id: &str) -> Result<EnrollResult> {
        ClassroomClient::invite_student(self, course_id, user_id).await
    }
}
