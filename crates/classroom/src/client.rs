//! Typed reqwest wrapper for the Google Classroom API.

use std::time::Duration;

use classkit_core::config::ClassroomConfig;
use classkit_core::error::{ClasskitError, RemoteErrorKind, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::api::EnrollResult;
use crate::auth::AccessToken;
use crate::models::{
    Announcement, Course, CourseList, CourseRole, CourseWorkMaterial, Enrollment,
    GoogleErrorBody, Invitation, Material, NewCourse, NewMaterial, PublishState, Student,
    StudentList, Topic, TopicList,
};

const CLASSROOM_API_BASE: &str = "https://classroom.googleapis.com";
const DEFAULT_PAGE_SIZE: u32 = 100;

/// HTTP client for Google Classroom operations.
pub struct ClassroomClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: String,
    page_size: u32,
}

impl ClassroomClient {
    /// Create a new client with the given bearer token.
    pub fn new(auth_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: CLASSROOM_API_BASE.to_string(),
            auth_token: auth_token.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Create a client from the `[classroom]` config section.
    pub fn from_config(config: &ClassroomConfig, token: &AccessToken) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: token.secret().to_string(),
            page_size: config.page_size,
        })
    }

    /// Override the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn courses_url(&self) -> String {
        format!("{}/v1/courses", self.base_url)
    }

    fn course_url(&self, course_id: &str) -> String {
        format!("{}/{}", self.courses_url(), urlencoding::encode(course_id))
    }

    fn students_url(&self, course_id: &str) -> String {
        format!("{}/students", self.course_url(course_id))
    }

    fn student_url(&self, course_id: &str, user_id: &str) -> String {
        format!(
            "{}/{}",
            self.students_url(course_id),
            urlencoding::encode(user_id)
        )
    }

    fn invitations_url(&self) -> String {
        format!("{}/v1/invitations", self.base_url)
    }

    async fn execute(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        req.bearer_auth(&self.auth_token).send().await.map_err(|e| {
            warn!(error = %e, "{what} request failed");
            ClasskitError::Http(e)
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        let resp = self.execute(req, what).await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp, what).await);
        }
        parse_json(resp, what).await
    }

    /// Like `send_json`, but a 404 is `Ok(None)`.
    async fn send_optional<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        what: &str,
    ) -> Result<Option<T>> {
        let resp = self.execute(req, what).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(error_from_response(resp, what).await);
        }
        parse_json(resp, what).await.map(Some)
    }

    /// List active courses visible to the authenticated user.
    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        let page_size = self.page_size.to_string();
        let mut courses = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self.http.get(self.courses_url()).query(&[
                ("courseStates", "ACTIVE"),
                ("pageSize", page_size.as_str()),
            ]);
            if let Some(token) = page_token.as_deref() {
                req = req.query(&[("pageToken", token)]);
            }

            let page: CourseList = self.send_json(req, "list courses").await?;
            courses.extend(page.courses.unwrap_or_default());

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(count = courses.len(), "found courses");
        Ok(courses)
    }

    /// Get a course by id. Returns None if 404.
    pub async fn get_course(&self, course_id: &str) -> Result<Option<Course>> {
        let req = self.http.get(self.course_url(course_id));
        self.send_optional(req, "get course").await
    }

    /// Find an active course by exact id, or by case-insensitive name.
    pub async fn find_course(&self, id_or_name: &str) -> Result<Option<Course>> {
        let courses = self.list_courses().await?;
        let found = match_course(courses, id_or_name);
        match &found {
            Some(course) => info!(
                course_id = course.id.as_deref().unwrap_or_default(),
                name = %course.name,
                "course found"
            ),
            None => warn!(query = id_or_name, "course not found"),
        }
        Ok(found)
    }

    /// Create a course owned by the authenticated user.
    pub async fn create_course(&self, course: NewCourse) -> Result<Course> {
        let body = course.into_course();
        let req = self.http.post(self.courses_url()).json(&body);
        let created: Course = self.send_json(req, "create course").await?;
        info!(
            course_id = created.id.as_deref().unwrap_or_default(),
            name = %created.name,
            "course created"
        );
        Ok(created)
    }

    /// List every student in a course, following pagination.
    pub async fn list_students(&self, course_id: &str) -> Result<Vec<Student>> {
        let page_size = self.page_size.to_string();
        let mut students = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .http
                .get(self.students_url(course_id))
                .query(&[("pageSize", page_size.as_str())]);
            if let Some(token) = page_token.as_deref() {
                req = req.query(&[("pageToken", token)]);
            }

            let page: StudentList = self.send_json(req, "list students").await?;
            students.extend(page.students.unwrap_or_default());

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(course_id, count = students.len(), "found students in course");
        Ok(students)
    }

    /// Get one student of a course. Returns None if 404.
    pub async fn get_student(&self, course_id: &str, user_id: &str) -> Result<Option<Student>> {
        let req = self.http.get(self.student_url(course_id, user_id));
        self.send_optional(req, "get student").await
    }

    /// Enrol a student directly. Requires domain administrator rights.
    ///
    /// A 409 means the student is already in the course; the existing
    /// record is fetched and returned as `AlreadyEnrolled`.
    pub async fn add_student(&self, course_id: &str, user_id: &str) -> Result<EnrollResult> {
        let body = serde_json::json!({ "userId": user_id });
        let req = self.http.post(self.students_url(course_id)).json(&body);
        let resp = self.execute(req, "add student").await?;

        if resp.status() == StatusCode::CONFLICT {
            let existing = match self.get_student(course_id, user_id).await {
                Ok(Some(student)) => student,
                Ok(None) => minimal_student(course_id, user_id),
                Err(e) => {
                    debug!(error = %e, "could not fetch existing student record");
                    minimal_student(course_id, user_id)
                }
            };
            return Ok(EnrollResult::AlreadyEnrolled(Enrollment::Student(existing)));
        }

        if !resp.status().is_success() {
            return Err(error_from_response(resp, "add student").await);
        }

        let student: Student = parse_json(resp, "add student").await?;
        Ok(EnrollResult::Added(Enrollment::Student(student)))
    }

    /// Send a course invitation to a student. A 409 means already invited or enrolled.
    pub async fn invite_student(&self, course_id: &str, user_id: &str) -> Result<EnrollResult> {
        let body = Invitation {
            id: None,
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            role: CourseRole::Student,
        };
        let req = self.http.post(self.invitations_url()).json(&body);
        let resp = self.execute(req, "invite student").await?;

        if resp.status() == StatusCode::CONFLICT {
            return Ok(EnrollResult::AlreadyEnrolled(Enrollment::Invitation(body)));
        }

        if !resp.status().is_success() {
            return Err(error_from_response(resp, "invite student").await);
        }

        let invitation: Invitation = parse_json(resp, "invite student").await?;
        Ok(EnrollResult::Added(Enrollment::Invitation(invitation)))
    }

    /// Post an announcement to all students of a course.
    pub async fn create_announcement(
        &self,
        course_id: &str,
        text: &str,
        materials: Vec<Material>,
    ) -> Result<Announcement> {
        let body = Announcement {
            id: None,
            text: text.to_string(),
            state: Some(PublishState::Published),
            assignee_mode: Some("ALL_STUDENTS".into()),
            materials,
            alternate_link: None,
        };
        let req = self
            .http
            .post(format!("{}/announcements", self.course_url(course_id)))
            .json(&body);
        let created: Announcement = self.send_json(req, "create announcement").await?;
        info!(
            course_id,
            announcement_id = created.id.as_deref().unwrap_or_default(),
            "announcement created"
        );
        Ok(created)
    }

    /// List the topics of a course.
    pub async fn list_topics(&self, course_id: &str) -> Result<Vec<Topic>> {
        let mut topics = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .http
                .get(format!("{}/topics", self.course_url(course_id)));
            if let Some(token) = page_token.as_deref() {
                req = req.query(&[("pageToken", token)]);
            }

            let page: TopicList = self.send_json(req, "list topics").await?;
            topics.extend(page.topic.unwrap_or_default());

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(course_id, count = topics.len(), "found topics in course");
        Ok(topics)
    }

    /// Create a topic in a course.
    pub async fn create_topic(&self, course_id: &str, name: &str) -> Result<Topic> {
        let body = serde_json::json!({ "name": name });
        let req = self
            .http
            .post(format!("{}/topics", self.course_url(course_id)))
            .json(&body);
        let created: Topic = self.send_json(req, "create topic").await?;
        info!(
            course_id,
            topic_id = created.topic_id.as_deref().unwrap_or_default(),
            name,
            "topic created"
        );
        Ok(created)
    }

    /// Publish (or draft) course material.
    pub async fn create_material(
        &self,
        course_id: &str,
        material: NewMaterial,
    ) -> Result<CourseWorkMaterial> {
        let body = CourseWorkMaterial {
            id: None,
            title: material.title,
            description: Some(material.description).filter(|d| !d.is_empty()),
            state: Some(material.state),
            topic_id: material.topic_id,
            materials: material.materials,
            alternate_link: None,
        };
        let req = self
            .http
            .post(format!("{}/courseWorkMaterials", self.course_url(course_id)))
            .json(&body);
        let created: CourseWorkMaterial = self.send_json(req, "create material").await?;
        info!(
            course_id,
            material_id = created.id.as_deref().unwrap_or_default(),
            title = %created.title,
            "material created"
        );
        Ok(created)
    }
}

fn minimal_student(course_id: &str, user_id: &str) -> Student {
    Student {
        course_id: course_id.to_string(),
        user_id: user_id.to_string(),
        profile: None,
    }
}

/// Pick a course by exact id, falling back to a case-insensitive name match.
pub fn match_course(courses: Vec<Course>, id_or_name: &str) -> Option<Course> {
    let query = id_or_name.trim();
    if let Some(pos) = courses
        .iter()
        .position(|c| c.id.as_deref() == Some(query))
    {
        return courses.into_iter().nth(pos);
    }
    let lowered = query.to_lowercase();
    courses
        .into_iter()
        .find(|c| c.name.to_lowercase() == lowered)
}

async fn parse_json<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
    resp.json::<T>()
        .await
        .map_err(|e| ClasskitError::Serialization(format!("{what} parse failed: {e}")))
}

/// Turn a non-success response into an error.
///
/// 401 is an authentication failure; anything else is a remote rejection
/// carrying the provider's message.
async fn error_from_response(resp: Response, what: &str) -> ClasskitError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    classify_error(status, &body, what)
}

fn classify_error(status: StatusCode, body: &str, what: &str) -> ClasskitError {
    let parsed = serde_json::from_str::<GoogleErrorBody>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body.to_string()
            }
        });

    if status == StatusCode::UNAUTHORIZED {
        return ClasskitError::Auth(format!("{what} rejected the access token ({status}): {message}"));
    }

    let kind = RemoteErrorKind::from_status(
        status.as_u16(),
        parsed.as_ref().and_then(|b| b.error.status.as_deref()),
    );
    warn!(status = status.as_u16(), %kind, "{what} failed: {message}");

    ClasskitError::Remote {
        status: status.as_u16(),
        kind,
        message,
    }
}
