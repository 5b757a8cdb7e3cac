//! Google Classroom API request/response structs.

use serde::{Deserialize, Serialize};

/// A Classroom course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_link: Option<String>,
}

/// Paginated list of courses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<Course>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Fields for creating a course.
#[derive(Debug, Clone, Default)]
pub struct NewCourse {
    pub name: String,
    pub section: String,
    pub room: String,
    pub description: String,
    pub description_heading: String,
}

impl NewCourse {
    /// Request body; the authenticated user becomes the owner.
    pub fn into_course(self) -> Course {
        Course {
            id: None,
            name: self.name,
            section: Some(self.section),
            description_heading: Some(self.description_heading),
            description: Some(self.description),
            room: Some(self.room),
            owner_id: Some("me".into()),
            course_state: None,
            alternate_link: None,
        }
    }
}

/// Name fields of a user profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Public profile of a Classroom user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

/// A student enrolled in a course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default)]
    pub course_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}

impl Student {
    /// Full name from the profile, falling back to the user id.
    pub fn display_name(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.name.as_ref())
            .and_then(|n| n.full_name.as_deref())
            .unwrap_or(&self.user_id)
    }

    pub fn email(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.email_address.as_deref())
    }

    /// Flat representation for CSV/JSON export.
    pub fn to_row(&self) -> StudentRow {
        StudentRow {
            user_id: self.user_id.clone(),
            full_name: self.display_name().to_string(),
            email: self.email().unwrap_or_default().to_string(),
        }
    }
}

/// One exported roster line.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StudentRow {
    pub user_id: String,
    pub full_name: String,
    pub email: String,
}

/// Paginated list of students.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub students: Option<Vec<Student>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Course role carried by an invitation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseRole {
    Student,
    Teacher,
    Owner,
}

/// An invitation to join a course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub course_id: String,
    pub role: CourseRole,
}

/// The remote record produced by enrolling or inviting a student.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrollment {
    Student(Student),
    Invitation(Invitation),
}

impl Enrollment {
    pub fn user_id(&self) -> &str {
        match self {
            Self::Student(s) => &s.user_id,
            Self::Invitation(i) => &i.user_id,
        }
    }
}

/// A topic used to group course materials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    pub name: String,
}

/// Paginated list of topics. The API names the array field `topic`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<Vec<Topic>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// A link attachment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Reference to a Google Drive file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A Drive file attachment and how it is shared with students.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SharedDriveFile {
    pub drive_file: DriveFile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_mode: Option<String>,
}

/// A YouTube video attachment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeVideo {
    pub id: String,
}

/// An attachment on an announcement or course material. Exactly one field is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_file: Option<SharedDriveFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_video: Option<YouTubeVideo>,
}

impl Material {
    pub fn link(url: &str) -> Self {
        Self {
            link: Some(Link {
                url: url.to_string(),
                title: None,
            }),
            ..Self::default()
        }
    }

    pub fn drive_file(id: &str) -> Self {
        Self {
            drive_file: Some(SharedDriveFile {
                drive_file: DriveFile {
                    id: id.to_string(),
                    title: None,
                },
                share_mode: Some("VIEW".into()),
            }),
            ..Self::default()
        }
    }

    pub fn youtube(id: &str) -> Self {
        Self {
            youtube_video: Some(YouTubeVideo { id: id.to_string() }),
            ..Self::default()
        }
    }
}

/// Publication state of a stream item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishState {
    #[default]
    Published,
    Draft,
}

/// An announcement posted to the course stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PublishState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_link: Option<String>,
}

/// Course material (a stream item without a grade).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseWorkMaterial {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PublishState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_link: Option<String>,
}

/// Fields for creating course material.
#[derive(Debug, Clone, Default)]
pub struct NewMaterial {
    pub title: String,
    pub description: String,
    pub topic_id: Option<String>,
    pub materials: Vec<Material>,
    pub state: PublishState,
}

/// Google API error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorBody {
    pub error: GoogleErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorDetail {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
