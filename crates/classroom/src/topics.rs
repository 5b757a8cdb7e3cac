//! Topic management for course materials.

use classkit_core::error::{ClasskitError, Result};
use tracing::debug;

use crate::client::ClassroomClient;
use crate::models::Topic;

/// Find a topic by name among `existing`, ignoring case and surrounding whitespace.
pub fn find_topic<'a>(existing: &'a [Topic], name: &str) -> Option<&'a Topic> {
    let wanted = name.trim().to_lowercase();
    existing
        .iter()
        .find(|t| t.name.trim().to_lowercase() == wanted)
}

/// Ensure a topic named `name` exists in the course and return its id.
/// Creates it if no existing topic matches.
pub async fn ensure_topic(client: &ClassroomClient, course_id: &str, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClasskitError::Config("topic name is empty".into()));
    }

    let existing = client.list_topics(course_id).await?;
    if let Some(id) = find_topic(&existing, name).and_then(|t| t.topic_id.clone()) {
        debug!(course_id, topic_id = %id, "reusing existing topic");
        return Ok(id);
    }

    let created = client.create_topic(course_id, name).await?;
    created.topic_id.ok_or_else(|| {
        ClasskitError::Serialization(format!("created topic '{name}' has no topicId"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn topic(id: &str, name: &str) -> Topic {
        Topic {
            course_id: Some("c1".into()),
            topic_id: Some(id.into()),
            name: name.into(),
        }
    }

    #[test]
    fn find_topic_ignores_case() {
        let topics = vec![topic("t1", "Week 1"), topic("t2", "Homework")];
        assert_eq!(
            find_topic(&topics, " homework ").and_then(|t| t.topic_id.as_deref()),
            Some("t2")
        );
        assert!(find_topic(&topics, "Week 2").is_none());
    }

    #[tokio::test]
    async fn ensure_topic_reuses_existing() {
        let server = MockServer::start().await;
        let client = ClassroomClient::new("tok").with_base_url(&server.uri());

        Mock::given(method("GET"))
            .and(path("/v1/courses/c1/topics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "topic": [{"courseId": "c1", "topicId": "t1", "name": "Week 1"}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/courses/c1/topics"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let id = ensure_topic(&client, "c1", "week 1").await.unwrap();
        assert_eq!(id, "t1");
    }

    #[tokio::test]
    async fn ensure_topic_creates_missing() {
        let server = MockServer::start().await;
        let client = ClassroomClient::new("tok").with_base_url(&server.uri());

        Mock::given(method("GET"))
            .and(path("/v1/courses/c1/topics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/courses/c1/topics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "courseId": "c1", "topicId": "t9", "name": "Labs"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = ensure_topic(&client, "c1", "Labs").await.unwrap();
        assert_eq!(id, "t9");
    }

    #[tokio::test]
    async fn ensure_topic_rejects_blank_name() {
        let client = ClassroomClient::new("tok").with_base_url("http://127.0.0.1:9");
        let err = ensure_topic(&client, "c1", "   ").await.unwrap_err();
        assert!(matches!(err, ClasskitError::Config(_)));
    }
}
