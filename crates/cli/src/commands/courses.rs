use classkit_classroom::models::NewCourse;

use super::{connect, load_config};

/// Run the `courses` command: list active courses.
pub async fn list(config_path: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let client = connect(&config).await?;

    let courses = client.list_courses().await?;
    if courses.is_empty() {
        println!("No active courses found.");
        return Ok(());
    }

    println!("{} active course(s):", courses.len());
    for course in &courses {
        println!(
            "  {:<16} {} {}",
            course.id.as_deref().unwrap_or("-"),
            course.name,
            course
                .section
                .as_deref()
                .map(|s| format!("({s})"))
                .unwrap_or_default()
        );
    }

    Ok(())
}

/// Run the `create-course` command.
pub async fn create(config_path: &str, course: NewCourse) -> anyhow::Result<()> {
    if course.name.trim().is_empty() {
        anyhow::bail!("course name must not be empty");
    }

    let config = load_config(config_path)?;
    let client = connect(&config).await?;

    let created = client.create_course(course).await?;
    println!("Course created!");
    println!("  ID:    {}", created.id.as_deref().unwrap_or("-"));
    println!("  Name:  {}", created.name);
    println!(
        "  State: {}",
        created.course_state.as_deref().unwrap_or("unknown")
    );
    if let Some(link) = &created.alternate_link {
        println!("  Link:  {link}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn courses_requires_config_file() {
        assert!(list("/nonexistent/classkit.toml").await.is_err());
    }

    #[tokio::test]
    async fn courses_lists_with_configured_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/courses"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(course_list()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        list(&write_config(dir.path(), &server.uri())).await.unwrap();
    }

    #[tokio::test]
    async fn create_course_rejects_blank_name() {
        let err = create("/nonexistent/classkit.toml", NewCourse::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[tokio::test]
    async fn create_course_posts_to_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/courses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "c9", "name": "Chemistry", "courseState": "PROVISIONED"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        create(
            &write_config(dir.path(), &server.uri()),
            NewCourse {
                name: "Chemistry".into(),
                ..NewCourse::default()
            },
        )
        .await
        .unwrap();
    }
}
