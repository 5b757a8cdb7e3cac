use classkit_classroom::models::Material;

use super::{connect, load_config, resolve_course};

/// Run the `announce` command: post an announcement to all students.
pub async fn run(config_path: &str, course: &str, text: &str, links: &[String]) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("announcement text must not be empty");
    }

    let config = load_config(config_path)?;
    let client = connect(&config).await?;
    let (course_id, course) = resolve_course(&client, course).await?;

    let materials = links.iter().map(|url| Material::link(url)).collect();
    let announcement = client
        .create_announcement(&course_id, text, materials)
        .await?;

    println!("Announcement posted to {}", course.name);
    if let Some(link) = &announcement.alternate_link {
        println!("  {link}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn announce_rejects_empty_text() {
        let err = run("/nonexistent/classkit.toml", "c1", "  ", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("text"));
    }

    #[tokio::test]
    async fn announce_posts_links_as_materials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/courses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(course_list()))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/courses/c2/announcements"))
            .and(body_json(serde_json::json!({
                "text": "Lab moved to room 4",
                "state": "PUBLISHED",
                "assigneeMode": "ALL_STUDENTS",
                "materials": [{"link": {"url": "https://example.com/map"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "a1", "text": "Lab moved to room 4"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        run(
            &write_config(dir.path(), &server.uri()),
            "Physics",
            "Lab moved to room 4",
            &["https://example.com/map".to_string()],
        )
        .await
        .unwrap();
    }
}
