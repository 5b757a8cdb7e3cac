pub mod announce;
pub mod courses;
pub mod import_students;
pub mod init;
pub mod materials;
pub mod students;

use std::path::Path;

use classkit_classroom::auth::provider_from_config;
use classkit_classroom::client::ClassroomClient;
use classkit_classroom::models::Course;
use classkit_core::config::ClasskitConfig;
use tracing::info;

/// Load and validate the configuration file.
pub(crate) fn load_config(config_path: &str) -> anyhow::Result<ClasskitConfig> {
    let path = Path::new(config_path);
    if !path.exists() {
        anyhow::bail!("configuration file {config_path} not found. Run `classkit init` first.");
    }
    let config = ClasskitConfig::load(path)?;
    config.validate()?;
    info!("Loaded configuration from {}", config_path);
    Ok(config)
}

/// Obtain an access token and build an authenticated client.
pub(crate) async fn connect(config: &ClasskitConfig) -> anyhow::Result<ClassroomClient> {
    let provider = provider_from_config(&config.auth)?;
    let token = provider.access_token().await?;
    Ok(ClassroomClient::from_config(&config.classroom, &token)?)
}

/// Resolve `--course` (an id or a course name) to an active course and its id.
pub(crate) async fn resolve_course(
    client: &ClassroomClient,
    id_or_name: &str,
) -> anyhow::Result<(String, Course)> {
    let course = client
        .find_course(id_or_name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no active course matches '{id_or_name}'"))?;
    let course_id = course
        .id
        .clone()
        .ok_or_else(|| anyhow::anyhow!("course '{}' has no id", course.name))?;
    Ok((course_id, course))
}
