use classkit_classroom::models::{Material, NewMaterial, PublishState};
use classkit_classroom::topics::ensure_topic;

use super::{connect, load_config, resolve_course};

/// Options for the `create-material` command.
#[derive(Debug, Clone, Default)]
pub struct MaterialOptions {
    pub course: String,
    pub title: String,
    pub description: String,
    /// Topic name; created if the course has no topic with this name.
    pub topic: Option<String>,
    pub links: Vec<String>,
    pub drive_files: Vec<String>,
    pub youtube: Vec<String>,
    pub draft: bool,
}

impl MaterialOptions {
    fn attachments(&self) -> Vec<Material> {
        self.links
            .iter()
            .map(|url| Material::link(url))
            .chain(self.drive_files.iter().map(|id| Material::drive_file(id)))
            .chain(self.youtube.iter().map(|id| Material::youtube(id)))
            .collect()
    }
}

/// Run the `create-topic` command. Reuses an existing topic with the same name.
pub async fn create_topic(config_path: &str, course: &str, name: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let client = connect(&config).await?;
    let (course_id, course) = resolve_course(&client, course).await?;

    let topic_id = ensure_topic(&client, &course_id, name).await?;
    println!("Topic '{}' in {}: {topic_id}", name.trim(), course.name);

    Ok(())
}

/// Run the `create-material` command.
pub async fn create_material(config_path: &str, opts: MaterialOptions) -> anyhow::Result<()> {
    if opts.title.trim().is_empty() {
        anyhow::bail!("material title must not be empty");
    }

    let config = load_config(config_path)?;
    let client = connect(&config).await?;
    let (course_id, course) = resolve_course(&client, &opts.course).await?;

    let topic_id = match opts.topic.as_deref() {
        Some(name) => Some(ensure_topic(&client, &course_id, name).await?),
        None => None,
    };

    let material = NewMaterial {
        title: opts.title.clone(),
        description: opts.description.clone(),
        topic_id,
        materials: opts.attachments(),
        state: if opts.draft {
            PublishState::Draft
        } else {
            PublishState::Published
        },
    };

    let created = client.create_material(&course_id, material).await?;
    println!(
        "Material '{}' {} in {}",
        created.title,
        if opts.draft { "drafted" } else { "published" },
        course.name
    );
    if let Some(link) = &created.alternate_link {
        println!("  {link}");
    }

    Ok(())
}
