use std::path::Path;

use classkit_classroom::models::StudentRow;
use classkit_core::roster::write_students;
use tracing::info;

use super::{connect, load_config, resolve_course};

/// Run the `students` command: list the students of a course.
pub async fn list(config_path: &str, course: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let client = connect(&config).await?;
    let (course_id, course) = resolve_course(&client, course).await?;

    let students = client.list_students(&course_id).await?;
    println!("{} student(s) in {}:", students.len(), course.name);
    for student in &students {
        println!(
            "  {:<24} {:<32} {}",
            student.user_id,
            student.display_name(),
            student.email().unwrap_or("")
        );
    }

    Ok(())
}

/// Run the `export-students` command: write the course roster to CSV or JSON.
pub async fn export(config_path: &str, course: &str, output: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let client = connect(&config).await?;
    let (course_id, course) = resolve_course(&client, course).await?;

    let rows: Vec<StudentRow> = client
        .list_students(&course_id)
        .await?
        .iter()
        .map(|s| s.to_row())
        .collect();

    if rows.is_empty() {
        println!("No students in {}. Nothing written.", course.name);
        return Ok(());
    }

    write_students(output, &rows)?;
    info!(course_id, count = rows.len(), "exported students");
    println!("Exported {} student(s) to {}", rows.len(), output.display());

    Ok(())
}
